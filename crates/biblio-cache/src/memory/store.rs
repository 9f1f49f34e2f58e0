//! In-memory store implementation using the moka crate.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use tracing::debug;

use biblio_core::config::store::MemoryStoreConfig;
use biblio_core::result::AppResult;
use biblio_core::traits::kv::KvStore;

/// A string entry with its own expiry deadline.
///
/// Entries carry their deadline explicitly: a blacklist entry must outlive
/// the token it blocks, so a cache-wide TTL cannot stand in for per-entry
/// expiry.
#[derive(Debug, Clone)]
struct StoredEntry {
    value: String,
    expires_at: Instant,
}

impl StoredEntry {
    fn is_expired(&self) -> bool {
        self.expires_at <= Instant::now()
    }
}

/// Expiry policy that evicts each entry at its own deadline.
#[derive(Debug)]
struct DeadlineExpiry;

impl Expiry<String, StoredEntry> for DeadlineExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &StoredEntry,
        created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.expires_at.saturating_duration_since(created_at))
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &StoredEntry,
        updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.expires_at.saturating_duration_since(updated_at))
    }
}

/// In-memory key-value store provider using moka for string entries and
/// dashmap for set, list, and counter structures.
///
/// The test-suite backend, and sufficient for single-node deployments.
/// String entries expire at their write-time TTL; set and list structures
/// expire when a TTL is attached via `expire` or `list_push_capped`, and
/// are purged lazily on access.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    /// String entries.
    cache: Cache<String, StoredEntry>,
    /// Default TTL for entries.
    default_ttl: Duration,
    /// Set structures (user session indexes).
    sets: Arc<dashmap::DashMap<String, BTreeSet<String>>>,
    /// List structures (capped security log indexes).
    lists: Arc<dashmap::DashMap<String, Vec<String>>>,
    /// Counters stored separately for atomic incr.
    counters: Arc<dashmap::DashMap<String, AtomicI64>>,
    /// Deadlines for set/list keys that received a TTL.
    deadlines: Arc<dashmap::DashMap<String, Instant>>,
}

impl MemoryStore {
    /// Create a new in-memory store from configuration.
    pub fn new(config: &MemoryStoreConfig, default_ttl_seconds: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(DeadlineExpiry)
            .build();

        Self {
            cache,
            default_ttl: Duration::from_secs(default_ttl_seconds),
            sets: Arc::new(dashmap::DashMap::new()),
            lists: Arc::new(dashmap::DashMap::new()),
            counters: Arc::new(dashmap::DashMap::new()),
            deadlines: Arc::new(dashmap::DashMap::new()),
        }
    }

    /// Drop a set/list structure whose deadline has passed.
    fn purge_structure_if_expired(&self, key: &str) {
        let expired = self
            .deadlines
            .get(key)
            .is_some_and(|entry| *entry.value() <= Instant::now());
        if expired {
            self.deadlines.remove(key);
            self.sets.remove(key);
            self.lists.remove(key);
        }
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        match self.cache.get(key).await {
            Some(entry) if !entry.is_expired() => Ok(Some(entry.value)),
            Some(_) => {
                self.cache.remove(key).await;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        let entry = StoredEntry {
            value: value.to_string(),
            expires_at: Instant::now() + ttl,
        };
        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn set_default(&self, key: &str, value: &str) -> AppResult<()> {
        self.set(key, value, self.default_ttl).await
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.cache.remove(key).await;
        self.sets.remove(key);
        self.lists.remove(key);
        self.counters.remove(key);
        self.deadlines.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        if self.get(key).await?.is_some() {
            return Ok(true);
        }
        self.purge_structure_if_expired(key);
        Ok(self.sets.contains_key(key) || self.lists.contains_key(key))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<bool> {
        let deadline = Instant::now() + ttl;

        if let Some(entry) = self.cache.get(key).await {
            if !entry.is_expired() {
                let refreshed = StoredEntry {
                    value: entry.value,
                    expires_at: deadline,
                };
                self.cache.insert(key.to_string(), refreshed).await;
                return Ok(true);
            }
            self.cache.remove(key).await;
        }

        self.purge_structure_if_expired(key);
        if self.sets.contains_key(key) || self.lists.contains_key(key) {
            self.deadlines.insert(key.to_string(), deadline);
            return Ok(true);
        }
        Ok(false)
    }

    async fn incr(&self, key: &str) -> AppResult<i64> {
        let entry = self
            .counters
            .entry(key.to_string())
            .or_insert_with(|| AtomicI64::new(0));
        let new_val = entry.value().fetch_add(1, Ordering::SeqCst) + 1;
        Ok(new_val)
    }

    async fn set_add(&self, key: &str, member: &str) -> AppResult<bool> {
        self.purge_structure_if_expired(key);
        let mut entry = self.sets.entry(key.to_string()).or_default();
        Ok(entry.value_mut().insert(member.to_string()))
    }

    async fn set_remove(&self, key: &str, member: &str) -> AppResult<bool> {
        self.purge_structure_if_expired(key);
        match self.sets.get_mut(key) {
            Some(mut entry) => Ok(entry.value_mut().remove(member)),
            None => Ok(false),
        }
    }

    async fn set_members(&self, key: &str) -> AppResult<Vec<String>> {
        self.purge_structure_if_expired(key);
        Ok(self
            .sets
            .get(key)
            .map(|entry| entry.value().iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn list_push_capped(
        &self,
        key: &str,
        value: &str,
        cap: u64,
        ttl: Duration,
    ) -> AppResult<()> {
        self.purge_structure_if_expired(key);
        let mut entry = self.lists.entry(key.to_string()).or_default();
        let list = entry.value_mut();
        list.insert(0, value.to_string());
        list.truncate(cap as usize);
        drop(entry);
        self.deadlines.insert(key.to_string(), Instant::now() + ttl);
        Ok(())
    }

    async fn list_range(&self, key: &str, limit: u64) -> AppResult<Vec<String>> {
        self.purge_structure_if_expired(key);
        Ok(self
            .lists
            .get(key)
            .map(|entry| entry.value().iter().take(limit as usize).cloned().collect())
            .unwrap_or_default())
    }

    async fn scan_keys(&self, pattern: &str) -> AppResult<Vec<String>> {
        // Prefix matching over all namespaces. moka's iterator lags recent
        // inserts until pending tasks run.
        self.cache.run_pending_tasks().await;
        let prefix = pattern.trim_end_matches('*');
        let mut keys: Vec<String> = self
            .cache
            .iter()
            .filter(|entry| entry.0.starts_with(prefix) && !entry.1.is_expired())
            .map(|entry| entry.0.to_string())
            .collect();

        let structure_keys: Vec<String> = self
            .sets
            .iter()
            .map(|entry| entry.key().clone())
            .chain(self.lists.iter().map(|entry| entry.key().clone()))
            .filter(|key| key.starts_with(prefix))
            .collect();
        for key in structure_keys {
            self.purge_structure_if_expired(&key);
            if self.sets.contains_key(&key) || self.lists.contains_key(&key) {
                keys.push(key);
            }
        }

        debug!(pattern, count = keys.len(), "Scanned keys matching pattern");
        Ok(keys)
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    async fn flush_all(&self) -> AppResult<()> {
        self.cache.invalidate_all();
        self.sets.clear();
        self.lists.clear();
        self.counters.clear();
        self.deadlines.clear();
        Ok(())
    }
}
