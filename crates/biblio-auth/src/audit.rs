//! Append-only security event trail.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use futures::future::join_all;
use tracing::{info, warn};
use uuid::Uuid;

use biblio_cache::{StoreManager, keys};
use biblio_core::AppResult;
use biblio_core::config::session::SessionConfig;
use biblio_core::traits::kv::KvStore;
use biblio_entity::security_event::SecurityEvent;

/// Records authentication events independently of the authorization
/// decision they describe.
///
/// `record` is infallible to callers: a logging failure must never fail
/// the surrounding auth operation.
#[derive(Debug, Clone)]
pub struct SecurityEventLogger {
    /// Key-value store handle.
    store: Arc<StoreManager>,
    /// Session configuration (retention and index cap).
    config: SessionConfig,
}

impl SecurityEventLogger {
    /// Creates a new security event logger.
    pub fn new(store: Arc<StoreManager>, config: SessionConfig) -> Self {
        Self { store, config }
    }

    /// Records one event: persists it under a time-bounded key, prepends
    /// its id to the capped per-user index, and emits a structured line.
    pub async fn record(&self, event: SecurityEvent) {
        info!(
            event_id = %event.id,
            kind = %event.kind,
            actor_id = %event.actor_id,
            session_id = ?event.session_id,
            ip = ?event.ip_address,
            "Security event"
        );

        let ttl = StdDuration::from_secs(self.config.security_event_ttl_days * 86400);

        if let Err(e) = self
            .store
            .set_json(&keys::security_event(event.id), &event, ttl)
            .await
        {
            warn!(event_id = %event.id, error = %e, "Failed to persist security event");
            return;
        }

        if let Err(e) = self
            .store
            .list_push_capped(
                &keys::user_security_log(event.actor_id),
                &event.id.to_string(),
                self.config.security_event_index_len,
                ttl,
            )
            .await
        {
            warn!(event_id = %event.id, error = %e, "Failed to index security event");
        }
    }

    /// Returns up to `limit` most recent events for a user, newest first.
    /// Events whose records have already expired are skipped.
    pub async fn recent_for_user(&self, user_id: Uuid, limit: u64) -> AppResult<Vec<SecurityEvent>> {
        let ids = self
            .store
            .list_range(&keys::user_security_log(user_id), limit)
            .await?;

        let reads = ids.iter().map(|id| {
            let store = Arc::clone(&self.store);
            let key = keys::security_event(id.parse().unwrap_or_default());
            async move { store.get_json::<SecurityEvent>(&key).await }
        });

        let mut events = Vec::with_capacity(ids.len());
        for result in join_all(reads).await {
            if let Some(event) = result? {
                events.push(event);
            }
        }
        Ok(events)
    }
}
