//! Periodic cleanup of expired session records.

use std::sync::Arc;

use tracing::{error, info};

use biblio_cache::{StoreManager, keys};
use biblio_core::AppResult;
use biblio_core::traits::kv::KvStore;
use biblio_entity::security_event::{SecurityEvent, SecurityEventKind};

use crate::audit::SecurityEventLogger;

use super::repository::SessionRepository;

/// Scans the session namespace and removes records whose logical expiry
/// has passed but whose physical TTL has not yet fired.
///
/// The store's own TTLs are the primary expiry mechanism; the sweep is a
/// consistency pass that also repairs the per-user index for records that
/// expired in place.
#[derive(Debug, Clone)]
pub struct SessionSweeper {
    /// Key-value store handle.
    store: Arc<StoreManager>,
    /// Session persistence.
    sessions: Arc<SessionRepository>,
    /// Audit trail.
    audit: Arc<SecurityEventLogger>,
}

impl SessionSweeper {
    /// Creates a new session sweeper.
    pub fn new(
        store: Arc<StoreManager>,
        sessions: Arc<SessionRepository>,
        audit: Arc<SecurityEventLogger>,
    ) -> Self {
        Self {
            store,
            sessions,
            audit,
        }
    }

    /// Runs one sweep pass and returns the number of sessions removed.
    ///
    /// A failure on one record is logged and skipped; the pass continues,
    /// so a single poisoned key cannot stall cleanup of the rest.
    pub async fn run_sweep(&self) -> AppResult<u32> {
        let session_keys = self.store.scan_keys(&keys::session_pattern()).await?;
        let scanned = session_keys.len();
        let mut removed = 0u32;

        for key in session_keys {
            let Some(session_id) = keys::parse_session_key(&key) else {
                continue;
            };

            let record = match self.sessions.get(session_id).await {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(e) => {
                    error!(session_id = %session_id, error = %e, "Sweep: failed to read session");
                    continue;
                }
            };

            if !record.is_expired() {
                continue;
            }

            if let Err(e) = self.sessions.delete(session_id).await {
                error!(session_id = %session_id, error = %e, "Sweep: failed to delete session");
                continue;
            }
            if let Err(e) = self
                .sessions
                .remove_from_user_index(record.user_id, session_id)
                .await
            {
                error!(session_id = %session_id, error = %e, "Sweep: failed to unindex session");
            }

            self.audit
                .record(SecurityEvent::new(
                    SecurityEventKind::SweepExpired,
                    record.user_id,
                    Some(session_id),
                ))
                .await;

            removed += 1;
        }

        info!(scanned, removed, "Session sweep complete");
        Ok(removed)
    }
}
