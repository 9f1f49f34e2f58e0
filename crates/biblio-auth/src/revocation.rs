//! Blacklist entries and revocation markers.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use futures::future::join_all;
use tracing::{info, warn};
use uuid::Uuid;

use biblio_cache::{StoreManager, keys};
use biblio_core::AppResult;
use biblio_core::traits::kv::KvStore;
use biblio_entity::security_event::{SecurityEvent, SecurityEventKind};

use crate::audit::SecurityEventLogger;
use crate::session::SessionRepository;
use crate::session::repository::ttl_until;
use crate::token::TokenClass;

/// Minimum blacklist TTL, so a near-expiry race cannot produce a
/// zero-TTL no-op entry.
const BLACKLIST_TTL_FLOOR_SECONDS: u64 = 60;

/// Outcome of a best-effort batch revocation.
///
/// Individual failures do not roll back the successful portion;
/// revocation is best-effort-maximal, not all-or-nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevocationOutcome {
    /// Markers successfully written.
    pub revoked: u32,
    /// Marker writes that failed.
    pub failed: u32,
}

/// Marks sessions and tokens as invalid.
#[derive(Debug, Clone)]
pub struct RevocationManager {
    /// Key-value store handle.
    store: Arc<StoreManager>,
    /// Session persistence.
    sessions: Arc<SessionRepository>,
    /// Audit trail.
    audit: Arc<SecurityEventLogger>,
}

impl RevocationManager {
    /// Creates a new revocation manager.
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

    /// Revokes a single session.
    ///
    /// - `Access`: sets `is_active = false` and leaves the record in place
    ///   until its natural TTL, supporting audit trails.
    /// - `Refresh`: full session termination — the record is deleted and
    ///   its id removed from the user's index.
    ///
    /// Idempotent: revoking an already-revoked or missing session is a no-op.
    pub async fn revoke_session(&self, session_id: Uuid, class: TokenClass) -> AppResult<()> {
        match class {
            TokenClass::Access => {
                if let Some(mut record) = self.sessions.get(session_id).await? {
                    if record.is_active {
                        record.is_active = false;
                        self.sessions.put(&record).await?;
                        info!(session_id = %session_id, "Session deactivated");
                        self.audit
                            .record(SecurityEvent::new(
                                SecurityEventKind::Logout,
                                record.user_id,
                                Some(session_id),
                            ))
                            .await;
                    }
                }
            }
            TokenClass::Refresh => {
                if let Some(record) = self.sessions.get(session_id).await? {
                    self.sessions.delete(session_id).await?;
                    self.sessions
                        .remove_from_user_index(record.user_id, session_id)
                        .await?;
                    info!(
                        session_id = %session_id,
                        user_id = %record.user_id,
                        "Session terminated"
                    );
                    self.audit
                        .record(SecurityEvent::new(
                            SecurityEventKind::SessionRevoked,
                            record.user_id,
                            Some(session_id),
                        ))
                        .await;
                }
            }
        }
        Ok(())
    }

    /// Revokes every session a user owns by writing one revocation marker
    /// per indexed id, in parallel, then deleting the index key.
    ///
    /// The marker alone is sufficient to fail future verifications; full
    /// session records are deliberately not read or rewritten here, and may
    /// persist until their own TTLs fire.
    pub async fn revoke_all_sessions_for_user(&self, user_id: Uuid) -> AppResult<RevocationOutcome> {
        let session_ids = self.sessions.list_ids_for_user(user_id).await?;
        let marker_ttl = ttl_until(self.sessions.next_cutoff());

        let writes = session_ids.iter().map(|id| {
            let store = Arc::clone(&self.store);
            let key = keys::revoked_session(*id);
            async move { store.set(&key, "revoked", marker_ttl).await }
        });

        let mut outcome = RevocationOutcome {
            revoked: 0,
            failed: 0,
        };
        for (id, result) in session_ids.iter().zip(join_all(writes).await) {
            match result {
                Ok(()) => outcome.revoked += 1,
                Err(e) => {
                    outcome.failed += 1;
                    warn!(
                        session_id = %id,
                        error = %e,
                        "Failed to write revocation marker"
                    );
                }
            }
        }

        self.sessions.delete_user_index(user_id).await?;

        info!(
            user_id = %user_id,
            revoked = outcome.revoked,
            failed = outcome.failed,
            "Revoked all sessions for user"
        );

        self.audit
            .record(SecurityEvent::new(
                SecurityEventKind::LogoutAllDevices,
                user_id,
                None,
            ))
            .await;

        Ok(outcome)
    }

    /// Blacklists one literal token value for its remaining validity, so
    /// the entry self-expires exactly when the token would have anyway.
    pub async fn blacklist_token(
        &self,
        raw_token: &str,
        class: TokenClass,
        remaining_ttl_seconds: u64,
    ) -> AppResult<()> {
        let key = blacklist_key(raw_token, class);
        let ttl = StdDuration::from_secs(remaining_ttl_seconds.max(BLACKLIST_TTL_FLOOR_SECONDS));
        self.store.set(&key, "revoked", ttl).await
    }

    /// Checks whether this exact token value has been blacklisted.
    pub async fn is_token_blacklisted(&self, raw_token: &str, class: TokenClass) -> AppResult<bool> {
        self.store.exists(&blacklist_key(raw_token, class)).await
    }

    /// Checks whether a revocation marker exists for a session id.
    pub async fn is_session_revoked(&self, session_id: Uuid) -> AppResult<bool> {
        self.store.exists(&keys::revoked_session(session_id)).await
    }
}

fn blacklist_key(raw_token: &str, class: TokenClass) -> String {
    match class {
        TokenClass::Access => keys::blacklist_access(raw_token),
        TokenClass::Refresh => keys::blacklist_refresh(raw_token),
    }
}
