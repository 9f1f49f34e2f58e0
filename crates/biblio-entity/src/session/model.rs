//! Session record entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One authenticated device/browser instance, stored as JSON in the
/// key-value store under `session:<id>`.
///
/// Records are created on login, mutated by refresh and single-device
/// logout, and destroyed by TTL expiry, refresh-class revocation, or the
/// cleanup sweep. Session ids are never reused, and `is_active = false`
/// is monotonic: there is no transition back to active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Unique session identifier.
    pub id: Uuid,
    /// The identity this session belongs to (lookup key, not ownership).
    pub user_id: Uuid,
    /// SHA-256 hex digest of the currently valid access token.
    pub access_token_hash: String,
    /// SHA-256 hex digest of the currently valid refresh token.
    pub refresh_token_hash: String,
    /// User-Agent captured at creation. Audit metadata only.
    pub user_agent: Option<String>,
    /// IP address captured at creation. Audit metadata only.
    pub ip_address: String,
    /// When the session was created (login time).
    pub created_at: DateTime<Utc>,
    /// Last time a token for this session was verified or rotated.
    pub last_used_at: DateTime<Utc>,
    /// Next occurrence of the daily cutoff; recomputed on every rotation.
    pub expires_at: DateTime<Utc>,
    /// `false` after single-device logout; record retained for audit
    /// until natural expiry.
    pub is_active: bool,
}

impl SessionRecord {
    /// Check whether the session has passed its logical expiry.
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// Check whether the given digest matches the stored access token hash.
    pub fn matches_access_hash(&self, digest: &str) -> bool {
        self.access_token_hash == digest
    }

    /// Check whether the given digest matches the stored refresh token hash.
    pub fn matches_refresh_hash(&self, digest: &str) -> bool {
        self.refresh_token_hash == digest
    }
}
