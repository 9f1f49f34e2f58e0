//! Store key builders for all Biblio session-store entries.
//!
//! Centralising key construction prevents typos and makes it easy
//! to find every key the application uses.

use uuid::Uuid;

// ── Session keys ───────────────────────────────────────────

/// Store key for a session record by ID.
pub fn session_by_id(session_id: Uuid) -> String {
    format!("session:{session_id}")
}

/// Glob pattern matching every session record. Used by the cleanup sweep.
pub fn session_pattern() -> String {
    "session:*".to_string()
}

/// Parse a session id back out of a `session:<id>` key.
pub fn parse_session_key(key: &str) -> Option<Uuid> {
    key.strip_prefix("session:")?.parse().ok()
}

/// Store key for the set of session ids owned by a user.
pub fn user_sessions(user_id: Uuid) -> String {
    format!("user:{user_id}:sessions")
}

// ── Revocation keys ────────────────────────────────────────

/// Store key for a session revocation marker. Its mere existence means
/// the session id is invalid, regardless of the session record.
pub fn revoked_session(session_id: Uuid) -> String {
    format!("revoked:session:{session_id}")
}

/// Store key for a blacklisted access token, keyed by the literal value.
pub fn blacklist_access(token: &str) -> String {
    format!("blacklist:{token}")
}

/// Store key for a blacklisted refresh token, keyed by the literal value.
pub fn blacklist_refresh(token: &str) -> String {
    format!("blacklist:refresh:{token}")
}

// ── Security log keys ──────────────────────────────────────

/// Store key for a security event record.
pub fn security_event(event_id: Uuid) -> String {
    format!("security_log:{event_id}")
}

/// Store key for the capped per-user security event index.
pub fn user_security_log(user_id: Uuid) -> String {
    format!("user:{user_id}:security_log")
}
