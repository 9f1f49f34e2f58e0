//! Security event entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The kind of authentication event being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityEventKind {
    /// A session was created at login or remember-me redemption.
    Login,
    /// A single device logged out.
    Logout,
    /// All of a user's devices were logged out.
    LogoutAllDevices,
    /// An access token was rotated via a refresh token.
    TokenRefreshed,
    /// A literal token value was blacklisted.
    TokenRevoked,
    /// A session was revoked (access- or refresh-class).
    SessionRevoked,
    /// A token failed verification.
    VerificationFailed,
    /// The cleanup sweep removed an expired session.
    SweepExpired,
}

impl SecurityEventKind {
    /// Return the kind as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Logout => "logout",
            Self::LogoutAllDevices => "logout_all_devices",
            Self::TokenRefreshed => "token_refreshed",
            Self::TokenRevoked => "token_revoked",
            Self::SessionRevoked => "session_revoked",
            Self::VerificationFailed => "verification_failed",
            Self::SweepExpired => "sweep_expired",
        }
    }
}

impl fmt::Display for SecurityEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An immutable audit record of one authentication event.
///
/// Events are retained with a fixed TTL and referenced from a capped
/// most-recent-N per-user index. They never influence the authorization
/// decision they describe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityEvent {
    /// Unique event identifier.
    pub id: Uuid,
    /// What happened.
    pub kind: SecurityEventKind,
    /// The identity the event concerns.
    pub actor_id: Uuid,
    /// The session involved, if any.
    pub session_id: Option<Uuid>,
    /// Client IP address, if known.
    pub ip_address: Option<String>,
    /// Client User-Agent, if known.
    pub user_agent: Option<String>,
    /// When the event occurred.
    pub occurred_at: DateTime<Utc>,
    /// Free-form metadata.
    pub metadata: serde_json::Value,
}

impl SecurityEvent {
    /// Create a new event occurring now, with empty metadata.
    pub fn new(kind: SecurityEventKind, actor_id: Uuid, session_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            actor_id,
            session_id,
            ip_address: None,
            user_agent: None,
            occurred_at: Utc::now(),
            metadata: serde_json::Value::Null,
        }
    }

    /// Attach device metadata.
    pub fn with_device(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }

    /// Attach free-form metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}
