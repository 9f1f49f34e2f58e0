//! Token claims structure shared by access and refresh tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use biblio_entity::identity::{CapabilitySet, Role};

/// Claims payload embedded in every signed token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject — the identity ID.
    pub sub: Uuid,
    /// Session ID this token belongs to.
    pub sid: Uuid,
    /// Role at the time of token issuance.
    pub role: Role,
    /// Display name for convenience.
    pub display_name: String,
    /// Contact email for convenience.
    pub email: String,
    /// Capability set at the time of token issuance.
    pub capabilities: CapabilitySet,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
    /// Issuer string.
    pub iss: String,
    /// Unique token ID.
    pub jti: Uuid,
    /// Token class: access or refresh.
    pub token_type: TokenClass,
}

/// Distinguishes access tokens from refresh tokens.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TokenClass {
    /// Short-lived token presented on every API request.
    Access,
    /// Long-lived token used only to mint new access tokens.
    Refresh,
}

impl fmt::Display for TokenClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Access => write!(f, "access"),
            Self::Refresh => write!(f, "refresh"),
        }
    }
}

impl Claims {
    /// Returns the identity ID from the subject claim.
    pub fn user_id(&self) -> Uuid {
        self.sub
    }

    /// Returns the session ID.
    pub fn session_id(&self) -> Uuid {
        self.sid
    }

    /// Returns the expiration as a `DateTime<Utc>`.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }

    /// Checks whether this token has expired.
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// Returns the remaining TTL in seconds (0 if expired).
    pub fn remaining_ttl_seconds(&self) -> u64 {
        let remaining = self.exp - Utc::now().timestamp();
        if remaining > 0 { remaining as u64 } else { 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(exp_offset: i64) -> Claims {
        let now = Utc::now().timestamp();
        Claims {
            sub: Uuid::new_v4(),
            sid: Uuid::new_v4(),
            role: Role::Member,
            display_name: "Pat".to_string(),
            email: "pat@example.com".to_string(),
            capabilities: CapabilitySet::new(),
            iat: now,
            exp: now + exp_offset,
            iss: "biblio".to_string(),
            jti: Uuid::new_v4(),
            token_type: TokenClass::Access,
        }
    }

    #[test]
    fn test_remaining_ttl() {
        assert!(claims(600).remaining_ttl_seconds() > 590);
        assert_eq!(claims(-10).remaining_ttl_seconds(), 0);
    }

    #[test]
    fn test_is_expired() {
        assert!(!claims(600).is_expired());
        assert!(claims(-1).is_expired());
    }
}
