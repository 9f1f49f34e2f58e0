//! Token issuance: login-time pair creation and refresh-time rotation.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use biblio_core::AppResult;
use biblio_entity::identity::{Identity, IdentityProvider};
use biblio_entity::security_event::{SecurityEvent, SecurityEventKind};
use biblio_entity::session::{DeviceInfo, SessionRecord};

use crate::audit::SecurityEventLogger;
use crate::error::AuthError;
use crate::revocation::RevocationManager;
use crate::token::{TokenClass, TokenCodec, sha256_hex};

use super::repository::SessionRepository;

/// Result of a successful login-time issuance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedTokens {
    /// Short-lived access token.
    pub access_token: String,
    /// Long-lived refresh token.
    pub refresh_token: String,
    /// The session both tokens belong to.
    pub session_id: Uuid,
}

/// Result of a successful refresh-time rotation.
///
/// Refresh tokens are single-use: each rotation returns a fresh pair and
/// the presented refresh token is blacklisted for its remaining life.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotatedTokens {
    /// New access token.
    pub access_token: String,
    /// New refresh token replacing the one just consumed.
    pub refresh_token: String,
}

/// Orchestrates the codec and the session repository to produce token
/// pairs at login and rotate them at refresh time.
#[derive(Clone)]
pub struct TokenIssuer {
    /// Token codec.
    codec: Arc<TokenCodec>,
    /// Session persistence.
    sessions: Arc<SessionRepository>,
    /// Revocation checks and blacklist writes.
    revocation: Arc<RevocationManager>,
    /// Identity lookup against the external store.
    identities: Arc<dyn IdentityProvider>,
    /// Audit trail.
    audit: Arc<SecurityEventLogger>,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer").finish()
    }
}

impl TokenIssuer {
    /// Creates a new token issuer with all required dependencies.
    pub fn new(
        codec: Arc<TokenCodec>,
        sessions: Arc<SessionRepository>,
        revocation: Arc<RevocationManager>,
        identities: Arc<dyn IdentityProvider>,
        audit: Arc<SecurityEventLogger>,
    ) -> Self {
        Self {
            codec,
            sessions,
            revocation,
            identities,
            audit,
        }
    }

    /// Creates a session and mints its token pair.
    ///
    /// Credential validation has already happened upstream; the caller
    /// hands over an authenticated identity. The session record and the
    /// user-index entry are independent keys written without a multi-key
    /// transaction (best-effort-atomic).
    pub async fn issue_session_tokens(
        &self,
        identity: &Identity,
        device: &DeviceInfo,
    ) -> AppResult<IssuedTokens> {
        let session_id = Uuid::new_v4();

        let access_token = self.codec.issue(
            identity,
            session_id,
            TokenClass::Access,
            self.codec.access_ttl(),
        )?;
        let refresh_token = self.codec.issue(
            identity,
            session_id,
            TokenClass::Refresh,
            self.codec.refresh_ttl(),
        )?;

        let now = Utc::now();
        let record = SessionRecord {
            id: session_id,
            user_id: identity.id,
            access_token_hash: sha256_hex(&access_token),
            refresh_token_hash: sha256_hex(&refresh_token),
            user_agent: device.user_agent.clone(),
            ip_address: device.ip_address.clone(),
            created_at: now,
            last_used_at: now,
            expires_at: self.sessions.next_cutoff(),
            is_active: true,
        };

        self.sessions.put(&record).await?;
        self.sessions
            .add_to_user_index(identity.id, session_id)
            .await?;

        info!(
            user_id = %identity.id,
            session_id = %session_id,
            "Session created"
        );

        self.audit
            .record(
                SecurityEvent::new(SecurityEventKind::Login, identity.id, Some(session_id))
                    .with_device(
                        Some(device.ip_address.clone()),
                        device.user_agent.clone(),
                    ),
            )
            .await;

        Ok(IssuedTokens {
            access_token,
            refresh_token,
            session_id,
        })
    }

    /// Rotates a session's tokens using a valid refresh token.
    ///
    /// 1. Verify the refresh token's signature and class
    /// 2. Check the refresh-token blacklist
    /// 3. Check the session's revocation marker
    /// 4. Load the session record; absent or inactive fails
    /// 5. Match the presented token's digest against the stored hash
    /// 6. Reload the identity and confirm it is still active
    /// 7. Mint a new pair on the same session id, blacklist the consumed
    ///    refresh token, and update the record
    pub async fn rotate_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<RotatedTokens, AuthError> {
        let claims = self.codec.verify(refresh_token, TokenClass::Refresh)?;
        let session_id = claims.session_id();

        if self
            .revocation
            .is_token_blacklisted(refresh_token, TokenClass::Refresh)
            .await?
        {
            return Err(AuthError::BlacklistedToken);
        }

        if self.revocation.is_session_revoked(session_id).await? {
            return Err(AuthError::RevokedSession);
        }

        let mut record = self
            .sessions
            .get(session_id)
            .await?
            .ok_or(AuthError::RevokedSession)?;

        if !record.is_active || record.is_expired() {
            return Err(AuthError::RevokedSession);
        }

        if !record.matches_refresh_hash(&sha256_hex(refresh_token)) {
            return Err(AuthError::SessionMismatch);
        }

        let identity = self
            .identities
            .find_by_id(claims.user_id())
            .await?
            .filter(|i| i.active)
            .ok_or(AuthError::InactiveIdentity)?;

        let access_token = self.codec.issue(
            &identity,
            session_id,
            TokenClass::Access,
            self.codec.access_ttl(),
        )?;
        let new_refresh_token = self.codec.issue(
            &identity,
            session_id,
            TokenClass::Refresh,
            self.codec.refresh_ttl(),
        )?;

        // Single-use refresh: the consumed token must never validate again,
        // even before the hash mismatch would catch it.
        self.revocation
            .blacklist_token(
                refresh_token,
                TokenClass::Refresh,
                claims.remaining_ttl_seconds(),
            )
            .await?;
        self.audit
            .record(SecurityEvent::new(
                SecurityEventKind::TokenRevoked,
                identity.id,
                Some(session_id),
            ))
            .await;

        record.access_token_hash = sha256_hex(&access_token);
        record.refresh_token_hash = sha256_hex(&new_refresh_token);
        record.last_used_at = Utc::now();
        record.expires_at = self.sessions.next_cutoff();
        self.sessions.put(&record).await?;

        info!(
            user_id = %identity.id,
            session_id = %session_id,
            "Access token rotated"
        );

        self.audit
            .record(SecurityEvent::new(
                SecurityEventKind::TokenRefreshed,
                identity.id,
                Some(session_id),
            ))
            .await;

        Ok(RotatedTokens {
            access_token,
            refresh_token: new_refresh_token,
        })
    }
}
