//! Request-path token verification.

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use biblio_entity::identity::{Identity, IdentityProvider};
use biblio_entity::security_event::{SecurityEvent, SecurityEventKind};

use crate::audit::SecurityEventLogger;
use crate::error::AuthError;
use crate::revocation::RevocationManager;
use crate::session::SessionRepository;
use crate::token::{Claims, TokenClass, TokenCodec, sha256_hex};

/// The identity a token successfully resolved to.
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    /// The fresh identity, reloaded from the identity store.
    pub identity: Identity,
    /// The session the token belongs to.
    pub session_id: Uuid,
    /// The validated claims payload.
    pub claims: Claims,
}

/// The single entry point every protected request goes through.
///
/// The outcome is binary: `Some(VerifiedIdentity)` or `None`. Infrastructure
/// failures deny — a request is never allowed through on a guess about what
/// the unreachable store would have said.
#[derive(Clone)]
pub struct Verifier {
    /// Token codec.
    codec: Arc<TokenCodec>,
    /// Session persistence.
    sessions: Arc<SessionRepository>,
    /// Revocation checks.
    revocation: Arc<RevocationManager>,
    /// Identity lookup against the external store.
    identities: Arc<dyn IdentityProvider>,
    /// Audit trail.
    audit: Arc<SecurityEventLogger>,
}

impl std::fmt::Debug for Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier").finish()
    }
}

impl Verifier {
    /// Creates a new verifier with all required dependencies.
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

    /// Verifies a token of the given class end to end.
    ///
    /// Checks run in order: signature and expiry, blacklist, session
    /// revocation marker, session record state, token-hash match, and a
    /// fresh identity lookup. The first failed check denies.
    pub async fn verify(&self, token: &str, class: TokenClass) -> Option<VerifiedIdentity> {
        match self.verify_inner(token, class).await {
            Ok(verified) => Some(verified),
            Err(e) => {
                match &e {
                    AuthError::InfrastructureUnavailable(source) => {
                        warn!(error = %source, "Verification denied: store unavailable");
                    }
                    _ => debug!(reason = %e, "Verification denied"),
                }
                self.audit_denial(token).await;
                None
            }
        }
    }

    async fn verify_inner(
        &self,
        token: &str,
        class: TokenClass,
    ) -> Result<VerifiedIdentity, AuthError> {
        let claims = self.codec.verify(token, class)?;
        let session_id = claims.session_id();

        if self.revocation.is_token_blacklisted(token, class).await? {
            return Err(AuthError::BlacklistedToken);
        }

        if self.revocation.is_session_revoked(session_id).await? {
            return Err(AuthError::RevokedSession);
        }

        let record = self
            .sessions
            .get(session_id)
            .await?
            .ok_or(AuthError::RevokedSession)?;

        if !record.is_active || record.is_expired() {
            return Err(AuthError::RevokedSession);
        }

        let digest = sha256_hex(token);
        let matches = match class {
            TokenClass::Access => record.matches_access_hash(&digest),
            TokenClass::Refresh => record.matches_refresh_hash(&digest),
        };
        if !matches {
            return Err(AuthError::SessionMismatch);
        }

        let identity = self
            .identities
            .find_by_id(claims.user_id())
            .await?
            .filter(|i| i.active)
            .ok_or(AuthError::InactiveIdentity)?;

        if class == TokenClass::Access {
            // Off the hot path; a lost bump only costs last-used freshness.
            let sessions = Arc::clone(&self.sessions);
            tokio::spawn(async move {
                if let Err(e) = sessions.touch(session_id).await {
                    debug!(session_id = %session_id, error = %e, "Failed to bump last_used_at");
                }
            });
        }

        Ok(VerifiedIdentity {
            identity,
            session_id,
            claims,
        })
    }

    /// Fast deny-only revocation pre-check.
    ///
    /// Returns `false` the moment anything looks revoked or unknowable; a
    /// `true` here is never sufficient to grant access and a full `verify`
    /// must still run.
    pub async fn quick_revocation_check(&self, token: &str) -> bool {
        let Some(claims) = self.codec.decode_unverified(token) else {
            return false;
        };
        let session_id = claims.session_id();

        match self.revocation.is_session_revoked(session_id).await {
            Ok(true) | Err(_) => return false,
            Ok(false) => {}
        }

        match self.sessions.get(session_id).await {
            Ok(Some(record)) => record.is_active,
            Ok(None) | Err(_) => false,
        }
    }

    async fn audit_denial(&self, token: &str) {
        if let Some(claims) = self.codec.decode_unverified(token) {
            self.audit
                .record(SecurityEvent::new(
                    SecurityEventKind::VerificationFailed,
                    claims.user_id(),
                    Some(claims.session_id()),
                ))
                .await;
        }
    }
}
