//! Authentication denial taxonomy.

use thiserror::Error;

use biblio_core::AppError;

use crate::token::TokenClass;

/// Why an authentication operation was denied.
///
/// The Verifier and Issuer collapse every variant to a denied outcome on
/// the hot path; callers receive an authenticated identity or a denial,
/// never a raised error, so one malformed token cannot destabilize request
/// handling.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No credential was presented in the cookie or header.
    #[error("no credential was presented")]
    MissingCredential,
    /// The token could not be parsed or its signature is invalid.
    #[error("token is malformed or its signature is invalid")]
    MalformedToken,
    /// The token's expiry claim is in the past.
    #[error("token has expired")]
    ExpiredToken,
    /// A token of one class was presented where the other was required.
    /// With distinct per-class secrets the mismatch already fails at the
    /// signature check as `MalformedToken`; this fires as the backstop
    /// when both classes are configured with the same secret.
    #[error("wrong token class: expected {expected}")]
    WrongTokenClass {
        /// The class the caller required.
        expected: TokenClass,
    },
    /// This exact token value has been blacklisted.
    #[error("token has been revoked")]
    BlacklistedToken,
    /// The session is revoked, inactive, expired, or gone.
    #[error("session has been revoked or is no longer active")]
    RevokedSession,
    /// The presented token's digest does not match the session record.
    /// Fires on stale or replayed tokens after a rotation or logout.
    #[error("token does not match the current session state")]
    SessionMismatch,
    /// The owning identity is inactive or no longer exists.
    #[error("identity is inactive or no longer exists")]
    InactiveIdentity,
    /// The session store could not be reached. Always fail-closed: the
    /// request is denied, never allowed through on a guess.
    #[error("session store is unavailable")]
    InfrastructureUnavailable(#[source] AppError),
}

impl From<AppError> for AuthError {
    fn from(err: AppError) -> Self {
        Self::InfrastructureUnavailable(err)
    }
}
