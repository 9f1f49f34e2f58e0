//! # biblio-auth
//!
//! Token issuance, verification, and revocation for the Biblio platform.
//! Tracks live sessions in the key-value store independently of the
//! system-of-record identity database, and guarantees that a revoked or
//! expired session can never again authenticate a request.
//!
//! ## Modules
//!
//! - `token` — signed token creation, validation, and claims
//! - `session` — session repository, token issuer, and cleanup sweep
//! - `revocation` — blacklist entries and revocation markers
//! - `verifier` — the request-path entry point
//! - `audit` — append-only security event trail
//! - `transport` — cookie/header credential extraction helpers

pub mod audit;
pub mod error;
pub mod revocation;
pub mod session;
pub mod token;
pub mod transport;
pub mod verifier;

pub use audit::SecurityEventLogger;
pub use error::AuthError;
pub use revocation::{RevocationManager, RevocationOutcome};
pub use session::{IssuedTokens, RotatedTokens, SessionRepository, SessionSweeper, TokenIssuer};
pub use token::{Claims, TokenClass, TokenCodec};
pub use verifier::{VerifiedIdentity, Verifier};
