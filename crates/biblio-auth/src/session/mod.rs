//! Session lifecycle: persistence, token issuance, and the cleanup sweep.

pub mod cleanup;
pub mod issuer;
pub mod repository;

pub use cleanup::SessionSweeper;
pub use issuer::{IssuedTokens, RotatedTokens, TokenIssuer};
pub use repository::SessionRepository;
