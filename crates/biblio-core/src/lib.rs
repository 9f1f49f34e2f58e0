//! # biblio-core
//!
//! Core crate for the Biblio platform. Contains traits, configuration
//! schemas, and the unified error system.
//!
//! This crate has **no** internal dependencies on other Biblio crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod result;
pub mod traits;

pub use error::AppError;
pub use result::AppResult;
