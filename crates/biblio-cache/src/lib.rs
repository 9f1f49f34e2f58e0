//! # biblio-cache
//!
//! Key-value session store providers for Biblio. Supports two modes:
//!
//! - **memory**: In-process store using [moka](https://crates.io/crates/moka),
//!   the backend for tests and single-node deployments
//! - **redis**: Redis-backed store using the [redis](https://crates.io/crates/redis) crate
//!
//! The provider is selected at runtime based on configuration. The session
//! store is independent of the system-of-record identity database.

pub mod keys;
#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use provider::StoreManager;
