//! Core traits defined in `biblio-core` and implemented by other crates.

pub mod kv;

pub use kv::KvStore;
