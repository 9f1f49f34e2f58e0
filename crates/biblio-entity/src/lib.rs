//! # biblio-entity
//!
//! Domain entity models for Biblio. Every struct in this crate represents
//! a store record or a domain value object. All entities derive `Debug`,
//! `Clone`, `Serialize`, and `Deserialize`.

pub mod identity;
pub mod security_event;
pub mod session;

pub use identity::{CapabilitySet, Identity, IdentityProvider, Role};
pub use security_event::{SecurityEvent, SecurityEventKind};
pub use session::{DeviceInfo, SessionRecord};
