//! Identity entity model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::capability::CapabilitySet;
use super::role::Role;

/// An identity row as returned by the external identity store.
///
/// One polymorphic model covers every role; the identity store resolves
/// super-admins, admins, staff, and members through a single lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    /// Unique identity identifier.
    pub id: Uuid,
    /// Display name.
    pub display_name: String,
    /// Contact email.
    pub email: String,
    /// Role at lookup time.
    pub role: Role,
    /// Flat capability set attached to this identity.
    pub capabilities: CapabilitySet,
    /// Whether the identity may currently authenticate.
    pub active: bool,
}

impl Identity {
    /// Check whether this identity grants the given capability.
    pub fn can(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }
}
