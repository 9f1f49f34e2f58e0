//! Identity models as returned by the external identity store.

pub mod capability;
pub mod model;
pub mod provider;
pub mod role;

pub use capability::CapabilitySet;
pub use model::Identity;
pub use provider::IdentityProvider;
pub use role::Role;
