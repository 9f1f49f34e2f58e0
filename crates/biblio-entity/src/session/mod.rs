//! Session record and device capture models.

pub mod device;
pub mod model;

pub use device::DeviceInfo;
pub use model::SessionRecord;
