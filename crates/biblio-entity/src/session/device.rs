//! Device information captured at session creation.

use serde::{Deserialize, Serialize};

/// Client device metadata captured once at login and kept immutable on the
/// session record for audit purposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Client IP address.
    pub ip_address: String,
    /// User-Agent header value, if presented.
    pub user_agent: Option<String>,
}

impl DeviceInfo {
    /// Create device info from an IP and optional user agent.
    pub fn new(ip_address: impl Into<String>, user_agent: Option<&str>) -> Self {
        Self {
            ip_address: ip_address.into(),
            user_agent: user_agent.map(String::from),
        }
    }
}
