//! Session lifecycle configuration.

use serde::{Deserialize, Serialize};

/// Session management configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// UTC hour (0-23) of the daily cutoff at which every session expires.
    /// Session record TTLs are computed as seconds until the next occurrence.
    #[serde(default = "default_cutoff_hour")]
    pub daily_cutoff_hour: u32,
    /// Security event retention in days.
    #[serde(default = "default_event_ttl_days")]
    pub security_event_ttl_days: u64,
    /// Maximum entries kept in the per-user security event index.
    #[serde(default = "default_event_index_len")]
    pub security_event_index_len: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            daily_cutoff_hour: default_cutoff_hour(),
            security_event_ttl_days: default_event_ttl_days(),
            security_event_index_len: default_event_index_len(),
        }
    }
}

fn default_cutoff_hour() -> u32 {
    3
}

fn default_event_ttl_days() -> u64 {
    30
}

fn default_event_index_len() -> u64 {
    50
}
