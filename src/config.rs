//! Hub Configuration
//!
//! Deserializable configuration for the device hub. All fields have sensible
//! defaults; embedders typically deserialize this from their own config file.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

fn default_device_path() -> PathBuf {
    PathBuf::from("/dev/input")
}

fn default_event_buffer_size() -> usize {
    256
}

fn default_timestamp_slack() -> Duration {
    Duration::from_secs(10)
}

/// Configuration for [`crate::hub::DeviceHub`]
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceHubConfig {
    /// Directory scanned and watched for evdev device nodes
    pub device_path: PathBuf,

    /// Maximum number of kernel records read from one descriptor per wakeup
    pub event_buffer_size: usize,

    /// Kernel timestamps older than this (or in the future) are replaced
    /// with the read-out time
    #[serde(with = "duration_secs")]
    pub timestamp_slack: Duration,
}

impl Default for DeviceHubConfig {
    fn default() -> Self {
        Self {
            device_path: default_device_path(),
            event_buffer_size: default_event_buffer_size(),
            timestamp_slack: default_timestamp_slack(),
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DeviceHubConfig::default();
        assert_eq!(config.device_path, PathBuf::from("/dev/input"));
        assert_eq!(config.event_buffer_size, 256);
        assert_eq!(config.timestamp_slack, Duration::from_secs(10));
    }

    #[test]
    fn test_partial_deserialization_uses_defaults() {
        let config: DeviceHubConfig =
            serde_json::from_str(r#"{"device_path": "/tmp/devices"}"#).unwrap();
        assert_eq!(config.device_path, PathBuf::from("/tmp/devices"));
        assert_eq!(config.event_buffer_size, 256);
    }
}
