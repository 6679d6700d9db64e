//! Bridge server configuration

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;
use crate::frame::DEFAULT_MAX_FRAME_BYTES;

/// First port tried for the control channel when none is configured.
pub const DEFAULT_CONTROL_PORT: u16 = 6000;
/// First port tried for the web server when none is configured.
pub const DEFAULT_WEB_PORT: u16 = 7000;
/// Ports tried before giving up.
pub const MAX_PORT_ATTEMPTS: u16 = 1000;

/// Configuration for the bridge server
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Interface both listeners bind to
    pub host: String,
    /// Control channel port. `None` searches upward from 6000.
    pub control_port: Option<u16>,
    /// HTTP/WebSocket port. `None` searches upward from 7000.
    pub web_port: Option<u16>,
    /// Bound on the port search
    pub max_port_attempts: u16,
    /// Directory served under `/static/`
    pub static_root: PathBuf,
    /// Messages queued per consumer before it is dropped
    pub consumer_buffer: usize,
    /// Largest accepted control frame
    pub max_frame_bytes: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            control_port: None,
            web_port: None,
            max_port_attempts: MAX_PORT_ATTEMPTS,
            static_root: PathBuf::from("viewer/dist"),
            consumer_buffer: 1024,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

impl BridgeConfig {
    /// Config with both ports bound to ephemeral ports, handy for tests.
    pub fn ephemeral() -> Self {
        Self {
            control_port: Some(0),
            web_port: Some(0),
            ..Default::default()
        }
    }

    /// Save to file (sync)
    pub fn save_sync(&self, path: &Path) -> Result<(), io::Error> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, json)
    }

    /// Load from file (sync). Missing fields take their defaults.
    pub fn load_sync(path: &Path) -> Result<Self, io::Error> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Load a server config file, naming the file in the error.
    pub fn load(path: &Path) -> Result<Self, BridgeError> {
        Self::load_sync(path).map_err(|e| BridgeError::Config(format!("{}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert!(config.control_port.is_none());
        assert_eq!(config.max_port_attempts, 1000);
        assert_eq!(config.consumer_buffer, 1024);
    }

    #[test]
    fn test_save_load() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("nested/bridge.json");

        let mut config = BridgeConfig::ephemeral();
        config.consumer_buffer = 8;
        config.save_sync(&path).expect("save failed");

        let loaded = BridgeConfig::load_sync(&path).expect("load failed");
        assert_eq!(loaded.control_port, Some(0));
        assert_eq!(loaded.consumer_buffer, 8);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("bridge.json");
        std::fs::write(&path, r#"{ "web_port": 8080 }"#).unwrap();

        let loaded = BridgeConfig::load_sync(&path).expect("load failed");
        assert_eq!(loaded.web_port, Some(8080));
        assert_eq!(loaded.host, "127.0.0.1");
    }

    #[test]
    fn test_invalid_json() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("bridge.json");
        std::fs::write(&path, "not json").unwrap();
        let err = BridgeConfig::load_sync(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_load_reports_config_error() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("bridge.json");
        std::fs::write(&path, "{ \"host\": 7 }").unwrap();
        let err = BridgeConfig::load(&path).unwrap_err();
        assert!(matches!(&err, BridgeError::Config(msg) if msg.contains("bridge.json")));

        let missing = BridgeConfig::load(&temp_dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(missing, BridgeError::Config(_)));
    }
}
