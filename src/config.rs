//! Fetch configuration, optionally loaded from a TOML file.
//!
//! The config file is optional. A missing or empty file yields
//! `FetchConfig::default()`. Unknown keys are ignored by serde, though we
//! log a warning when the file contains potential typos.
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::util::HostPolicy;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// SEC-014: Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Settings for retrieving feeds over HTTP.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Redirect hops followed before a fetch is abandoned.
    pub max_redirects: usize,

    /// Per-hop deadline in seconds, shared by the request and its body transfer.
    pub request_timeout_secs: u64,

    /// Largest response body accepted, in bytes.
    pub max_feed_size: usize,

    /// Value sent in the `User-Agent` header.
    pub user_agent: String,

    /// Reject localhost and private network addresses, including redirect targets.
    pub block_private_hosts: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_redirects: 10,
            request_timeout_secs: 30,
            max_feed_size: 10 * 1024 * 1024, // 10MB
            user_agent: concat!("feedstream/", env!("CARGO_PKG_VERSION")).to_string(),
            block_private_hosts: false,
        }
    }
}

impl FetchConfig {
    /// SEC-014: Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 5] = [
        "max_redirects",
        "request_timeout_secs",
        "max_feed_size",
        "user_agent",
        "block_private_hosts",
    ];

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn host_policy(&self) -> HostPolicy {
        if self.block_private_hosts {
            HostPolicy::PublicOnly
        } else {
            HostPolicy::Any
        }
    }

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(FetchConfig::default())`
    /// - Empty file → `Ok(FetchConfig::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // SEC-014: Check file size before reading to prevent memory exhaustion
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race condition: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text. Blank input yields defaults.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            tracing::debug!("Config is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: FetchConfig = toml::from_str(content)?;
        tracing::info!(
            max_redirects = config.max_redirects,
            timeout_secs = config.request_timeout_secs,
            "Loaded fetch configuration"
        );
        Ok(config)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FetchConfig::default();
        assert_eq!(config.max_redirects, 10);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.max_feed_size, 10 * 1024 * 1024);
        assert!(config.user_agent.starts_with("feedstream/"));
        assert_eq!(config.host_policy(), HostPolicy::Any);
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/feedstream_test_nonexistent_config.toml");
        let config = FetchConfig::load(path).unwrap();
        assert_eq!(config, FetchConfig::default());
    }

    #[test]
    fn test_empty_file_returns_default() {
        let dir = std::env::temp_dir().join("feedstream_config_test_empty");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "").unwrap();

        let config = FetchConfig::load(&path).unwrap();
        assert_eq!(config, FetchConfig::default());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let dir = std::env::temp_dir().join("feedstream_config_test_partial");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "max_redirects = 3\nblock_private_hosts = true\n").unwrap();

        let config = FetchConfig::load(&path).unwrap();
        assert_eq!(config.max_redirects, 3);
        assert_eq!(config.host_policy(), HostPolicy::PublicOnly);
        assert_eq!(config.request_timeout_secs, 30); // default

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let config = FetchConfig::from_toml("user_agent = \"bot/1\"\nretries = 5\n").unwrap();
        assert_eq!(config.user_agent, "bot/1");
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let result = FetchConfig::from_toml("max_redirects = [oops");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_wrong_type_is_error() {
        let result = FetchConfig::from_toml("max_redirects = \"ten\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_oversized_file_rejected() {
        let dir = std::env::temp_dir().join("feedstream_config_test_large");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        let padding = "#".repeat(FetchConfig::MAX_FILE_SIZE as usize + 1);
        std::fs::write(&path, padding).unwrap();

        let result = FetchConfig::load(&path);
        assert!(matches!(result, Err(ConfigError::TooLarge(_))));

        std::fs::remove_dir_all(&dir).ok();
    }
}
