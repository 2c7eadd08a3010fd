//! Client configuration.
//!
//! Loaded from a JSON5 file (`MEDIAPREP_CONFIG_PATH`, or
//! `<config dir>/mediaprep/config.json5`). A missing file yields defaults.
//! `MEDIAPREP_BASE_URL` overrides the configured base URL.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::logging::LoggingConfig;
use crate::media::DEFAULT_MAX_UPLOAD_BYTES;

pub const CONFIG_PATH_ENV: &str = "MEDIAPREP_CONFIG_PATH";
pub const BASE_URL_ENV: &str = "MEDIAPREP_BASE_URL";

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_API_PREFIX: &str = "/api/v1";

/// Simulated round-trip for fixture responses.
pub const DEFAULT_FIXTURE_LATENCY_MS: u64 = 1000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid base URL {url:?}: {message}")]
    InvalidBaseUrl { url: String, message: String },
}

/// How requests reach the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportMode {
    /// Real HTTP only; failures surface as errors.
    #[default]
    Live,
    /// Canned fixtures only; no network access.
    Fixtures,
    /// Real HTTP, answering from fixtures when the backend fails.
    LiveWithFallback,
}

/// Top-level client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    /// Backend origin, e.g. `http://localhost:8000`.
    pub base_url: String,
    /// Path prefix prepended to every endpoint.
    pub api_prefix: String,
    pub transport: TransportMode,
    /// Fetch and send a CSRF token on live requests.
    pub csrf: bool,
    /// Delay applied to fixture responses, in milliseconds.
    pub fixture_latency_ms: u64,
    /// Largest file accepted at intake.
    pub max_upload_bytes: u64,
    /// Connect timeout for the HTTP client. Requests themselves never time out.
    pub connect_timeout_secs: u64,
    pub logging: LoggingConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            transport: TransportMode::default(),
            csrf: true,
            fixture_latency_ms: DEFAULT_FIXTURE_LATENCY_MS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            connect_timeout_secs: 10,
            logging: LoggingConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Parse and normalise the base URL (no trailing slash).
    pub fn validated_base_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(self.base_url.trim()).map_err(|e| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            message: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidBaseUrl {
                url: self.base_url.clone(),
                message: format!("unsupported scheme {:?}", url.scheme()),
            });
        }
        Ok(url)
    }

    /// Base URL joined with the API prefix, without a trailing slash.
    pub fn api_root(&self) -> Result<String, ConfigError> {
        let base = self.validated_base_url()?;
        let origin = base.as_str().trim_end_matches('/');
        let prefix = self.api_prefix.trim_matches('/');
        if prefix.is_empty() {
            Ok(origin.to_string())
        } else {
            Ok(format!("{origin}/{prefix}"))
        }
    }

    pub fn fixture_latency(&self) -> Duration {
        Duration::from_millis(self.fixture_latency_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Apply `MEDIAPREP_BASE_URL` if set and non-empty.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.base_url = url.trim().to_string();
            }
        }
    }
}

/// Resolve the configuration file path.
pub fn get_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mediaprep")
        .join("config.json5")
}

/// Load configuration from a specific path. A missing file yields defaults.
pub fn load_config_from(path: &Path) -> Result<ClientConfig, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(ClientConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    parse_config(&raw).map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

/// Load configuration from the resolved path and apply environment overrides.
pub fn load_config() -> Result<ClientConfig, ConfigError> {
    let mut config = load_config_from(&get_config_path())?;
    config.apply_env();
    config.validated_base_url()?;
    Ok(config)
}

fn parse_config(raw: &str) -> Result<ClientConfig, String> {
    if raw.trim().is_empty() {
        return Ok(ClientConfig::default());
    }
    json5::from_str(raw).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.api_prefix, "/api/v1");
        assert_eq!(config.transport, TransportMode::Live);
        assert!(config.csrf);
        assert_eq!(config.max_upload_bytes, 100 * 1024 * 1024);
        assert_eq!(config.fixture_latency(), Duration::from_secs(1));
    }

    #[test]
    fn test_api_root_normalises_slashes() {
        let mut config = ClientConfig::default();
        config.base_url = "http://example.com:9000/".into();
        assert_eq!(config.api_root().unwrap(), "http://example.com:9000/api/v1");

        config.api_prefix = "api/v2/".into();
        assert_eq!(config.api_root().unwrap(), "http://example.com:9000/api/v2");

        config.api_prefix = String::new();
        assert_eq!(config.api_root().unwrap(), "http://example.com:9000");
    }

    #[test]
    fn test_invalid_base_url() {
        let mut config = ClientConfig::default();
        config.base_url = "not a url".into();
        assert!(matches!(
            config.validated_base_url(),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));

        config.base_url = "ftp://example.com".into();
        assert!(config.validated_base_url().is_err());
    }

    #[test]
    fn test_parse_json5_partial() {
        let raw = r#"{
            // comments are allowed
            baseUrl: "http://10.0.0.2:8000",
            transport: "live-with-fallback",
            fixtureLatencyMs: 0,
        }"#;
        let config = parse_config(raw).unwrap();
        assert_eq!(config.base_url, "http://10.0.0.2:8000");
        assert_eq!(config.transport, TransportMode::LiveWithFallback);
        assert_eq!(config.fixture_latency_ms, 0);
        assert_eq!(config.api_prefix, "/api/v1");
        assert!(config.csrf);
    }

    #[test]
    fn test_parse_empty_is_default() {
        let config = parse_config("   ").unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_config("{ baseUrl: ").is_err());
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.json5")).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json5");
        std::fs::write(&path, "{ transport: 'fixtures', csrf: false }").unwrap();
        let config = load_config_from(&path).unwrap();
        assert_eq!(config.transport, TransportMode::Fixtures);
        assert!(!config.csrf);
    }

    #[test]
    fn test_load_parse_error_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json5");
        std::fs::write(&path, "{ nope").unwrap();
        let err = load_config_from(&path).unwrap_err();
        assert!(err.to_string().contains("config.json5"));
    }
}
