use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::api::client::ApiClient;
use crate::storage::StorageScope;

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8000/message/";
pub const DEFAULT_BANNER: &str = "Welcome to our dating service with 6000 potential dating partners!";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("could not write config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid endpoint {endpoint:?}: {source}")]
    Endpoint { endpoint: String, source: url::ParseError },
    #[error("could not build http client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub endpoint: String,
    pub request_timeout_secs: Option<u64>,
    pub banner: String,
    pub database_path: Option<PathBuf>,
    /// `global` keeps one thread for every phone number; `per-phone` splits them.
    pub storage_scope: StorageScope,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout_secs: None,
            banner: DEFAULT_BANNER.to_string(),
            database_path: None,
            storage_scope: StorageScope::Global,
        }
    }
}

impl AppConfig {
    pub fn config_path() -> Option<PathBuf> {
        let base = BaseDirs::new()?;
        Some(base.config_dir().join("converse.toml"))
    }

    /// Defaults when the file is missing or can't be parsed.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        match Self::load_from(&path) {
            Ok(cfg) => cfg,
            Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                log::warn!("Ignoring {}: {e}", path.display());
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn endpoint_url(&self) -> Result<Url, ConfigError> {
        Url::parse(self.endpoint.trim()).map_err(|source| ConfigError::Endpoint {
            endpoint: self.endpoint.clone(),
            source,
        })
    }

    pub fn api_client(&self) -> Result<ApiClient, ConfigError> {
        let endpoint = self.endpoint_url()?;
        match self.request_timeout_secs {
            Some(secs) => Ok(ApiClient::with_timeout(endpoint, Duration::from_secs(secs))?),
            None => Ok(ApiClient::new(endpoint)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_service() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.endpoint_url().unwrap().as_str(), DEFAULT_ENDPOINT);
        assert!(cfg.request_timeout_secs.is_none());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("converse.toml");
        fs::write(&path, "request_timeout_secs = 10\n").unwrap();
        let cfg = AppConfig::load_from(&path).unwrap();
        assert_eq!(cfg.request_timeout_secs, Some(10));
        assert_eq!(cfg.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(cfg.banner, DEFAULT_BANNER);
        assert_eq!(cfg.storage_scope, StorageScope::Global);
    }

    #[test]
    fn per_phone_scope_is_read_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("converse.toml");
        fs::write(&path, "storage_scope = \"per-phone\"\n").unwrap();
        assert_eq!(AppConfig::load_from(&path).unwrap().storage_scope, StorageScope::PerPhone);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("converse.toml");
        let cfg = AppConfig {
            endpoint: "https://chat.example.org/message/".into(),
            request_timeout_secs: Some(3),
            banner: "Hello".into(),
            database_path: Some(dir.path().join("db.sqlite")),
            storage_scope: StorageScope::PerPhone,
        };
        cfg.save_to(&path).unwrap();
        assert_eq!(AppConfig::load_from(&path).unwrap(), cfg);
    }

    #[test]
    fn bad_endpoint_is_reported() {
        let cfg = AppConfig { endpoint: "not a url".into(), ..AppConfig::default() };
        assert!(matches!(cfg.endpoint_url(), Err(ConfigError::Endpoint { .. })));
        assert!(cfg.api_client().is_err());
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("converse.toml");
        fs::write(&path, "endpoint = [").unwrap();
        assert!(matches!(AppConfig::load_from(&path), Err(ConfigError::Parse(_))));
    }
}
