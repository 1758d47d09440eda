//! Session configuration

use crate::error::{ErrorContext, SessionError, SessionResult};
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Header carrying the session token on outbound requests
pub const DEFAULT_AUTH_HEADER: &str = "X-AIMS-Auth-Token";

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Storage namespace for the persisted session
    pub namespace: String,
    /// Key of the session record inside the namespace
    pub storage_key: String,
    /// Header set on outbound requests while the session is active
    pub auth_header: String,
    /// Upper bound for one resolution epoch; `None` waits indefinitely
    pub resolution_timeout_ms: Option<u64>,
    /// Whether resolution fetches the accounts managed by the primary account
    pub resolve_managed_accounts: bool,
    /// Directory for file-backed storage; platform data dir when unset
    pub storage_dir: Option<PathBuf>,
    pub logging: LoggingConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            namespace: "al_session".to_string(),
            storage_key: "session".to_string(),
            auth_header: DEFAULT_AUTH_HEADER.to_string(),
            resolution_timeout_ms: Some(30_000),
            resolve_managed_accounts: true,
            storage_dir: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> SessionResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| SessionError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        let config: SessionConfig = toml::from_str(&content).map_err(|e| SessionError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> SessionResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| SessionError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        std::fs::write(path, content).map_err(|e| SessionError::Config {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("write_file")
                .with_suggestion("Check if the directory exists and is writable"),
        })?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SessionResult<()> {
        let required = [
            ("namespace", &self.namespace),
            ("storage_key", &self.storage_key),
            ("auth_header", &self.auth_header),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(SessionError::Config {
                    message: format!("{} must not be empty", field),
                    source: None,
                    context: ErrorContext::new("config")
                        .with_operation("validate")
                        .with_suggestion(&format!("Set {} or remove it to use the default", field)),
                });
            }
        }

        if self.resolution_timeout_ms == Some(0) {
            return Err(SessionError::Config {
                message: "resolution_timeout_ms must be greater than 0".to_string(),
                source: None,
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Set a positive timeout or remove it to wait indefinitely"),
            });
        }

        Ok(())
    }

    /// Directory used by file-backed storage
    pub fn resolved_storage_dir(&self) -> PathBuf {
        self.storage_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("alsession")
        })
    }
}
