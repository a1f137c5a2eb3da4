//! Configuration management infrastructure.
//!
//! A small TOML file holds the service endpoint, the API access token and
//! request preferences. Environment variables and command-line flags can
//! override the endpoint and token without touching the file.

use crate::adapters::remote::RemoteServiceConfig;
use crate::domain::constants::{StandardSecurityContexts, DEFAULT_ENDPOINT_URL, DEFAULT_TIMEOUT_SECS};
use crate::domain::types::{AccessToken, EndpointUrl};
use crate::infra::error::{RestPkiError, RestPkiResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable overriding `endpoint_url`
pub const ENDPOINT_ENV: &str = "RESTPKI_ENDPOINT";
/// Environment variable overriding `access_token`
pub const ACCESS_TOKEN_ENV: &str = "RESTPKI_ACCESS_TOKEN";

/// Client configuration stored on disk
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfiguration {
    /// Base URL of the signing service
    pub endpoint_url: String,

    /// API access token; usually supplied through the environment instead
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Request timeout
    pub timeout_seconds: u64,

    /// Security context used when a command does not name one
    pub default_security_context: String,

    /// Overrides the `User-Agent` header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for ClientConfiguration {
    fn default() -> Self {
        Self {
            endpoint_url: DEFAULT_ENDPOINT_URL.to_string(),
            access_token: None,
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
            default_security_context: StandardSecurityContexts::PKI_BRAZIL.to_string(),
            user_agent: None,
        }
    }
}

impl fmt::Debug for ClientConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfiguration")
            .field("endpoint_url", &self.endpoint_url)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "<redacted>"),
            )
            .field("timeout_seconds", &self.timeout_seconds)
            .field("default_security_context", &self.default_security_context)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl ClientConfiguration {
    /// Replace endpoint and token with explicitly supplied values
    pub fn apply_overrides(&mut self, endpoint: Option<String>, access_token: Option<String>) {
        if let Some(endpoint) = endpoint {
            self.endpoint_url = endpoint;
        }
        if let Some(token) = access_token {
            self.access_token = Some(token);
        }
    }

    /// Apply `RESTPKI_ENDPOINT` and `RESTPKI_ACCESS_TOKEN` when set
    pub fn apply_env_overrides(&mut self) {
        let non_empty = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        self.apply_overrides(non_empty(ENDPOINT_ENV), non_empty(ACCESS_TOKEN_ENV));
    }

    /// Build the transport settings, checking the credential.
    ///
    /// # Errors
    /// Returns a configuration error when the token is absent or a
    /// placeholder, the endpoint is invalid, or the timeout is zero.
    pub fn service_config(&self) -> RestPkiResult<RemoteServiceConfig> {
        let token = self.access_token.as_deref().ok_or_else(|| {
            RestPkiError::ConfigurationError(format!(
                "No API access token configured; set {ACCESS_TOKEN_ENV} or access_token in the configuration file"
            ))
        })?;
        if self.timeout_seconds == 0 {
            return Err(RestPkiError::ConfigurationError(
                "Request timeout must be greater than 0".to_string(),
            ));
        }
        let mut config =
            RemoteServiceConfig::new(&self.endpoint_url, token)?.with_timeout(self.timeout_seconds);
        if let Some(user_agent) = &self.user_agent {
            config = config.with_user_agent(user_agent.clone());
        }
        Ok(config)
    }
}

/// Configuration manager for handling config files
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new configuration manager with default path
    pub fn new() -> RestPkiResult<Self> {
        Ok(Self {
            config_path: Self::default_config_path(),
        })
    }

    /// Create a configuration manager with custom path
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    /// `<config dir>/restpki-client/config.toml`, or a file in the working
    /// directory when the platform has no config directory
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        match dirs::config_dir() {
            Some(config_dir) => config_dir.join("restpki-client").join("config.toml"),
            None => PathBuf::from("restpki-client-config.toml"),
        }
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub fn load_or_create_default(&self) -> RestPkiResult<ClientConfiguration> {
        if self.config_path.exists() {
            self.load()
        } else {
            log::info!(
                "Configuration file not found, creating default: {}",
                self.config_path.display()
            );
            let default_config = ClientConfiguration::default();
            self.save(&default_config)?;
            Ok(default_config)
        }
    }

    /// Load configuration from file, or defaults when the file is missing
    pub fn load_or_default(&self) -> RestPkiResult<ClientConfiguration> {
        if self.config_path.exists() {
            self.load()
        } else {
            log::debug!(
                "No configuration file at {}, using defaults",
                self.config_path.display()
            );
            Ok(ClientConfiguration::default())
        }
    }

    /// Load configuration from file
    pub fn load(&self) -> RestPkiResult<ClientConfiguration> {
        log::debug!("Loading configuration from: {}", self.config_path.display());

        let content = fs::read_to_string(&self.config_path).map_err(|e| {
            RestPkiError::ConfigurationError(format!(
                "Failed to read config file {}: {e}",
                self.config_path.display()
            ))
        })?;

        let config: ClientConfiguration = toml::from_str(&content).map_err(|e| {
            RestPkiError::ConfigurationError(format!("Failed to parse config file: {e}"))
        })?;

        Self::validate_config(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &ClientConfiguration) -> RestPkiResult<()> {
        log::info!("Saving configuration to: {}", self.config_path.display());

        if let Some(parent) = self.config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                RestPkiError::ConfigurationError(format!(
                    "Failed to create config directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let content = toml::to_string_pretty(config).map_err(|e| {
            RestPkiError::ConfigurationError(format!("Failed to serialize config: {e}"))
        })?;

        fs::write(&self.config_path, content).map_err(|e| {
            RestPkiError::ConfigurationError(format!(
                "Failed to write config file {}: {e}",
                self.config_path.display()
            ))
        })?;

        Ok(())
    }

    /// Check values and normalise the endpoint to end with `/`
    fn validate_config(mut config: ClientConfiguration) -> RestPkiResult<ClientConfiguration> {
        config.endpoint_url = EndpointUrl::new(&config.endpoint_url)?.to_string();

        if config.timeout_seconds == 0 {
            return Err(RestPkiError::ConfigurationError(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        if config.default_security_context.trim().is_empty() {
            return Err(RestPkiError::ConfigurationError(
                "default_security_context cannot be empty".to_string(),
            ));
        }

        Ok(config)
    }

    /// Update a specific configuration value
    pub fn update_value(&self, key: &str, value: &str) -> RestPkiResult<()> {
        let mut config = self.load_or_default()?;

        match key {
            "endpoint_url" => {
                config.endpoint_url = EndpointUrl::new(value)?.to_string();
            }
            "access_token" => {
                AccessToken::new(value)?;
                config.access_token = Some(value.to_string());
            }
            "timeout_seconds" => {
                config.timeout_seconds = value.parse().map_err(|_| {
                    RestPkiError::ConfigurationError(format!("Invalid timeout value: {value}"))
                })?;
            }
            "default_security_context" => {
                config.default_security_context = value.to_string();
            }
            "user_agent" => {
                config.user_agent = Some(value.to_string()).filter(|v| !v.is_empty());
            }
            _ => {
                return Err(RestPkiError::ConfigurationError(format!(
                    "Unknown configuration key: {key}"
                )));
            }
        }

        let config = Self::validate_config(config)?;
        self.save(&config)
    }

    /// Get the configuration file path
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Export configuration as a portable format
    pub fn export_config(&self, format: ExportFormat) -> RestPkiResult<String> {
        let config = self.load()?;

        match format {
            ExportFormat::Toml => toml::to_string_pretty(&config)
                .map_err(|e| RestPkiError::ConfigurationError(format!("TOML export failed: {e}"))),
            ExportFormat::Json => serde_json::to_string_pretty(&config)
                .map_err(|e| RestPkiError::ConfigurationError(format!("JSON export failed: {e}"))),
            ExportFormat::Yaml => serde_yaml::to_string(&config)
                .map_err(|e| RestPkiError::ConfigurationError(format!("YAML export failed: {e}"))),
        }
    }

    /// Import configuration from a string
    pub fn import_config(&self, content: &str, format: ExportFormat) -> RestPkiResult<()> {
        let config: ClientConfiguration = match format {
            ExportFormat::Toml => toml::from_str(content).map_err(|e| {
                RestPkiError::ConfigurationError(format!("TOML import failed: {e}"))
            })?,
            ExportFormat::Json => serde_json::from_str(content).map_err(|e| {
                RestPkiError::ConfigurationError(format!("JSON import failed: {e}"))
            })?,
            ExportFormat::Yaml => serde_yaml::from_str(content).map_err(|e| {
                RestPkiError::ConfigurationError(format!("YAML import failed: {e}"))
            })?,
        };

        let config = Self::validate_config(config)?;
        self.save(&config)
    }
}

/// Configuration export/import formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Toml,
    Json,
    Yaml,
}

impl FromStr for ExportFormat {
    type Err = RestPkiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "toml" => Ok(ExportFormat::Toml),
            "json" => Ok(ExportFormat::Json),
            "yaml" | "yml" => Ok(ExportFormat::Yaml),
            other => Err(RestPkiError::ConfigurationError(format!(
                "Unknown export format: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_configuration() {
        let config = ClientConfiguration::default();
        assert_eq!(config.endpoint_url, "https://pki.rest/");
        assert_eq!(config.timeout_seconds, 30);
        assert_eq!(
            config.default_security_context,
            StandardSecurityContexts::PKI_BRAZIL
        );
        assert!(config.access_token.is_none());
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");
        let manager = ConfigManager::with_path(&config_path);

        let mut config = ClientConfiguration::default();
        config.endpoint_url = "https://restpki.example.com".to_string();
        config.timeout_seconds = 90;
        manager.save(&config).unwrap();

        let loaded = manager.load().unwrap();
        assert_eq!(loaded.endpoint_url, "https://restpki.example.com/");
        assert_eq!(loaded.timeout_seconds, 90);
    }

    #[test]
    fn test_update_value() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp_dir.path().join("config.toml"));
        manager.load_or_create_default().unwrap();

        manager.update_value("timeout_seconds", "45").unwrap();
        manager
            .update_value("default_security_context", StandardSecurityContexts::LACUNA_TEST)
            .unwrap();
        let loaded = manager.load().unwrap();
        assert_eq!(loaded.timeout_seconds, 45);
        assert_eq!(
            loaded.default_security_context,
            StandardSecurityContexts::LACUNA_TEST
        );

        assert!(manager.update_value("timeout_seconds", "0").is_err());
        assert!(manager
            .update_value("access_token", "PLACE YOUR API ACCESS TOKEN HERE")
            .is_err());
        assert!(manager.update_value("no_such_key", "x").is_err());
    }

    #[test]
    fn test_export_import_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp_dir.path().join("config.toml"));
        manager.load_or_create_default().unwrap();

        for format in [ExportFormat::Toml, ExportFormat::Json, ExportFormat::Yaml] {
            let exported = manager.export_config(format).unwrap();
            manager.import_config(&exported, format).unwrap();
        }
        assert!(manager
            .import_config("{\"timeout_seconds\": 0}", ExportFormat::Json)
            .is_err());
        assert_eq!("YML".parse::<ExportFormat>().unwrap(), ExportFormat::Yaml);
    }

    #[test]
    fn test_service_config_requires_token() {
        let mut config = ClientConfiguration::default();
        assert!(matches!(
            config.service_config(),
            Err(RestPkiError::ConfigurationError(_))
        ));

        config.apply_overrides(None, Some("real-token".to_string()));
        let service = config.service_config().unwrap();
        assert_eq!(service.endpoint.as_str(), "https://pki.rest/");
        assert_eq!(service.timeout_secs, 30);

        let debug = format!("{config:?}");
        assert!(!debug.contains("real-token"));
    }
}
