// Configuration management

use crate::core::errors::ServerError;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Application configuration loaded from environment variables
///
/// All configuration is validated on load with clear error messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Listeners
    pub bind_address: String,
    pub admin_port: u16,
    pub proxy_port: u16,

    // Server configuration store
    pub serverconf_path: PathBuf,
    pub serverconf_write_back: bool,

    // Admin API principals
    pub api_keys_path: PathBuf,

    // Global configuration and authentication key
    pub globalconf_path: PathBuf,
    pub auth_cert_chain_path: Option<PathBuf>,
    pub auth_private_key_path: Option<PathBuf>,
    pub ssl_enabled: bool,
    pub conf_reload_interval_secs: u64,

    // Client proxy forwarding
    pub server_proxy_url: String,
    pub proxy_timeout_secs: u64,

    // WSDL handling
    pub wsdl_fetch_timeout_secs: u64,
    pub wsdl_validator_command: Option<String>,

    // Middleware configuration
    pub request_timeout_secs: u64,
    pub body_size_limit_bytes: usize,

    // Logging configuration
    pub log_level: String,
    pub log_format: String, // "json" or "text"
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Supports `.env` file loading in development (via dotenv crate).
    /// Validates all required fields and file paths.
    pub fn from_env() -> Result<Self, ServerError> {
        // Skip in test environment to avoid interfering with test environment variables
        #[cfg(not(test))]
        {
            dotenv::dotenv().ok();
        }

        let config = Self {
            bind_address: Self::get_env_or_default("BIND_ADDRESS", "0.0.0.0")?,
            admin_port: Self::parse_port("ADMIN_PORT", 4000)?,
            proxy_port: Self::parse_port("PROXY_PORT", 8080)?,
            serverconf_path: Self::get_required_path("SERVERCONF_PATH")?,
            serverconf_write_back: Self::parse_bool_or_default("SERVERCONF_WRITE_BACK", false)?,
            api_keys_path: Self::get_required_path("API_KEYS_PATH")?,
            globalconf_path: Self::get_required_path("GLOBALCONF_PATH")?,
            auth_cert_chain_path: Self::get_optional_path("AUTH_CERT_CHAIN_PATH")?,
            auth_private_key_path: Self::get_optional_path("AUTH_PRIVATE_KEY_PATH")?,
            ssl_enabled: Self::parse_bool_or_default("SSL_ENABLED", true)?,
            conf_reload_interval_secs: Self::parse_u64_or_default("CONF_RELOAD_INTERVAL_SECS", 60)?,
            server_proxy_url: Self::get_required_env("SERVER_PROXY_URL")?,
            proxy_timeout_secs: Self::parse_u64_or_default("PROXY_TIMEOUT_SECS", 30)?,
            wsdl_fetch_timeout_secs: Self::parse_u64_or_default("WSDL_FETCH_TIMEOUT_SECS", 10)?,
            wsdl_validator_command: Self::get_optional_env("WSDL_VALIDATOR_COMMAND")?,
            request_timeout_secs: Self::parse_u64_or_default("REQUEST_TIMEOUT_SECS", 60)?,
            body_size_limit_bytes: Self::parse_usize_or_default("BODY_SIZE_LIMIT_BYTES", 10 * 1024 * 1024)?,
            log_level: Self::get_env_or_default("LOG_LEVEL", "info")?,
            log_format: Self::get_env_or_default("LOG_FORMAT", "json")?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Get environment variable or return default value
    fn get_env_or_default(key: &str, default: &str) -> Result<String, ServerError> {
        Ok(env::var(key).unwrap_or_else(|_| default.to_string()))
    }

    /// Get optional environment variable
    fn get_optional_env(key: &str) -> Result<Option<String>, ServerError> {
        match env::var(key) {
            Ok(value) if !value.is_empty() => Ok(Some(value)),
            _ => Ok(None),
        }
    }

    fn get_required_env(key: &str) -> Result<String, ServerError> {
        match env::var(key) {
            Ok(value) if !value.is_empty() => Ok(value),
            Ok(_) => Err(ServerError::Configuration(format!("{} is empty", key))),
            Err(_) => Err(ServerError::Configuration(format!("{} not set", key))),
        }
    }

    /// Get required file path from environment variable
    fn get_required_path(key: &str) -> Result<PathBuf, ServerError> {
        Self::get_required_env(key).map(PathBuf::from)
    }

    /// Get optional file path from environment variable
    fn get_optional_path(key: &str) -> Result<Option<PathBuf>, ServerError> {
        Ok(Self::get_optional_env(key)?.map(PathBuf::from))
    }

    /// Parse a listener port, rejecting 0
    fn parse_port(key: &str, default: u16) -> Result<u16, ServerError> {
        let port_str = env::var(key).unwrap_or_else(|_| default.to_string());
        let port = port_str.parse::<u16>().map_err(|e| {
            ServerError::Configuration(format!("Invalid {} value '{}': {}", key, port_str, e))
        })?;

        if port == 0 {
            return Err(ServerError::Configuration(format!(
                "{} must be between 1 and 65535",
                key
            )));
        }

        Ok(port)
    }

    fn parse_bool_or_default(key: &str, default: bool) -> Result<bool, ServerError> {
        match env::var(key) {
            Ok(value) => match value.to_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(true),
                "false" | "0" | "no" => Ok(false),
                _ => Err(ServerError::Configuration(format!(
                    "Invalid {} value '{}': expected true or false",
                    key, value
                ))),
            },
            Err(_) => Ok(default),
        }
    }

    /// Parse u64 from environment variable or return default
    fn parse_u64_or_default(key: &str, default: u64) -> Result<u64, ServerError> {
        match env::var(key) {
            Ok(value) => {
                let parsed = value.parse::<u64>().map_err(|e| {
                    ServerError::Configuration(format!("Invalid {} value '{}': {}", key, value, e))
                })?;

                if parsed == 0 {
                    return Err(ServerError::Configuration(format!(
                        "{} must be greater than 0",
                        key
                    )));
                }

                Ok(parsed)
            }
            _ => Ok(default),
        }
    }

    /// Parse usize from environment variable or return default
    fn parse_usize_or_default(key: &str, default: usize) -> Result<usize, ServerError> {
        match env::var(key) {
            Ok(value) => {
                let parsed = value.parse::<usize>().map_err(|e| {
                    ServerError::Configuration(format!("Invalid {} value '{}': {}", key, value, e))
                })?;

                if parsed == 0 {
                    return Err(ServerError::Configuration(format!(
                        "{} must be greater than 0",
                        key
                    )));
                }

                Ok(parsed)
            }
            _ => Ok(default),
        }
    }

    /// Validate all configuration values
    fn validate(&self) -> Result<(), ServerError> {
        if self.admin_port == self.proxy_port {
            return Err(ServerError::Configuration(format!(
                "ADMIN_PORT and PROXY_PORT must differ (both {})",
                self.admin_port
            )));
        }

        Self::validate_file_path(&self.serverconf_path, "Server configuration file")?;
        Self::validate_file_path(&self.api_keys_path, "API keys file")?;
        Self::validate_file_path(&self.globalconf_path, "Global configuration file")?;

        if let Some(ref path) = self.auth_cert_chain_path {
            Self::validate_file_path(path, "Authentication certificate chain")?;
        }
        if let Some(ref path) = self.auth_private_key_path {
            Self::validate_file_path(path, "Authentication private key")?;
        }

        Self::validate_url(&self.server_proxy_url, "Server proxy")?;
        Self::validate_log_level(&self.log_level)?;
        Self::validate_log_format(&self.log_format)?;

        Ok(())
    }

    /// Validate that a file path exists and is readable
    fn validate_file_path(path: &Path, description: &str) -> Result<(), ServerError> {
        if !path.exists() {
            return Err(ServerError::Configuration(format!(
                "{} not found at {:?}",
                description, path
            )));
        }

        if !path.is_file() {
            return Err(ServerError::Configuration(format!(
                "{} is not a file: {:?}",
                description, path
            )));
        }

        std::fs::File::open(path).map_err(|e| {
            ServerError::Configuration(format!("Cannot read {} at {:?}: {}", description, path, e))
        })?;

        Ok(())
    }

    /// Validate URL format; only http(s) upstreams are accepted
    fn validate_url(url: &str, description: &str) -> Result<(), ServerError> {
        let parsed = url::Url::parse(url).map_err(|e| {
            ServerError::Configuration(format!("Invalid {} URL '{}': {}", description, url, e))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ServerError::Configuration(format!(
                "Invalid {} URL '{}': scheme must be http or https",
                description, url
            )));
        }
        Ok(())
    }

    fn validate_log_level(level: &str) -> Result<(), ServerError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&level.to_lowercase().as_str()) {
            return Err(ServerError::Configuration(format!(
                "Invalid LOG_LEVEL '{}': must be one of {}",
                level,
                valid_levels.join(", ")
            )));
        }
        Ok(())
    }

    fn validate_log_format(format: &str) -> Result<(), ServerError> {
        if format != "json" && format != "text" {
            return Err(ServerError::Configuration(format!(
                "Invalid LOG_FORMAT '{}': must be 'json' or 'text'",
                format
            )));
        }
        Ok(())
    }
}

impl Config {
    /// Create a test configuration
    ///
    /// This bypasses environment variable loading and file validation.
    pub fn test_config() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            admin_port: 4000,
            proxy_port: 8080,
            serverconf_path: PathBuf::from("/tmp/serverconf.yaml"),
            serverconf_write_back: false,
            api_keys_path: PathBuf::from("/tmp/api-keys.yaml"),
            globalconf_path: PathBuf::from("/tmp/globalconf.yaml"),
            auth_cert_chain_path: None,
            auth_private_key_path: None,
            ssl_enabled: true,
            conf_reload_interval_secs: 60,
            server_proxy_url: "http://127.0.0.1:5500".to_string(),
            proxy_timeout_secs: 30,
            wsdl_fetch_timeout_secs: 10,
            wsdl_validator_command: None,
            request_timeout_secs: 60,
            body_size_limit_bytes: 10 * 1024 * 1024,
            log_level: "info".to_string(),
            log_format: "json".to_string(),
        }
    }
}
