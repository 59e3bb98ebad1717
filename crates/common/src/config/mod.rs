//! Configuration management for Resplain services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Conventional variables (PORT, DATABASE_URL, GEMINI_API_KEY, JWT_SECRET)
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Explanation generation configuration
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database URL
    pub url: String,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Create missing tables on startup
    #[serde(default = "default_enabled")]
    pub auto_create_schema: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationConfig {
    /// Generation provider: gemini, mock
    #[serde(default = "default_generation_provider")]
    pub provider: String,

    /// API key for the generative-language service
    pub api_key: Option<String>,

    /// API base URL
    #[serde(default = "default_generation_api_base")]
    pub api_base: String,

    /// Model to use
    #[serde(default = "default_generation_model")]
    pub model: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Secret used to verify bearer tokens
    pub jwt_secret: Option<String>,

    /// JWT expiration in seconds
    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name reported in logs
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 3000 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_max_connections() -> u32 { 20 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_enabled() -> bool { true }
fn default_generation_provider() -> String { "gemini".to_string() }
fn default_generation_api_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_generation_model() -> String { "gemini-2.5-flash".to_string() }
fn default_jwt_expiration() -> u64 { 7 * 24 * 3600 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "resplain".to_string() }

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_generation_provider(),
            api_key: None,
            api_base: default_generation_api_base(),
            model: default_generation_model(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            jwt_expiration_secs: default_jwt_expiration(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with defaults
            .set_default("server.host", default_host())?
            .set_default("server.port", i64::from(default_port()))?

            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=8081
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            // Conventional variables win over everything else
            .set_override_option("server.port", std::env::var("PORT").ok())?
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("generation.api_key", std::env::var("GEMINI_API_KEY").ok())?
            .set_override_option("auth.jwt_secret", std::env::var("JWT_SECRET").ok())?

            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generation.provider == "gemini"
            && self.generation.api_key.as_deref().map_or(true, str::is_empty)
        {
            return Err(ConfigError::Message(
                "generation.api_key (or GEMINI_API_KEY) is required for the gemini provider"
                    .to_string(),
            ));
        }

        if self.auth.jwt_secret.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::Message(
                "auth.jwt_secret (or JWT_SECRET) is required".to_string(),
            ));
        }

        Ok(())
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                shutdown_timeout_secs: default_shutdown_timeout(),
            },
            database: DatabaseConfig {
                url: "postgres://localhost/resplain".to_string(),
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                connect_timeout_secs: default_connect_timeout(),
                idle_timeout_secs: default_idle_timeout(),
                auto_create_schema: default_enabled(),
            },
            generation: GenerationConfig::default(),
            auth: AuthConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.generation.model, "gemini-2.5-flash");
        assert_eq!(config.generation.provider, "gemini");
    }

    #[test]
    fn test_gemini_requires_api_key() {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = Some("secret".into());
        assert!(config.validate().is_err());

        config.generation.api_key = Some("key".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_mock_provider_needs_no_key() {
        let mut config = AppConfig::default();
        config.generation.provider = "mock".into();
        config.auth.jwt_secret = Some("secret".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_jwt_secret_required() {
        let mut config = AppConfig::default();
        config.generation.provider = "mock".into();
        config.auth.jwt_secret = Some(String::new());
        assert!(config.validate().is_err());
    }
}
