// Centralized configuration management for the Encore backend
// Load ALL env vars ONCE at startup - immutable afterwards, no runtime mutation

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Global application configuration loaded once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(|| {
    // For tests, load .env file first
    #[cfg(test)]
    dotenv::dotenv().ok();

    AppConfig::from_env().expect("Failed to load configuration")
});

/// Access the global configuration
pub fn config() -> &'static AppConfig {
    &CONFIG
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    // Server
    pub bind_address: String,
    pub port: u16,
    pub environment: Environment,
    pub rust_log: String,

    // Database
    pub database_url: String,
    pub database_max_connections: u32,
    pub database_min_connections: u32,
    pub database_connect_timeout: u64,
    pub database_idle_timeout: u64,
    pub database_max_lifetime: u64,

    // JWT session tokens
    pub jwt_secret: String,
    pub jwt_expiry: u64,
    pub jwt_issuer: String,

    // Security
    pub cors_allowed_origins: Vec<String>,

    // Media storage for generated files
    pub media_dir: String,

    // Features
    pub enable_tracing: bool,
    pub disable_embedded_migrations: bool,

    // External collaborators
    pub media_gen: MediaGenConfig,
    pub paypal: PayPalConfig,
    pub nets: NetsConfig,
    pub drive: DriveConfig,
}

/// Environment type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Environment {
    Development,
    Test,
    Staging,
    Production,
}

impl From<String> for Environment {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Environment::Development,
            "test" => Environment::Test,
            "staging" | "stage" => Environment::Staging,
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Generative media API configuration (Gemini-style submit + poll + fetch)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaGenConfig {
    pub api_key: String,
    pub base_url: String,
    pub image_model: String,
    pub video_model: String,
    /// Fixed delay between polls of a long-running video operation, in seconds
    pub poll_interval_secs: u64,
    /// Caller-side ceiling on total poll time, in seconds
    pub poll_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

/// PayPal order create/capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayPalConfig {
    pub client_id: String,
    pub client_secret: String,
    pub base_url: String,
    pub currency: String,
}

/// NETS QR payment request configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetsConfig {
    pub api_key: String,
    pub project_id: String,
    pub base_url: String,
    pub txn_id_prefix: String,
}

/// Google Drive upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveConfig {
    pub upload_url: String,
    pub access_token: String,
    /// Destination folder; empty uploads to the Drive root
    pub folder_id: String,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let get_required = |key: &str| -> Result<String, ConfigError> {
            env::var(key).map_err(|_| ConfigError::MissingVar(key.to_string()))
        };

        let get_or_default = |key: &str, default: &str| -> String {
            env::var(key).unwrap_or_else(|_| default.to_string())
        };

        let parse_or_default = |key: &str, default: &str| -> Result<u32, ConfigError> {
            get_or_default(key, default).parse().map_err(|_| {
                ConfigError::InvalidValue(key.to_string(), "not a valid u32".to_string())
            })
        };

        let parse_u64_or_default = |key: &str, default: &str| -> Result<u64, ConfigError> {
            get_or_default(key, default).parse().map_err(|_| {
                ConfigError::InvalidValue(key.to_string(), "not a valid u64".to_string())
            })
        };

        let parse_bool_or_default = |key: &str, default: &str| -> bool {
            get_or_default(key, default).to_lowercase() == "true"
        };

        let bind_address = get_or_default("BIND_ADDRESS", "0.0.0.0:8080");
        let port = bind_address
            .rsplit(':')
            .next()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let environment = Environment::from(get_or_default("ENVIRONMENT", "development"));

        let jwt_secret = get_required("JWT_SECRET")?;
        if jwt_secret.len() < 32 {
            return Err(ConfigError::InvalidValue(
                "JWT_SECRET".to_string(),
                "Secret must be at least 32 characters long".to_string(),
            ));
        }

        let database_url = get_required("DATABASE_URL")?;
        let database_max_connections = parse_or_default("DATABASE_MAX_CONNECTIONS", "50")?;
        let database_min_connections = parse_or_default("DATABASE_MIN_CONNECTIONS", "5")?;
        let database_connect_timeout = parse_u64_or_default("DATABASE_CONNECT_TIMEOUT", "30")?;
        let database_idle_timeout = parse_u64_or_default("DATABASE_IDLE_TIMEOUT", "600")?;
        let database_max_lifetime = parse_u64_or_default("DATABASE_MAX_LIFETIME", "1800")?;

        let jwt_expiry = parse_u64_or_default("JWT_EXPIRY", "604800")?;
        let jwt_issuer = get_or_default("JWT_ISSUER", "encore.sg");

        let cors_allowed_origins: Vec<String> = get_or_default("CORS_ALLOWED_ORIGINS", "*")
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let media_dir = get_or_default("MEDIA_DIR", "media/generated");

        let media_gen = MediaGenConfig {
            api_key: get_or_default("GOOGLE_API_KEY", ""),
            base_url: get_or_default(
                "MEDIA_GEN_BASE_URL",
                "https://generativelanguage.googleapis.com/v1beta",
            ),
            image_model: get_or_default("MEDIA_GEN_IMAGE_MODEL", "gemini-2.5-flash-image"),
            video_model: get_or_default("MEDIA_GEN_VIDEO_MODEL", "veo-3.1-generate-preview"),
            poll_interval_secs: parse_u64_or_default("MEDIA_GEN_POLL_INTERVAL_SECS", "5")?,
            poll_timeout_secs: parse_u64_or_default("MEDIA_GEN_POLL_TIMEOUT_SECS", "300")?,
            request_timeout_secs: parse_u64_or_default("MEDIA_GEN_REQUEST_TIMEOUT_SECS", "60")?,
        };

        let paypal = PayPalConfig {
            client_id: get_or_default("PAYPAL_CLIENT_ID", ""),
            client_secret: get_or_default("PAYPAL_CLIENT_SECRET", ""),
            base_url: get_or_default("PAYPAL_BASE_URL", "https://api-m.sandbox.paypal.com"),
            currency: get_or_default("PAYPAL_CURRENCY", "SGD"),
        };

        let nets = NetsConfig {
            api_key: get_or_default("NETS_API_KEY", ""),
            project_id: get_or_default("NETS_PROJECT_ID", ""),
            base_url: get_or_default(
                "NETS_BASE_URL",
                "https://sandbox.nets.openapipaas.com/api/v1",
            ),
            txn_id_prefix: get_or_default("NETS_TXN_ID_PREFIX", "sandbox_nets|m|"),
        };

        let drive = DriveConfig {
            upload_url: get_or_default(
                "DRIVE_UPLOAD_URL",
                "https://www.googleapis.com/upload/drive/v3/files",
            ),
            access_token: get_or_default("DRIVE_ACCESS_TOKEN", ""),
            folder_id: get_or_default("DRIVE_FOLDER_ID", ""),
        };

        // Production refuses to run with placeholder payment credentials
        if environment == Environment::Production && paypal.client_id.is_empty() {
            return Err(ConfigError::MissingVar("PAYPAL_CLIENT_ID".to_string()));
        }

        Ok(AppConfig {
            bind_address,
            port,
            environment,
            rust_log: get_or_default("RUST_LOG", "info"),
            database_url,
            database_max_connections,
            database_min_connections,
            database_connect_timeout,
            database_idle_timeout,
            database_max_lifetime,
            jwt_secret,
            jwt_expiry,
            jwt_issuer,
            cors_allowed_origins,
            media_dir,
            enable_tracing: parse_bool_or_default("ENABLE_TRACING", "true"),
            disable_embedded_migrations: parse_bool_or_default(
                "DISABLE_EMBEDDED_MIGRATIONS",
                "false",
            ),
            media_gen,
            paypal,
            nets,
            drive,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_required_env<T>(f: impl FnOnce() -> T) -> T {
        env::set_var("JWT_SECRET", "0123456789abcdef0123456789abcdef");
        env::set_var("DATABASE_URL", "postgresql://localhost/encore_test");
        let out = f();
        env::remove_var("JWT_SECRET");
        env::remove_var("DATABASE_URL");
        out
    }

    #[test]
    #[ignore] // mutates process env; run with --ignored in isolation
    fn test_defaults_applied() {
        let config = with_required_env(|| AppConfig::from_env().unwrap());
        assert_eq!(config.port, 8080);
        assert_eq!(config.media_gen.poll_interval_secs, 5);
        assert_eq!(config.paypal.currency, "SGD");
        assert!(!config.is_production());
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!(
            Environment::from("prod".to_string()),
            Environment::Production
        );
        assert_eq!(
            Environment::from("unknown".to_string()),
            Environment::Development
        );
        assert_eq!(Environment::Production.to_string(), "production");
    }
}
