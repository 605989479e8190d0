//! Application configuration module
//! Handles environment variable loading, configuration validation, and application settings

use std::env;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub admin: AdminConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connection_timeout: u64,   // seconds
    pub idle_timeout: Option<u64>, // seconds
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log format options
#[derive(Debug, Clone)]
pub enum LogFormat {
    Json,
    Plain,
}

/// Administrative access configuration.
///
/// The password is the first factor; the OTP challenge delivered to
/// `admin_email` is the second. Session tokens minted after a successful
/// challenge are signed with `session_secret`.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub password: String,
    pub admin_email: String,
    pub session_secret: String,
    pub session_ttl_secs: i64,
    pub otp_ttl_secs: i64,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenv::dotenv().ok();

        Ok(AppConfig {
            server: ServerConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
            admin: AdminConfig::from_env()?,
        })
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.database.validate()?;
        self.logging.validate()?;
        self.admin.validate()?;

        Ok(())
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(ServerConfig {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".to_string()))?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidValue(
                "SERVER_PORT cannot be 0".to_string(),
            ));
        }

        if self.host.is_empty() {
            return Err(ConfigError::InvalidValue(
                "SERVER_HOST cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(DatabaseConfig {
            url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::MissingVariable("DATABASE_URL".to_string()))?,
            max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()))?,
            min_connections: env::var("DB_MIN_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DB_MIN_CONNECTIONS".to_string()))?,
            connection_timeout: env::var("DB_CONNECTION_TIMEOUT")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DB_CONNECTION_TIMEOUT".to_string()))?,
            idle_timeout: env::var("DB_IDLE_TIMEOUT")
                .ok()
                .and_then(|val| val.parse().ok()),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::InvalidValue("DATABASE_URL".to_string()));
        }

        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }

        if self.min_connections > self.max_connections {
            return Err(ConfigError::InvalidValue(
                "DB_MIN_CONNECTIONS must be <= DB_MAX_CONNECTIONS".to_string(),
            ));
        }

        Ok(())
    }
}

impl LoggingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "plain".to_string())
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Plain,
            },
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];
        if !valid_levels.contains(&self.level.to_uppercase().as_str()) {
            return Err(ConfigError::InvalidValue("LOG_LEVEL".to_string()));
        }

        Ok(())
    }
}

impl AdminConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(AdminConfig {
            password: env::var("ADMIN_PASSWORD")
                .map_err(|_| ConfigError::MissingVariable("ADMIN_PASSWORD".to_string()))?,
            admin_email: env::var("ADMIN_EMAIL")
                .map_err(|_| ConfigError::MissingVariable("ADMIN_EMAIL".to_string()))?,
            session_secret: env::var("ADMIN_SESSION_SECRET")
                .map_err(|_| ConfigError::MissingVariable("ADMIN_SESSION_SECRET".to_string()))?,
            session_ttl_secs: env::var("ADMIN_SESSION_TTL_SECS")
                .unwrap_or_else(|_| "43200".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("ADMIN_SESSION_TTL_SECS".to_string()))?,
            otp_ttl_secs: env::var("ADMIN_OTP_TTL_SECS")
                .unwrap_or_else(|_| "600".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("ADMIN_OTP_TTL_SECS".to_string()))?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.password.is_empty() {
            return Err(ConfigError::InvalidValue(
                "ADMIN_PASSWORD cannot be empty".to_string(),
            ));
        }

        if !self.admin_email.contains('@') {
            return Err(ConfigError::InvalidValue(
                "ADMIN_EMAIL must be an email address".to_string(),
            ));
        }

        // Short MAC keys weaken every session token at once.
        if self.session_secret.len() < 32 {
            return Err(ConfigError::InvalidValue(
                "ADMIN_SESSION_SECRET must be at least 32 characters".to_string(),
            ));
        }

        if self.session_ttl_secs <= 0 {
            return Err(ConfigError::InvalidValue(
                "ADMIN_SESSION_TTL_SECS must be positive".to_string(),
            ));
        }

        if self.otp_ttl_secs <= 0 {
            return Err(ConfigError::InvalidValue(
                "ADMIN_OTP_TTL_SECS must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),

    #[error("Invalid value for configuration: {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin_config() -> AdminConfig {
        AdminConfig {
            password: "a-long-admin-password".to_string(),
            admin_email: "admin@example.com".to_string(),
            session_secret: "0123456789abcdef0123456789abcdef".to_string(),
            session_ttl_secs: 43200,
            otp_ttl_secs: 600,
        }
    }

    #[test]
    fn test_server_config_validation() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8000,
        };

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_port_validation() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Invalid port
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn admin_config_accepts_sane_values() {
        assert!(admin_config().validate().is_ok());
    }

    #[test]
    fn admin_config_rejects_short_session_secret() {
        let mut config = admin_config();
        config.session_secret = "short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn admin_config_rejects_non_email_subject() {
        let mut config = admin_config();
        config.admin_email = "not-an-email".to_string();
        assert!(config.validate().is_err());
    }
}
