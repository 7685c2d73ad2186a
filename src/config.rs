use std::env;

use thiserror::Error;

/// Runtime settings for the command line tool.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let url = env::var("DATABASE_URL").ok().filter(|value| !value.trim().is_empty());
        let max_connections = env::var("GRADES_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidMaxConnections)?;
        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            database: DatabaseConfig {
                url,
                max_connections,
            },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn require_url(&self) -> Result<&str, ConfigError> {
        self.url.as_deref().ok_or(ConfigError::MissingDatabaseUrl)
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("GRADES_MAX_CONNECTIONS must be a valid u32")]
    InvalidMaxConnections,
    #[error("DATABASE_URL must be set to a production Postgres instance")]
    MissingDatabaseUrl,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("DATABASE_URL");
        env::remove_var("GRADES_MAX_CONNECTIONS");
        env::remove_var("APP_LOG_LEVEL");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn rejects_invalid_pool_size() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("GRADES_MAX_CONNECTIONS", "many");
        assert_eq!(
            AppConfig::load().unwrap_err(),
            ConfigError::InvalidMaxConnections
        );
        reset_env();
    }

    #[test]
    fn database_url_required_on_demand() {
        let database = DatabaseConfig {
            url: None,
            max_connections: 5,
        };
        assert_eq!(database.require_url(), Err(ConfigError::MissingDatabaseUrl));

        let database = DatabaseConfig {
            url: Some("postgres://localhost/grades".to_string()),
            max_connections: 5,
        };
        assert_eq!(database.require_url(), Ok("postgres://localhost/grades"));
    }
}
