use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use crate::{AcademyError, AcademyResult};

pub const DEFAULT_FROM_EMAIL: &str = "noreply@cloudacademy.ar";
pub const DEFAULT_BRAND_NAME: &str = "CloudAcademy";
pub const DEFAULT_BASE_URL: &str = "https://proyectos.cloudacademy.ar";
pub const DEFAULT_BEDROCK_MODEL_ID: &str = "anthropic.claude-3-haiku-20240307-v1:0";

/// Source of configuration values. Lambda reads the process environment;
/// tests pass a map.
pub trait ConfigSource {
    fn get(&self, key: &str) -> Option<String>;
}

pub struct ProcessEnv;

impl ConfigSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned().filter(|v| !v.is_empty())
    }
}

fn required(source: &dyn ConfigSource, key: &str) -> AcademyResult<String> {
    source.get(key).ok_or_else(|| {
        tracing::error!("{} environment variable not set", key);
        AcademyError::ConfigurationError(format!("{} not set", key))
    })
}

fn or_default(source: &dyn ConfigSource, key: &str, default: &str) -> String {
    source.get(key).unwrap_or_else(|| default.to_string())
}

fn parsed<T: FromStr>(source: &dyn ConfigSource, key: &str, default: T) -> AcademyResult<T> {
    match source.get(key) {
        Some(raw) => raw.parse().map_err(|_| {
            AcademyError::ConfigurationError(format!("{} has an invalid value: {}", key, raw))
        }),
        None => Ok(default),
    }
}

/// PostgreSQL connection settings
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn from_env() -> AcademyResult<Self> {
        Self::from_source(&ProcessEnv)
    }

    pub fn from_source(source: &dyn ConfigSource) -> AcademyResult<Self> {
        Ok(Self {
            host: required(source, "DB_HOST")?,
            port: parsed(source, "DB_PORT", 5432)?,
            name: or_default(source, "DB_NAME", "cloudacademy"),
            user: or_default(source, "DB_USER", "postgres"),
            password: or_default(source, "DB_PASSWORD", ""),
            max_connections: parsed(source, "DB_MAX_CONNECTIONS", 10)?,
        })
    }

    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.name)
            .username(&self.user)
            .password(&self.password)
    }

    /// Create the connection pool. Connections are opened on first use, so a
    /// database outage surfaces per request instead of at cold start. The
    /// caller owns the pool and closes it on shutdown.
    pub fn lazy_pool(&self) -> PgPool {
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(Duration::from_secs(60))
            .connect_lazy_with(self.connect_options());

        tracing::info!(
            "Database pool created - host: {}, database: {}, max connections: {}",
            self.host,
            self.name,
            self.max_connections
        );
        pool
    }
}

/// Sender identity and branding for outgoing emails
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub from_email: String,
    pub brand_name: String,
    pub base_url: String,
}

impl EmailConfig {
    pub fn from_env() -> Self {
        Self::from_source(&ProcessEnv)
    }

    pub fn from_source(source: &dyn ConfigSource) -> Self {
        Self {
            from_email: or_default(source, "FROM_EMAIL", DEFAULT_FROM_EMAIL),
            brand_name: or_default(source, "BRAND_NAME", DEFAULT_BRAND_NAME),
            base_url: or_default(source, "BASE_URL", DEFAULT_BASE_URL),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BedrockConfig {
    pub model_id: String,
    pub max_tokens: u32,
    pub history_window: usize,
}

impl BedrockConfig {
    pub fn from_env() -> AcademyResult<Self> {
        Self::from_source(&ProcessEnv)
    }

    pub fn from_source(source: &dyn ConfigSource) -> AcademyResult<Self> {
        Ok(Self {
            model_id: or_default(source, "BEDROCK_MODEL_ID", DEFAULT_BEDROCK_MODEL_ID),
            max_tokens: parsed(source, "BEDROCK_MAX_TOKENS", 1000)?,
            history_window: parsed(source, "BEDROCK_HISTORY_WINDOW", 4)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allow_origin: String,
}

impl CorsConfig {
    pub fn from_env() -> Self {
        Self::from_source(&ProcessEnv)
    }

    pub fn from_source(source: &dyn ConfigSource) -> Self {
        Self {
            allow_origin: or_default(source, "CORS_ALLOW_ORIGIN", "*"),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origin: "*".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_database_config_defaults() {
        let config = DatabaseConfig::from_source(&source(&[("DB_HOST", "db.internal")])).unwrap();

        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 5432);
        assert_eq!(config.name, "cloudacademy");
        assert_eq!(config.user, "postgres");
        assert_eq!(config.password, "");
        assert_eq!(config.max_connections, 10);
    }

    #[test]
    fn test_database_config_requires_host() {
        let result = DatabaseConfig::from_source(&source(&[("DB_NAME", "academy")]));
        assert!(matches!(result, Err(AcademyError::ConfigurationError(_))));
    }

    #[test]
    fn test_database_config_rejects_bad_port() {
        let result = DatabaseConfig::from_source(&source(&[("DB_HOST", "db"), ("DB_PORT", "fivefour")]));
        assert!(matches!(result, Err(AcademyError::ConfigurationError(_))));
    }

    #[test]
    fn test_email_config_overrides() {
        let config = EmailConfig::from_source(&source(&[
            ("FROM_EMAIL", "hello@template.example"),
            ("BRAND_NAME", "Template"),
        ]));

        assert_eq!(config.from_email, "hello@template.example");
        assert_eq!(config.brand_name, "Template");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_bedrock_config() {
        let config = BedrockConfig::from_source(&source(&[("BEDROCK_MAX_TOKENS", "512")])).unwrap();

        assert_eq!(config.model_id, DEFAULT_BEDROCK_MODEL_ID);
        assert_eq!(config.max_tokens, 512);
        assert_eq!(config.history_window, 4);
    }

    #[test]
    fn test_empty_values_fall_back_to_defaults() {
        let config = CorsConfig::from_source(&source(&[("CORS_ALLOW_ORIGIN", "")]));
        assert_eq!(config.allow_origin, "*");
    }
}
