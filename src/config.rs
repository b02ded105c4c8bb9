//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `AUTH_TOKEN_SECRET` - Bearer token signing secret (min 32 chars)
//! - `DATABASE_URL` - `PostgreSQL` connection string (postgres backend only)
//!
//! ## Optional
//! - `HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 8083)
//! - `STORE_BACKEND` - `postgres` or `memory` (default: postgres)
//! - `DATABASE_MAX_CONNECTIONS` - Pool size (default: 10)
//! - `MAX_PAGE_SIZE` - Upper bound for `limit` on product search (default: 100)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_TOKEN_SECRET_LENGTH: usize = 32;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Where products, categories and carts are kept.
#[derive(Debug, Clone)]
pub enum StoreBackend {
    Postgres(DatabaseConfig),
    /// Process-local maps; contents are lost on restart.
    Memory,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Connection URL (contains password)
    pub url: SecretString,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub host: IpAddr,
    pub port: u16,
    pub store: StoreBackend,
    pub auth_token_secret: SecretString,
    pub max_page_size: u32,
}

impl CatalogConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = parse_or_default(&get, "HOST", "0.0.0.0")?;
        let port = parse_or_default(&get, "PORT", "8083")?;
        let max_page_size = parse_or_default(&get, "MAX_PAGE_SIZE", "100")?;
        if max_page_size == 0 {
            return Err(ConfigError::InvalidEnvVar("MAX_PAGE_SIZE".into(), "must be at least 1".into()));
        }

        let store = match get("STORE_BACKEND").as_deref().unwrap_or("postgres") {
            "postgres" => StoreBackend::Postgres(DatabaseConfig {
                url: SecretString::from(get("DATABASE_URL").ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".into()))?),
                max_connections: parse_or_default(&get, "DATABASE_MAX_CONNECTIONS", "10")?,
            }),
            "memory" => StoreBackend::Memory,
            other => return Err(ConfigError::InvalidEnvVar("STORE_BACKEND".into(), format!("unknown backend '{other}'"))),
        };

        let auth_token_secret = SecretString::from(
            get("AUTH_TOKEN_SECRET").ok_or_else(|| ConfigError::MissingEnvVar("AUTH_TOKEN_SECRET".into()))?,
        );
        validate_token_secret(&auth_token_secret, "AUTH_TOKEN_SECRET")?;

        Ok(Self { host, port, store, auth_token_secret, max_page_size })
    }

    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_or_default<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get(key)
        .unwrap_or_else(|| default.to_string())
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn validate_token_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_TOKEN_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("must be at least {MIN_TOKEN_SECRET_LENGTH} characters (got {})", value.len()),
        ));
    }
    Ok(())
}
