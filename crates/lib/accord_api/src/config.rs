//! API server configuration.

use std::fmt;
use std::str::FromStr;

use accord_core::config::{AuthConfig, ConfigError};

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Dev,
    Prod,
}

impl Environment {
    pub fn is_prod(&self) -> bool {
        matches!(self, Environment::Prod)
    }

    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub fn default_log_filter(&self) -> &'static str {
        match self {
            Environment::Dev => "debug,accord_api=debug,accord_core=debug",
            Environment::Prod => "info",
        }
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Dev),
            "prod" | "production" => Ok(Environment::Prod),
            other => Err(ConfigError::Invalid {
                var: "ENV",
                reason: format!("expected dev or prod, got {other:?}"),
            }),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Environment::Dev => "dev",
            Environment::Prod => "prod",
        })
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub env: Environment,
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:8080").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    pub auth: AuthConfig,
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable       | Default                              |
    /// |----------------|--------------------------------------|
    /// | `ENV`          | `dev`                                |
    /// | `BIND_ADDR`    | `127.0.0.1:8080`                     |
    /// | `DATABASE_URL` | `postgres://localhost:5432/accord`   |
    ///
    /// Token and provider settings are read by [`AuthConfig::from_env`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = match lookup("ENV") {
            Some(raw) if !raw.trim().is_empty() => raw.parse()?,
            _ => Environment::default(),
        };
        Ok(Self {
            env,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:8080".into()),
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "postgres://localhost:5432/accord".into()),
            auth: AuthConfig::from_lookup(&lookup)?,
        })
    }
}
