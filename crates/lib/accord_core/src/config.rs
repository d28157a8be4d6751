//! Authentication configuration, read once at startup.

use std::fmt;

use chrono::Duration;
use jsonwebtoken::Algorithm;
use thiserror::Error;

use crate::auth::jwt::{DEFAULT_TOKEN_EXPIRY_MINUTES, parse_algorithm, resolve_jwt_secret};
use crate::oauth::ProviderRegistration;

/// Default public base URL of the API.
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8080";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Everything the authenticator needs. Immutable once built.
#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub algorithm: Algorithm,
    pub token_expiry: Duration,
    /// Public base URL; OAuth callbacks land on `{api_base_url}/auth/{provider}`.
    pub api_base_url: String,
    /// Registered providers. Providers without credentials are absent.
    pub providers: Vec<ProviderRegistration>,
}

impl AuthConfig {
    /// Reads configuration from the process environment.
    ///
    /// | Variable                       | Default                           |
    /// |--------------------------------|-----------------------------------|
    /// | `SECRET_KEY` / `JWT_SECRET`    | generated & persisted to file     |
    /// | `ALGORITHM`                    | `HS256`                           |
    /// | `ACCESS_TOKEN_EXPIRE_MINUTES`  | `1440`                            |
    /// | `API_BASE_URL`                 | `http://127.0.0.1:8080`           |
    /// | `GOOGLE_CLIENT_ID` / `_SECRET` | provider disabled                 |
    /// | `DISCORD_CLIENT_ID` / `_SECRET`| provider disabled                 |
    /// | `GITHUB_CLIENT_ID` / `_SECRET` | provider disabled                 |
    /// | `AUTH0_DOMAIN` / `AUTH0_CLIENT_ID` / `AUTH0_CLIENT_SECRET` | provider disabled |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let algorithm_name = get("ALGORITHM").unwrap_or_else(|| "HS256".into());
        let algorithm = parse_algorithm(&algorithm_name).map_err(|e| ConfigError::Invalid {
            var: "ALGORITHM",
            reason: e.to_string(),
        })?;
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(ConfigError::Invalid {
                var: "ALGORITHM",
                reason: format!("{algorithm_name} is not an HMAC algorithm"),
            });
        }

        let minutes = match get("ACCESS_TOKEN_EXPIRE_MINUTES") {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|m| *m > 0)
                .ok_or_else(|| ConfigError::Invalid {
                    var: "ACCESS_TOKEN_EXPIRE_MINUTES",
                    reason: format!("expected a positive number of minutes, got {raw:?}"),
                })?,
            None => DEFAULT_TOKEN_EXPIRY_MINUTES,
        };

        let api_base_url = get("API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.into())
            .trim_end_matches('/')
            .to_string();
        url::Url::parse(&api_base_url).map_err(|e| ConfigError::Invalid {
            var: "API_BASE_URL",
            reason: e.to_string(),
        })?;

        let mut providers = Vec::new();
        if let (Some(id), Some(secret)) = (get("GOOGLE_CLIENT_ID"), get("GOOGLE_CLIENT_SECRET")) {
            providers.push(ProviderRegistration::google(&id, &secret));
        }
        if let (Some(id), Some(secret)) = (get("DISCORD_CLIENT_ID"), get("DISCORD_CLIENT_SECRET")) {
            providers.push(ProviderRegistration::discord(&id, &secret));
        }
        if let (Some(id), Some(secret)) = (get("GITHUB_CLIENT_ID"), get("GITHUB_CLIENT_SECRET")) {
            providers.push(ProviderRegistration::github(&id, &secret));
        }
        if let (Some(domain), Some(id), Some(secret)) = (
            get("AUTH0_DOMAIN"),
            get("AUTH0_CLIENT_ID"),
            get("AUTH0_CLIENT_SECRET"),
        ) {
            providers.push(ProviderRegistration::auth0(&domain, &id, &secret));
        }

        Ok(Self {
            secret: resolve_jwt_secret(&get),
            algorithm,
            token_expiry: Duration::minutes(minutes),
            api_base_url,
            providers,
        })
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("token_expiry", &self.token_expiry)
            .field("api_base_url", &self.api_base_url)
            .field("providers", &self.providers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::oauth::Provider;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn defaults() {
        let config = AuthConfig::from_lookup(lookup(&[("SECRET_KEY", "s3cret")])).unwrap();
        assert_eq!(config.secret, "s3cret");
        assert_eq!(config.algorithm, Algorithm::HS256);
        assert_eq!(config.token_expiry, Duration::minutes(1440));
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert!(config.providers.is_empty());
    }

    #[test]
    fn providers_register_only_with_full_credentials() {
        let config = AuthConfig::from_lookup(lookup(&[
            ("SECRET_KEY", "s"),
            ("GOOGLE_CLIENT_ID", "g-id"),
            ("GOOGLE_CLIENT_SECRET", "g-secret"),
            ("DISCORD_CLIENT_ID", "d-id"),
            ("GITHUB_CLIENT_ID", "gh-id"),
            ("GITHUB_CLIENT_SECRET", ""),
            ("AUTH0_DOMAIN", "tenant.auth0.com"),
            ("AUTH0_CLIENT_ID", "a-id"),
            ("AUTH0_CLIENT_SECRET", "a-secret"),
        ]))
        .unwrap();
        let registered: Vec<Provider> = config.providers.iter().map(|p| p.provider).collect();
        assert_eq!(registered, vec![Provider::Google, Provider::Auth0]);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let config = AuthConfig::from_lookup(lookup(&[
            ("SECRET_KEY", "s"),
            ("API_BASE_URL", "https://api.example.com/"),
        ]))
        .unwrap();
        assert_eq!(config.api_base_url, "https://api.example.com");
    }

    #[test]
    fn rejects_bad_values() {
        assert!(AuthConfig::from_lookup(lookup(&[("SECRET_KEY", "s"), ("ALGORITHM", "RS256")])).is_err());
        assert!(AuthConfig::from_lookup(lookup(&[("SECRET_KEY", "s"), ("ALGORITHM", "nope")])).is_err());
        assert!(
            AuthConfig::from_lookup(lookup(&[
                ("SECRET_KEY", "s"),
                ("ACCESS_TOKEN_EXPIRE_MINUTES", "0")
            ]))
            .is_err()
        );
        assert!(
            AuthConfig::from_lookup(lookup(&[("SECRET_KEY", "s"), ("API_BASE_URL", "not a url")]))
                .is_err()
        );
    }

    #[test]
    fn debug_redacts_secret() {
        let config = AuthConfig::from_lookup(lookup(&[("SECRET_KEY", "hush-hush")])).unwrap();
        assert!(!format!("{config:?}").contains("hush-hush"));
    }
}
