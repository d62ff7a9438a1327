// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup into an immutable [`Config`]; request
//! handling never looks at the environment.

use crate::services::providers::{OAuthProviderConfig, Provider};
use hkdf::Hkdf;
use sha2::Sha256;
use std::env;
use std::time::Duration;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Path every route is nested under ("" for root)
    pub base_path: String,
    /// Externally visible origin, used to build OAuth redirect URIs
    pub public_url: String,
    /// Frontend origin allowed by CORS
    pub frontend_url: String,
    /// sqlx connection string for the credential store
    pub database_url: String,

    /// HS256 key for bearer tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Bearer token lifetime
    pub access_token_ttl: chrono::Duration,
    /// HMAC key for the OAuth `state` parameter
    pub oauth_state_key: Vec<u8>,
    /// Reject callbacks whose `state` was not issued by us
    pub enforce_oauth_state: bool,
    /// Upper bound for every call to an OAuth provider
    pub oauth_http_timeout: Duration,

    /// Mount `/auth/standard`
    pub standard_auth_enabled: bool,
    /// Enabled OAuth providers
    pub providers: Vec<OAuthProviderConfig>,
}

impl Config {
    /// Default config for testing only.
    ///
    /// All login methods enabled, pointing at the real provider endpoints.
    pub fn test_default() -> Self {
        let jwt_signing_key = b"test_jwt_key_32_bytes_minimum!!".to_vec();
        let oauth_state_key = b"test_oauth_state_key_32_bytes!!!".to_vec();

        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            base_path: "/api".to_string(),
            public_url: "http://127.0.0.1:8000".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            database_url: "sqlite::memory:".to_string(),
            jwt_signing_key,
            access_token_ttl: chrono::Duration::minutes(30),
            oauth_state_key,
            enforce_oauth_state: true,
            oauth_http_timeout: Duration::from_secs(5),
            standard_auth_enabled: true,
            providers: Provider::ALL
                .into_iter()
                .map(|provider| OAuthProviderConfig {
                    provider,
                    client_id: format!("test_{}_client_id", provider),
                    client_secret: format!("test_{}_secret", provider),
                    endpoints: provider.default_endpoints("common"),
                })
                .collect(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file is loaded first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string());
        let required = |key: &'static str| var(key).ok_or(ConfigError::Missing(key));
        let flag = |key: &'static str| -> Result<bool, ConfigError> {
            match var(key) {
                None => Ok(false),
                Some(v) => parse_flag(&v).ok_or(ConfigError::Invalid(key, v)),
            }
        };

        let host = var("API_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = match var("PORT") {
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid("PORT", v))?,
            None => 8000,
        };
        let base_path = normalize_base_path(&var("API_BASE_PATH").unwrap_or_else(|| "/api".into()));
        let public_url = var("PUBLIC_URL")
            .unwrap_or_else(|| format!("http://{}:{}", host, port))
            .trim_end_matches('/')
            .to_string();

        let jwt_signing_key = required("JWT_SECRET_KEY")?.into_bytes();
        let ttl_minutes: i64 = match var("JWT_ACCESS_TOKEN_EXPIRE_MINUTES") {
            Some(v) => v
                .parse()
                .ok()
                .filter(|m| *m > 0)
                .ok_or(ConfigError::Invalid("JWT_ACCESS_TOKEN_EXPIRE_MINUTES", v))?,
            None => 30,
        };
        let oauth_state_key = match var("OAUTH_STATE_KEY") {
            Some(v) => v.into_bytes(),
            None => derive_state_key(&jwt_signing_key)?,
        };
        let enforce_oauth_state = match var("OAUTH_ENFORCE_STATE") {
            Some(v) => parse_flag(&v).ok_or(ConfigError::Invalid("OAUTH_ENFORCE_STATE", v))?,
            None => true,
        };
        let timeout_secs: u64 = match var("OAUTH_HTTP_TIMEOUT_SECS") {
            Some(v) => v
                .parse()
                .ok()
                .filter(|s| *s > 0)
                .ok_or(ConfigError::Invalid("OAUTH_HTTP_TIMEOUT_SECS", v))?,
            None => 10,
        };

        let tenant = var("ENTRA_ID_TENANT_ID").unwrap_or_else(|| "common".to_string());
        let mut providers = Vec::new();
        for provider in Provider::ALL {
            let (flag_var, id_var, secret_var) = provider_env_vars(provider);
            if !flag(flag_var)? {
                continue;
            }
            let mut endpoints = provider.default_endpoints(&tenant);
            if let (Some(graph), Some(scopes)) =
                (endpoints.graph.as_mut(), var("ENTRA_ID_APPLICATION_SCOPE"))
            {
                graph.app_scopes = split_scopes(&scopes);
            }
            providers.push(OAuthProviderConfig {
                provider,
                client_id: required(id_var)?,
                client_secret: required(secret_var)?,
                endpoints,
            });
        }

        Ok(Self {
            host,
            port,
            base_path,
            public_url,
            frontend_url: var("FRONTEND_URL")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            database_url: var("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://auth-gateway.db?mode=rwc".to_string()),
            jwt_signing_key,
            access_token_ttl: chrono::Duration::minutes(ttl_minutes),
            oauth_state_key,
            enforce_oauth_state,
            oauth_http_timeout: Duration::from_secs(timeout_secs),
            standard_auth_enabled: flag("AUTH_EMAIL_PASSWORD")?,
            providers,
        })
    }

    /// Origin plus base path; OAuth redirect URIs hang off this.
    pub fn callback_base(&self) -> String {
        format!("{}{}", self.public_url, self.base_path)
    }
}

/// Environment variable names: (feature flag, client id, client secret).
fn provider_env_vars(provider: Provider) -> (&'static str, &'static str, &'static str) {
    match provider {
        Provider::Google => ("AUTH_GOOGLE", "GOOGLE_CLIENT_ID", "GOOGLE_CLIENT_SECRET"),
        Provider::Facebook => ("AUTH_FACEBOOK", "FACEBOOK_CLIENT_ID", "FACEBOOK_CLIENT_SECRET"),
        Provider::Strava => ("AUTH_STRAVA", "STRAVA_CLIENT_ID", "STRAVA_CLIENT_SECRET"),
        Provider::Microsoft => ("AUTH_MICROSOFT", "ENTRA_ID_CLIENT_ID", "ENTRA_ID_CLIENT_SECRET"),
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// "/api/" -> "/api", "api" -> "/api", "/" -> ""
fn normalize_base_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

/// Comma- or space-separated scope list.
fn split_scopes(value: &str) -> Vec<String> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Derive the OAuth state key from the JWT key so a single secret suffices.
fn derive_state_key(jwt_signing_key: &[u8]) -> Result<Vec<u8>, ConfigError> {
    let hk = Hkdf::<Sha256>::new(None, jwt_signing_key);
    let mut okm = [0u8; 32];
    hk.expand(b"auth-gateway oauth state", &mut okm)
        .map_err(|e| ConfigError::KeyDerivation(e.to_string()))?;
    Ok(okm.to_vec())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),

    #[error("Failed to derive OAuth state key: {0}")]
    KeyDerivation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_minimal() {
        let config = Config::from_lookup(lookup(&[("JWT_SECRET_KEY", "k")])).unwrap();

        assert_eq!(config.port, 8000);
        assert_eq!(config.base_path, "/api");
        assert_eq!(config.public_url, "http://127.0.0.1:8000");
        assert_eq!(config.access_token_ttl, chrono::Duration::minutes(30));
        assert!(config.enforce_oauth_state);
        assert!(!config.standard_auth_enabled);
        assert!(config.providers.is_empty());
        assert_eq!(config.oauth_state_key.len(), 32);
        assert_ne!(config.oauth_state_key, config.jwt_signing_key);
    }

    #[test]
    fn test_config_missing_jwt_key() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_SECRET_KEY")));
    }

    #[test]
    fn test_config_enabled_provider_requires_credentials() {
        let err = Config::from_lookup(lookup(&[
            ("JWT_SECRET_KEY", "k"),
            ("AUTH_GOOGLE", "true"),
            ("GOOGLE_CLIENT_ID", "gid"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("GOOGLE_CLIENT_SECRET")));
    }

    #[test]
    fn test_config_providers_and_flags() {
        let config = Config::from_lookup(lookup(&[
            ("JWT_SECRET_KEY", "k"),
            ("AUTH_EMAIL_PASSWORD", "true"),
            ("AUTH_STRAVA", "1"),
            ("STRAVA_CLIENT_ID", "sid"),
            ("STRAVA_CLIENT_SECRET", " ssecret "),
            ("AUTH_MICROSOFT", "true"),
            ("ENTRA_ID_CLIENT_ID", "mid"),
            ("ENTRA_ID_CLIENT_SECRET", "msecret"),
            ("ENTRA_ID_TENANT_ID", "contoso"),
            ("API_BASE_PATH", "/v1/"),
            ("PUBLIC_URL", "https://auth.example.com/"),
            ("JWT_ACCESS_TOKEN_EXPIRE_MINUTES", "15"),
        ]))
        .unwrap();

        assert!(config.standard_auth_enabled);
        let names: Vec<_> = config.providers.iter().map(|p| p.provider).collect();
        assert_eq!(names, vec![Provider::Strava, Provider::Microsoft]);
        assert_eq!(config.providers[0].client_secret, "ssecret");
        assert!(config.providers[1]
            .endpoints
            .authorize_url
            .contains("/contoso/"));
        assert_eq!(config.callback_base(), "https://auth.example.com/v1");
        assert_eq!(config.access_token_ttl, chrono::Duration::minutes(15));
    }

    #[test]
    fn test_config_invalid_flag() {
        let err = Config::from_lookup(lookup(&[
            ("JWT_SECRET_KEY", "k"),
            ("AUTH_FACEBOOK", "maybe"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("AUTH_FACEBOOK", _)));
    }

    #[test]
    fn test_state_key_derivation_is_deterministic() {
        let a = derive_state_key(b"jwt key").unwrap();
        let b = derive_state_key(b"jwt key").unwrap();
        let c = derive_state_key(b"other key").unwrap();
        assert_eq!(a.len(), 32);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_microsoft_application_scope_override() {
        let config = Config::from_lookup(lookup(&[
            ("JWT_SECRET_KEY", "k"),
            ("AUTH_MICROSOFT", "true"),
            ("ENTRA_ID_CLIENT_ID", "mid"),
            ("ENTRA_ID_CLIENT_SECRET", "msecret"),
            (
                "ENTRA_ID_APPLICATION_SCOPE",
                "https://graph.microsoft.com/.default, api://x/.default",
            ),
        ]))
        .unwrap();

        let graph = config.providers[0].endpoints.graph.as_ref().unwrap();
        assert_eq!(
            graph.app_scopes,
            vec!["https://graph.microsoft.com/.default", "api://x/.default"]
        );
    }

    #[test]
    fn test_normalize_base_path() {
        assert_eq!(normalize_base_path("/"), "");
        assert_eq!(normalize_base_path(""), "");
        assert_eq!(normalize_base_path("api"), "/api");
        assert_eq!(normalize_base_path("/api/v1/"), "/api/v1");
    }
}
