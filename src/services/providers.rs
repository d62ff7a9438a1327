// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth provider registry and profile normalization.
//!
//! The set of federated providers is closed: every provider is a variant of
//! [`Provider`], so adding one forces every `match` below to be revisited.

use crate::error::AppError;
use crate::models::NormalizedIdentity;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// OAuth2 providers a user can federate through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Google,
    Facebook,
    Strava,
    Microsoft,
}

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::Google,
        Provider::Facebook,
        Provider::Strava,
        Provider::Microsoft,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Facebook => "facebook",
            Provider::Strava => "strava",
            Provider::Microsoft => "microsoft",
        }
    }

    /// Public endpoints and scopes for this provider.
    ///
    /// `tenant` only affects Microsoft, whose authority URL is tenant-scoped.
    pub fn default_endpoints(&self, tenant: &str) -> ProviderEndpoints {
        match self {
            Provider::Google => ProviderEndpoints {
                authorize_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
                token_url: "https://oauth2.googleapis.com/token".to_string(),
                profile_url: "https://www.googleapis.com/oauth2/v2/userinfo".to_string(),
                scopes: vec!["openid".into(), "email".into(), "profile".into()],
                graph: None,
            },
            Provider::Facebook => ProviderEndpoints {
                authorize_url: "https://www.facebook.com/v18.0/dialog/oauth".to_string(),
                token_url: "https://graph.facebook.com/v18.0/oauth/access_token".to_string(),
                profile_url: "https://graph.facebook.com/me?fields=id,name,email,picture"
                    .to_string(),
                scopes: vec!["email".into(), "public_profile".into()],
                graph: None,
            },
            Provider::Strava => ProviderEndpoints {
                authorize_url: "https://www.strava.com/oauth/authorize".to_string(),
                token_url: "https://www.strava.com/oauth/token".to_string(),
                profile_url: "https://www.strava.com/api/v3/athlete".to_string(),
                scopes: vec!["read".into(), "profile:read_all".into()],
                graph: None,
            },
            Provider::Microsoft => ProviderEndpoints {
                authorize_url: format!(
                    "https://login.microsoftonline.com/{}/oauth2/v2.0/authorize",
                    tenant
                ),
                token_url: format!(
                    "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
                    tenant
                ),
                profile_url: "https://graph.microsoft.com/v1.0/me".to_string(),
                scopes: vec![
                    "openid".into(),
                    "profile".into(),
                    "email".into(),
                    "offline_access".into(),
                    "User.Read".into(),
                ],
                graph: Some(GraphEndpoints {
                    base_url: "https://graph.microsoft.com/v1.0".to_string(),
                    app_scopes: vec!["https://graph.microsoft.com/.default".into()],
                }),
            },
        }
    }

    /// Map this provider's raw profile payload to the canonical identity.
    ///
    /// Total over JSON objects: any missing or mistyped field becomes `None`.
    pub fn normalize(&self, raw: &Value) -> NormalizedIdentity {
        match self {
            Provider::Google => NormalizedIdentity {
                provider: *self,
                provider_user_id: id_string(raw),
                email: string_field(raw, "email"),
                full_name: string_field(raw, "name"),
                avatar_url: string_field(raw, "picture"),
            },
            Provider::Facebook => NormalizedIdentity {
                provider: *self,
                provider_user_id: id_string(raw),
                email: string_field(raw, "email"),
                full_name: string_field(raw, "name"),
                avatar_url: raw
                    .pointer("/picture/data/url")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            },
            Provider::Strava => {
                // Strava never grants email with these scopes.
                let first = raw.get("firstname").and_then(Value::as_str).unwrap_or("");
                let last = raw.get("lastname").and_then(Value::as_str).unwrap_or("");
                let full_name = format!("{} {}", first, last).trim().to_string();

                NormalizedIdentity {
                    provider: *self,
                    provider_user_id: id_string(raw),
                    email: None,
                    full_name: Some(full_name).filter(|n| !n.is_empty()),
                    avatar_url: string_field(raw, "profile"),
                }
            }
            Provider::Microsoft => NormalizedIdentity {
                provider: *self,
                provider_user_id: id_string(raw),
                email: string_field(raw, "mail")
                    .or_else(|| string_field(raw, "userPrincipalName")),
                full_name: string_field(raw, "displayName"),
                avatar_url: None,
            },
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Provider::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| AppError::UnsupportedProvider(s.to_string()))
    }
}

/// Provider ids are strings for Google/Facebook/Microsoft and numbers for Strava.
fn id_string(raw: &Value) -> Option<String> {
    match raw.get("id") {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn string_field(raw: &Value, key: &str) -> Option<String> {
    raw.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Endpoint URLs and scopes for one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub profile_url: String,
    pub scopes: Vec<String>,
    /// Directory API reachable with an app-only token (Microsoft only)
    pub graph: Option<GraphEndpoints>,
}

/// Microsoft Graph base URL and the scopes of the client-credentials grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphEndpoints {
    pub base_url: String,
    pub app_scopes: Vec<String>,
}

/// Immutable configuration for one enabled provider.
#[derive(Debug, Clone)]
pub struct OAuthProviderConfig {
    pub provider: Provider,
    pub client_id: String,
    pub client_secret: String,
    pub endpoints: ProviderEndpoints,
}

/// A provider's configuration together with its callback URL.
#[derive(Debug, Clone)]
pub struct RegisteredProvider {
    pub config: OAuthProviderConfig,
    pub redirect_uri: String,
}

impl RegisteredProvider {
    pub fn provider(&self) -> Provider {
        self.config.provider
    }
}

/// Lookup of enabled providers, built once from [`crate::config::Config`].
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<Provider, RegisteredProvider>,
}

impl ProviderRegistry {
    /// Register every provider in `configs`.
    ///
    /// `callback_base` is the public origin plus base path; each provider's
    /// redirect URI is `{callback_base}/auth/{provider}/callback`.
    pub fn new(configs: &[OAuthProviderConfig], callback_base: &str) -> Self {
        let callback_base = callback_base.trim_end_matches('/');
        let providers = configs
            .iter()
            .map(|cfg| {
                let redirect_uri =
                    format!("{}/auth/{}/callback", callback_base, cfg.provider.as_str());
                (
                    cfg.provider,
                    RegisteredProvider {
                        config: cfg.clone(),
                        redirect_uri,
                    },
                )
            })
            .collect();

        Self { providers }
    }

    /// Resolve a provider by name.
    pub fn get(&self, name: &str) -> Result<&RegisteredProvider, AppError> {
        let provider: Provider = name.parse()?;
        self.resolve(provider)
    }

    /// Resolve an already-parsed provider; disabled providers are unsupported.
    pub fn resolve(&self, provider: Provider) -> Result<&RegisteredProvider, AppError> {
        self.providers
            .get(&provider)
            .ok_or_else(|| AppError::UnsupportedProvider(provider.as_str().to_string()))
    }

    /// Enabled providers in a stable order.
    pub fn enabled(&self) -> Vec<Provider> {
        Provider::ALL
            .into_iter()
            .filter(|p| self.providers.contains_key(p))
            .collect()
    }
}
