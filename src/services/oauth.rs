// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth2 authorization-code client.
//!
//! Handles:
//! - Authorize URL construction
//! - Code-for-token exchange
//! - Profile fetch with the provider access token
//! - App-only (client credentials) tokens and directory reads for providers
//!   that expose a Graph API
//!
//! Nothing here retries: authorization codes are single-use, so any failure
//! ends the login attempt and the user restarts the flow.

use crate::error::AppError;
use crate::models::ProviderToken;
use crate::services::providers::{GraphEndpoints, RegisteredProvider};
use serde_json::Value;
use std::time::Duration;

/// OAuth2 client shared by all providers.
#[derive(Clone)]
pub struct OAuthClient {
    http: reqwest::Client,
}

impl OAuthClient {
    /// Create a client whose every request is bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("failed building OAuth HTTP client: {}", e)))?;
        Ok(Self { http })
    }

    /// Build the provider's authorize URL for this login attempt.
    pub fn authorize_url(&self, provider: &RegisteredProvider, state: &str) -> String {
        let cfg = &provider.config;
        let separator = if cfg.endpoints.authorize_url.contains('?') {
            '&'
        } else {
            '?'
        };

        format!(
            "{}{}response_type=code&client_id={}&redirect_uri={}&scope={}&state={}",
            cfg.endpoints.authorize_url,
            separator,
            urlencoding::encode(&cfg.client_id),
            urlencoding::encode(&provider.redirect_uri),
            urlencoding::encode(&cfg.endpoints.scopes.join(" ")),
            urlencoding::encode(state),
        )
    }

    /// Exchange an authorization code for provider tokens.
    pub async fn exchange_code(
        &self,
        provider: &RegisteredProvider,
        code: &str,
    ) -> Result<ProviderToken, AppError> {
        let cfg = &provider.config;

        let response = self
            .http
            .post(&cfg.endpoints.token_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", provider.redirect_uri.as_str()),
                ("client_id", cfg.client_id.as_str()),
                ("client_secret", cfg.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| transport_error(provider, "token exchange", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                provider = %cfg.provider,
                status = %status,
                body = %body,
                "Token exchange rejected"
            );
            return Err(AppError::TokenExchange(format!("HTTP {}: {}", status, body)));
        }

        let token: ProviderToken = response.json().await.map_err(|e| {
            AppError::TokenExchange(format!("Failed to obtain access token: {}", e))
        })?;

        if token.access_token.is_empty() {
            return Err(AppError::TokenExchange(
                "Failed to obtain access token".to_string(),
            ));
        }

        Ok(token)
    }

    /// Fetch the raw profile payload with the provider access token.
    pub async fn fetch_profile(
        &self,
        provider: &RegisteredProvider,
        access_token: &str,
    ) -> Result<Value, AppError> {
        let cfg = &provider.config;

        let response = self
            .http
            .get(&cfg.endpoints.profile_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| transport_error(provider, "profile fetch", e))?;

        if response.status() != reqwest::StatusCode::OK {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ProfileFetch(format!(
                "Failed to get user info: HTTP {}: {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::ProfileFetch(format!("JSON parse error: {}", e)))
    }

    /// Obtain an app-only token via the client credentials grant.
    pub async fn client_credentials_token(
        &self,
        provider: &RegisteredProvider,
    ) -> Result<ProviderToken, AppError> {
        let cfg = &provider.config;
        let graph = graph_endpoints(provider)?;
        let scope = graph.app_scopes.join(" ");

        let response = self
            .http
            .post(&cfg.endpoints.token_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", cfg.client_id.as_str()),
                ("client_secret", cfg.client_secret.as_str()),
                ("scope", scope.as_str()),
            ])
            .send()
            .await
            .map_err(|e| transport_error(provider, "app token", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                provider = %cfg.provider,
                status = %status,
                body = %body,
                "App token request rejected"
            );
            return Err(AppError::TokenExchange(format!(
                "Failed to obtain application token: HTTP {}",
                status
            )));
        }

        let token: ProviderToken = response.json().await.map_err(|e| {
            AppError::TokenExchange(format!("Failed to obtain application token: {}", e))
        })?;

        if token.access_token.is_empty() {
            return Err(AppError::TokenExchange(
                "Failed to obtain application token".to_string(),
            ));
        }

        Ok(token)
    }

    /// GET `path` under the provider's Graph base URL, restricted to the
    /// `select` properties.
    ///
    /// A 404 from Graph is [`AppError::NotFound`]; any other non-200 is a
    /// provider error.
    pub async fn graph_get(
        &self,
        provider: &RegisteredProvider,
        app_token: &str,
        path: &str,
        select: &str,
    ) -> Result<Value, AppError> {
        let graph = graph_endpoints(provider)?;
        let url = format!(
            "{}/{}",
            graph.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );

        let response = self
            .http
            .get(&url)
            .bearer_auth(app_token)
            .query(&[("$select", select)])
            .send()
            .await
            .map_err(|e| transport_error(provider, "graph request", e))?;

        match response.status() {
            reqwest::StatusCode::OK => response
                .json()
                .await
                .map_err(|e| AppError::ProfileFetch(format!("Graph JSON parse error: {}", e))),
            reqwest::StatusCode::NOT_FOUND => Err(AppError::NotFound(path.to_string())),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(AppError::ProfileFetch(format!(
                    "Graph request {} failed: HTTP {}: {}",
                    path, status, body
                )))
            }
        }
    }
}

fn graph_endpoints(provider: &RegisteredProvider) -> Result<&GraphEndpoints, AppError> {
    provider
        .config
        .endpoints
        .graph
        .as_ref()
        .ok_or_else(|| AppError::UnsupportedProvider(provider.provider().as_str().to_string()))
}

/// Failures before any HTTP status was received.
fn transport_error(provider: &RegisteredProvider, step: &str, err: reqwest::Error) -> AppError {
    let kind = if err.is_timeout() { "timed out" } else { "failed" };
    tracing::warn!(
        provider = %provider.provider(),
        step,
        error = %err,
        "OAuth provider request {}",
        kind
    );
    AppError::ProviderUnavailable(format!("{} {}: {}", step, kind, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::{OAuthProviderConfig, Provider, ProviderRegistry};

    fn registered(provider: Provider) -> RegisteredProvider {
        let cfg = OAuthProviderConfig {
            provider,
            client_id: "client id".into(),
            client_secret: "secret".into(),
            endpoints: provider.default_endpoints("common"),
        };
        ProviderRegistry::new(&[cfg], "http://localhost:8000/api")
            .resolve(provider)
            .unwrap()
            .clone()
    }

    #[test]
    fn test_authorize_url_google() {
        let client = OAuthClient::new(Duration::from_secs(1)).unwrap();
        let url = client.authorize_url(&registered(Provider::Google), "abc123");

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("client_id=client%20id"));
        assert!(url.contains(
            "redirect_uri=http%3A%2F%2Flocalhost%3A8000%2Fapi%2Fauth%2Fgoogle%2Fcallback"
        ));
        assert!(url.contains("scope=openid%20email%20profile"));
        assert!(url.ends_with("state=abc123"));
    }

    #[test]
    fn test_authorize_url_keeps_existing_query() {
        let client = OAuthClient::new(Duration::from_secs(1)).unwrap();
        let mut provider = registered(Provider::Strava);
        provider.config.endpoints.authorize_url = "https://idp.test/authorize?prompt=consent".into();

        let url = client.authorize_url(&provider, "s");
        assert!(url.starts_with("https://idp.test/authorize?prompt=consent&response_type=code"));
    }

    #[tokio::test]
    async fn test_app_token_needs_graph_endpoints() {
        let client = OAuthClient::new(Duration::from_millis(500)).unwrap();
        let err = client
            .client_credentials_token(&registered(Provider::Google))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnsupportedProvider(_)));
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_unavailable() {
        let client = OAuthClient::new(Duration::from_millis(500)).unwrap();
        let mut provider = registered(Provider::Google);
        // Port 9 (discard) on localhost is closed in test environments.
        provider.config.endpoints.token_url = "http://127.0.0.1:9/token".into();

        let err = client.exchange_code(&provider, "code").await.unwrap_err();
        assert!(matches!(err, AppError::ProviderUnavailable(_)));
    }
}
