// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth2 login routes, one sub-router per enabled provider.
//!
//! Every failure inside the callback is reported to the client as the same
//! generic 400; the cause is only logged.

use axum::{
    extract::{Query, State},
    routing::get,
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::models::UserResponse;
use crate::routes::TokenResponse;
use crate::services::oauth_state::{issue_state, verify_state, StateError};
use crate::services::providers::Provider;
use crate::AppState;

/// Routes for `provider`, to be nested at `/auth/{provider}`.
pub fn routes(provider: Provider) -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
        .layer(Extension(provider))
}

/// Authorization redirect target handed to the frontend.
#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "frontend/src/lib/generated/")
)]
pub struct LoginResponse {
    pub auth_url: String,
    pub state: String,
}

/// Query parameters the provider appends to the callback URL.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set instead of `code` when the user denied consent
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Start a login: mint a signed state and build the authorize URL.
async fn login(
    State(state): State<Arc<AppState>>,
    Extension(provider): Extension<Provider>,
) -> Result<Json<LoginResponse>> {
    let registered = state.providers.resolve(provider)?;

    let oauth_state = issue_state(
        provider,
        &state.config.oauth_state_key,
        &state.rng,
        Utc::now().timestamp(),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to issue OAuth state: {}", e)))?;

    let auth_url = state.oauth_client.authorize_url(registered, &oauth_state);

    tracing::info!(provider = %provider, "Starting OAuth flow");

    Ok(Json(LoginResponse {
        auth_url,
        state: oauth_state,
    }))
}

/// Finish a login: exchange the code, fetch the profile, reconcile the
/// identity and issue a session.
async fn callback(
    State(state): State<Arc<AppState>>,
    Extension(provider): Extension<Provider>,
    Query(params): Query<CallbackParams>,
) -> Result<Json<TokenResponse>> {
    let response = complete_login(&state, provider, params)
        .await
        .map_err(|e| callback_failure(provider, e))?;
    Ok(Json(response))
}

/// Collapse any callback error into the generic OAuth failure, logging
/// local faults loudly since the client never sees them.
fn callback_failure(provider: Provider, err: AppError) -> AppError {
    match err {
        e @ AppError::OAuthAuthenticationFailed(_) => e,
        e if e.is_provider_error() => {
            AppError::OAuthAuthenticationFailed(format!("provider: {}", e))
        }
        e @ (AppError::InactiveAccount | AppError::UnsupportedProvider(_)) => {
            AppError::OAuthAuthenticationFailed(e.to_string())
        }
        other => {
            tracing::error!(provider = %provider, error = %other, "OAuth callback failed locally");
            AppError::OAuthAuthenticationFailed(format!("local: {}", other))
        }
    }
}

async fn complete_login(
    state: &AppState,
    provider: Provider,
    params: CallbackParams,
) -> Result<TokenResponse> {
    if let Some(error) = params.error {
        return Err(AppError::OAuthAuthenticationFailed(format!(
            "provider returned error: {} {}",
            error,
            params.error_description.unwrap_or_default()
        )));
    }

    if state.config.enforce_oauth_state {
        let received = params.state.as_deref().ok_or(StateError::Missing);
        received
            .and_then(|s| {
                verify_state(
                    s,
                    provider,
                    &state.config.oauth_state_key,
                    Utc::now().timestamp(),
                )
            })
            .map_err(|e| AppError::OAuthAuthenticationFailed(format!("invalid state: {}", e)))?;
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::OAuthAuthenticationFailed("missing code".to_string()))?;

    let registered = state.providers.resolve(provider)?;
    let token = state.oauth_client.exchange_code(registered, &code).await?;
    let profile = state
        .oauth_client
        .fetch_profile(registered, &token.access_token)
        .await?;
    let identity = provider.normalize(&profile);

    let reconciliation = state.reconciler.reconcile(&identity, &token).await?;
    let user = reconciliation.user;

    if !user.is_active {
        return Err(AppError::InactiveAccount);
    }

    let issued = state.sessions.issue(&user).await?;

    tracing::info!(
        provider = %provider,
        user_id = %user.id,
        "OAuth login complete"
    );

    Ok(TokenResponse::new(issued, UserResponse::from(&user)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cause(err: AppError) -> String {
        match err {
            AppError::OAuthAuthenticationFailed(cause) => cause,
            other => panic!("expected OAuthAuthenticationFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_callback_failure_classifies_cause() {
        let p = Provider::Google;
        assert_eq!(
            cause(callback_failure(p, AppError::OAuthAuthenticationFailed("missing code".into()))),
            "missing code"
        );
        assert!(cause(callback_failure(p, AppError::TokenExchange("HTTP 400".into())))
            .starts_with("provider: "));
        assert!(cause(callback_failure(p, AppError::ProviderUnavailable("timed out".into())))
            .starts_with("provider: "));
        assert!(cause(callback_failure(p, AppError::Database("locked".into())))
            .starts_with("local: "));
        assert_eq!(
            cause(callback_failure(p, AppError::InactiveAccount)),
            "Inactive user"
        );
    }
}
