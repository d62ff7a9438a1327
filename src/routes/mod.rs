// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod graph;
pub mod oauth;
pub mod standard;

use crate::models::UserResponse;
use crate::services::sessions::IssuedSession;
use crate::services::Provider;
use crate::AppState;
use axum::http::{header, Method};
use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "frontend/src/lib/generated/")
)]
pub struct HealthResponse {
    pub status: String,
    pub build_id: String,
}

/// Successful login/registration response.
#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "frontend/src/lib/generated/")
)]
pub struct TokenResponse {
    pub access_token: String,
    /// Always "bearer"
    pub token_type: String,
    pub user: UserResponse,
}

impl TokenResponse {
    pub fn new(issued: IssuedSession, user: UserResponse) -> Self {
        Self {
            access_token: issued.access_token,
            token_type: "bearer".to_string(),
            user,
        }
    }
}

/// Login methods currently mounted.
#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "frontend/src/lib/generated/")
)]
pub struct ProvidersResponse {
    /// Email/password login available
    pub standard: bool,
    /// Enabled OAuth provider names
    pub oauth: Vec<String>,
}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Json(HealthResponse {
        status: "ok".to_string(),
        build_id,
    })
}

async fn list_providers(State(state): State<Arc<AppState>>) -> Json<ProvidersResponse> {
    Json(ProvidersResponse {
        standard: state.config.standard_auth_enabled,
        oauth: state
            .providers
            .enabled()
            .into_iter()
            .map(|p| p.as_str().to_string())
            .collect(),
    })
}

/// Exact frontend origin, or plain-HTTP localhost on any port (dev).
///
/// Hosts are compared after parsing, so `http://localhost.evil.example`
/// does not pass as localhost.
fn is_allowed_origin(origin: &str, frontend_url: &str) -> bool {
    if origin == frontend_url.trim_end_matches('/') {
        return true;
    }
    let Ok(url) = reqwest::Url::parse(origin) else {
        return false;
    };
    url.scheme() == "http"
        && matches!(url.host_str(), Some("localhost") | Some("127.0.0.1"))
        && url.username().is_empty()
        && url.password().is_none()
        && url.path() == "/"
        && url.query().is_none()
}

/// Build the complete router with all routes.
///
/// Login methods are mounted only when enabled in the config, so a disabled
/// provider is simply a 404.
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS layer - allow requests from frontend URL and localhost (for dev)
    let frontend_url = state.config.frontend_url.clone();
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::predicate(
            move |origin: &axum::http::HeaderValue, _request_parts: &axum::http::request::Parts| {
                origin
                    .to_str()
                    .map(|o| is_allowed_origin(o, &frontend_url))
                    .unwrap_or(false)
            },
        ))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    let mut api = Router::new()
        .route("/health", get(health_check))
        .route("/auth/providers", get(list_providers));

    for provider in state.providers.enabled() {
        let mut routes = oauth::routes(provider);
        if provider == Provider::Microsoft {
            routes = routes.merge(graph::routes(state.clone()));
        }
        api = api.nest(&format!("/auth/{}", provider.as_str()), routes);
    }

    if state.config.standard_auth_enabled {
        api = api.nest("/auth/standard", standard::routes(state.clone()));
    }

    let app = if state.config.base_path.is_empty() {
        api
    } else {
        Router::new().nest(&state.config.base_path, api)
    };

    app.layer(axum::middleware::from_fn(
        crate::middleware::security::add_security_headers,
    ))
    .layer(cors)
    .layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    )
    .with_state(state)
}
