// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Microsoft Graph directory routes, merged into the Microsoft sub-router.
//!
//! All three require a gateway bearer token. Graph itself is called with an
//! app-only token obtained through the client credentials grant.

use axum::{
    extract::{Path, State},
    middleware,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::Result;
use crate::middleware::auth::require_auth;
use crate::services::providers::{Provider, RegisteredProvider};
use crate::AppState;

const GROUP_FIELDS: &str = "id,displayName,description";
const MEMBER_FIELDS: &str = "id,displayName,mail,userPrincipalName";

/// Routes to be merged at `/auth/microsoft`.
pub fn routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/app-token", get(app_token))
        .route("/groups", get(groups))
        .route("/groups/{group_id}/members", get(group_members))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "frontend/src/lib/generated/")
)]
pub struct AppTokenResponse {
    pub access_token: String,
    /// Always "bearer"
    pub token_type: String,
    pub expires_in: Option<i64>,
}

fn microsoft(state: &AppState) -> Result<&RegisteredProvider> {
    state.providers.resolve(Provider::Microsoft)
}

async fn app_token(State(state): State<Arc<AppState>>) -> Result<Json<AppTokenResponse>> {
    let token = state
        .oauth_client
        .client_credentials_token(microsoft(&state)?)
        .await?;

    Ok(Json(AppTokenResponse {
        access_token: token.access_token,
        token_type: "bearer".to_string(),
        expires_in: token.expires_in,
    }))
}

async fn groups(State(state): State<Arc<AppState>>) -> Result<Json<Value>> {
    let provider = microsoft(&state)?;
    let token = state.oauth_client.client_credentials_token(provider).await?;
    let body = state
        .oauth_client
        .graph_get(provider, &token.access_token, "groups", GROUP_FIELDS)
        .await?;
    Ok(Json(body))
}

async fn group_members(
    State(state): State<Arc<AppState>>,
    Path(group_id): Path<String>,
) -> Result<Json<Value>> {
    let provider = microsoft(&state)?;
    let token = state.oauth_client.client_credentials_token(provider).await?;
    let path = format!("groups/{}/members", urlencoding::encode(&group_id));

    tracing::debug!(group_id = %group_id, "Listing group members");

    let body = state
        .oauth_client
        .graph_get(provider, &token.access_token, &path, MEMBER_FIELDS)
        .await?;
    Ok(Json(body))
}
