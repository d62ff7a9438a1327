// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Email/password authentication routes.

use axum::{extract::State, middleware, routing::get, routing::post, Extension, Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::{require_auth, AuthUser};
use crate::models::UserResponse;
use crate::routes::TokenResponse;
use crate::services::standard::{self, NewStandardUser};
use crate::AppState;

/// Routes to be nested at `/auth/standard`.
pub fn routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let protected = Router::new()
        .route("/me", get(me))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .merge(protected)
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
    pub username: Option<String>,
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<TokenResponse>> {
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let user = standard::register(
        &state.db,
        NewStandardUser {
            email: body.email,
            password: body.password,
            username: body.username,
            full_name: body.full_name,
        },
    )
    .await?;

    let issued = state.sessions.issue(&user).await?;
    Ok(Json(TokenResponse::new(issued, UserResponse::from(&user))))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<TokenResponse>> {
    let user = standard::authenticate(&state.db, &body.email, &body.password).await?;
    let issued = state.sessions.issue(&user).await?;

    tracing::info!(user_id = %user.id, "Standard login");
    Ok(Json(TokenResponse::new(issued, UserResponse::from(&user))))
}

/// Current user profile.
async fn me(Extension(auth): Extension<AuthUser>) -> Json<UserResponse> {
    Json(UserResponse::from(&auth.user))
}
