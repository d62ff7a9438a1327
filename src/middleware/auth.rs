// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bearer token authentication middleware.

use crate::error::AppError;
use crate::models::User;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    typed_header::TypedHeaderRejection,
    TypedHeader,
};
use std::sync::Arc;

/// Authenticated user loaded from the bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
}

/// Middleware that requires a valid bearer token for an active user.
///
/// - no `Authorization` header: 401 `Unauthorized`
/// - malformed header, bad signature, expired token, unknown user: 401
///   `InvalidCredentials`
/// - inactive user: 400 `InactiveAccount`
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(Authorization(bearer)) = bearer.map_err(|rejection| {
        if rejection.is_missing() {
            AppError::Unauthorized
        } else {
            AppError::InvalidCredentials
        }
    })?;

    let user_id = state.token_codec.verify_token(bearer.token())?;

    let user = state.db.get_user(&user_id).await?.ok_or_else(|| {
        tracing::debug!(user_id = %user_id, "Bearer token for unknown user");
        AppError::InvalidCredentials
    })?;

    if !user.is_active {
        return Err(AppError::InactiveAccount);
    }

    request.extensions_mut().insert(AuthUser { user });
    Ok(next.run(request).await)
}
