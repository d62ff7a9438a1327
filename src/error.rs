// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not authenticated")]
    Unauthorized,

    /// Bad password or bad/expired bearer token. Callers cannot tell which.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Inactive user")]
    InactiveAccount,

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Unsupported OAuth provider: {0}")]
    UnsupportedProvider(String),

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    #[error("Profile fetch failed: {0}")]
    ProfileFetch(String),

    #[error("OAuth provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Any failure inside an OAuth callback. The cause is logged, not returned.
    #[error("OAuth authentication failed: {0}")]
    OAuthAuthenticationFailed(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Client-facing detail for the generic OAuth failure response.
    pub const OAUTH_FAILED_DETAIL: &'static str = "OAuth authentication failed";

    /// True for failures caused by the upstream OAuth provider.
    pub fn is_provider_error(&self) -> bool {
        matches!(
            self,
            AppError::TokenExchange(_) | AppError::ProfileFetch(_) | AppError::ProviderUnavailable(_)
        )
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

/// Whether a store error was a UNIQUE constraint rejection.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, detail) = match &self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                Some(self.to_string()),
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                Some(self.to_string()),
            ),
            AppError::InactiveAccount => (
                StatusCode::BAD_REQUEST,
                "inactive_account",
                Some(self.to_string()),
            ),
            AppError::DuplicateEmail => (
                StatusCode::BAD_REQUEST,
                "duplicate_email",
                Some(self.to_string()),
            ),
            AppError::UnsupportedProvider(_) => (
                StatusCode::BAD_REQUEST,
                "unsupported_provider",
                Some(self.to_string()),
            ),
            AppError::TokenExchange(msg)
            | AppError::ProfileFetch(msg)
            | AppError::ProviderUnavailable(msg) => {
                tracing::warn!(error = %msg, "OAuth provider error");
                (
                    StatusCode::BAD_GATEWAY,
                    "provider_error",
                    Some(Self::OAUTH_FAILED_DETAIL.to_string()),
                )
            }
            AppError::OAuthAuthenticationFailed(cause) => {
                tracing::warn!(error = %cause, "OAuth authentication failed");
                (
                    StatusCode::BAD_REQUEST,
                    "oauth_failed",
                    Some(Self::OAUTH_FAILED_DETAIL.to_string()),
                )
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            detail,
        };

        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
