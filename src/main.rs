// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Auth-Gateway API Server
//!
//! Email/password and OAuth2 login in front of a single local user store.

use auth_gateway::{config::Config, db::AuthDb, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        base_path = %config.base_path,
        standard = config.standard_auth_enabled,
        providers = ?config.providers.iter().map(|p| p.provider.as_str()).collect::<Vec<_>>(),
        "Starting Auth-Gateway API"
    );

    // Open credential store (creates tables on first run)
    let db = AuthDb::connect(&config.database_url).await?;

    // Build shared state
    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::new(config, db)?);

    // Build router
    let app = auth_gateway::routes::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("auth_gateway=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .try_init()?;
    Ok(())
}
