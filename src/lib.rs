// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Auth-Gateway: multi-provider authentication backend
//!
//! This crate provides email/password and OAuth2 (Google, Facebook, Strava,
//! Microsoft) login, reconciles every external identity onto one local user
//! record, and issues signed bearer tokens.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::AuthDb;
use error::AppError;
use services::{IdentityReconciler, OAuthClient, ProviderRegistry, SessionIssuer, TokenCodec};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: AuthDb,
    pub providers: ProviderRegistry,
    pub oauth_client: OAuthClient,
    pub token_codec: TokenCodec,
    pub sessions: SessionIssuer,
    pub reconciler: IdentityReconciler,
    /// Source of OAuth state nonces
    pub rng: ring::rand::SystemRandom,
}

impl AppState {
    /// Wire every service from `config` around an already-open store.
    pub fn new(config: Config, db: AuthDb) -> Result<Self, AppError> {
        let providers = ProviderRegistry::new(&config.providers, &config.callback_base());
        let oauth_client = OAuthClient::new(config.oauth_http_timeout)?;
        let token_codec = TokenCodec::new(&config.jwt_signing_key, config.access_token_ttl);
        let sessions = SessionIssuer::new(db.clone(), token_codec.clone());
        let reconciler = IdentityReconciler::new(db.clone());

        Ok(Self {
            config,
            db,
            providers,
            oauth_client,
            token_codec,
            sessions,
            reconciler,
            rng: ring::rand::SystemRandom::new(),
        })
    }
}
