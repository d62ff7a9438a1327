// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod oauth;
pub mod oauth_state;
pub mod password;
pub mod providers;
pub mod reconcile;
pub mod sessions;
pub mod standard;
pub mod tokens;

pub use oauth::OAuthClient;
pub use providers::{OAuthProviderConfig, Provider, ProviderEndpoints, ProviderRegistry};
pub use reconcile::{IdentityReconciler, ReconcileOutcome, Reconciliation};
pub use sessions::{IssuedSession, SessionIssuer};
pub use tokens::TokenCodec;
