// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity reconciliation: map a federated identity onto a local user.
//!
//! Decision order inside one transaction:
//! 1. Known `(provider, provider_user_id)` → refresh tokens, reuse its user.
//! 2. Otherwise match a user by email (real or synthesized) → link.
//! 3. Otherwise create a verified user → link.
//!
//! The account lookup must come first; matching by email first would let
//! one provider identity end up owning two users.

use crate::db::{queries, AuthDb};
use crate::error::{is_unique_violation, AppError};
use crate::models::{AuthSource, LinkedProviderAccount, NormalizedIdentity, ProviderToken, User};
use crate::services::providers::Provider;
use chrono::{DateTime, Duration, Utc};
use sqlx::SqliteConnection;

/// How a federated login was matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Returning login; only the stored provider tokens changed.
    Refreshed,
    /// First login via this provider for an existing user (email match).
    Linked,
    /// Brand-new user.
    Created,
}

impl ReconcileOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileOutcome::Refreshed => "refreshed",
            ReconcileOutcome::Linked => "linked",
            ReconcileOutcome::Created => "created",
        }
    }
}

/// Result of a successful reconciliation.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub user: User,
    pub outcome: ReconcileOutcome,
}

/// Placeholder email for providers that never share one.
///
/// Deterministic per identity so a returning user maps to the same row.
pub fn synthesized_email(provider: Provider, provider_user_id: &str) -> String {
    format!(
        "{p}_{id}@{p}.local",
        p = provider.as_str(),
        id = provider_user_id
    )
}

/// Runs reconciliation against the credential store.
#[derive(Clone)]
pub struct IdentityReconciler {
    db: AuthDb,
}

impl IdentityReconciler {
    pub fn new(db: AuthDb) -> Self {
        Self { db }
    }

    /// Match `identity` to a local user, creating or linking as needed.
    ///
    /// All writes commit together. On any failure the transaction is
    /// dropped (rolled back) and the cause is wrapped in
    /// [`AppError::OAuthAuthenticationFailed`].
    pub async fn reconcile(
        &self,
        identity: &NormalizedIdentity,
        token: &ProviderToken,
    ) -> Result<Reconciliation, AppError> {
        let reconciliation = self
            .reconcile_in_transaction(identity, token)
            .await
            .map_err(|e| match e {
                e @ AppError::OAuthAuthenticationFailed(_) => e,
                other => AppError::OAuthAuthenticationFailed(other.to_string()),
            })?;

        tracing::info!(
            provider = %identity.provider,
            user_id = %reconciliation.user.id,
            outcome = reconciliation.outcome.as_str(),
            "Federated identity reconciled"
        );
        Ok(reconciliation)
    }

    async fn reconcile_in_transaction(
        &self,
        identity: &NormalizedIdentity,
        token: &ProviderToken,
    ) -> Result<Reconciliation, AppError> {
        let provider_user_id = identity
            .provider_user_id
            .as_deref()
            .ok_or_else(|| {
                AppError::OAuthAuthenticationFailed(
                    "provider profile has no user id".to_string(),
                )
            })?;
        let provider = AuthSource::from(identity.provider);
        let expires_at = token_expiry(token, Utc::now());

        let mut tx = self.db.begin().await?;

        // 1. Returning federated login
        if let Some(account) =
            queries::find_account(&mut tx, provider.as_str(), provider_user_id).await?
        {
            queries::update_account_tokens(
                &mut tx,
                &account.id,
                &token.access_token,
                token.refresh_token.as_deref(),
                expires_at,
            )
            .await?;

            let user = queries::find_user_by_id(&mut tx, &account.user_id)
                .await?
                .ok_or_else(|| {
                    AppError::Database(format!("Account {} has no owning user", account.id))
                })?;

            tx.commit().await?;
            return Ok(Reconciliation {
                user,
                outcome: ReconcileOutcome::Refreshed,
            });
        }

        // 2./3. First login via this provider: link or create
        let email = identity
            .email
            .clone()
            .unwrap_or_else(|| synthesized_email(identity.provider, provider_user_id));

        let (user, outcome) = match queries::find_user_by_email(&mut tx, &email).await? {
            Some(existing) => (existing, ReconcileOutcome::Linked),
            None => (
                create_federated_user(&mut tx, identity, email).await?,
                ReconcileOutcome::Created,
            ),
        };

        let now = Utc::now();
        let account = LinkedProviderAccount {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            provider: provider.as_str().to_string(),
            provider_user_id: provider_user_id.to_string(),
            provider_email: identity.email.clone(),
            access_token: Some(token.access_token.clone()),
            refresh_token: token.refresh_token.clone(),
            expires_at,
            created_at: now,
            updated_at: now,
        };
        queries::insert_account(&mut tx, &account)
            .await
            .map_err(|e| conflict_or_db(e, "linked account"))?;

        tx.commit().await?;
        Ok(Reconciliation { user, outcome })
    }
}

async fn create_federated_user(
    conn: &mut SqliteConnection,
    identity: &NormalizedIdentity,
    email: String,
) -> Result<User, AppError> {
    // The provider vouched for this identity.
    let mut user = User::new(email, true);
    user.full_name = identity.full_name.clone();
    user.avatar_url = identity.avatar_url.clone();

    queries::insert_user(conn, &user)
        .await
        .map_err(|e| conflict_or_db(e, "user email"))?;
    Ok(user)
}

/// A concurrent callback won the race for a unique key.
fn conflict_or_db(err: sqlx::Error, what: &str) -> AppError {
    if is_unique_violation(&err) {
        AppError::OAuthAuthenticationFailed(format!("concurrent login created this {}", what))
    } else {
        AppError::from(err)
    }
}

/// Absolute expiry of the provider access token.
///
/// Non-positive or unrepresentable lifetimes mean "unknown".
fn token_expiry(token: &ProviderToken, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    token
        .expires_in
        .filter(|secs| *secs > 0)
        .and_then(Duration::try_seconds)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
}
