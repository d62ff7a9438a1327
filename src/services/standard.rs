// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Email/password registration and login.

use crate::db::{queries, AuthDb};
use crate::error::{is_unique_violation, AppError};
use crate::models::{PasswordCredential, User};
use crate::services::password;
use chrono::Utc;

/// Fields accepted at registration.
#[derive(Debug, Clone)]
pub struct NewStandardUser {
    pub email: String,
    pub password: String,
    pub username: Option<String>,
    pub full_name: Option<String>,
}

/// Create an unverified user with a password credential.
///
/// Fails with [`AppError::DuplicateEmail`] if any user (standard or
/// federated) already owns the email, including a concurrent registration
/// that commits first.
pub async fn register(db: &AuthDb, new_user: NewStandardUser) -> Result<User, AppError> {
    // Hash before opening the transaction; it is the slow part.
    let password_hash = password::hash_password_async(new_user.password).await?;

    let mut user = User::new(new_user.email, false);
    user.username = new_user.username;
    user.full_name = new_user.full_name;

    let now = Utc::now();
    let credential = PasswordCredential {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user.id.clone(),
        password_hash,
        created_at: now,
        updated_at: now,
    };

    let mut tx = db.begin().await?;

    if queries::find_user_by_email(&mut tx, &user.email)
        .await?
        .is_some()
    {
        return Err(AppError::DuplicateEmail);
    }

    queries::insert_user(&mut tx, &user).await.map_err(|e| {
        if is_unique_violation(&e) {
            AppError::DuplicateEmail
        } else {
            AppError::from(e)
        }
    })?;
    queries::insert_password(&mut tx, &credential).await?;
    tx.commit().await?;

    tracing::info!(user_id = %user.id, "Standard user registered");
    Ok(user)
}

/// Check email/password and return the user.
///
/// Unknown email, missing password credential and wrong password are all
/// [`AppError::InvalidCredentials`]. The active check happens only after
/// the password matched. A miss still runs one Argon2 verification so that
/// response time does not reveal whether the email is registered.
pub async fn authenticate(db: &AuthDb, email: &str, password: &str) -> Result<User, AppError> {
    let mut tx = db.begin().await?;
    let user = queries::find_user_by_email(&mut tx, email).await?;
    let credential = match &user {
        Some(user) => queries::find_password_for_user(&mut tx, &user.id).await?,
        None => None,
    };
    // Read-only; release the connection before hashing.
    tx.rollback().await?;

    let (Some(user), Some(credential)) = (user, credential) else {
        // Burn the same Argon2 work as a real check.
        if let Some(dummy) = password::dummy_hash() {
            password::verify_password_async(password.to_string(), dummy.to_string()).await?;
        }
        return Err(AppError::InvalidCredentials);
    };

    if !password::verify_password_async(password.to_string(), credential.password_hash).await? {
        tracing::info!(user_id = %user.id, "Password mismatch");
        return Err(AppError::InvalidCredentials);
    }

    if !user.is_active {
        return Err(AppError::InactiveAccount);
    }

    Ok(user)
}
