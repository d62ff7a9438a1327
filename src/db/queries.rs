// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Typed queries against the credential store.
//!
//! Every function takes a bare connection so callers decide the transaction
//! scope: pass `&mut *tx` inside a transaction, or a pooled connection
//! for one-off reads.

use crate::db::tables;
use crate::models::{LinkedProviderAccount, PasswordCredential, Session, User};
use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

// ─── Schema ──────────────────────────────────────────────────

pub async fn create_tables(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {users} (
            id TEXT PRIMARY KEY NOT NULL,
            email TEXT NOT NULL UNIQUE,
            username TEXT,
            full_name TEXT,
            avatar_url TEXT,
            is_active BOOLEAN NOT NULL DEFAULT true,
            is_verified BOOLEAN NOT NULL DEFAULT false,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
        )
        "#,
        users = tables::USERS
    ))
    .execute(&mut *conn)
    .await?;

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {passwords} (
            id TEXT PRIMARY KEY NOT NULL,
            user_id TEXT NOT NULL UNIQUE REFERENCES {users}(id) ON DELETE CASCADE,
            password_hash TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
        )
        "#,
        passwords = tables::USER_PASSWORDS,
        users = tables::USERS
    ))
    .execute(&mut *conn)
    .await?;

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {accounts} (
            id TEXT PRIMARY KEY NOT NULL,
            user_id TEXT NOT NULL REFERENCES {users}(id) ON DELETE CASCADE,
            provider TEXT NOT NULL,
            provider_user_id TEXT NOT NULL,
            provider_email TEXT,
            access_token TEXT,
            refresh_token TEXT,
            expires_at TIMESTAMP,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL,
            UNIQUE(provider, provider_user_id)
        )
        "#,
        accounts = tables::OAUTH_ACCOUNTS,
        users = tables::USERS
    ))
    .execute(&mut *conn)
    .await?;

    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS idx_{accounts}_user_id ON {accounts}(user_id)",
        accounts = tables::OAUTH_ACCOUNTS
    ))
    .execute(&mut *conn)
    .await?;

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {sessions} (
            id TEXT PRIMARY KEY NOT NULL,
            user_id TEXT NOT NULL REFERENCES {users}(id) ON DELETE CASCADE,
            session_token TEXT NOT NULL UNIQUE,
            expires_at TIMESTAMP NOT NULL,
            created_at TIMESTAMP NOT NULL
        )
        "#,
        sessions = tables::USER_SESSIONS,
        users = tables::USERS
    ))
    .execute(&mut *conn)
    .await?;

    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS idx_{sessions}_user_id ON {sessions}(user_id)",
        sessions = tables::USER_SESSIONS
    ))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// ─── Users ───────────────────────────────────────────────────

pub async fn find_user_by_id(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT * FROM {} WHERE id = ?", tables::USERS))
        .bind(id)
        .fetch_optional(conn)
        .await
}

pub async fn find_user_by_email(
    conn: &mut SqliteConnection,
    email: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT * FROM {} WHERE email = ?", tables::USERS))
        .bind(email)
        .fetch_optional(conn)
        .await
}

/// Insert a user. Fails with a unique violation if the email is taken.
pub async fn insert_user(conn: &mut SqliteConnection, user: &User) -> Result<(), sqlx::Error> {
    sqlx::query(&format!(
        r#"
        INSERT INTO {} (id, email, username, full_name, avatar_url,
                        is_active, is_verified, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        tables::USERS
    ))
    .bind(&user.id)
    .bind(&user.email)
    .bind(&user.username)
    .bind(&user.full_name)
    .bind(&user.avatar_url)
    .bind(user.is_active)
    .bind(user.is_verified)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Enable or disable login for a user. Returns false if no such user.
pub async fn set_user_active(
    conn: &mut SqliteConnection,
    id: &str,
    is_active: bool,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(&format!(
        "UPDATE {} SET is_active = ?, updated_at = ? WHERE id = ?",
        tables::USERS
    ))
    .bind(is_active)
    .bind(Utc::now())
    .bind(id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete a user; passwords, linked accounts and sessions cascade.
pub async fn delete_user(conn: &mut SqliteConnection, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(&format!("DELETE FROM {} WHERE id = ?", tables::USERS))
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

// ─── Password Credentials ────────────────────────────────────

pub async fn insert_password(
    conn: &mut SqliteConnection,
    credential: &PasswordCredential,
) -> Result<(), sqlx::Error> {
    sqlx::query(&format!(
        r#"
        INSERT INTO {} (id, user_id, password_hash, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
        tables::USER_PASSWORDS
    ))
    .bind(&credential.id)
    .bind(&credential.user_id)
    .bind(&credential.password_hash)
    .bind(credential.created_at)
    .bind(credential.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn find_password_for_user(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<Option<PasswordCredential>, sqlx::Error> {
    sqlx::query_as::<_, PasswordCredential>(&format!(
        "SELECT * FROM {} WHERE user_id = ?",
        tables::USER_PASSWORDS
    ))
    .bind(user_id)
    .fetch_optional(conn)
    .await
}

// ─── Linked Provider Accounts ────────────────────────────────

pub async fn find_account(
    conn: &mut SqliteConnection,
    provider: &str,
    provider_user_id: &str,
) -> Result<Option<LinkedProviderAccount>, sqlx::Error> {
    sqlx::query_as::<_, LinkedProviderAccount>(&format!(
        "SELECT * FROM {} WHERE provider = ? AND provider_user_id = ?",
        tables::OAUTH_ACCOUNTS
    ))
    .bind(provider)
    .bind(provider_user_id)
    .fetch_optional(conn)
    .await
}

/// Insert a linked account. Fails with a unique violation on a duplicate
/// `(provider, provider_user_id)`.
pub async fn insert_account(
    conn: &mut SqliteConnection,
    account: &LinkedProviderAccount,
) -> Result<(), sqlx::Error> {
    sqlx::query(&format!(
        r#"
        INSERT INTO {} (id, user_id, provider, provider_user_id, provider_email,
                        access_token, refresh_token, expires_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        tables::OAUTH_ACCOUNTS
    ))
    .bind(&account.id)
    .bind(&account.user_id)
    .bind(&account.provider)
    .bind(&account.provider_user_id)
    .bind(&account.provider_email)
    .bind(&account.access_token)
    .bind(&account.refresh_token)
    .bind(account.expires_at)
    .bind(account.created_at)
    .bind(account.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Overwrite the provider tokens of an existing account.
pub async fn update_account_tokens(
    conn: &mut SqliteConnection,
    account_id: &str,
    access_token: &str,
    refresh_token: Option<&str>,
    expires_at: Option<DateTime<Utc>>,
) -> Result<(), sqlx::Error> {
    sqlx::query(&format!(
        r#"
        UPDATE {} SET access_token = ?, refresh_token = ?, expires_at = ?, updated_at = ?
        WHERE id = ?
        "#,
        tables::OAUTH_ACCOUNTS
    ))
    .bind(access_token)
    .bind(refresh_token)
    .bind(expires_at)
    .bind(Utc::now())
    .bind(account_id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn accounts_for_user(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<Vec<LinkedProviderAccount>, sqlx::Error> {
    sqlx::query_as::<_, LinkedProviderAccount>(&format!(
        "SELECT * FROM {} WHERE user_id = ? ORDER BY created_at ASC",
        tables::OAUTH_ACCOUNTS
    ))
    .bind(user_id)
    .fetch_all(conn)
    .await
}

// ─── Sessions ────────────────────────────────────────────────

/// Delete sessions of `user_id` that expired before `now`.
pub async fn delete_expired_sessions(
    conn: &mut SqliteConnection,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = ? AND expires_at < ?",
        tables::USER_SESSIONS
    ))
    .bind(user_id)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

pub async fn insert_session(
    conn: &mut SqliteConnection,
    session: &Session,
) -> Result<(), sqlx::Error> {
    sqlx::query(&format!(
        r#"
        INSERT INTO {} (id, user_id, session_token, expires_at, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
        tables::USER_SESSIONS
    ))
    .bind(&session.id)
    .bind(&session.user_id)
    .bind(&session.session_token)
    .bind(session.expires_at)
    .bind(session.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn sessions_for_user(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<Vec<Session>, sqlx::Error> {
    sqlx::query_as::<_, Session>(&format!(
        "SELECT * FROM {} WHERE user_id = ? ORDER BY created_at ASC",
        tables::USER_SESSIONS
    ))
    .bind(user_id)
    .fetch_all(conn)
    .await
}
