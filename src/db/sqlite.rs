// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! SQLite credential store.
//!
//! Provides:
//! - Connection pooling and schema creation
//! - Explicit transactions for multi-step writes
//! - Convenience reads for handlers outside a transaction

use crate::db::queries;
use crate::error::AppError;
use crate::models::{LinkedProviderAccount, Session, User};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::str::FromStr;

const MAX_CONNECTIONS: u32 = 10;

/// Credential store client.
#[derive(Clone)]
pub struct AuthDb {
    pool: SqlitePool,
}

impl AuthDb {
    /// Connect to the store at `url` and create the schema if needed.
    ///
    /// In-memory databases live only as long as their connection, so they
    /// get a single connection that is never recycled.
    pub async fn connect(url: &str) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| AppError::Database(format!("Invalid DATABASE_URL: {}", e)))?
            .create_if_missing(true)
            .foreign_keys(true);

        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(MAX_CONNECTIONS)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| AppError::Database(format!("Failed to open database: {}", e)))?;

        let db = Self { pool };
        db.migrate().await?;

        tracing::info!(in_memory, "Credential store ready");
        Ok(db)
    }

    /// Fresh private in-memory store (tests, local experiments).
    pub async fn in_memory() -> Result<Self, AppError> {
        Self::connect("sqlite::memory:").await
    }

    async fn migrate(&self) -> Result<(), AppError> {
        let mut conn = self.pool.acquire().await?;
        queries::create_tables(&mut conn).await?;
        Ok(())
    }

    /// Begin a transaction. Dropping it without `commit` rolls back.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, AppError> {
        self.pool
            .begin()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))
    }

    // ─── User Operations ─────────────────────────────────────────

    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let mut conn = self.pool.acquire().await?;
        Ok(queries::find_user_by_id(&mut conn, id).await?)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let mut conn = self.pool.acquire().await?;
        Ok(queries::find_user_by_email(&mut conn, email).await?)
    }

    pub async fn set_user_active(&self, id: &str, is_active: bool) -> Result<bool, AppError> {
        let mut conn = self.pool.acquire().await?;
        Ok(queries::set_user_active(&mut conn, id, is_active).await?)
    }

    /// Delete a user and everything hanging off it.
    pub async fn delete_user(&self, id: &str) -> Result<bool, AppError> {
        let mut conn = self.pool.acquire().await?;
        Ok(queries::delete_user(&mut conn, id).await?)
    }

    // ─── Linked Accounts / Sessions ──────────────────────────────

    pub async fn accounts_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<LinkedProviderAccount>, AppError> {
        let mut conn = self.pool.acquire().await?;
        Ok(queries::accounts_for_user(&mut conn, user_id).await?)
    }

    pub async fn get_account(
        &self,
        provider: &str,
        provider_user_id: &str,
    ) -> Result<Option<LinkedProviderAccount>, AppError> {
        let mut conn = self.pool.acquire().await?;
        Ok(queries::find_account(&mut conn, provider, provider_user_id).await?)
    }

    pub async fn sessions_for_user(&self, user_id: &str) -> Result<Vec<Session>, AppError> {
        let mut conn = self.pool.acquire().await?;
        Ok(queries::sessions_for_user(&mut conn, user_id).await?)
    }
}
