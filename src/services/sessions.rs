// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session issuance: server-side session row plus a bearer token.

use crate::db::{queries, AuthDb};
use crate::error::AppError;
use crate::models::{Session, User};
use crate::services::tokens::TokenCodec;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use ring::rand::{SecureRandom, SystemRandom};

/// Lifetime of the server-side session row.
pub const SESSION_LIFETIME_DAYS: i64 = 7;

const SESSION_TOKEN_BYTES: usize = 32;

/// Credentials minted for one successful login.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    /// Stateless bearer token returned to the client
    pub access_token: String,
    /// Opaque server-side session token (not returned to the client)
    pub session_token: String,
    pub session_expires_at: DateTime<Utc>,
}

/// Mints bearer tokens and records the matching server-side session.
#[derive(Clone)]
pub struct SessionIssuer {
    db: AuthDb,
    codec: TokenCodec,
    rng: SystemRandom,
}

impl SessionIssuer {
    pub fn new(db: AuthDb, codec: TokenCodec) -> Self {
        Self {
            db,
            codec,
            rng: SystemRandom::new(),
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Create a session for `user` and sign a bearer token bound to its id.
    ///
    /// The user's already-expired sessions are swept in the same transaction.
    pub async fn issue(&self, user: &User) -> Result<IssuedSession, AppError> {
        let session = self.create_session(&user.id).await?;
        let access_token = self.codec.issue_token(&user.id, self.codec.default_ttl())?;

        Ok(IssuedSession {
            access_token,
            session_token: session.session_token,
            session_expires_at: session.expires_at,
        })
    }

    /// Lazy GC then insert: delete expired sessions for the user and add a
    /// fresh one with a 7-day horizon.
    pub async fn create_session(&self, user_id: &str) -> Result<Session, AppError> {
        let now = Utc::now();
        let session = Session {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            session_token: self.random_token()?,
            expires_at: now + Duration::days(SESSION_LIFETIME_DAYS),
            created_at: now,
        };

        let mut tx = self.db.begin().await?;
        let swept = queries::delete_expired_sessions(&mut tx, user_id, now).await?;
        queries::insert_session(&mut tx, &session).await?;
        tx.commit().await?;

        if swept > 0 {
            tracing::debug!(user_id, swept, "Removed expired sessions");
        }
        Ok(session)
    }

    fn random_token(&self) -> Result<String, AppError> {
        let mut bytes = [0u8; SESSION_TOKEN_BYTES];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG failure")))?;
        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }
}
