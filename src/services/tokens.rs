// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bearer token codec (HS256 JWT).

use crate::error::AppError;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const TOKEN_ID_BYTES: usize = 16;

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (local user id)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Random token id; tokens minted in the same second still differ
    pub jti: String,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// Issues and verifies stateless bearer tokens.
///
/// Keys are derived once from the process-wide signing secret.
#[derive(Clone)]
pub struct TokenCodec {
    keys: Arc<Keys>,
    default_ttl: Duration,
    rng: SystemRandom,
}

impl TokenCodec {
    pub fn new(signing_key: &[u8], default_ttl: Duration) -> Self {
        Self {
            keys: Arc::new(Keys {
                encoding: EncodingKey::from_secret(signing_key),
                decoding: DecodingKey::from_secret(signing_key),
            }),
            default_ttl,
            rng: SystemRandom::new(),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Sign `{sub: user_id, iat: now, exp: now + ttl, jti: random}`.
    pub fn issue_token(&self, user_id: &str, ttl: Duration) -> Result<String, AppError> {
        let mut token_id = [0u8; TOKEN_ID_BYTES];
        self.rng
            .fill(&mut token_id)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG failure")))?;

        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: hex::encode(token_id),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.keys.encoding)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))
    }

    /// Verify signature and expiry and return the user id.
    ///
    /// Every failure collapses into [`AppError::InvalidCredentials`].
    pub fn verify_token(&self, token: &str) -> Result<String, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = decode::<Claims>(token, &self.keys.decoding, &validation).map_err(|e| {
            tracing::debug!(error = %e, "Bearer token rejected");
            AppError::InvalidCredentials
        })?;

        if data.claims.sub.is_empty() {
            return Err(AppError::InvalidCredentials);
        }
        Ok(data.claims.sub)
    }
}
