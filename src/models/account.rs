// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Linked provider accounts.

use crate::services::providers::Provider;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Every login method a user can have, as persisted in `oauth_accounts.provider`.
///
/// `Standard` and `Apple` never appear on a linked account today; they are
/// kept so stored values and the wire vocabulary stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthSource {
    Standard,
    Microsoft,
    Google,
    Facebook,
    Strava,
    Apple,
}

impl AuthSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthSource::Standard => "standard",
            AuthSource::Microsoft => "microsoft",
            AuthSource::Google => "google",
            AuthSource::Facebook => "facebook",
            AuthSource::Strava => "strava",
            AuthSource::Apple => "apple",
        }
    }
}

impl fmt::Display for AuthSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Provider> for AuthSource {
    fn from(provider: Provider) -> Self {
        match provider {
            Provider::Google => AuthSource::Google,
            Provider::Facebook => AuthSource::Facebook,
            Provider::Strava => AuthSource::Strava,
            Provider::Microsoft => AuthSource::Microsoft,
        }
    }
}

/// A third-party identity linked to a local user.
///
/// `(provider, provider_user_id)` is unique in the store.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LinkedProviderAccount {
    pub id: String,
    pub user_id: String,
    pub provider: String,
    pub provider_user_id: String,
    pub provider_email: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
