// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Transient values produced during an OAuth login.

use crate::services::providers::Provider;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Provider-agnostic identity built from a raw profile payload.
///
/// Never persisted directly; consumed by reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedIdentity {
    pub provider: Provider,
    pub provider_user_id: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Token endpoint response, reduced to the fields we store.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ProviderToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Seconds until the access token expires
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub expires_in: Option<i64>,
}

/// Accept `expires_in` as a JSON number or a numeric string; anything else
/// is treated as absent rather than failing the exchange.
fn lenient_seconds<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(raw: Value) -> ProviderToken {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn test_expires_in_number() {
        let token = parse(json!({"access_token": "a", "expires_in": 3600}));
        assert_eq!(token.expires_in, Some(3600));
        assert_eq!(token.refresh_token, None);
    }

    #[test]
    fn test_expires_in_string() {
        let token = parse(json!({"access_token": "a", "expires_in": "3600"}));
        assert_eq!(token.expires_in, Some(3600));
    }

    #[test]
    fn test_expires_in_missing_or_junk() {
        assert_eq!(parse(json!({"access_token": "a"})).expires_in, None);
        assert_eq!(
            parse(json!({"access_token": "a", "expires_in": null})).expires_in,
            None
        );
        assert_eq!(
            parse(json!({"access_token": "a", "expires_in": "soon"})).expires_in,
            None
        );
    }

    #[test]
    fn test_access_token_required() {
        assert!(serde_json::from_value::<ProviderToken>(json!({"expires_in": 10})).is_err());
    }
}
