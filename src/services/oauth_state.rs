// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Signed, stateless OAuth `state` values.
//!
//! Format (before base64url): `provider|nonce_hex|issued_at_hex|hmac_hex`.
//! The callback can check that a state was minted here, for the same
//! provider, within the last [`STATE_MAX_AGE_SECS`], without server storage.

use crate::services::providers::Provider;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::Sha256;
use subtle::ConstantTimeEq;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// How long a login attempt may take before its state is refused.
pub const STATE_MAX_AGE_SECS: i64 = 10 * 60;
const CLOCK_SKEW_SECS: i64 = 60;
const NONCE_BYTES: usize = 16;

/// Why a state value was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("state is missing")]
    Missing,
    #[error("state is malformed")]
    Malformed,
    #[error("state signature mismatch")]
    BadSignature,
    #[error("state was issued for another provider")]
    WrongProvider,
    #[error("state has expired")]
    Expired,
    #[error("random generator failure")]
    Rng,
}

/// Mint a fresh signed state for `provider` at unix time `now`.
pub fn issue_state(
    provider: Provider,
    key: &[u8],
    rng: &SystemRandom,
    now: i64,
) -> Result<String, StateError> {
    let mut nonce = [0u8; NONCE_BYTES];
    rng.fill(&mut nonce).map_err(|_| StateError::Rng)?;

    let payload = format!("{}|{}|{:x}", provider.as_str(), hex::encode(nonce), now);
    let signature = sign(&payload, key)?;

    Ok(URL_SAFE_NO_PAD.encode(format!("{}|{}", payload, signature)))
}

/// Check a state received at the callback of `provider` at unix time `now`.
pub fn verify_state(
    state: &str,
    provider: Provider,
    key: &[u8],
    now: i64,
) -> Result<(), StateError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(state)
        .map_err(|_| StateError::Malformed)?;
    let decoded = String::from_utf8(bytes).map_err(|_| StateError::Malformed)?;

    let parts: Vec<&str> = decoded.splitn(4, '|').collect();
    let [name, nonce_hex, issued_hex, signature_hex] = parts.as_slice() else {
        return Err(StateError::Malformed);
    };

    // Reconstruct payload and verify signature
    let payload = format!("{}|{}|{}", name, nonce_hex, issued_hex);
    let expected = sign(&payload, key)?;
    if !bool::from(expected.as_bytes().ct_eq(signature_hex.as_bytes())) {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return Err(StateError::BadSignature);
    }

    if *name != provider.as_str() {
        return Err(StateError::WrongProvider);
    }

    let issued_at = i64::from_str_radix(issued_hex, 16).map_err(|_| StateError::Malformed)?;
    if now - issued_at > STATE_MAX_AGE_SECS || issued_at - now > CLOCK_SKEW_SECS {
        return Err(StateError::Expired);
    }

    Ok(())
}

fn sign(payload: &str, key: &[u8]) -> Result<String, StateError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| StateError::Malformed)?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}
