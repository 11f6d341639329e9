//! Expiry Decoding
//!
//! Reads the `exp` claim of a JWT without verifying its signature. The backend
//! receiving the token is responsible for verification.

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, errors::ErrorKind, DecodingKey, Validation};
use serde::Deserialize;

use crate::error::{LifecycleError, TokenError};

#[derive(Debug, Deserialize)]
struct ExpiryClaims {
    exp: i64,
}

fn claims_only_validation() -> Validation {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.set_required_spec_claims(&["exp"]);
    validation
}

/// Decode the absolute expiry instant of a JWT.
pub fn decode_expiry(token: &str) -> Result<DateTime<Utc>, LifecycleError> {
    let data = decode::<ExpiryClaims>(
        token,
        &DecodingKey::from_secret(&[]),
        &claims_only_validation(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::MissingRequiredClaim(_) => LifecycleError::Token(TokenError::MissingExpiry),
        _ => LifecycleError::Token(TokenError::InvalidToken {
            message: e.to_string(),
        }),
    })?;

    Utc.timestamp_opt(data.claims.exp, 0)
        .single()
        .ok_or_else(|| {
            LifecycleError::Token(TokenError::InvalidToken {
                message: format!("exp claim out of range: {}", data.claims.exp),
            })
        })
}

/// Build an HS256-signed JWT with the given subject and expiry, for tests.
#[cfg(test)]
pub(crate) fn test_jwt(sub: &str, exp: i64) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let claims = serde_json::json!({ "sub": sub, "exp": exp, "aud": "backend" });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"test-secret"),
    )
    .unwrap()
}
