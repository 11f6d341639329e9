//! Token Types
//!
//! Token model held by the lifecycle manager and raw tokens returned by providers.

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};

use crate::error::LifecycleError;
use crate::token::decode_expiry;

/// Raw token strings returned by a provider adapter.
#[derive(Clone)]
pub struct ProviderTokens {
    /// ID token in JWT format.
    pub id_token: String,
    /// Access token in JWT format.
    pub access_token: String,
}

impl ProviderTokens {
    /// Create new provider token pair.
    pub fn new(id_token: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            id_token: id_token.into(),
            access_token: access_token.into(),
        }
    }
}

impl std::fmt::Debug for ProviderTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderTokens")
            .field("id_token", &"[REDACTED]")
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// A single token and the absolute instant after which it must not be used.
///
/// The expiry is always taken from the token's own `exp` claim.
#[derive(Clone)]
pub struct TokenInfo {
    token: SecretString,
    expiry: DateTime<Utc>,
}

impl TokenInfo {
    /// Decode the expiry claim of a JWT and wrap it.
    pub fn from_jwt(token: impl Into<String>) -> Result<Self, LifecycleError> {
        let token = token.into();
        let expiry = decode_expiry(&token)?;
        Ok(Self {
            token: SecretString::new(token),
            expiry,
        })
    }

    /// Get token value (for Authorization header).
    pub fn token(&self) -> &str {
        self.token.expose_secret()
    }

    /// Expiry instant.
    pub fn expiry(&self) -> DateTime<Utc> {
        self.expiry
    }

    /// Expiry as epoch milliseconds.
    pub fn expiry_ms(&self) -> i64 {
        self.expiry.timestamp_millis()
    }

    /// True if the token lapses at or before `now + window`.
    ///
    /// A window reaching past the representable range covers every expiry.
    pub fn expires_within(&self, window: Duration, now: DateTime<Utc>) -> bool {
        now.checked_add_signed(window)
            .map_or(true, |limit| self.expiry <= limit)
    }

    /// Remaining lifetime, zero once expired.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        if self.expiry > now {
            self.expiry - now
        } else {
            Duration::zero()
        }
    }

    /// Redacted summary safe to log.
    pub fn for_log(&self) -> String {
        let value = self.token.expose_secret();
        let tail: String = value
            .chars()
            .rev()
            .take(8)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!(
            "[...{}] expires {}",
            tail,
            self.expiry.format("%Y-%m-%d %H:%M:%S UTC")
        )
    }
}

impl PartialEq for TokenInfo {
    fn eq(&self, other: &Self) -> bool {
        self.expiry == other.expiry && self.token.expose_secret() == other.token.expose_secret()
    }
}

impl Eq for TokenInfo {}

impl std::fmt::Debug for TokenInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenInfo")
            .field("token", &"[REDACTED]")
            .field("expiry", &self.expiry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::test_jwt;

    #[test]
    fn test_expiry_matches_claim() {
        let exp = 1_900_000_000;
        let info = TokenInfo::from_jwt(test_jwt("alice", exp)).unwrap();
        assert_eq!(info.expiry_ms(), exp * 1000);
    }

    #[test]
    fn test_expires_within() {
        let now = Utc::now();
        let exp = (now + Duration::minutes(9)).timestamp();
        let info = TokenInfo::from_jwt(test_jwt("alice", exp)).unwrap();

        assert!(info.expires_within(Duration::minutes(10), now));
        assert!(!info.expires_within(Duration::minutes(5), now));
        assert!(info.remaining(now) <= Duration::minutes(9));
        assert_eq!(info.remaining(now + Duration::hours(1)), Duration::zero());
    }

    #[test]
    fn test_expires_within_huge_window() {
        let now = Utc::now();
        let info = TokenInfo::from_jwt(test_jwt("alice", 1_900_000_000)).unwrap();

        assert!(info.expires_within(Duration::MAX, now));
        assert!(info.expires_within(Duration::weeks(52 * 1000), now));
    }

    #[test]
    fn test_debug_and_log_redact_token() {
        let token = test_jwt("alice", 1_900_000_000);
        let info = TokenInfo::from_jwt(token.clone()).unwrap();

        let debug = format!("{:?}", info);
        assert!(!debug.contains(&token));
        assert!(debug.contains("REDACTED"));

        let log = info.for_log();
        assert!(!log.contains(&token));
        assert!(log.ends_with("UTC"));
    }

    #[test]
    fn test_equality() {
        let a = TokenInfo::from_jwt(test_jwt("alice", 1_900_000_000)).unwrap();
        let b = TokenInfo::from_jwt(test_jwt("alice", 1_900_000_000)).unwrap();
        let c = TokenInfo::from_jwt(test_jwt("bob", 1_900_000_000)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
