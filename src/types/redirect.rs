//! Redirect State Types
//!
//! Records persisted across a redirect-based sign-in.

use serde::{Deserialize, Serialize};

/// Path and query of the visible browser location.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationSnapshot {
    pub pathname: String,
    pub search: String,
}

impl LocationSnapshot {
    pub fn new(pathname: impl Into<String>, search: impl Into<String>) -> Self {
        Self {
            pathname: pathname.into(),
            search: search.into(),
        }
    }

    /// `pathname + search`, as written back to the location bar.
    pub fn to_relative_url(&self) -> String {
        format!("{}{}", self.pathname, self.search)
    }
}

/// Where the user was before leaving the page for the identity provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectStateRecord {
    /// Key round-tripped through the provider's redirect flow.
    pub key: String,
    /// Capture time, epoch milliseconds.
    pub timestamp: i64,
    pub pathname: String,
    pub search: String,
}

impl RedirectStateRecord {
    pub fn location(&self) -> LocationSnapshot {
        LocationSnapshot::new(self.pathname.clone(), self.search.clone())
    }

    /// True once the record is older than `max_age_ms` at `now_ms`.
    pub fn is_expired(&self, max_age_ms: i64, now_ms: i64) -> bool {
        now_ms - self.timestamp > max_age_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_wire_format() {
        let record = RedirectStateRecord {
            key: "k1".to_string(),
            timestamp: 1_700_000_000_000,
            pathname: "/app/grid".to_string(),
            search: "?tab=2".to_string(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "key": "k1",
                "timestamp": 1_700_000_000_000i64,
                "pathname": "/app/grid",
                "search": "?tab=2"
            })
        );
        assert_eq!(record.location().to_relative_url(), "/app/grid?tab=2");
    }

    #[test]
    fn test_record_expiry() {
        let record = RedirectStateRecord {
            key: "k1".to_string(),
            timestamp: 0,
            pathname: "/".to_string(),
            search: String::new(),
        };
        assert!(!record.is_expired(300_000, 300_000));
        assert!(record.is_expired(300_000, 300_001));
    }
}
