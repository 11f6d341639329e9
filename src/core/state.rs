//! Redirect State
//!
//! Remembers where the user was before a redirect-based sign-in left the page, and puts
//! them back there afterwards.

use chrono::Duration;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::{BrowserLocation, Clock, KeyValueStore, SystemClock};
use crate::error::{LifecycleError, RedirectStateError, StorageError};
use crate::types::RedirectStateRecord;

/// Storage key holding the list of pending redirect records.
pub const REDIRECT_STATE_KEY: &str = "xhOAuthState";

/// Records older than this are pruned on every read.
pub const REDIRECT_STATE_MAX_AGE_MINS: i64 = 5;

/// Persisted list of [`RedirectStateRecord`]s.
pub struct RedirectStateStore {
    storage: Arc<dyn KeyValueStore>,
    location: Arc<dyn BrowserLocation>,
    clock: Arc<dyn Clock>,
}

impl RedirectStateStore {
    /// Create store with the system clock and the default 5 minute max age.
    pub fn new(storage: Arc<dyn KeyValueStore>, location: Arc<dyn BrowserLocation>) -> Self {
        Self {
            storage,
            location,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Snapshot the current location and persist it under a fresh key.
    ///
    /// The returned key is handed to the provider and round-tripped through its redirect.
    pub fn capture(&self) -> Result<String, LifecycleError> {
        let location = self.location.current();
        let key = Uuid::new_v4().to_string();

        let mut records = match self.load() {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Discarding unreadable redirect state");
                Vec::new()
            }
        };
        records.push(RedirectStateRecord {
            key: key.clone(),
            timestamp: self.clock.now_ms(),
            pathname: location.pathname,
            search: location.search,
        });
        self.save(&records)?;

        debug!(key = %key, pending = records.len(), "Redirect state captured");
        Ok(key)
    }

    /// Rewrite the visible location to the one captured under `key`.
    ///
    /// The record is consumed once the trimmed list is persisted. Fails with [`RedirectStateError::NotFound`] when
    /// the key is unknown or its record has aged out.
    pub fn restore(&self, key: &str) -> Result<(), LifecycleError> {
        let mut records = self.load()?;
        let idx = records.iter().position(|r| r.key == key).ok_or_else(|| {
            LifecycleError::RedirectState(RedirectStateError::NotFound {
                key: key.to_string(),
            })
        })?;

        // Persist the consumed list first so a storage failure leaves the page untouched.
        let record = records.remove(idx);
        self.save(&records)?;
        self.location
            .replace(&record.location().to_relative_url())
            .map_err(|e| {
                LifecycleError::RedirectState(RedirectStateError::LocationUpdateFailed {
                    message: e.to_string(),
                })
            })?;

        debug!(key = %key, pathname = %record.pathname, "Redirect state restored");
        Ok(())
    }

    /// Records still within the max age, pruning the rest from storage.
    pub fn pending(&self) -> Result<Vec<RedirectStateRecord>, LifecycleError> {
        self.load()
    }

    fn load(&self) -> Result<Vec<RedirectStateRecord>, LifecycleError> {
        let records: Vec<RedirectStateRecord> = match self.storage.get(REDIRECT_STATE_KEY)? {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(value) => serde_json::from_value(value).map_err(|e| {
                LifecycleError::Storage(StorageError::CorruptedData {
                    message: e.to_string(),
                })
            })?,
        };

        let now_ms = self.clock.now_ms();
        let max_age_ms = Duration::minutes(REDIRECT_STATE_MAX_AGE_MINS).num_milliseconds();
        let total = records.len();
        let live: Vec<_> = records
            .into_iter()
            .filter(|r| !r.is_expired(max_age_ms, now_ms))
            .collect();

        if live.len() != total {
            debug!(pruned = total - live.len(), "Pruned stale redirect state");
            self.save(&live)?;
        }
        Ok(live)
    }

    fn save(&self, records: &[RedirectStateRecord]) -> Result<(), LifecycleError> {
        if records.is_empty() {
            self.storage.remove(REDIRECT_STATE_KEY)?;
            return Ok(());
        }

        let value = serde_json::to_value(records).map_err(|e| {
            LifecycleError::Storage(StorageError::WriteFailed {
                message: e.to_string(),
            })
        })?;
        self.storage.set(REDIRECT_STATE_KEY, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{InMemoryKeyValueStore, InMemoryLocation, ManualClock};
    use crate::types::LocationSnapshot;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Store whose writes can be switched off after setup.
    #[derive(Default)]
    struct FlakyStore {
        inner: InMemoryKeyValueStore,
        fail_writes: AtomicBool,
    }

    impl FlakyStore {
        fn check_writable(&self) -> Result<(), LifecycleError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(LifecycleError::Storage(StorageError::WriteFailed {
                    message: "quota exceeded".to_string(),
                }));
            }
            Ok(())
        }
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<Value>, LifecycleError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: Value) -> Result<(), LifecycleError> {
            self.check_writable()?;
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<bool, LifecycleError> {
            self.check_writable()?;
            self.inner.remove(key)
        }
    }

    struct Fixture {
        storage: Arc<InMemoryKeyValueStore>,
        location: Arc<InMemoryLocation>,
        clock: Arc<ManualClock>,
        store: RedirectStateStore,
    }

    fn fixture() -> Fixture {
        let storage = Arc::new(InMemoryKeyValueStore::new());
        let location = Arc::new(InMemoryLocation::new("/app/grid", "?tab=orders"));
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        ));
        let store = RedirectStateStore::new(storage.clone(), location.clone())
            .with_clock(clock.clone());
        Fixture {
            storage,
            location,
            clock,
            store,
        }
    }

    #[test]
    fn test_capture_then_restore() {
        let f = fixture();
        let key = f.store.capture().unwrap();

        f.location.navigate("/app/", "?code=abc&state=xyz");
        f.store.restore(&key).unwrap();

        assert_eq!(
            f.location.current(),
            LocationSnapshot::new("/app/grid", "?tab=orders")
        );
        assert_eq!(f.location.history_len(), 2);
        assert!(f.store.pending().unwrap().is_empty());
    }

    #[test]
    fn test_restore_write_failure_leaves_location() {
        let storage = Arc::new(FlakyStore::default());
        let location = Arc::new(InMemoryLocation::new("/app/grid", "?tab=orders"));
        let store = RedirectStateStore::new(storage.clone(), location.clone());
        let key = store.capture().unwrap();
        location.navigate("/app/", "?code=abc");

        storage.fail_writes.store(true, Ordering::SeqCst);
        let err = store.restore(&key).unwrap_err();

        assert!(matches!(
            err,
            LifecycleError::Storage(StorageError::WriteFailed { .. })
        ));
        assert!(location.replace_history().is_empty());
        assert_eq!(location.current(), LocationSnapshot::new("/app/", "?code=abc"));

        // The record survives for a later attempt.
        storage.fail_writes.store(false, Ordering::SeqCst);
        store.restore(&key).unwrap();
        assert_eq!(
            location.current(),
            LocationSnapshot::new("/app/grid", "?tab=orders")
        );
    }

    #[test]
    fn test_restore_consumes_record() {
        let f = fixture();
        let key = f.store.capture().unwrap();
        f.store.restore(&key).unwrap();

        let err = f.store.restore(&key).unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::RedirectState(RedirectStateError::NotFound { .. })
        ));
    }

    #[test]
    fn test_expired_record_not_found() {
        let f = fixture();
        let key = f.store.capture().unwrap();

        f.clock.advance(Duration::minutes(5) + Duration::seconds(1));
        let err = f.store.restore(&key).unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::RedirectState(RedirectStateError::NotFound { key: ref k }) if *k == key
        ));
        assert!(f.storage.get(REDIRECT_STATE_KEY).unwrap().is_none());
    }

    #[test]
    fn test_record_at_max_age_still_valid() {
        let f = fixture();
        let key = f.store.capture().unwrap();

        f.clock.advance(Duration::minutes(5));
        assert!(f.store.restore(&key).is_ok());
    }

    #[test]
    fn test_capture_prunes_stale_records() {
        let f = fixture();
        f.store.capture().unwrap();
        f.clock.advance(Duration::minutes(6));
        let fresh = f.store.capture().unwrap();

        let pending = f.store.pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].key, fresh);
    }

    #[test]
    fn test_capture_recovers_from_corrupt_list() {
        let f = fixture();
        f.storage
            .set(REDIRECT_STATE_KEY, json!({"not": "a list"}))
            .unwrap();

        let key = f.store.capture().unwrap();
        let pending = f.store.pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].key, key);
    }

    #[test]
    fn test_keys_are_unique() {
        let f = fixture();
        let a = f.store.capture().unwrap();
        let b = f.store.capture().unwrap();
        assert_ne!(a, b);
        assert_eq!(f.store.pending().unwrap().len(), 2);
    }
}
