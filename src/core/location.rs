//! Browser Location
//!
//! Read and rewrite the visible location without reloading the page.

use parking_lot::Mutex;

use crate::error::LifecycleError;
use crate::types::LocationSnapshot;

/// Browser location interface (for dependency injection).
pub trait BrowserLocation: Send + Sync {
    /// Current pathname and query string.
    fn current(&self) -> LocationSnapshot;

    /// Replace the visible URL with `relative_url`. Must not reload the page or push a
    /// new history entry.
    fn replace(&self, relative_url: &str) -> Result<(), LifecycleError>;
}

/// In-memory location, used by hosts without a real browser and by tests.
pub struct InMemoryLocation {
    current: Mutex<LocationSnapshot>,
    history_len: Mutex<usize>,
    replace_history: Mutex<Vec<String>>,
}

impl InMemoryLocation {
    /// Create location at the given pathname and query string.
    pub fn new(pathname: impl Into<String>, search: impl Into<String>) -> Self {
        Self {
            current: Mutex::new(LocationSnapshot::new(pathname, search)),
            history_len: Mutex::new(1),
            replace_history: Mutex::new(Vec::new()),
        }
    }

    /// Navigate to a new location, adding a history entry.
    pub fn navigate(&self, pathname: impl Into<String>, search: impl Into<String>) {
        *self.current.lock() = LocationSnapshot::new(pathname, search);
        *self.history_len.lock() += 1;
    }

    /// Number of history entries.
    pub fn history_len(&self) -> usize {
        *self.history_len.lock()
    }

    /// URLs passed to [`BrowserLocation::replace`].
    pub fn replace_history(&self) -> Vec<String> {
        self.replace_history.lock().clone()
    }
}

impl Default for InMemoryLocation {
    fn default() -> Self {
        Self::new("/", "")
    }
}

impl BrowserLocation for InMemoryLocation {
    fn current(&self) -> LocationSnapshot {
        self.current.lock().clone()
    }

    fn replace(&self, relative_url: &str) -> Result<(), LifecycleError> {
        let (pathname, search) = match relative_url.find('?') {
            Some(idx) => relative_url.split_at(idx),
            None => (relative_url, ""),
        };
        *self.current.lock() = LocationSnapshot::new(pathname, search);
        self.replace_history.lock().push(relative_url.to_string());
        Ok(())
    }
}
