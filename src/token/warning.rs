//! Expiry Warning
//!
//! Tracks whether the "authentication expired" banner is displayed and decides when it
//! must be raised or lowered.

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::types::{BannerSpec, ExpiryWarningSetting};

/// Receives banner show/hide requests (for dependency injection).
pub trait BannerSink: Send + Sync {
    /// Display `banner`, replacing any banner of the same category.
    fn show(&self, banner: &BannerSpec);

    /// Remove the banner with the given category.
    fn hide(&self, category: &str);
}

/// Banner sink that only logs. Used when the host has no UI.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingBannerSink;

impl BannerSink for LoggingBannerSink {
    fn show(&self, banner: &BannerSpec) {
        warn!(category = %banner.category, message = %banner.message, "Showing banner");
    }

    fn hide(&self, category: &str) {
        info!(category = %category, "Hiding banner");
    }
}

/// Call recorded by [`MockBannerSink`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BannerCall {
    Show(BannerSpec),
    Hide(String),
}

/// Mock banner sink for testing.
#[derive(Default)]
pub struct MockBannerSink {
    calls: Mutex<Vec<BannerCall>>,
}

impl MockBannerSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<BannerCall> {
        self.calls.lock().clone()
    }

    pub fn show_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, BannerCall::Show(_)))
            .count()
    }

    pub fn hide_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, BannerCall::Hide(_)))
            .count()
    }
}

impl BannerSink for MockBannerSink {
    fn show(&self, banner: &BannerSpec) {
        self.calls.lock().push(BannerCall::Show(banner.clone()));
    }

    fn hide(&self, category: &str) {
        self.calls.lock().push(BannerCall::Hide(category.to_string()));
    }
}

/// Change the banner must undergo.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WarningTransition {
    Show(BannerSpec),
    Hide(String),
}

/// Banner state machine.
#[derive(Debug)]
pub struct ExpiryWarning {
    setting: ExpiryWarningSetting,
    shown: bool,
}

impl ExpiryWarning {
    pub fn new(setting: ExpiryWarningSetting) -> Self {
        Self {
            setting,
            shown: false,
        }
    }

    pub fn is_shown(&self) -> bool {
        self.shown
    }

    /// Recompute from token presence. Returns a transition only when the state changes.
    pub fn update(&mut self, id_present: bool, access_present: bool) -> Option<WarningTransition> {
        if !self.setting.is_enabled() {
            return None;
        }

        let expired = !id_present && !access_present;
        match (expired, self.shown) {
            (true, false) => {
                self.shown = true;
                let mut banner = BannerSpec::expiry_warning();
                if let Some(overrides) = self.setting.overrides() {
                    banner = banner.with_overrides(overrides);
                }
                Some(WarningTransition::Show(banner))
            }
            (false, true) => {
                self.shown = false;
                Some(WarningTransition::Hide(BannerSpec::expiry_warning().category))
            }
            _ => None,
        }
    }
}

impl WarningTransition {
    /// Forward this transition to a sink.
    pub fn apply(&self, sink: &dyn BannerSink) {
        match self {
            Self::Show(banner) => sink.show(banner),
            Self::Hide(category) => sink.hide(category),
        }
    }
}
