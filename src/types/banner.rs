//! Banner Types
//!
//! Description of the expiry warning banner handed to the UI layer.

use serde::{Deserialize, Serialize};

/// Banner category used for the expiry warning.
pub const EXPIRY_BANNER_CATEGORY: &str = "xhOAuth";

/// Visual intent of a banner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BannerIntent {
    Primary,
    Success,
    Warning,
    Danger,
}

/// Action a banner performs when activated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BannerAction {
    /// Reload the whole application.
    ReloadApp,
}

/// Action button shown on a banner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BannerButton {
    pub text: String,
    pub action: BannerAction,
}

/// Banner handed to a [`BannerSink`](crate::token::BannerSink).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BannerSpec {
    pub category: String,
    pub message: String,
    pub icon: String,
    pub intent: BannerIntent,
    /// Whether the user may dismiss the banner.
    pub enable_close: bool,
    pub action_button: BannerButton,
    /// Action when the banner body itself is clicked.
    pub on_click: BannerAction,
}

impl BannerSpec {
    /// The default expiry warning banner.
    pub fn expiry_warning() -> Self {
        Self {
            category: EXPIRY_BANNER_CATEGORY.to_string(),
            message: "Authentication expired. Reload required".to_string(),
            icon: "warning".to_string(),
            intent: BannerIntent::Warning,
            enable_close: false,
            action_button: BannerButton {
                text: "Reload Now".to_string(),
                action: BannerAction::ReloadApp,
            },
            on_click: BannerAction::ReloadApp,
        }
    }

    /// Apply caller customization. Only presentation fields can change.
    pub fn with_overrides(mut self, overrides: &BannerOverrides) -> Self {
        if let Some(message) = &overrides.message {
            self.message = message.clone();
        }
        if let Some(icon) = &overrides.icon {
            self.icon = icon.clone();
        }
        if let Some(intent) = overrides.intent {
            self.intent = intent;
        }
        self
    }
}

/// Partial banner customization accepted in config.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<BannerIntent>,
}
