//! Configuration Types
//!
//! Config layers as they arrive from the server or from code, and the effective
//! configuration resolved from them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::types::BannerOverrides;

/// Sentinel replaced with the running application's base URL.
pub const APP_BASE_URL: &str = "APP_BASE_URL";

/// Scopes always requested, whatever the configuration says.
pub const MANDATORY_SCOPES: [&str; 3] = ["openid", "profile", "email"];

pub const DEFAULT_TOKEN_REFRESH_THRESHOLD_MINS: u64 = 10;
pub const DEFAULT_TOKEN_REFRESH_CHECK_SECS: u64 = 30;
/// Largest accepted `tokenRefreshThresholdMins`: one day.
pub const MAX_REFRESH_THRESHOLD_MINS: u64 = 24 * 60;
/// Largest accepted `tokenRefreshCheckSecs`: one day.
pub const MAX_REFRESH_CHECK_SECS: u64 = 24 * 60 * 60;

/// Interactive login mechanism.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoginMethod {
    /// Navigate the page away to the provider and back.
    Redirect,
    /// Authenticate in a secondary window.
    Popup,
}

/// Platform the client is running on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Platform {
    #[default]
    Desktop,
    Mobile,
}

/// Where the client application is running.
#[derive(Clone, Debug)]
pub struct AppEnvironment {
    /// Origin the application is served from.
    pub origin: Url,
    /// Path segment identifying the application under the origin.
    pub app_code: String,
    pub platform: Platform,
}

impl AppEnvironment {
    /// Create new environment.
    pub fn new(origin: Url, app_code: impl Into<String>, platform: Platform) -> Self {
        Self {
            origin,
            app_code: app_code.into(),
            platform,
        }
    }

    /// `<origin>/<appCode>/`
    pub fn base_url(&self) -> String {
        let code = self.app_code.trim_matches('/');
        if code.is_empty() {
            format!("{}/", self.origin.origin().ascii_serialization())
        } else {
            format!("{}/{}/", self.origin.origin().ascii_serialization(), code)
        }
    }
}

/// Expiry warning setting: off, on, or on with a customized banner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExpiryWarningSetting {
    Flag(bool),
    Custom(BannerOverrides),
}

impl ExpiryWarningSetting {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Flag(false))
    }

    pub fn overrides(&self) -> Option<&BannerOverrides> {
        match self {
            Self::Custom(overrides) => Some(overrides),
            Self::Flag(_) => None,
        }
    }
}

impl Default for ExpiryWarningSetting {
    fn default() -> Self {
        Self::Flag(false)
    }
}

/// One layer of configuration (remote, local or defaults). Every field is optional.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigLayer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_logout_redirect_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_method_desktop: Option<LoginMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_method_mobile: Option<LoginMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_refresh_threshold_mins: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_refresh_check_secs: Option<u64>,
    #[serde(default, alias = "idScopes", skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_warning: Option<ExpiryWarningSetting>,
    /// Provider-specific keys (tenant, domain, authority...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConfigLayer {
    /// Hard-coded defaults, lowest merge priority.
    pub fn defaults() -> Self {
        Self {
            client_id: None,
            redirect_url: Some(APP_BASE_URL.to_string()),
            post_logout_redirect_url: Some(APP_BASE_URL.to_string()),
            login_method_desktop: Some(LoginMethod::Redirect),
            login_method_mobile: Some(LoginMethod::Redirect),
            token_refresh_threshold_mins: Some(DEFAULT_TOKEN_REFRESH_THRESHOLD_MINS),
            token_refresh_check_secs: Some(DEFAULT_TOKEN_REFRESH_CHECK_SECS),
            scopes: None,
            expiry_warning: Some(ExpiryWarningSetting::Flag(false)),
            extra: Map::new(),
        }
    }
}

/// Configuration in force for the session. Immutable once resolved.
#[derive(Clone, Debug, PartialEq)]
pub struct EffectiveConfig {
    pub client_id: String,
    pub redirect_url: String,
    pub post_logout_redirect_url: String,
    pub login_method_desktop: LoginMethod,
    pub login_method_mobile: LoginMethod,
    pub token_refresh_threshold_mins: u64,
    pub token_refresh_check_secs: u64,
    /// Mandatory scopes plus configured scopes, deduplicated.
    pub scopes: Vec<String>,
    pub expiry_warning: ExpiryWarningSetting,
    pub extra: Map<String, Value>,
}

impl EffectiveConfig {
    /// Login method for the given platform.
    pub fn login_method(&self, platform: Platform) -> LoginMethod {
        match platform {
            Platform::Desktop => self.login_method_desktop,
            Platform::Mobile => self.login_method_mobile,
        }
    }

    pub fn uses_redirect(&self, platform: Platform) -> bool {
        self.login_method(platform) == LoginMethod::Redirect
    }

    /// Remaining lifetime below which tokens are refreshed.
    ///
    /// Capped at [`MAX_REFRESH_THRESHOLD_MINS`] for hand-built configs.
    pub fn refresh_threshold(&self) -> chrono::Duration {
        let mins = self.token_refresh_threshold_mins.min(MAX_REFRESH_THRESHOLD_MINS);
        chrono::Duration::minutes(mins as i64)
    }

    /// Minimum spacing between refresh attempts.
    ///
    /// Capped at [`MAX_REFRESH_CHECK_SECS`] for hand-built configs.
    pub fn refresh_check_interval(&self) -> chrono::Duration {
        let secs = self.token_refresh_check_secs.min(MAX_REFRESH_CHECK_SECS);
        chrono::Duration::seconds(secs as i64)
    }

    /// Scopes joined for a provider request.
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }

    /// Provider-specific string setting.
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }
}
