//! Configuration Builder
//!
//! Fluent builder for the local (code-supplied) OAuth config layer. Values set here
//! are overridden by the server's remote config and fill in over the hard defaults.

use serde_json::Value;

use crate::types::{BannerIntent, BannerOverrides, ConfigLayer, ExpiryWarningSetting, LoginMethod};

/// Local OAuth configuration builder.
#[derive(Default)]
pub struct OAuthConfigBuilder {
    layer: ConfigLayer,
}

impl OAuthConfigBuilder {
    /// Create new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set client ID.
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.layer.client_id = Some(client_id.into());
        self
    }

    /// Set redirect URL (`APP_BASE_URL` for the running app).
    pub fn redirect_url(mut self, url: impl Into<String>) -> Self {
        self.layer.redirect_url = Some(url.into());
        self
    }

    /// Set post-logout redirect URL.
    pub fn post_logout_redirect_url(mut self, url: impl Into<String>) -> Self {
        self.layer.post_logout_redirect_url = Some(url.into());
        self
    }

    /// Set login method used on desktop.
    pub fn login_method_desktop(mut self, method: LoginMethod) -> Self {
        self.layer.login_method_desktop = Some(method);
        self
    }

    /// Set login method used on mobile.
    pub fn login_method_mobile(mut self, method: LoginMethod) -> Self {
        self.layer.login_method_mobile = Some(method);
        self
    }

    /// Remaining lifetime, in minutes, below which tokens are refreshed.
    pub fn token_refresh_threshold_mins(mut self, mins: u64) -> Self {
        self.layer.token_refresh_threshold_mins = Some(mins);
        self
    }

    /// Minimum seconds between refresh attempts.
    pub fn token_refresh_check_secs(mut self, secs: u64) -> Self {
        self.layer.token_refresh_check_secs = Some(secs);
        self
    }

    /// Set extra scopes.
    pub fn scopes(mut self, scopes: Vec<String>) -> Self {
        self.layer.scopes = Some(scopes);
        self
    }

    /// Add an extra scope.
    pub fn add_scope(mut self, scope: impl Into<String>) -> Self {
        self.layer
            .scopes
            .get_or_insert_with(Vec::new)
            .push(scope.into());
        self
    }

    /// Enable or disable the expiry warning banner.
    pub fn expiry_warning(mut self, enabled: bool) -> Self {
        self.layer.expiry_warning = Some(ExpiryWarningSetting::Flag(enabled));
        self
    }

    /// Enable the expiry warning with customized presentation.
    pub fn expiry_warning_overrides(mut self, overrides: BannerOverrides) -> Self {
        self.layer.expiry_warning = Some(ExpiryWarningSetting::Custom(overrides));
        self
    }

    /// Enable the expiry warning with a custom message.
    pub fn expiry_warning_message(self, message: impl Into<String>) -> Self {
        let overrides = self.custom_overrides();
        self.expiry_warning_overrides(BannerOverrides {
            message: Some(message.into()),
            ..overrides
        })
    }

    /// Enable the expiry warning with a custom intent.
    pub fn expiry_warning_intent(self, intent: BannerIntent) -> Self {
        let overrides = self.custom_overrides();
        self.expiry_warning_overrides(BannerOverrides {
            intent: Some(intent),
            ..overrides
        })
    }

    /// Set a provider-specific value.
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.layer.extra.insert(key.into(), value.into());
        self
    }

    /// Build the local config layer. Validation happens at resolution time.
    pub fn build(self) -> ConfigLayer {
        self.layer
    }

    fn custom_overrides(&self) -> BannerOverrides {
        self.layer
            .expiry_warning
            .as_ref()
            .and_then(ExpiryWarningSetting::overrides)
            .cloned()
            .unwrap_or_default()
    }
}

/// Create a new local OAuth configuration builder.
pub fn oauth_config() -> OAuthConfigBuilder {
    OAuthConfigBuilder::new()
}
