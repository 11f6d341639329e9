//! Config Resolution
//!
//! Merges the remote, local and default config layers into an [`EffectiveConfig`].

use serde_json::{Map, Value};
use url::Url;

use crate::error::{ConfigurationError, LifecycleError, ProtocolError};
use crate::types::{
    AppEnvironment, ConfigLayer, EffectiveConfig, APP_BASE_URL, MANDATORY_SCOPES,
    MAX_REFRESH_CHECK_SECS, MAX_REFRESH_THRESHOLD_MINS,
};

/// Fill keys missing (or null) in `target` from `defaults`, recursing into objects.
///
/// Arrays and scalars are leaves: a value already present in `target` wins outright.
pub fn merge_defaults(target: &mut Map<String, Value>, defaults: &Map<String, Value>) {
    for (key, default) in defaults {
        match target.get_mut(key) {
            None | Some(Value::Null) => {
                target.insert(key.clone(), default.clone());
            }
            Some(Value::Object(existing)) => {
                if let Value::Object(default_obj) = default {
                    merge_defaults(existing, default_obj);
                }
            }
            Some(_) => {}
        }
    }
}

/// Rewrite legacy `idScopes` to `scopes` so the two spellings merge as one key.
fn normalize_aliases(layer: &mut Map<String, Value>) {
    if let Some(scopes) = layer.remove("idScopes") {
        if !layer.contains_key("scopes") {
            layer.insert("scopes".to_string(), scopes);
        }
    }
}

fn layer_to_map(layer: &ConfigLayer) -> Result<Map<String, Value>, LifecycleError> {
    match serde_json::to_value(layer) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Ok(Map::new()),
        Err(e) => Err(LifecycleError::Configuration(
            ConfigurationError::InvalidConfig {
                message: e.to_string(),
            },
        )),
    }
}

/// Union of mandatory and configured scopes, mandatory first, without duplicates.
pub fn compute_scopes(configured: &[String]) -> Vec<String> {
    let mut scopes: Vec<String> = Vec::with_capacity(MANDATORY_SCOPES.len() + configured.len());
    for scope in MANDATORY_SCOPES
        .iter()
        .map(|s| s.to_string())
        .chain(configured.iter().cloned())
    {
        if !scope.is_empty() && !scopes.contains(&scope) {
            scopes.push(scope);
        }
    }
    scopes
}

fn resolve_url(
    field: &str,
    value: Option<String>,
    environment: &AppEnvironment,
) -> Result<String, LifecycleError> {
    let url = match value.as_deref() {
        None | Some(APP_BASE_URL) => environment.base_url(),
        Some(other) => other.to_string(),
    };

    Url::parse(&url).map_err(|_| {
        LifecycleError::Configuration(ConfigurationError::InvalidEndpoint {
            field: field.to_string(),
            url: url.clone(),
        })
    })?;
    Ok(url)
}

fn bounded(field: &str, value: u64, max: u64) -> Result<u64, LifecycleError> {
    if value > max {
        return Err(LifecycleError::Configuration(
            ConfigurationError::InvalidConfig {
                message: format!("{} must be at most {}, got {}", field, max, value),
            },
        ));
    }
    Ok(value)
}

/// Resolve the effective configuration. Priority: remote > local > defaults.
pub fn resolve_config(
    remote: &Value,
    local: &ConfigLayer,
    defaults: &ConfigLayer,
    environment: &AppEnvironment,
) -> Result<EffectiveConfig, LifecycleError> {
    let mut merged = match remote {
        Value::Object(map) => map.clone(),
        Value::Null => Map::new(),
        other => {
            return Err(LifecycleError::Protocol(ProtocolError::InvalidResponse {
                message: format!("Remote OAuth config is not a JSON object: {}", other),
            }))
        }
    };
    normalize_aliases(&mut merged);
    merge_defaults(&mut merged, &layer_to_map(local)?);
    merge_defaults(&mut merged, &layer_to_map(defaults)?);

    let layer: ConfigLayer = serde_json::from_value(Value::Object(merged)).map_err(|e| {
        LifecycleError::Configuration(ConfigurationError::InvalidConfig {
            message: e.to_string(),
        })
    })?;

    let client_id = layer
        .client_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| {
            LifecycleError::Configuration(ConfigurationError::MissingRequired {
                field: "clientId".to_string(),
            })
        })?;

    let missing = |field: &str| {
        LifecycleError::Configuration(ConfigurationError::MissingRequired {
            field: field.to_string(),
        })
    };

    Ok(EffectiveConfig {
        client_id,
        redirect_url: resolve_url("redirectUrl", layer.redirect_url, environment)?,
        post_logout_redirect_url: resolve_url(
            "postLogoutRedirectUrl",
            layer.post_logout_redirect_url,
            environment,
        )?,
        login_method_desktop: layer
            .login_method_desktop
            .ok_or_else(|| missing("loginMethodDesktop"))?,
        login_method_mobile: layer
            .login_method_mobile
            .ok_or_else(|| missing("loginMethodMobile"))?,
        token_refresh_threshold_mins: bounded(
            "tokenRefreshThresholdMins",
            layer
                .token_refresh_threshold_mins
                .ok_or_else(|| missing("tokenRefreshThresholdMins"))?,
            MAX_REFRESH_THRESHOLD_MINS,
        )?,
        token_refresh_check_secs: bounded(
            "tokenRefreshCheckSecs",
            layer
                .token_refresh_check_secs
                .ok_or_else(|| missing("tokenRefreshCheckSecs"))?,
            MAX_REFRESH_CHECK_SECS,
        )?,
        scopes: compute_scopes(layer.scopes.as_deref().unwrap_or_default()),
        expiry_warning: layer.expiry_warning.unwrap_or_default(),
        extra: layer.extra,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::oauth_config;
    use crate::types::{ExpiryWarningSetting, LoginMethod, Platform};
    use serde_json::json;

    fn environment() -> AppEnvironment {
        AppEnvironment::new(
            Url::parse("https://apps.example.com").unwrap(),
            "portfolio",
            Platform::Mobile,
        )
    }

    fn resolve(remote: Value, local: ConfigLayer) -> Result<EffectiveConfig, LifecycleError> {
        resolve_config(&remote, &local, &ConfigLayer::defaults(), &environment())
    }

    #[test]
    fn test_defaults_applied() {
        let config = resolve(json!({"clientId": "abc"}), ConfigLayer::default()).unwrap();

        assert_eq!(config.client_id, "abc");
        assert_eq!(config.redirect_url, "https://apps.example.com/portfolio/");
        assert_eq!(
            config.post_logout_redirect_url,
            "https://apps.example.com/portfolio/"
        );
        assert_eq!(config.login_method_desktop, LoginMethod::Redirect);
        assert_eq!(config.login_method_mobile, LoginMethod::Redirect);
        assert_eq!(config.token_refresh_threshold_mins, 10);
        assert_eq!(config.token_refresh_check_secs, 30);
        assert_eq!(config.expiry_warning, ExpiryWarningSetting::Flag(false));
        assert_eq!(config.scopes, vec!["openid", "profile", "email"]);
    }

    #[test]
    fn test_remote_beats_local() {
        let local = oauth_config()
            .client_id("local-client")
            .login_method_mobile(LoginMethod::Popup)
            .token_refresh_check_secs(60)
            .build();
        let config = resolve(json!({"clientId": "remote-client"}), local).unwrap();

        assert_eq!(config.client_id, "remote-client");
        assert_eq!(config.login_method(Platform::Mobile), LoginMethod::Popup);
        assert!(!config.uses_redirect(Platform::Mobile));
        assert_eq!(config.token_refresh_check_secs, 60);
    }

    #[test]
    fn test_missing_client_id_is_fatal() {
        let err = resolve(json!({}), ConfigLayer::default()).unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Configuration(ConfigurationError::MissingRequired { ref field })
                if field == "clientId"
        ));
        assert!(err.is_fatal());

        let err = resolve(json!({"clientId": "  "}), ConfigLayer::default()).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_scopes_union_regardless_of_layer() {
        let from_remote = resolve(
            json!({"clientId": "abc", "scopes": ["custom"]}),
            ConfigLayer::default(),
        )
        .unwrap();
        let from_local = resolve(
            json!({"clientId": "abc"}),
            oauth_config().scopes(vec!["custom".to_string()]).build(),
        )
        .unwrap();

        let expected = vec!["openid", "profile", "email", "custom"];
        assert_eq!(from_remote.scopes, expected);
        assert_eq!(from_local.scopes, expected);
    }

    #[test]
    fn test_scopes_deduplicated() {
        assert_eq!(
            compute_scopes(&[
                "email".to_string(),
                "custom".to_string(),
                "custom".to_string()
            ]),
            vec!["openid", "profile", "email", "custom"]
        );
    }

    #[test]
    fn test_remote_id_scopes_alias() {
        let config = resolve(
            json!({"clientId": "abc", "idScopes": ["remote"]}),
            oauth_config().add_scope("local").build(),
        )
        .unwrap();
        assert_eq!(config.scopes, vec!["openid", "profile", "email", "remote"]);
    }

    #[test]
    fn test_explicit_redirect_url_kept() {
        let config = resolve(
            json!({"clientId": "abc", "redirectUrl": "https://apps.example.com/cb"}),
            ConfigLayer::default(),
        )
        .unwrap();
        assert_eq!(config.redirect_url, "https://apps.example.com/cb");
    }

    #[test]
    fn test_invalid_redirect_url() {
        let err = resolve(
            json!({"clientId": "abc", "postLogoutRedirectUrl": "not a url"}),
            ConfigLayer::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Configuration(ConfigurationError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn test_expiry_warning_object_merges_deeply() {
        let local = oauth_config()
            .client_id("abc")
            .expiry_warning_message("Local message")
            .build();
        let config = resolve(
            json!({"expiryWarning": {"intent": "danger"}}),
            local,
        )
        .unwrap();

        let overrides = config.expiry_warning.overrides().unwrap();
        assert_eq!(overrides.message.as_deref(), Some("Local message"));
        assert_eq!(
            overrides.intent,
            Some(crate::types::BannerIntent::Danger)
        );
    }

    #[test]
    fn test_extra_keys_available_to_providers() {
        let config = resolve(
            json!({"clientId": "abc", "domain": "login.example.com"}),
            ConfigLayer::default(),
        )
        .unwrap();
        assert_eq!(config.extra_str("domain"), Some("login.example.com"));
        assert_eq!(config.scope_string(), "openid profile email");
    }

    #[test]
    fn test_remote_must_be_object() {
        let err = resolve(json!(["clientId"]), ConfigLayer::default()).unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Protocol(ProtocolError::InvalidResponse { .. })
        ));

        let err = resolve(Value::Null, ConfigLayer::default()).unwrap_err();
        assert!(matches!(err, LifecycleError::Configuration(_)));
    }

    #[test]
    fn test_oversized_refresh_settings_rejected() {
        for remote in [
            json!({"clientId": "abc", "tokenRefreshThresholdMins": u64::MAX}),
            json!({"clientId": "abc", "tokenRefreshCheckSecs": u64::MAX}),
            json!({"clientId": "abc", "tokenRefreshThresholdMins": MAX_REFRESH_THRESHOLD_MINS + 1}),
        ] {
            let err = resolve(remote, ConfigLayer::default()).unwrap_err();
            assert!(matches!(
                err,
                LifecycleError::Configuration(ConfigurationError::InvalidConfig { .. })
            ));
        }

        let config = resolve(
            json!({
                "clientId": "abc",
                "tokenRefreshThresholdMins": MAX_REFRESH_THRESHOLD_MINS,
                "tokenRefreshCheckSecs": MAX_REFRESH_CHECK_SECS
            }),
            ConfigLayer::default(),
        )
        .unwrap();
        assert_eq!(config.refresh_threshold(), chrono::Duration::days(1));
        assert_eq!(config.refresh_check_interval(), chrono::Duration::days(1));
    }

    #[test]
    fn test_merge_defaults_null_is_missing() {
        let mut target = json!({"a": null, "b": 1, "c": {"x": 1}})
            .as_object()
            .cloned()
            .unwrap();
        let defaults = json!({"a": 2, "b": 3, "c": {"x": 9, "y": 2}, "d": [1]})
            .as_object()
            .cloned()
            .unwrap();

        merge_defaults(&mut target, &defaults);
        assert_eq!(
            Value::Object(target),
            json!({"a": 2, "b": 1, "c": {"x": 1, "y": 2}, "d": [1]})
        );
    }
}
