//! Lifecycle Manager
//!
//! Owns the identity and access token slots for a session. Bootstraps config and the
//! provider, keeps tokens fresh ahead of expiry, clears them once they lapse and raises
//! the expiry banner when both are gone.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use super::scheduler::SchedulerHandle;
use super::warning::{BannerSink, ExpiryWarning, LoggingBannerSink, WarningTransition};
use crate::core::{resolve_config, BackendClient, Clock, RedirectStateStore, SystemClock};
use crate::error::{ConfigurationError, LifecycleError, LifecycleResult, TokenError};
use crate::provider::{ProviderAdapter, ProviderContext};
use crate::types::{
    AppEnvironment, ConfigLayer, EffectiveConfig, ExpiryWarningSetting, ProviderTokens,
    TokenInfo,
};

/// Default spacing between scheduler ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Default)]
struct TokenSlots {
    id_token: Option<TokenInfo>,
    access_token: Option<TokenInfo>,
    last_refresh_attempt: Option<DateTime<Utc>>,
}

pub(crate) struct ManagerInner {
    provider: Arc<dyn ProviderAdapter>,
    backend: Arc<dyn BackendClient>,
    banner_sink: Arc<dyn BannerSink>,
    clock: Arc<dyn Clock>,
    redirect_state: Option<Arc<RedirectStateStore>>,
    local_config: ConfigLayer,
    environment: AppEnvironment,
    tick_interval: Duration,
    tick_window: chrono::Duration,
    config: OnceLock<EffectiveConfig>,
    initialized: AtomicBool,
    /// Set once `init_async` succeeds, cleared by `logout_async`.
    active: AtomicBool,
    slots: Mutex<TokenSlots>,
    warning: Mutex<ExpiryWarning>,
    tick_guard: tokio::sync::Mutex<()>,
    scheduler: Mutex<Option<SchedulerHandle>>,
}

impl ManagerInner {
    fn context<'a>(&'a self, config: &'a EffectiveConfig) -> ProviderContext<'a> {
        ProviderContext::new(
            config,
            self.environment.platform,
            self.redirect_state.as_deref(),
        )
    }

    /// One scheduler iteration. Skipped if another tick is still running or no
    /// session is active.
    pub(crate) async fn tick(&self) {
        let Ok(_guard) = self.tick_guard.try_lock() else {
            trace!("Tick already in progress, skipping");
            return;
        };
        if !self.active.load(Ordering::SeqCst) {
            trace!("No active session, skipping tick");
            return;
        }
        let Some(config) = self.config.get() else {
            return;
        };

        let now = self.clock.now();
        let threshold = config.refresh_threshold();

        let should_refresh = {
            let mut slots = self.slots.lock();
            let needs_refresh = [slots.id_token.as_ref(), slots.access_token.as_ref()]
                .into_iter()
                .any(|slot| slot.map_or(true, |t| t.expires_within(threshold, now)));
            let eligible = slots
                .last_refresh_attempt
                .map_or(true, |last| now - last >= config.refresh_check_interval());

            if needs_refresh && eligible {
                slots.last_refresh_attempt = Some(now);
            } else {
                self.clear_lapsing(&mut slots, now);
            }
            needs_refresh && eligible
        };

        if should_refresh {
            debug!("Refreshing OAuth tokens");
            if let Err(e) = self.refresh_tokens().await {
                warn!(error = %e, code = e.error_code(), "Failed to refresh OAuth tokens");
            }
        }

        self.update_warning();
    }

    fn clear_lapsing(&self, slots: &mut TokenSlots, now: DateTime<Utc>) {
        for (kind, slot) in [
            ("id", &mut slots.id_token),
            ("access", &mut slots.access_token),
        ] {
            if slot
                .as_ref()
                .is_some_and(|t| t.expires_within(self.tick_window, now))
            {
                if let Some(token) = slot.take() {
                    info!(kind, token = %token.for_log(), "OAuth token expired, clearing");
                }
            }
        }
    }

    fn update_warning(&self) {
        let transition = {
            let slots = self.slots.lock();
            self.warning
                .lock()
                .update(slots.id_token.is_some(), slots.access_token.is_some())
        };

        match transition {
            Some(transition @ WarningTransition::Show(_)) => {
                warn!("OAuth tokens expired, showing expiry warning");
                transition.apply(self.banner_sink.as_ref());
            }
            Some(transition) => {
                info!("OAuth tokens restored, hiding expiry warning");
                transition.apply(self.banner_sink.as_ref());
            }
            None => {}
        }
    }

    async fn refresh_tokens(&self) -> LifecycleResult<()> {
        let tokens = self.provider.acquire_tokens(false).await?;
        let (id_token, access_token) = decode_pair(tokens)?;
        self.install(id_token, access_token)
    }

    /// Initial load. Cached tokens already inside the refresh threshold are replaced by a
    /// forced network refresh.
    async fn load_tokens(&self, config: &EffectiveConfig) -> LifecycleResult<()> {
        let tokens = self.provider.acquire_tokens(true).await?;
        let (mut id_token, mut access_token) = decode_pair(tokens)?;

        let now = self.clock.now();
        let threshold = config.refresh_threshold();
        if id_token.expires_within(threshold, now) || access_token.expires_within(threshold, now)
        {
            info!(
                id_token = %id_token.for_log(),
                access_token = %access_token.for_log(),
                "Cached OAuth tokens near expiry, re-acquiring"
            );
            let tokens = self.provider.acquire_tokens(false).await?;
            (id_token, access_token) = decode_pair(tokens)?;
        }

        self.install(id_token, access_token)
    }

    /// Replace both slots. Tokens that would lapse before the next tick are rejected.
    fn install(&self, id_token: TokenInfo, access_token: TokenInfo) -> LifecycleResult<()> {
        let now = self.clock.now();
        for (kind, token) in [("id", &id_token), ("access", &access_token)] {
            if token.expires_within(self.tick_window, now) {
                return Err(LifecycleError::Token(TokenError::Expired {
                    kind: kind.to_string(),
                    expires_at: token.expiry().to_rfc3339(),
                }));
            }
        }

        debug!(
            id_token = %id_token.for_log(),
            access_token = %access_token.for_log(),
            "OAuth tokens installed"
        );
        let mut slots = self.slots.lock();
        slots.id_token = Some(id_token);
        slots.access_token = Some(access_token);
        Ok(())
    }

    fn stop_scheduler(&self) {
        if let Some(handle) = self.scheduler.lock().take() {
            handle.stop();
            debug!("Token scheduler stopped");
        }
    }
}

fn decode_pair(tokens: ProviderTokens) -> LifecycleResult<(TokenInfo, TokenInfo)> {
    Ok((
        TokenInfo::from_jwt(tokens.id_token)?,
        TokenInfo::from_jwt(tokens.access_token)?,
    ))
}

/// Token lifecycle manager.
///
/// Cheap to clone; clones share one session. Construct with [`lifecycle_manager`].
#[derive(Clone)]
pub struct LifecycleManager {
    inner: Arc<ManagerInner>,
}

impl LifecycleManager {
    /// Fetch and resolve config, initialize the provider, load tokens and start the
    /// scheduler. Any failure is fatal to the session and leaves the scheduler stopped.
    pub async fn init_async(&self) -> LifecycleResult<()> {
        let inner = &self.inner;
        if inner.initialized.swap(true, Ordering::SeqCst) {
            return Err(LifecycleError::AlreadyInitialized);
        }

        let remote = inner.backend.fetch_config().await?;
        let config = resolve_config(
            &remote,
            &inner.local_config,
            &ConfigLayer::defaults(),
            &inner.environment,
        )?;
        let config = inner.config.get_or_init(|| config);
        *inner.warning.lock() = ExpiryWarning::new(config.expiry_warning.clone());
        info!(
            client_id = %config.client_id,
            login_method = ?config.login_method(inner.environment.platform),
            scopes = %config.scope_string(),
            "OAuth config resolved"
        );

        inner.provider.initialize(&inner.context(config)).await?;
        inner.load_tokens(config).await?;

        inner.active.store(true, Ordering::SeqCst);
        let handle = SchedulerHandle::spawn(Arc::downgrade(inner), inner.tick_interval);
        *inner.scheduler.lock() = Some(handle);
        info!("OAuth token lifecycle started");
        Ok(())
    }

    /// Terminate the backend session, then sign out with the provider.
    ///
    /// Backend failures are logged and do not stop the provider logout.
    pub async fn logout_async(&self) -> LifecycleResult<()> {
        let inner = &self.inner;
        let config = inner.config.get().ok_or(LifecycleError::NotInitialized)?;

        if let Err(e) = inner.backend.terminate_session().await {
            warn!(error = %e, "Error during backend logout");
        }
        inner.provider.logout(&inner.context(config)).await?;

        inner.active.store(false, Ordering::SeqCst);
        inner.stop_scheduler();
        // Wait out a manual tick that may still install tokens.
        let _guard = inner.tick_guard.lock().await;
        let mut slots = inner.slots.lock();
        slots.id_token = None;
        slots.access_token = None;
        info!("Logged out");
        Ok(())
    }

    /// Run one scheduler iteration now.
    pub async fn tick(&self) {
        self.inner.tick().await;
    }

    /// Stop the background scheduler. Tokens are left in place.
    pub fn shutdown(&self) {
        self.inner.stop_scheduler();
    }

    /// True while the background scheduler is ticking.
    pub fn is_running(&self) -> bool {
        self.inner
            .scheduler
            .lock()
            .as_ref()
            .is_some_and(SchedulerHandle::is_running)
    }

    /// Current identity token, if held.
    pub fn id_token(&self) -> Option<String> {
        self.inner
            .slots
            .lock()
            .id_token
            .as_ref()
            .map(|t| t.token().to_string())
    }

    /// Current access token, if held.
    pub fn access_token(&self) -> Option<String> {
        self.inner
            .slots
            .lock()
            .access_token
            .as_ref()
            .map(|t| t.token().to_string())
    }

    /// Identity token with its decoded expiry.
    pub fn id_token_info(&self) -> Option<TokenInfo> {
        self.inner.slots.lock().id_token.clone()
    }

    /// Access token with its decoded expiry.
    pub fn access_token_info(&self) -> Option<TokenInfo> {
        self.inner.slots.lock().access_token.clone()
    }

    /// `Bearer <access token>` for outgoing backend requests.
    pub fn authorization_header(&self) -> Option<String> {
        self.access_token().map(|token| format!("Bearer {}", token))
    }

    /// Effective config, once `init_async` has resolved it.
    pub fn config(&self) -> Option<&EffectiveConfig> {
        self.inner.config.get()
    }

    /// True while the expiry banner is up.
    pub fn is_expiry_warning_shown(&self) -> bool {
        self.inner.warning.lock().is_shown()
    }

    /// Redirect-state store shared with the provider, if configured.
    pub fn redirect_state(&self) -> Option<&RedirectStateStore> {
        self.inner.redirect_state.as_deref()
    }
}

/// Builder for [`LifecycleManager`].
pub struct LifecycleManagerBuilder {
    provider: Option<Arc<dyn ProviderAdapter>>,
    backend: Option<Arc<dyn BackendClient>>,
    banner_sink: Arc<dyn BannerSink>,
    clock: Arc<dyn Clock>,
    redirect_state: Option<Arc<RedirectStateStore>>,
    local_config: ConfigLayer,
    environment: Option<AppEnvironment>,
    tick_interval: Duration,
}

impl LifecycleManagerBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            backend: None,
            banner_sink: Arc::new(LoggingBannerSink),
            clock: Arc::new(SystemClock),
            redirect_state: None,
            local_config: ConfigLayer::default(),
            environment: None,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }

    pub fn provider(mut self, provider: Arc<dyn ProviderAdapter>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn backend(mut self, backend: Arc<dyn BackendClient>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Local config layer, merged beneath the remote config.
    pub fn local_config(mut self, config: ConfigLayer) -> Self {
        self.local_config = config;
        self
    }

    pub fn environment(mut self, environment: AppEnvironment) -> Self {
        self.environment = Some(environment);
        self
    }

    pub fn banner_sink(mut self, sink: Arc<dyn BannerSink>) -> Self {
        self.banner_sink = sink;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn redirect_state(mut self, store: Arc<RedirectStateStore>) -> Self {
        self.redirect_state = Some(store);
        self
    }

    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Build the manager.
    pub fn build(self) -> LifecycleResult<LifecycleManager> {
        let missing = |field: &str| {
            LifecycleError::Configuration(ConfigurationError::MissingRequired {
                field: field.to_string(),
            })
        };

        let provider = self.provider.ok_or_else(|| missing("provider"))?;
        let backend = self.backend.ok_or_else(|| missing("backend"))?;
        let environment = self.environment.ok_or_else(|| missing("environment"))?;

        if self.tick_interval.is_zero() {
            return Err(LifecycleError::Configuration(
                ConfigurationError::InvalidConfig {
                    message: "Tick interval must be positive".to_string(),
                },
            ));
        }
        let tick_window = chrono::Duration::from_std(self.tick_interval).map_err(|e| {
            LifecycleError::Configuration(ConfigurationError::InvalidConfig {
                message: format!("Tick interval out of range: {}", e),
            })
        })?;

        Ok(LifecycleManager {
            inner: Arc::new(ManagerInner {
                provider,
                backend,
                banner_sink: self.banner_sink,
                clock: self.clock,
                redirect_state: self.redirect_state,
                local_config: self.local_config,
                environment,
                tick_interval: self.tick_interval,
                tick_window,
                config: OnceLock::new(),
                initialized: AtomicBool::new(false),
                active: AtomicBool::new(false),
                slots: Mutex::new(TokenSlots::default()),
                warning: Mutex::new(ExpiryWarning::new(ExpiryWarningSetting::default())),
                tick_guard: tokio::sync::Mutex::new(()),
                scheduler: Mutex::new(None),
            }),
        })
    }
}

impl Default for LifecycleManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a lifecycle manager builder.
pub fn lifecycle_manager() -> LifecycleManagerBuilder {
    LifecycleManagerBuilder::new()
}
