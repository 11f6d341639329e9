//! Provider Adapter
//!
//! Contract implemented per identity provider. The lifecycle manager drives the provider
//! through these three operations and never talks to the provider's endpoints itself.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

use crate::core::RedirectStateStore;
use crate::error::{LifecycleError, ProviderError};
use crate::types::{EffectiveConfig, LoginMethod, Platform, ProviderTokens};

/// Everything a provider may consult while initializing or logging out.
#[derive(Clone, Copy)]
pub struct ProviderContext<'a> {
    pub config: &'a EffectiveConfig,
    pub platform: Platform,
    /// Present when the host can persist state across a full-page redirect.
    pub redirect_state: Option<&'a RedirectStateStore>,
}

impl<'a> ProviderContext<'a> {
    pub fn new(
        config: &'a EffectiveConfig,
        platform: Platform,
        redirect_state: Option<&'a RedirectStateStore>,
    ) -> Self {
        Self {
            config,
            platform,
            redirect_state,
        }
    }

    /// Login method for the running platform.
    pub fn login_method(&self) -> LoginMethod {
        self.config.login_method(self.platform)
    }

    pub fn uses_redirect(&self) -> bool {
        self.config.uses_redirect(self.platform)
    }
}

/// Identity provider adapter interface.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Provider-specific boot handshake, including completing any redirect in progress.
    async fn initialize(&self, ctx: &ProviderContext<'_>) -> Result<(), LifecycleError>;

    /// Obtain an identity and access token pair.
    ///
    /// With `use_cache = false` the provider must go to the network rather than return
    /// tokens it already holds.
    async fn acquire_tokens(&self, use_cache: bool) -> Result<ProviderTokens, LifecycleError>;

    /// Provider-specific sign-out.
    async fn logout(&self, ctx: &ProviderContext<'_>) -> Result<(), LifecycleError>;
}

/// Mock provider adapter for testing.
///
/// Token results are served FIFO. When the queue is empty the last successful pair is
/// returned again, or an acquire failure if none was ever queued.
#[derive(Default)]
pub struct MockProviderAdapter {
    token_results: Mutex<VecDeque<Result<ProviderTokens, LifecycleError>>>,
    last_tokens: Mutex<Option<ProviderTokens>>,
    init_error: Mutex<Option<LifecycleError>>,
    logout_error: Mutex<Option<LifecycleError>>,
    init_history: Mutex<Vec<LoginMethod>>,
    acquire_history: Mutex<Vec<bool>>,
    logout_count: Mutex<u32>,
}

impl MockProviderAdapter {
    /// Create new mock provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a token pair to return.
    pub fn queue_tokens(&self, tokens: ProviderTokens) -> &Self {
        self.token_results.lock().push_back(Ok(tokens));
        self
    }

    /// Queue an acquisition failure.
    pub fn queue_error(&self, error: LifecycleError) -> &Self {
        self.token_results.lock().push_back(Err(error));
        self
    }

    /// Fail the next `initialize`.
    pub fn set_init_error(&self, error: LifecycleError) -> &Self {
        *self.init_error.lock() = Some(error);
        self
    }

    /// Fail the next `logout`.
    pub fn set_logout_error(&self, error: LifecycleError) -> &Self {
        *self.logout_error.lock() = Some(error);
        self
    }

    /// Login methods seen by `initialize`, in call order.
    pub fn init_history(&self) -> Vec<LoginMethod> {
        self.init_history.lock().clone()
    }

    /// `use_cache` flags passed to `acquire_tokens`, in call order.
    pub fn acquire_history(&self) -> Vec<bool> {
        self.acquire_history.lock().clone()
    }

    pub fn acquire_count(&self) -> usize {
        self.acquire_history.lock().len()
    }

    pub fn logout_count(&self) -> u32 {
        *self.logout_count.lock()
    }
}

#[async_trait]
impl ProviderAdapter for MockProviderAdapter {
    async fn initialize(&self, ctx: &ProviderContext<'_>) -> Result<(), LifecycleError> {
        self.init_history.lock().push(ctx.login_method());
        match self.init_error.lock().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn acquire_tokens(&self, use_cache: bool) -> Result<ProviderTokens, LifecycleError> {
        self.acquire_history.lock().push(use_cache);

        let next = self.token_results.lock().pop_front();
        match next {
            Some(Ok(tokens)) => {
                *self.last_tokens.lock() = Some(tokens.clone());
                Ok(tokens)
            }
            Some(Err(error)) => Err(error),
            None => self.last_tokens.lock().clone().ok_or_else(|| {
                LifecycleError::Provider(ProviderError::AcquireFailed {
                    message: "No mock tokens available".to_string(),
                })
            }),
        }
    }

    async fn logout(&self, _ctx: &ProviderContext<'_>) -> Result<(), LifecycleError> {
        *self.logout_count.lock() += 1;
        match self.logout_error.lock().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Create mock provider adapter for testing.
pub fn create_mock_provider() -> MockProviderAdapter {
    MockProviderAdapter::new()
}
