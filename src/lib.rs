//! OAuth2 Token Lifecycle
//!
//! Client-side OAuth2/OIDC token lifecycle manager for single-page applications.
//!
//! # Features
//!
//! - Layered configuration (server > application > defaults) with mandatory OIDC scopes
//! - Proactive token refresh ahead of expiry, driven by a fixed-interval scheduler
//! - Clearing of lapsed tokens and an "authentication expired" banner
//! - Redirect-state continuity across full-page sign-in redirects
//! - Pluggable identity provider adapters
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use oauth2_lifecycle::{
//!     lifecycle_manager, oauth_config, AppEnvironment, HttpBackendClient, Platform,
//!     ReqwestHttpTransport,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let environment = AppEnvironment::new(
//!         "https://apps.example.com".parse()?,
//!         "portfolio",
//!         Platform::Desktop,
//!     );
//!     let transport = Arc::new(ReqwestHttpTransport::new()?);
//!     let backend = Arc::new(HttpBackendClient::for_environment(transport, &environment));
//!
//!     let manager = lifecycle_manager()
//!         .provider(Arc::new(MyProvider::new()))
//!         .backend(backend)
//!         .environment(environment)
//!         .local_config(oauth_config().add_scope("api://portfolio").expiry_warning(true).build())
//!         .build()?;
//!
//!     manager.init_async().await?;
//!     let header = manager.authorization_header();
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `types`: config layers, tokens, redirect records and banner descriptions
//! - `error`: error hierarchy
//! - `core`: clock, HTTP transport, backend client, config resolution, storage and
//!   redirect state
//! - `provider`: identity provider adapter contract
//! - `token`: lifecycle manager, scheduler and expiry warning
//! - `builders`: fluent builder for the local config layer

pub mod builders;
pub mod core;
pub mod error;
pub mod provider;
pub mod token;
pub mod types;

// Re-export builders
pub use builders::{oauth_config, OAuthConfigBuilder};

// Re-export errors
pub use error::{
    get_user_message, ConfigurationError, LifecycleError, LifecycleResult, NetworkError,
    ProtocolError, ProviderError, RedirectStateError, StorageError, TokenError,
    DEFAULT_AUTH_ERROR_MESSAGE, POPUP_BLOCKED_MESSAGE,
};

// Re-export types
pub use types::{
    // Config
    AppEnvironment, ConfigLayer, EffectiveConfig, ExpiryWarningSetting, LoginMethod, Platform,
    APP_BASE_URL, MANDATORY_SCOPES,
    // Token
    ProviderTokens, TokenInfo,
    // Redirect
    LocationSnapshot, RedirectStateRecord,
    // Banner
    BannerAction, BannerButton, BannerIntent, BannerOverrides, BannerSpec,
    EXPIRY_BANNER_CATEGORY,
};

// Re-export core components
pub use core::{
    // Clock
    Clock, ManualClock, SystemClock,
    // Transport
    HttpRequest, HttpResponse, HttpTransport, MockHttpTransport, ReqwestHttpTransport,
    // Backend
    BackendClient, HttpBackendClient, MockBackendClient,
    // Config
    compute_scopes, resolve_config,
    // Storage
    FileKeyValueStore, InMemoryKeyValueStore, KeyValueStore,
    // Location
    BrowserLocation, InMemoryLocation,
    // Redirect state
    RedirectStateStore, REDIRECT_STATE_KEY,
};

// Re-export provider contract
pub use provider::{create_mock_provider, MockProviderAdapter, ProviderAdapter, ProviderContext};

// Re-export token lifecycle
pub use token::{
    decode_expiry, lifecycle_manager, BannerCall, BannerSink, LifecycleManager,
    LifecycleManagerBuilder, LoggingBannerSink, MockBannerSink, DEFAULT_TICK_INTERVAL,
};
