//! Lifecycle Error Types
//!
//! Error hierarchy for config resolution, token handling, redirect state and providers.

use std::time::Duration;
use thiserror::Error;

/// Root error type for the token lifecycle manager.
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Redirect state error: {0}")]
    RedirectState(#[from] RedirectStateError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Lifecycle manager already initialized")]
    AlreadyInitialized,

    #[error("Lifecycle manager not initialized")]
    NotInitialized,
}

impl LifecycleError {
    /// Get error code for telemetry.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "OAUTH_CONFIG",
            Self::Token(_) => "OAUTH_TOKEN",
            Self::RedirectState(_) => "OAUTH_REDIRECT_STATE",
            Self::Network(_) => "OAUTH_NETWORK",
            Self::Storage(_) => "OAUTH_STORAGE",
            Self::Protocol(_) => "OAUTH_PROTOCOL",
            Self::Provider(_) => "OAUTH_PROVIDER",
            Self::AlreadyInitialized | Self::NotInitialized => "OAUTH_STATE",
        }
    }

    /// Check if a later attempt may succeed without user action.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_retryable(),
            Self::Token(TokenError::Expired { .. }) => true,
            Self::Provider(ProviderError::AcquireFailed { .. }) => true,
            _ => false,
        }
    }

    /// Check if the application cannot continue without startup being aborted.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::RedirectState(_) | Self::AlreadyInitialized
        )
    }
}

/// Configuration error.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Missing required field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid endpoint URL for {field}: {url}")]
    InvalidEndpoint { field: String, url: String },
}

/// Token-related error.
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Invalid token format: {message}")]
    InvalidToken { message: String },

    #[error("Token missing expiry claim")]
    MissingExpiry,

    #[error("Provider returned {kind} token that expires at {expires_at}")]
    Expired { kind: String, expires_at: String },
}

/// Redirect-state continuity error.
#[derive(Error, Debug)]
pub enum RedirectStateError {
    #[error("Failure in OAuth, no redirect state located for key {key}")]
    NotFound { key: String },

    #[error("Unable to update browser location: {message}")]
    LocationUpdateFailed { message: String },
}

/// Network/transport error.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Request timeout after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Unexpected HTTP status {status} from {url}")]
    HttpStatus { status: u16, url: String },
}

impl NetworkError {
    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::HttpStatus { status, .. } => *status >= 500,
            _ => true,
        }
    }
}

/// Protocol/response parsing error.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Unexpected redirect to: {location}")]
    UnexpectedRedirect { location: String },

    #[error("Response too large: {size} bytes")]
    ResponseTooLarge { size: usize },

    #[error("Invalid JSON: {message}")]
    InvalidJson { message: String },
}

/// Persistent key-value storage error.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Read failed: {message}")]
    ReadFailed { message: String },

    #[error("Write failed: {message}")]
    WriteFailed { message: String },

    #[error("Corrupted data: {message}")]
    CorruptedData { message: String },
}

/// Identity provider adapter error.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Token acquisition failed: {message}")]
    AcquireFailed { message: String },

    #[error("Provider logout failed: {message}")]
    LogoutFailed { message: String },

    #[error("Login popup window blocked")]
    PopupBlocked,

    #[error("Login popup window closed")]
    PopupClosed,

    #[error("Login popup window timed out")]
    PopupTimeout,
}

/// Result type for lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

pub const POPUP_BLOCKED_MESSAGE: &str =
    "Login popup window blocked. Please check your browser for a blocked popup notification \
     (typically within the URL bar). Allow all popups from this site, then refresh this page \
     in your browser to try again.";

pub const DEFAULT_AUTH_ERROR_MESSAGE: &str =
    "We are unable to authenticate you. Please ensure any pop-up windows or alternate \
     browser tabs with this app open are fully closed, then refresh this tab in your browser \
     to reload the application and try again.";

/// Get user-friendly error message.
pub fn get_user_message(error: &LifecycleError) -> String {
    match error {
        LifecycleError::Provider(ProviderError::PopupBlocked) => POPUP_BLOCKED_MESSAGE.to_string(),
        LifecycleError::Provider(ProviderError::PopupClosed) => {
            "Login popup window closed. Please reload this tab in your browser to try again."
                .to_string()
        }
        LifecycleError::Provider(ProviderError::PopupTimeout) => {
            "Login popup window timed out. Please reload this tab in your browser to try again."
                .to_string()
        }
        LifecycleError::Configuration(_) => {
            "Missing or invalid OAuth configuration. Please review your configuration.".to_string()
        }
        LifecycleError::Token(TokenError::Expired { .. }) => {
            "Your session has expired. Please reload the application.".to_string()
        }
        _ => DEFAULT_AUTH_ERROR_MESSAGE.to_string(),
    }
}
