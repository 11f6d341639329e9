//! Backend Client
//!
//! Calls to the application's own server: the remote OAuth config layer and
//! session termination on logout.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::core::{HttpRequest, HttpTransport};
use crate::error::{LifecycleError, NetworkError, ProtocolError};
use crate::types::AppEnvironment;

/// Path of the remote OAuth config endpoint, relative to the app base URL.
pub const OAUTH_CONFIG_PATH: &str = "xh/oauthConfig";
/// Path of the backend logout endpoint, relative to the app base URL.
pub const LOGOUT_PATH: &str = "xh/logout";

/// Backend client interface (for dependency injection).
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Fetch the remote configuration layer.
    async fn fetch_config(&self) -> Result<Value, LifecycleError>;

    /// Terminate the backend session.
    async fn terminate_session(&self) -> Result<(), LifecycleError>;
}

/// Backend client over an [`HttpTransport`].
pub struct HttpBackendClient<T: HttpTransport> {
    transport: Arc<T>,
    config_url: String,
    logout_url: String,
    timeout: Duration,
}

impl<T: HttpTransport> HttpBackendClient<T> {
    /// Create client with explicit endpoint URLs.
    pub fn new(transport: Arc<T>, config_url: impl Into<String>, logout_url: impl Into<String>) -> Self {
        Self {
            transport,
            config_url: config_url.into(),
            logout_url: logout_url.into(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Create client using the standard endpoints under the app base URL.
    pub fn for_environment(transport: Arc<T>, environment: &AppEnvironment) -> Self {
        let base = environment.base_url();
        Self::new(
            transport,
            format!("{}{}", base, OAUTH_CONFIG_PATH),
            format!("{}{}", base, LOGOUT_PATH),
        )
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn get_json(&self, url: &str) -> Result<Value, LifecycleError> {
        let mut request = HttpRequest::get_json(url);
        request.timeout = Some(self.timeout);

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(LifecycleError::Network(NetworkError::HttpStatus {
                status: response.status,
                url: url.to_string(),
            }));
        }

        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&response.body).map_err(|e| {
            LifecycleError::Protocol(ProtocolError::InvalidJson {
                message: e.to_string(),
            })
        })
    }
}

#[async_trait]
impl<T: HttpTransport> BackendClient for HttpBackendClient<T> {
    async fn fetch_config(&self) -> Result<Value, LifecycleError> {
        let config = self.get_json(&self.config_url).await?;
        debug!(url = %self.config_url, "OAuth config fetched from server");
        Ok(config)
    }

    async fn terminate_session(&self) -> Result<(), LifecycleError> {
        self.get_json(&self.logout_url).await?;
        debug!(url = %self.logout_url, "Backend session terminated");
        Ok(())
    }
}

/// Mock backend client for testing.
#[derive(Default)]
pub struct MockBackendClient {
    config: Mutex<Value>,
    config_error: Mutex<Option<LifecycleError>>,
    logout_error: Mutex<Option<LifecycleError>>,
    fetch_count: Mutex<u32>,
    terminate_count: Mutex<u32>,
}

impl MockBackendClient {
    /// Create new mock backend returning an empty remote config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create mock backend serving the given remote config.
    pub fn with_config(config: Value) -> Self {
        let mock = Self::new();
        *mock.config.lock() = config;
        mock
    }

    /// Fail the next config fetch.
    pub fn set_config_error(&self, error: LifecycleError) -> &Self {
        *self.config_error.lock() = Some(error);
        self
    }

    /// Fail the next session termination.
    pub fn set_logout_error(&self, error: LifecycleError) -> &Self {
        *self.logout_error.lock() = Some(error);
        self
    }

    pub fn fetch_count(&self) -> u32 {
        *self.fetch_count.lock()
    }

    pub fn terminate_count(&self) -> u32 {
        *self.terminate_count.lock()
    }
}

#[async_trait]
impl BackendClient for MockBackendClient {
    async fn fetch_config(&self) -> Result<Value, LifecycleError> {
        *self.fetch_count.lock() += 1;
        if let Some(error) = self.config_error.lock().take() {
            return Err(error);
        }
        Ok(self.config.lock().clone())
    }

    async fn terminate_session(&self) -> Result<(), LifecycleError> {
        *self.terminate_count.lock() += 1;
        if let Some(error) = self.logout_error.lock().take() {
            return Err(error);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MockHttpTransport;
    use crate::types::Platform;
    use url::Url;

    fn environment() -> AppEnvironment {
        AppEnvironment::new(
            Url::parse("https://apps.example.com").unwrap(),
            "portfolio",
            Platform::Desktop,
        )
    }

    #[tokio::test]
    async fn test_fetch_config_uses_standard_endpoint() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.queue_json_response(200, &serde_json::json!({"clientId": "abc"}));

        let client = HttpBackendClient::for_environment(transport.clone(), &environment());
        let config = client.fetch_config().await.unwrap();

        assert_eq!(config["clientId"], "abc");
        let requests = transport.get_requests();
        assert_eq!(
            requests[0].url,
            "https://apps.example.com/portfolio/xh/oauthConfig"
        );
        assert_eq!(requests[0].timeout, Some(Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn test_fetch_config_http_error() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.queue_json_response(503, &serde_json::json!({}));

        let client = HttpBackendClient::for_environment(transport, &environment());
        let err = client.fetch_config().await.unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Network(NetworkError::HttpStatus { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_config_invalid_json() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.queue_response(crate::core::HttpResponse {
            status: 200,
            headers: Default::default(),
            body: "<html>".to_string(),
        });

        let client = HttpBackendClient::for_environment(transport, &environment());
        let err = client.fetch_config().await.unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Protocol(ProtocolError::InvalidJson { .. })
        ));
    }

    #[tokio::test]
    async fn test_terminate_session_accepts_empty_body() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.queue_response(crate::core::HttpResponse {
            status: 200,
            headers: Default::default(),
            body: String::new(),
        });

        let client = HttpBackendClient::for_environment(transport.clone(), &environment());
        tokio_test::assert_ok!(client.terminate_session().await);
        assert_eq!(
            transport.get_requests()[0].url,
            "https://apps.example.com/portfolio/xh/logout"
        );
    }

    #[tokio::test]
    async fn test_mock_backend() {
        let backend = MockBackendClient::with_config(serde_json::json!({"clientId": "x"}));
        backend.set_logout_error(LifecycleError::Network(NetworkError::ConnectionFailed {
            message: "down".to_string(),
        }));

        assert_eq!(backend.fetch_config().await.unwrap()["clientId"], "x");
        tokio_test::assert_err!(backend.terminate_session().await);
        tokio_test::assert_ok!(backend.terminate_session().await);
        assert_eq!(backend.terminate_count(), 2);
    }
}
