//! Ferry HTTP Client
//!
//! A small, type-safe HTTP client for the import-job API.
//!
//! Both the watcher and the CLI talk to the API through this crate, so error
//! classification (auth / not found / network) lives in one place.
//!
//! # Example
//!
//! ```no_run
//! use ferry_client::{Credentials, ImportClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ferry_client::ClientError> {
//!     let credentials = Credentials::new(Some("token".to_string()));
//!     let client = ImportClient::new("http://localhost:8000/api/v1", credentials);
//!
//!     for job in client.list_jobs().await? {
//!         println!("job {} is {}", job.id, job.status);
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
mod jobs;

pub use error::{ClientError, FailureKind, Result};

use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

/// Shared bearer-token holder
///
/// Clones share the same slot, so clearing it after an authorization failure
/// is seen by every client built from it.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    token: Arc<RwLock<Option<String>>>,
}

impl Credentials {
    /// Create a holder, optionally pre-filled with a token
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: Arc::new(RwLock::new(token.filter(|t| !t.is_empty()))),
        }
    }

    /// Current token, if any
    pub fn get(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the stored token
    pub fn set(&self, token: impl Into<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token.into());
    }

    /// Forget the stored token
    pub fn clear(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Whether a token is currently held
    pub fn is_present(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

/// HTTP client for the import-job API
#[derive(Debug, Clone)]
pub struct ImportClient {
    /// Base URL of the API (e.g., "http://localhost:8000/api/v1")
    base_url: String,
    /// HTTP client instance
    client: Client,
    /// Bearer token attached to every request
    credentials: Credentials,
}

/// Error body returned by the API (`{"detail": "..."}`)
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

impl ImportClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the API (e.g., "http://localhost:8000/api/v1")
    /// * `credentials` - Token holder shared with whoever manages the session
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Self {
        Self::with_client(base_url, Client::new(), credentials)
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client, credentials: Credentials) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            credentials,
        }
    }

    /// Create a new client whose requests give up after `timeout`
    pub fn with_timeout(
        base_url: impl Into<String>,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(base_url, client, credentials))
    }

    /// Get the base URL of the API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Token holder used by this client
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Attach the bearer token, when one is held
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.credentials.get() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// Non-success statuses are mapped onto [`ClientError`] variants; the
    /// server's `detail` field is preferred over the raw body as the message.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = serde_json::from_str::<ErrorBody>(&error_text)
                .map(|body| body.detail)
                .unwrap_or(error_text);
            return Err(ClientError::from_status(status.as_u16(), message));
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body)
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}
