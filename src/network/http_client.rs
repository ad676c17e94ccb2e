// src/network/http_client.rs
//! HTTP transport shared by every flow.
//!
//! All network steps go through [`HttpClient::send`], which folds transport
//! errors and status codes into the wallet taxonomy in one place:
//! - HTTP 403 becomes `Forbidden`, whatever the step
//! - any other non-2xx, or a thrown transport error, becomes the step's own
//!   failure kind carrying the response body as detail
//!
//! Nothing is retried.

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::{WalletError, WalletResult};

/// Constructor of the failure kind owned by a protocol step, e.g.
/// `WalletError::DiscoveryFailed`.
pub type Failure = fn(String) -> WalletError;

/// Thin wrapper around a pooled `reqwest::Client`.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a client. `timeout` of `None` keeps requests open until the
    /// peer answers.
    ///
    /// # Errors
    /// `Config` if the TLS backend cannot be initialised.
    pub fn new(timeout: Option<Duration>) -> WalletResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| WalletError::Config(format!("HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url)
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        self.client.post(url)
    }

    /// Sends a request and returns the body of a 2xx response.
    pub async fn send(&self, request: RequestBuilder, fail: Failure) -> WalletResult<String> {
        let (status, url, body) = match request.send().await {
            Ok(response) => {
                let status = response.status();
                let url = response.url().to_string();
                let body = response.text().await.map_err(|e| fail(e.to_string()))?;
                (status, url, body)
            }
            Err(e) => {
                let err = fail(e.to_string());
                log::error!("{}", err);
                return Err(err);
            }
        };

        if status == StatusCode::FORBIDDEN {
            log::warn!("{} answered 403", url);
            return Err(WalletError::Forbidden(detail(status, &url, &body)));
        }
        if !status.is_success() {
            let err = fail(detail(status, &url, &body));
            log::error!("{}", err);
            return Err(err);
        }
        log::debug!("{} answered {}", url, status);
        Ok(body)
    }

    /// [`send`](Self::send), then parses the body as JSON.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        fail: Failure,
    ) -> WalletResult<T> {
        let body = self.send(request, fail).await?;
        serde_json::from_str(&body).map_err(|e| fail(format!("invalid response body: {}", e)))
    }

    /// Sends a request and hands back status and body whatever the status.
    /// Only a transport error fails.
    pub async fn exchange(&self, request: RequestBuilder) -> Result<(StatusCode, String), reqwest::Error> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }
}

/// Failure detail: the server's body when it sent one.
fn detail(status: StatusCode, url: &str, body: &str) -> String {
    if body.trim().is_empty() {
        format!("HTTP {} from {}", status, url)
    } else {
        body.to_string()
    }
}
