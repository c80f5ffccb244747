//! HTTP client abstraction for the remote gift-code API and the code
//! aggregator.
//!
//! The trait exists so platform clients can be tested against scripted
//! responses without real network traffic; the default implementation wraps
//! reqwest and adds a bounded retry with exponential backoff for transport
//! errors and 429/5xx responses. Protocol-level rate limiting (the API's
//! "TOO FREQUENT" replies) is handled above this layer, not here.

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::Error;

/// Total attempts (first try included) before a transport error is surfaced.
const MAX_TRANSPORT_ATTEMPTS: u32 = 10;
const BACKOFF_BASE: Duration = Duration::from_millis(500);
const BACKOFF_CAP: Duration = Duration::from_secs(10);

/// A generic trait for the HTTP calls the core makes.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// POST an `application/x-www-form-urlencoded` body, returning the
    /// response body text.
    async fn post_form(&self, url: &str, body: String) -> Result<String, Error>;

    /// POST a JSON body, returning the response body text.
    async fn post_json(&self, url: &str, body: serde_json::Value) -> Result<String, Error>;

    /// GET a URL, returning the response body text.
    async fn get(&self, url: &str) -> Result<String, Error>;
}

#[derive(Clone)]
pub struct DefaultHttpClient {
    client: reqwest::Client,
}

impl DefaultHttpClient {
    pub fn new() -> Result<Self, Error> {
        let client = reqwest::ClientBuilder::new()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Platform(format!("Failed to build reqwest client: {e}")))?;
        Ok(Self { client })
    }

    /// Sends a request built by `make`, retrying transport failures and
    /// 429/5xx statuses with capped exponential backoff.
    async fn send_with_retry<F>(&self, make: F) -> Result<String, Error>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder + Send + Sync,
    {
        let mut backoff = BACKOFF_BASE;
        for attempt in 1..=MAX_TRANSPORT_ATTEMPTS {
            let result = make(&self.client).send().await;
            match result {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return Ok(resp.text().await?);
                    }
                    let retryable =
                        status.as_u16() == 429 || status.is_server_error();
                    let body = resp.text().await.unwrap_or_default();
                    if !retryable || attempt == MAX_TRANSPORT_ATTEMPTS {
                        return Err(Error::Platform(format!(
                            "HTTP {status} => {body}"
                        )));
                    }
                    warn!("HTTP {} on attempt {}/{}; backing off {:?}",
                        status, attempt, MAX_TRANSPORT_ATTEMPTS, backoff);
                }
                Err(e) => {
                    if attempt == MAX_TRANSPORT_ATTEMPTS {
                        return Err(e.into());
                    }
                    warn!("transport error on attempt {}/{}: {e}; backing off {:?}",
                        attempt, MAX_TRANSPORT_ATTEMPTS, backoff);
                }
            }
            tokio::time::sleep(backoff).await;
            backoff = std::cmp::min(backoff * 2, BACKOFF_CAP);
        }
        unreachable!("retry loop returns before exhausting attempts")
    }
}

#[async_trait]
impl HttpClient for DefaultHttpClient {
    async fn post_form(&self, url: &str, body: String) -> Result<String, Error> {
        self.send_with_retry(|c| {
            c.post(url)
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(body.clone())
        })
        .await
    }

    async fn post_json(&self, url: &str, body: serde_json::Value) -> Result<String, Error> {
        self.send_with_retry(|c| c.post(url).json(&body)).await
    }

    async fn get(&self, url: &str) -> Result<String, Error> {
        self.send_with_retry(|c| c.get(url)).await
    }
}
