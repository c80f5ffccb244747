//! Shared code-aggregator sync.
//!
//! Fire-and-forget notifier: validated/invalidated codes get pushed to a
//! remote aggregator other deployments share, and the discovery sweep pulls
//! its recent list. None of this is load-bearing; failures are logged and
//! the caller moves on.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use crate::http::HttpClient;
use crate::Error;

pub struct AggregatorClient {
    http: Arc<dyn HttpClient>,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct CodeList {
    #[serde(default)]
    codes: Vec<String>,
}

impl AggregatorClient {
    pub fn new(http: Arc<dyn HttpClient>, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Push one code with its settled validity. Never fails the caller.
    pub async fn push_code(&self, code: &str, valid: bool) {
        let body = serde_json::json!({ "code": code, "valid": valid });
        match self
            .http
            .post_json(&format!("{}/giftcode", self.base_url), body)
            .await
        {
            Ok(_) => info!("pushed code {code} (valid={valid}) to aggregator"),
            Err(e) => warn!("aggregator push for {code} failed: {e}"),
        }
    }

    /// Pull the aggregator's current code list.
    pub async fn fetch_codes(&self) -> Result<Vec<String>, Error> {
        let text = self
            .http
            .get(&format!("{}/giftcodes", self.base_url))
            .await?;
        let list: CodeList = serde_json::from_str(&text)
            .map_err(|e| Error::Platform(format!("aggregator list parse: {e}")))?;
        Ok(list.codes)
    }
}
