//! Persistence client: hand the final canvas to the storage endpoint.
//!
//! Delivery is best-effort. [`persist`] never fails; the outcome is reported
//! as a [`SaveOutcome`] so callers can inspect it, while the pipeline carries
//! on to completion either way.

use crate::config::PostId;
use crate::Result;
use async_trait::async_trait;
use serde::Serialize;

/// Name of the remote save operation
pub const SAVE_ACTION: &str = "screenshot_save";

/// Payload of the save operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveRequest {
    pub post_id: Option<PostId>,
    /// PNG data URI
    pub screenshot: String,
}

/// The external storage endpoint
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Store the screenshot; returns the stored asset URL
    async fn save(&self, request: &SaveRequest) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { url: String },
    Failed { reason: String },
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved { .. })
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            SaveOutcome::Saved { url } => Some(url),
            SaveOutcome::Failed { .. } => None,
        }
    }
}

/// Percent-encode an asset URL for display
pub(crate) fn display_url(url: &str) -> String {
    url::Url::parse(url)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| url.replace(' ', "%20"))
}

/// Submit `request`; failures are folded into the outcome
pub async fn persist(persistence: &dyn Persistence, request: &SaveRequest) -> SaveOutcome {
    match persistence.save(request).await {
        Ok(url) => {
            log::debug!("screenshot stored at {}", display_url(&url));
            SaveOutcome::Saved { url }
        }
        Err(e) => {
            log::debug!("screenshot save failed: {}", e);
            SaveOutcome::Failed {
                reason: e.to_string(),
            }
        }
    }
}

#[cfg(feature = "http")]
pub use http::AjaxPersistence;

#[cfg(feature = "http")]
mod http {
    use super::{Persistence, SaveRequest, SAVE_ACTION};
    use crate::{Error, Result};
    use async_trait::async_trait;
    use serde::Deserialize;
    use std::time::Duration;

    #[derive(Debug, Deserialize)]
    struct AjaxResponse {
        success: bool,
        #[serde(default)]
        data: serde_json::Value,
    }

    /// Persistence over an HTTP endpoint accepting
    /// `{"action": "screenshot_save", "data": {...}}` and answering
    /// `{"success": bool, "data": <url or error>}`
    #[derive(Debug, Clone)]
    pub struct AjaxPersistence {
        client: reqwest::Client,
        endpoint: String,
        nonce: Option<String>,
    }

    impl AjaxPersistence {
        pub fn new(endpoint: &str) -> Result<Self> {
            Self::with_timeout(endpoint, Duration::from_secs(30))
        }

        pub fn with_timeout(endpoint: &str, timeout: Duration) -> Result<Self> {
            url::Url::parse(endpoint)?;
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| Error::Persistence(format!("Failed to build HTTP client: {}", e)))?;
            Ok(Self {
                client,
                endpoint: endpoint.to_string(),
                nonce: None,
            })
        }

        /// Send `nonce` as the `X-WP-Nonce` header
        pub fn with_nonce(mut self, nonce: &str) -> Self {
            self.nonce = Some(nonce.to_string());
            self
        }
    }

    #[async_trait]
    impl Persistence for AjaxPersistence {
        async fn save(&self, request: &SaveRequest) -> Result<String> {
            let body = serde_json::json!({ "action": SAVE_ACTION, "data": request });
            let mut req = self.client.post(&self.endpoint).json(&body);
            if let Some(nonce) = &self.nonce {
                req = req.header("X-WP-Nonce", nonce);
            }
            let resp = req.send().await?.error_for_status()?;
            let parsed: AjaxResponse = resp.json().await?;

            match (parsed.success, parsed.data) {
                (true, serde_json::Value::String(url)) => Ok(url),
                (true, other) => Err(Error::Persistence(format!(
                    "unexpected response payload: {}",
                    other
                ))),
                (false, serde_json::Value::String(msg)) => Err(Error::Persistence(msg)),
                (false, other) => Err(Error::Persistence(format!("save rejected: {}", other))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    struct Fixed(std::result::Result<&'static str, &'static str>);

    #[async_trait]
    impl Persistence for Fixed {
        async fn save(&self, _request: &SaveRequest) -> Result<String> {
            self.0
                .map(String::from)
                .map_err(|e| Error::Persistence(e.to_string()))
        }
    }

    fn request() -> SaveRequest {
        SaveRequest {
            post_id: Some(PostId::Number(42)),
            screenshot: "data:image/png;base64,AAAA".into(),
        }
    }

    #[test]
    fn request_serializes_to_wire_payload() {
        let v = serde_json::to_value(request()).unwrap();
        assert_eq!(v, serde_json::json!({"post_id": 42, "screenshot": "data:image/png;base64,AAAA"}));
    }

    #[tokio::test]
    async fn success_and_failure_become_outcomes() {
        let saved = persist(&Fixed(Ok("https://site.test/shot 1.png")), &request()).await;
        assert_eq!(saved.url(), Some("https://site.test/shot 1.png"));
        assert!(saved.is_saved());

        let failed = persist(&Fixed(Err("disk full")), &request()).await;
        assert!(!failed.is_saved());
        assert!(matches!(failed, SaveOutcome::Failed { ref reason } if reason.contains("disk full")));
    }

    #[test]
    fn display_url_percent_encodes() {
        assert_eq!(display_url("https://site.test/a b.png"), "https://site.test/a%20b.png");
    }
}
