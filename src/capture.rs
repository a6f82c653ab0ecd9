//! Capture orchestration: decide when the page is ready, then invoke the
//! external rasterizer exactly once.

use crate::data_uri::DataUri;
use crate::dom::{Document, NodeId};
use crate::{Error, Result};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// Bitmap produced by the rasterizer: a data URI of the full target at native size
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBitmap(String);

impl RawBitmap {
    pub fn new(data_uri: impl Into<String>) -> Self {
        Self(data_uri.into())
    }

    /// Wrap encoded image bytes
    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Self {
        Self(DataUri::encode(mime_type, bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn decode(&self) -> Result<DataUri> {
        DataUri::parse(&self.0)
    }
}

/// Options passed through to the rasterizer. Beyond the output type the
/// rasterizer's own defaults govern scale and fidelity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub mime_type: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            mime_type: "image/png".to_string(),
        }
    }
}

/// The external DOM-to-bitmap engine.
///
/// The document is borrowed across the render call and is not `Sync`, so
/// render futures are not required to be `Send`.
#[async_trait(?Send)]
pub trait Rasterizer: Send + Sync {
    /// Render `target` of `document`. Any error is a hard failure.
    async fn render(
        &self,
        document: &Document,
        target: NodeId,
        options: &RenderOptions,
    ) -> Result<RawBitmap>;
}

/// Which signal started the capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadySignal {
    /// The page reported it finished loading
    Loaded,
    /// The timeout elapsed first
    TimedOut,
}

/// Resolve on the first of `page_loaded` and `timeout`. The other signal is
/// dropped and has no effect if it fires later.
pub async fn wait_until_ready<F>(page_loaded: F, timeout: Duration) -> ReadySignal
where
    F: Future<Output = ()>,
{
    tokio::select! {
        biased;
        _ = page_loaded => ReadySignal::Loaded,
        _ = tokio::time::sleep(timeout) => ReadySignal::TimedOut,
    }
}

/// Invoke the rasterizer once against `target`
pub async fn render_once(
    rasterizer: &dyn Rasterizer,
    document: &Document,
    target: NodeId,
) -> Result<RawBitmap> {
    rasterizer
        .render(document, target, &RenderOptions::default())
        .await
        .map_err(|e| match e {
            Error::Render(_) => e,
            other => Error::Render(other.to_string()),
        })
}

/// Wait for readiness, then render `target` once
pub async fn capture<F>(
    rasterizer: &dyn Rasterizer,
    document: &Document,
    target: NodeId,
    page_loaded: F,
    timeout: Duration,
) -> Result<(ReadySignal, RawBitmap)>
where
    F: Future<Output = ()>,
{
    let ready = wait_until_ready(page_loaded, timeout).await;
    log::debug!("capture triggered by {:?}", ready);
    let bitmap = render_once(rasterizer, document, target).await?;
    Ok((ready, bitmap))
}
