//! The capture pipeline: normalize, capture, postprocess, persist, then
//! signal completion.
//!
//! Stages run strictly in sequence. Failures before persistence stop the
//! pipeline without a completion signal; a persistence failure is only
//! reported, and the completion signal still fires exactly once.

use crate::capture::{self, Rasterizer, ReadySignal};
use crate::config::CaptureConfig;
use crate::diagnostics::{Diagnostic, DiagnosticHandler, Diagnostics};
use crate::dom::DomHandle;
use crate::normalize::{self, IframeReplacement, ResourceRequest};
use crate::persist::{self, display_url, Persistence, SaveOutcome, SaveRequest};
use crate::postprocess;
use crate::{Error, Result};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Name carried by the completion message
pub const COMPLETION_MESSAGE_NAME: &str = "capture-screenshot-done";

/// One-shot message broadcast once the pipeline has finished
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionMessage {
    pub name: String,
}

impl Default for CompletionMessage {
    fn default() -> Self {
        Self {
            name: COMPLETION_MESSAGE_NAME.to_string(),
        }
    }
}

/// Observer of the completion message. Fire-and-forget; no reply is expected.
pub trait CompletionNotifier: Send + Sync {
    fn notify(&self, message: &CompletionMessage);
}

impl<F> CompletionNotifier for F
where
    F: Fn(&CompletionMessage) + Send + Sync,
{
    fn notify(&self, message: &CompletionMessage) {
        self(message)
    }
}

/// External collaborators the pipeline drives
#[derive(Clone)]
pub struct Collaborators {
    pub rasterizer: Arc<dyn Rasterizer>,
    pub persistence: Arc<dyn Persistence>,
    pub notifier: Arc<dyn CompletionNotifier>,
}

/// Summary of a finished run
#[derive(Debug, Clone)]
pub struct CaptureReport {
    pub ready: ReadySignal,
    pub outcome: SaveOutcome,
    pub width: u32,
    pub height: u32,
    pub replacements: Vec<IframeReplacement>,
    pub resources: Vec<ResourceRequest>,
    pub elapsed: Duration,
}

pub struct CapturePipeline {
    config: CaptureConfig,
    collaborators: Collaborators,
    on_diagnostic: Option<DiagnosticHandler>,
}

impl CapturePipeline {
    /// Create a pipeline; the configuration is validated here and read-only afterwards.
    pub fn new(config: CaptureConfig, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            collaborators,
            on_diagnostic: None,
        })
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Register a callback receiving every diagnostic line
    pub fn on_diagnostic<F>(&mut self, cb: F)
    where
        F: Fn(&Diagnostic) + Send + Sync + 'static,
    {
        self.on_diagnostic = Some(Arc::new(cb));
    }

    pub fn clear_on_diagnostic(&mut self) {
        self.on_diagnostic = None;
    }

    /// Run the pipeline once against `dom`. `page_loaded` resolves when the
    /// page reports it finished loading.
    pub async fn run<D, L>(&self, dom: &mut D, page_loaded: L) -> Result<CaptureReport>
    where
        D: DomHandle + ?Sized,
        L: Future<Output = ()>,
    {
        let diag = Diagnostics::new(
            self.config.debug,
            &self.config.timer_label,
            self.on_diagnostic.clone(),
        );
        diag.progress("Screenshot init");

        let snapshot = dom.snapshot()?;
        let normalized = match normalize::normalize(&snapshot, &self.config) {
            Ok(n) => n,
            Err(e @ Error::TargetNotFound(_)) => {
                diag.warn("Screenshots: content was not found");
                return Err(e);
            }
            Err(e) => {
                diag.error(&format!("Screenshots: normalization failed: {}", e));
                return Err(e);
            }
        };
        dom.apply(&normalized.mutations)?;

        let live = dom.snapshot()?;
        let body = live
            .body()
            .ok_or_else(|| Error::Dom("document has no body".to_string()))?;

        let timeout = Duration::from_millis(self.config.timeout_ms);
        let ready = capture::wait_until_ready(page_loaded, timeout).await;
        log::debug!("capture triggered by {:?}", ready);
        diag.progress("Start creating screenshot.");

        let raw = match capture::render_once(self.collaborators.rasterizer.as_ref(), &live, body).await {
            Ok(raw) => raw,
            Err(e) => {
                diag.error(&format!("Screenshots: {}", e));
                return Err(e);
            }
        };

        let canvas = postprocess::postprocess(raw, self.config.crop).await?;
        let request = SaveRequest {
            post_id: self.config.post_id.clone(),
            screenshot: canvas.to_data_uri()?,
        };
        let outcome = persist::persist(self.collaborators.persistence.as_ref(), &request).await;
        match &outcome {
            SaveOutcome::Saved { url } => {
                diag.progress(&format!("Screenshot created: {}", display_url(url)))
            }
            SaveOutcome::Failed { .. } => diag.progress("Failed to create screenshot."),
        }

        self.collaborators
            .notifier
            .notify(&CompletionMessage::default());
        diag.progress("Screenshot End.");

        Ok(CaptureReport {
            ready,
            outcome,
            width: canvas.width(),
            height: canvas.height(),
            replacements: normalized.replacements,
            resources: normalized.resources,
            elapsed: diag.elapsed(),
        })
    }
}

/// Validate `config`, then run the pipeline once
pub async fn run_capture<D, L>(
    config: CaptureConfig,
    collaborators: Collaborators,
    dom: &mut D,
    page_loaded: L,
) -> Result<CaptureReport>
where
    D: DomHandle + ?Sized,
    L: Future<Output = ()>,
{
    CapturePipeline::new(config, collaborators)?
        .run(dom, page_loaded)
        .await
}
