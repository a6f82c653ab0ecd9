//! RFox Screenshot Capture
//!
//! Captures a single fixed-size PNG of a rendered page region and hands it to
//! a storage endpoint.
//!
//! # Pipeline
//!
//! - **Normalize**: rewrite the document so an external rasterizer can paint
//!   the target region (iframes become placeholders, sliders keep one slide,
//!   the target is isolated, cross-origin stylesheets are proxied)
//! - **Capture**: wait for the page load or a timeout, then rasterize once
//! - **Postprocess**: scale to the crop width and clip from the top
//! - **Persist**: submit the PNG; failure is reported, never raised
//! - **Notify**: broadcast `capture-screenshot-done` exactly once
//!
//! # Example
//!
//! ```no_run
//! use rfshot::{CaptureConfig, CapturePipeline, Collaborators, InMemoryDom};
//! # use std::sync::Arc;
//! # async fn demo(
//! #     rasterizer: Arc<dyn rfshot::Rasterizer>,
//! #     persistence: Arc<dyn rfshot::Persistence>,
//! # ) -> rfshot::Result<()> {
//! let config = CaptureConfig::from_json(
//!     r##"{"selector":"#content","home_url":"https://example.com","nonce":"abc","post_id":42}"##,
//! )?;
//! let pipeline = CapturePipeline::new(
//!     config,
//!     Collaborators {
//!         rasterizer,
//!         persistence,
//!         notifier: Arc::new(|m: &rfshot::CompletionMessage| println!("{}", m.name)),
//!     },
//! )?;
//!
//! let mut dom = InMemoryDom::from_html("<html><body><div id=content></div></body></html>");
//! let report = pipeline.run(&mut dom, async {}).await?;
//! println!("saved: {:?}", report.outcome.url());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod config;
pub use config::{CaptureConfig, CaptureOverrides, Crop, PostId, VideoProvider};

// Owned document tree, selectors and the host mutation seam
pub mod dom;
pub use dom::{Document, DomHandle, DomMutation, InMemoryDom, NodeId};

pub mod normalize;
pub use normalize::{normalize, Normalization, ResourceKind, ResourceRequest};

pub mod capture;
pub use capture::{Rasterizer, RawBitmap, ReadySignal, RenderOptions};

pub mod data_uri;

pub mod postprocess;
pub use postprocess::FinalCanvas;

pub mod persist;
#[cfg(feature = "http")]
pub use persist::AjaxPersistence;
pub use persist::{Persistence, SaveOutcome, SaveRequest};

pub mod diagnostics;
pub use diagnostics::{Diagnostic, DiagnosticHandler, DiagnosticLevel};

pub mod pipeline;
pub use pipeline::{
    run_capture, CaptureReport, CapturePipeline, Collaborators, CompletionMessage,
    CompletionNotifier,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = CaptureConfig::default();
        assert_eq!(config.crop, Crop { width: 1200, height: 1500 });
        assert_eq!(config.timeout_ms, 5000);
        assert_eq!(config.exclude_css_urls, vec!["https://kit-pro.fontawesome.com"]);
        assert!(!config.debug);
    }

    #[test]
    fn test_pipeline_rejects_invalid_config() {
        struct Never;
        #[async_trait::async_trait(?Send)]
        impl Rasterizer for Never {
            async fn render(&self, _: &Document, _: NodeId, _: &RenderOptions) -> Result<RawBitmap> {
                unreachable!()
            }
        }
        #[async_trait::async_trait]
        impl Persistence for Never {
            async fn save(&self, _: &SaveRequest) -> Result<String> {
                unreachable!()
            }
        }

        let collaborators = Collaborators {
            rasterizer: std::sync::Arc::new(Never),
            persistence: std::sync::Arc::new(Never),
            notifier: std::sync::Arc::new(|_: &CompletionMessage| {}),
        };
        let config = CaptureConfig {
            selector: String::new(),
            ..Default::default()
        };
        assert!(matches!(
            CapturePipeline::new(config, collaborators),
            Err(Error::Config(_))
        ));
    }
}
