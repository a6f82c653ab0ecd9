//! DOM normalization: rewrite the document so an external rasterizer can
//! render the target subtree faithfully.
//!
//! [`normalize`] is a pure pass over a [`Document`] snapshot. It returns the
//! ordered [`DomMutation`]s a host applies to its live document, along with the
//! normalized tree those mutations produce. Passes run in a fixed order
//! (iframes, slides, isolation, stylesheets); each pass sees the result of the
//! previous ones.

pub mod iframes;
pub mod isolate;
pub mod slides;
pub mod stylesheets;

pub use iframes::{IframeReplacement, ReplacementKind};

use crate::dom::{parse_selector, Document, DomMutation, NodeId};
use crate::{CaptureConfig, Error, Result};

/// What a new element or rewritten reference will fetch once inserted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Image,
    Stylesheet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    pub url: String,
    pub kind: ResourceKind,
    /// Must be loaded with anonymous CORS
    pub cross_origin: bool,
}

/// Output of [`normalize`]
#[derive(Debug, Clone)]
pub struct Normalization {
    /// The document after every mutation was applied
    pub document: Document,
    /// The target root
    pub root: NodeId,
    /// Mutations in application order
    pub mutations: Vec<DomMutation>,
    pub resources: Vec<ResourceRequest>,
    pub replacements: Vec<IframeReplacement>,
}

/// Working state shared by the passes: every emitted mutation is applied to
/// the working tree immediately and recorded.
pub(crate) struct Rewrite {
    pub(crate) document: Document,
    pub(crate) mutations: Vec<DomMutation>,
    pub(crate) resources: Vec<ResourceRequest>,
}

impl Rewrite {
    fn new(document: Document) -> Self {
        Self {
            document,
            mutations: Vec::new(),
            resources: Vec::new(),
        }
    }

    pub(crate) fn emit(&mut self, mutation: DomMutation) -> Result<()> {
        self.document.apply(&mutation)?;
        self.mutations.push(mutation);
        Ok(())
    }

    pub(crate) fn request(&mut self, url: String, kind: ResourceKind, cross_origin: bool) {
        self.resources.push(ResourceRequest {
            url,
            kind,
            cross_origin,
        });
    }
}

/// Resolve the target root: the first element matching the configured selector.
pub fn find_root(document: &Document, selector: &str) -> Result<NodeId> {
    let selector_list = parse_selector(selector)?;
    document
        .select(&selector_list)
        .into_iter()
        .next()
        .ok_or_else(|| Error::TargetNotFound(selector.to_string()))
}

/// Normalize `document` for capture.
///
/// Fails with [`Error::TargetNotFound`] before producing any mutation when the
/// selector matches nothing.
pub fn normalize(document: &Document, config: &CaptureConfig) -> Result<Normalization> {
    let root = find_root(document, &config.selector)?;
    let providers = config.compiled_providers()?;

    let mut rw = Rewrite::new(document.clone());
    let replacements = iframes::replace_iframes(&mut rw, root, config, &providers)?;
    slides::reduce_slides(&mut rw, root)?;
    isolate::isolate_root(&mut rw, root)?;
    stylesheets::proxy_stylesheets(&mut rw, config)?;

    log::debug!(
        "normalized {}: {} mutations, {} iframes replaced, {} resources",
        config.selector,
        rw.mutations.len(),
        replacements.len(),
        rw.resources.len()
    );

    Ok(Normalization {
        document: rw.document,
        root,
        mutations: rw.mutations,
        resources: rw.resources,
        replacements,
    })
}
