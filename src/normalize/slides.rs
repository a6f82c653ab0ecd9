//! Slideshow reduction: a static capture shows one slide, so every slideshow
//! container keeps only its first element child.

use super::Rewrite;
use crate::dom::{DomMutation, NodeId};
use crate::Result;

/// Class marking a slideshow container
pub const SLIDES_CLASS: &str = "elementor-slides";

pub(crate) fn reduce_slides(rw: &mut Rewrite, root: NodeId) -> Result<()> {
    let containers: Vec<NodeId> = rw
        .document
        .descendants(root)
        .into_iter()
        .filter(|n| {
            rw.document
                .element(*n)
                .map(|e| e.has_class(SLIDES_CLASS))
                .unwrap_or(false)
        })
        .collect();

    for container in containers {
        if !rw.document.is_attached(container) {
            continue;
        }
        let extra: Vec<NodeId> = rw
            .document
            .element_children(container)
            .into_iter()
            .skip(1)
            .collect();
        for slide in extra {
            rw.emit(DomMutation::Remove { node: slide })?;
        }
    }
    Ok(())
}
