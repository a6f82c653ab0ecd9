//! Isolation: move the target root to the top of `<body>` and hide every other
//! top-level body element, so the captured body is exactly the root's box.

use super::Rewrite;
use crate::dom::{DomMutation, NodeId};
use crate::{Error, Result};

pub(crate) fn isolate_root(rw: &mut Rewrite, root: NodeId) -> Result<()> {
    let body = rw
        .document
        .body()
        .ok_or_else(|| Error::Dom("document has no <body>".into()))?;

    // Root is <body> or <html>: nothing else to hide
    if rw.document.is_inclusive_ancestor(root, body) {
        return Ok(());
    }

    rw.emit(DomMutation::PrependExisting {
        parent: body,
        node: root,
    })?;

    let others: Vec<NodeId> = rw
        .document
        .element_children(body)
        .into_iter()
        .filter(|n| *n != root)
        .collect();
    for node in others {
        rw.emit(DomMutation::SetStyle {
            node,
            property: "display".into(),
            value: "none".into(),
        })?;
    }
    Ok(())
}
