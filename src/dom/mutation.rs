//! Mutations the normalizer emits, and the seam through which a host applies
//! them to its live document.

use super::{Document, NodeId};
use crate::Result;

/// Markup for a new element subtree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSpec {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<ElementSpec>,
}

impl ElementSpec {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        let name = name.to_ascii_lowercase();
        if let Some(slot) = self.attrs.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value.to_string();
        } else {
            self.attrs.push((name, value.to_string()));
        }
        self
    }

    pub fn child(mut self, child: ElementSpec) -> Self {
        self.children.push(child);
        self
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Deep copy of the element subtree rooted at `id`. Text nodes are not copied.
    pub fn from_element(doc: &Document, id: NodeId) -> Option<Self> {
        let el = doc.element(id)?;
        let mut spec = ElementSpec::new(el.tag());
        spec.attrs = el.attrs().map(|(n, v)| (n.to_string(), v.to_string())).collect();
        spec.children = doc
            .element_children(id)
            .into_iter()
            .filter_map(|c| ElementSpec::from_element(doc, c))
            .collect();
        Some(spec)
    }
}

/// A single change to the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomMutation {
    /// Insert a new element as the previous sibling of `reference`
    InsertBefore { reference: NodeId, element: ElementSpec },
    /// Append a new element as the last child of `parent`
    AppendChild { parent: NodeId, element: ElementSpec },
    /// Move an existing node to be the first child of `parent`
    PrependExisting { parent: NodeId, node: NodeId },
    /// Detach a node and its subtree
    Remove { node: NodeId },
    /// Set one inline style property
    SetStyle { node: NodeId, property: String, value: String },
    /// Set an attribute
    SetAttribute { node: NodeId, name: String, value: String },
}

impl Document {
    /// Apply one mutation. Returns the id of a newly created element, if any.
    pub fn apply(&mut self, mutation: &DomMutation) -> Result<Option<NodeId>> {
        match mutation {
            DomMutation::InsertBefore { reference, element } => {
                let id = self.instantiate(element);
                self.insert_before(*reference, id)?;
                Ok(Some(id))
            }
            DomMutation::AppendChild { parent, element } => {
                let id = self.instantiate(element);
                self.append_child(*parent, id)?;
                Ok(Some(id))
            }
            DomMutation::PrependExisting { parent, node } => {
                self.prepend_child(*parent, *node)?;
                Ok(None)
            }
            DomMutation::Remove { node } => {
                self.detach(*node)?;
                Ok(None)
            }
            DomMutation::SetStyle { node, property, value } => {
                let mut style = self
                    .element(*node)
                    .map(|e| e.style())
                    .ok_or_else(|| crate::Error::Dom(format!("node {:?} is not an element", node)))?;
                style.set(property, value);
                self.set_attr(*node, "style", &style.to_string())?;
                Ok(None)
            }
            DomMutation::SetAttribute { node, name, value } => {
                self.set_attr(*node, name, value)?;
                Ok(None)
            }
        }
    }
}

/// Access to the host's live document.
///
/// `snapshot` describes the document with ids that `apply` understands; ids of
/// elements created by `InsertBefore`/`AppendChild` are never referenced by
/// later mutations.
pub trait DomHandle {
    fn snapshot(&self) -> Result<Document>;
    fn apply(&mut self, mutations: &[DomMutation]) -> Result<()>;
}

/// A `DomHandle` over an owned document, for headless hosts and tests
#[derive(Debug, Clone, Default)]
pub struct InMemoryDom {
    document: Document,
}

impl InMemoryDom {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    pub fn from_html(html: &str) -> Self {
        Self::new(Document::parse_html(html))
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }
}

impl DomHandle for InMemoryDom {
    fn snapshot(&self) -> Result<Document> {
        Ok(self.document.clone())
    }

    fn apply(&mut self, mutations: &[DomMutation]) -> Result<()> {
        for m in mutations {
            self.document.apply(m)?;
        }
        Ok(())
    }
}
