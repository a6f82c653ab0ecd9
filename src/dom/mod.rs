//! Document model used by the normalizer.
//!
//! A [`Document`] wraps a parsed `scraper::Html` tree. Nodes are addressed by
//! the tree's [`NodeId`]s, which stay valid after a node is detached, so ids
//! held by earlier mutations stay meaningful. Host-measured layout sizes and
//! computed styles ride alongside the tree, keyed by node.

pub mod mutation;
pub mod style;

pub use ego_tree::NodeId;
pub use mutation::{DomHandle, DomMutation, ElementSpec, InMemoryDom};
pub use style::Style;

use crate::{Error, Result};
use ego_tree::{NodeMut, NodeRef};
use html5ever::tendril::StrTendril;
use html5ever::{Attribute, LocalName, Namespace, QualName};
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashMap;
use std::fmt;

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Parse a CSS selector
pub fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| Error::InvalidSelector(format!("{}: {:?}", selector, e)))
}

/// Host-measured rendered size of an element, in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

/// Borrowed view of one element and the host data attached to it
#[derive(Clone, Copy)]
pub struct Element<'a> {
    node: ElementRef<'a>,
    layout: Option<Size>,
    computed: Option<&'a Style>,
}

impl<'a> Element<'a> {
    pub fn id(&self) -> NodeId {
        self.node.id()
    }

    pub fn tag(&self) -> &'a str {
        self.node.value().name()
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.node.value().attr(name)
    }

    pub fn attrs(&self) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.node.value().attrs()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|c| c.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    /// Inline style parsed from the `style` attribute
    pub fn style(&self) -> Style {
        self.attr("style").map(Style::parse).unwrap_or_default()
    }

    /// Computed style as reported by the host
    pub fn computed_style(&self) -> Option<&'a Style> {
        self.computed
    }

    /// Computed style when the host measured one, else the inline style
    pub fn effective_style(&self) -> Style {
        self.computed.cloned().unwrap_or_else(|| self.style())
    }

    /// Rendered size as reported by the host
    pub fn layout(&self) -> Option<Size> {
        self.layout
    }

    pub fn element_ref(&self) -> ElementRef<'a> {
        self.node
    }
}

#[derive(Clone)]
pub struct Document {
    html: Html,
    layout: HashMap<NodeId, Size>,
    computed: HashMap<NodeId, Style>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("html", &self.to_html())
            .field("layout", &self.layout)
            .field("computed", &self.computed)
            .finish()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Html> for Document {
    fn from(html: Html) -> Self {
        Self {
            html,
            layout: HashMap::new(),
            computed: HashMap::new(),
        }
    }
}

impl Document {
    /// An empty standards-mode document
    pub fn new() -> Self {
        Self::parse_html("<!DOCTYPE html><html><head></head><body></body></html>")
    }

    pub fn parse_html(html: &str) -> Self {
        Html::parse_document(html).into()
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    /// The document element (`<html>`)
    pub fn root(&self) -> NodeId {
        self.html.root_element().id()
    }

    fn node(&self, id: NodeId) -> Option<NodeRef<'_, Node>> {
        self.html.tree.get(id)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<NodeMut<'_, Node>> {
        self.html
            .tree
            .get_mut(id)
            .ok_or_else(|| Error::Dom(format!("unknown node {:?}", id)))
    }

    pub fn element(&self, id: NodeId) -> Option<Element<'_>> {
        let node = ElementRef::wrap(self.node(id)?)?;
        Some(Element {
            node,
            layout: self.layout.get(&id).copied(),
            computed: self.computed.get(&id),
        })
    }

    /// Record the host-measured size of `id`
    pub fn set_layout(&mut self, id: NodeId, size: Size) {
        self.layout.insert(id, size);
    }

    /// Record the host-computed style of `id`
    pub fn set_computed_style(&mut self, id: NodeId, style: Style) {
        self.computed.insert(id, style);
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent().map(|p| p.id())
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id)
            .map(|n| {
                n.children()
                    .filter(|c| c.value().is_element())
                    .map(|c| c.id())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The element immediately following `id` among its siblings, skipping
    /// text and comments
    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?
            .next_siblings()
            .find(|s| s.value().is_element())
            .map(|s| s.id())
    }

    /// Whether `id` is reachable from the document node
    pub fn is_attached(&self, id: NodeId) -> bool {
        let top = self.html.tree.root().id();
        match self.node(id) {
            Some(n) => n.id() == top || n.ancestors().any(|a| a.id() == top),
            None => false,
        }
    }

    /// Whether `ancestor` is `id` or one of its ancestors
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        match self.node(id) {
            Some(n) => id == ancestor || n.ancestors().any(|a| a.id() == ancestor),
            None => false,
        }
    }

    /// Descendants of `id` in document order, excluding `id` itself
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id)
            .map(|n| n.descendants().skip(1).map(|d| d.id()).collect())
            .unwrap_or_default()
    }

    /// Element descendants of `id` with the given tag, in document order
    pub fn descendants_by_tag(&self, id: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|n| {
                self.element(*n)
                    .map(|e| e.tag().eq_ignore_ascii_case(tag))
                    .unwrap_or(false)
            })
            .collect()
    }

    fn first_by_tag(&self, tag: &str) -> Option<NodeId> {
        let root = self.root();
        std::iter::once(root)
            .chain(self.descendants(root))
            .find(|n| self.element(*n).map(|e| e.tag() == tag).unwrap_or(false))
    }

    pub fn head(&self) -> Option<NodeId> {
        self.first_by_tag("head")
    }

    pub fn body(&self) -> Option<NodeId> {
        self.first_by_tag("body")
    }

    /// Attached elements matching `selector`, in document order
    pub fn select(&self, selector: &Selector) -> Vec<NodeId> {
        let root = self.html.root_element();
        std::iter::once(root)
            .filter(|r| selector.matches(r))
            .chain(root.select(selector))
            .map(|e| e.id())
            .collect()
    }

    /// Concatenated text of `id` and its descendants
    pub fn text(&self, id: NodeId) -> String {
        self.node(id)
            .map(|n| {
                n.descendants()
                    .filter_map(|d| d.value().as_text().map(|t| &**t))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Serialize the whole document, doctype included
    pub fn to_html(&self) -> String {
        self.html.html()
    }

    /// Create the subtree described by `spec`, detached
    pub fn instantiate(&mut self, spec: &ElementSpec) -> NodeId {
        let element = new_element(&spec.tag, spec.attrs.iter().map(|(n, v)| (n.as_str(), v.as_str())));
        let id = self.html.tree.orphan(Node::Element(element)).id();
        for child in &spec.children {
            let cid = self.instantiate(child);
            if let Some(mut parent) = self.html.tree.get_mut(id) {
                parent.append_id(cid);
            }
        }
        id
    }

    fn expect_element(&self, id: NodeId) -> Result<Element<'_>> {
        if self.node(id).is_none() {
            return Err(Error::Dom(format!("unknown node {:?}", id)));
        }
        self.element(id)
            .ok_or_else(|| Error::Dom(format!("node {:?} is not an element", id)))
    }

    /// Set one attribute. The element value is rebuilt so that its cached id
    /// and classes stay in step with the attributes.
    pub(crate) fn set_attr(&mut self, id: NodeId, name: &str, value: &str) -> Result<()> {
        let name = name.to_ascii_lowercase();
        let el = self.expect_element(id)?;
        let qual = el.element_ref().value().name.clone();

        let mut attrs: Vec<(&str, &str)> = el.attrs().collect();
        match attrs.iter_mut().find(|slot| slot.0 == name) {
            Some(slot) => slot.1 = value,
            None => attrs.push((name.as_str(), value)),
        }
        let rebuilt = scraper::node::Element::new(qual, attrs.into_iter().map(|(n, v)| attribute(n, v)).collect());

        *self.node_mut(id)?.value() = Node::Element(rebuilt);
        Ok(())
    }

    pub(crate) fn insert_before(&mut self, reference: NodeId, node: NodeId) -> Result<()> {
        let parent = self
            .parent(reference)
            .ok_or_else(|| Error::Dom(format!("node {:?} has no parent", reference)))?;
        if node == reference {
            return Err(Error::Dom(format!("cannot insert node {:?} before itself", node)));
        }
        self.check_insert(parent, node)?;
        self.node_mut(reference)?.insert_id_before(node);
        Ok(())
    }

    pub(crate) fn append_child(&mut self, parent: NodeId, node: NodeId) -> Result<()> {
        self.check_insert(parent, node)?;
        self.node_mut(parent)?.append_id(node);
        Ok(())
    }

    pub(crate) fn prepend_child(&mut self, parent: NodeId, node: NodeId) -> Result<()> {
        self.check_insert(parent, node)?;
        self.node_mut(parent)?.prepend_id(node);
        Ok(())
    }

    /// Unlink `id` from its parent. Detached nodes are a no-op.
    pub(crate) fn detach(&mut self, id: NodeId) -> Result<()> {
        self.node_mut(id)?.detach();
        Ok(())
    }

    fn check_insert(&self, parent: NodeId, node: NodeId) -> Result<()> {
        self.expect_element(parent)?;
        if self.node(node).is_none() {
            return Err(Error::Dom(format!("unknown node {:?}", node)));
        }
        if self.is_inclusive_ancestor(node, parent) {
            return Err(Error::Dom(format!(
                "inserting node {:?} under {:?} would create a cycle",
                node, parent
            )));
        }
        Ok(())
    }
}

fn attribute(name: &str, value: &str) -> Attribute {
    Attribute {
        name: QualName::new(None, Namespace::from(""), LocalName::from(name)),
        value: StrTendril::from_slice(value),
    }
}

fn new_element<'a>(tag: &str, attrs: impl Iterator<Item = (&'a str, &'a str)>) -> scraper::node::Element {
    let name = QualName::new(None, Namespace::from(HTML_NAMESPACE), LocalName::from(tag));
    scraper::node::Element::new(name, attrs.map(|(n, v)| attribute(n, v)).collect())
}
