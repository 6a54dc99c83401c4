//! In-memory document tree.
//!
//! Sources, templates and fragments are parsed into a [`Document`]: an arena
//! of nodes addressed by [`NodeId`]. Detaching a node only unlinks it from its
//! parent, so ids stay valid for the lifetime of the document and a pass can
//! iterate a snapshot of ids while it rewrites the tree underneath.
//!
//! # Node Kinds
//!
//! | Kind      | Source form                         |
//! |-----------|-------------------------------------|
//! | `Root`    | synthetic, always `NodeId` 0        |
//! | `Element` | `<tag attr="…">…</tag>` / `<tag/>`  |
//! | `Text`    | raw (still escaped) character data  |
//! | `Comment` | `<!-- … -->`                        |
//! | `Doctype` | `<!DOCTYPE …>`                      |
//!
//! Marker elements and attributes (`ui:section`, `ui:inline`, …) are matched
//! by their local name, so any namespace prefix works.

mod parse;
mod serialize;

pub use parse::{ParseError, is_void};
pub(crate) use serialize::write_open_tag;

/// Handle to a node inside one [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
pub enum NodeKind {
    Root,
    Element(Element),
    Text(String),
    Comment(String),
    Doctype(Doctype),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    /// Raw attribute value, entity references are kept as written.
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct Element {
    /// Qualified tag name as written (`ui:section`, `td`).
    pub name: String,
    pub attrs: Vec<Attribute>,
    /// Written as `<tag/>` in the source.
    pub self_closing: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Doctype {
    pub name: String,
    pub public_id: Option<String>,
    pub system_id: Option<String>,
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Strip a namespace prefix: `ui:section` → `section`.
#[inline]
pub fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

// ============================================================================
// Element
// ============================================================================

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            self_closing: false,
        }
    }

    #[inline]
    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    /// Case-insensitive local name comparison.
    #[inline]
    pub fn is(&self, local: &str) -> bool {
        self.local_name().eq_ignore_ascii_case(local)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| a.value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    /// Find an attribute by local name, ignoring any prefix (`ui:inline`).
    pub fn marker(&self, local: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| local_name(&a.name).eq_ignore_ascii_case(local))
            .map(|a| a.value.as_str())
    }

    pub fn has_marker(&self, local: &str) -> bool {
        self.marker(local).is_some()
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|a| a.name.eq_ignore_ascii_case(name)) {
            Some(attr) => attr.value = value,
            None => self.attrs.push(Attribute {
                name: name.to_owned(),
                value,
            }),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let pos = self
            .attrs
            .iter()
            .position(|a| a.name.eq_ignore_ascii_case(name))?;
        Some(self.attrs.remove(pos).value)
    }
}

// ============================================================================
// Document
// ============================================================================

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document holding only the synthetic root.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Root,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    #[inline]
    pub const fn root(&self) -> NodeId {
        NodeId(0)
    }

    #[inline]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    #[inline]
    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.nodes[id.0].kind
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.kind(id) {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match self.kind_mut(id) {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    #[inline]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Allocate a detached node.
    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn create_element(&mut self, element: Element) -> NodeId {
        self.create(NodeKind::Element(element))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.create(NodeKind::Text(text.into()))
    }

    /// Unlink a node from its parent. The subtree stays intact.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != id);
        }
    }

    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn prepend(&mut self, parent: NodeId, child: NodeId) {
        self.insert_at(parent, 0, child);
    }

    /// Insert `node` right after `anchor`. No-op when `anchor` is detached.
    pub fn insert_after(&mut self, anchor: NodeId, node: NodeId) {
        if anchor == node {
            return;
        }
        self.detach(node);
        let Some(parent) = self.parent(anchor) else {
            return;
        };
        let pos = self.nodes[parent.0]
            .children
            .iter()
            .position(|&c| c == anchor)
            .map_or(0, |p| p + 1);
        self.insert_at(parent, pos, node);
    }

    fn insert_at(&mut self, parent: NodeId, pos: usize, child: NodeId) {
        self.detach(child);
        let children = &mut self.nodes[parent.0].children;
        let pos = pos.min(children.len());
        children.insert(pos, child);
        self.nodes[child.0].parent = Some(parent);
    }

    /// Insert a run of nodes after `anchor`, keeping their order.
    pub fn insert_all_after(&mut self, anchor: NodeId, nodes: &[NodeId]) {
        let mut last = anchor;
        for &node in nodes {
            self.insert_after(last, node);
            last = node;
        }
    }

    /// Whether the node is still reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root() {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// All nodes below `id` in document order, `id` excluded.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Descendant elements of `id` whose local tag name is `local`.
    pub fn elements_by_name(&self, id: NodeId, local: &str) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&n| self.element(n).is_some_and(|el| el.is(local)))
            .collect()
    }

    /// First element in the document with the given local name.
    pub fn first_element(&self, local: &str) -> Option<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .find(|&n| self.element(n).is_some_and(|el| el.is(local)))
    }

    /// Concatenated text of all text descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .into_iter()
            .filter_map(|n| match self.kind(n) {
                NodeKind::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Deep-copy `id` from `other` into this document, returning the detached copy.
    pub fn import(&mut self, other: &Document, id: NodeId) -> NodeId {
        let copy = self.create(other.kind(id).clone());
        for &child in other.children(id) {
            let child_copy = self.import(other, child);
            self.append(copy, child_copy);
        }
        copy
    }

    /// Deep-copy the children of `id` from `other`, returning the detached copies.
    pub fn import_children(&mut self, other: &Document, id: NodeId) -> Vec<NodeId> {
        other
            .children(id)
            .iter()
            .map(|&child| self.import(other, child))
            .collect()
    }
}
