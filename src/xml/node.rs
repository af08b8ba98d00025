//! Node handles and arena slots

use std::cell::OnceCell;

/// Handle to a tree node (element, text or CDATA) inside a [`Document`]
///
/// [`Document`]: super::Document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// Handle to an attribute inside a [`Document`]
///
/// [`Document`]: super::Document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttrId(pub(crate) usize);

/// A node as seen by callers: one of the tree kinds or an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Node {
    /// Element node
    Element(NodeId),
    /// Text node
    Text(NodeId),
    /// CDATA section
    CData(NodeId),
    /// Attribute of an element
    Attribute(AttrId),
}

impl Node {
    /// Element handle, if this is an element
    #[inline]
    pub fn element(self) -> Option<NodeId> {
        match self {
            Node::Element(id) => Some(id),
            _ => None,
        }
    }

    /// Tree handle for elements, text and CDATA
    #[inline]
    pub fn tree_id(self) -> Option<NodeId> {
        match self {
            Node::Element(id) | Node::Text(id) | Node::CData(id) => Some(id),
            Node::Attribute(_) => None,
        }
    }

    /// Attribute handle, if this is an attribute
    #[inline]
    pub fn attribute(self) -> Option<AttrId> {
        match self {
            Node::Attribute(id) => Some(id),
            _ => None,
        }
    }

    /// Whether this is an element
    #[inline]
    pub fn is_element(self) -> bool {
        matches!(self, Node::Element(_))
    }
}

impl From<AttrId> for Node {
    fn from(id: AttrId) -> Self {
        Node::Attribute(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Document,
    Element,
    Text,
    CData,
}

/// Qualified name with a lazily computed prefix split
#[derive(Debug, Clone, Default)]
pub(crate) struct QualifiedName {
    full: String,
    colon: OnceCell<Option<usize>>,
}

impl QualifiedName {
    pub(crate) fn new(full: impl Into<String>) -> Self {
        Self {
            full: full.into(),
            colon: OnceCell::new(),
        }
    }

    pub(crate) fn join(name: &str, prefix: Option<&str>) -> Self {
        match prefix.filter(|p| !p.is_empty()) {
            Some(prefix) => Self::new(format!("{prefix}:{name}")),
            None => Self::new(name),
        }
    }

    #[inline]
    pub(crate) fn as_str(&self) -> &str {
        &self.full
    }

    #[inline]
    fn colon(&self) -> Option<usize> {
        *self.colon.get_or_init(|| self.full.find(':'))
    }

    /// Text before the first colon
    #[inline]
    pub(crate) fn prefix(&self) -> Option<&str> {
        self.colon().map(|i| &self.full[..i])
    }

    /// Text after the first colon, or the whole name
    #[inline]
    pub(crate) fn local(&self) -> &str {
        match self.colon() {
            Some(i) => &self.full[i + 1..],
            None => &self.full,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub(crate) kind: NodeKind,
    pub(crate) name: QualifiedName,
    pub(crate) value: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) first_child: Option<NodeId>,
    pub(crate) last_child: Option<NodeId>,
    pub(crate) prev_sibling: Option<NodeId>,
    pub(crate) next_sibling: Option<NodeId>,
    pub(crate) attributes: Vec<AttrId>,
}

impl NodeData {
    pub(crate) fn new(kind: NodeKind, name: QualifiedName, value: String) -> Self {
        Self {
            kind,
            name,
            value,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            attributes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct AttrData {
    pub(crate) name: QualifiedName,
    pub(crate) value: String,
    pub(crate) owner: NodeId,
}
