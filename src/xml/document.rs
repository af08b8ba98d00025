//! Arena-backed XML document
//!
//! All nodes and attributes live in two vectors owned by the [`Document`];
//! callers hold [`NodeId`]/[`AttrId`] handles. Slot 0 is the document node,
//! whose first element child is the root. Detached nodes stay in the arena
//! until the document is dropped.

use crate::error::{Error, Result};

use super::node::{AttrData, AttrId, Node, NodeData, NodeId, NodeKind, QualifiedName};

/// Mutable XML document
#[derive(Debug, Clone)]
pub struct Document {
    pub(crate) nodes: Vec<NodeData>,
    pub(crate) attrs: Vec<AttrData>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over the direct children of a node
pub(crate) struct Children<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = self.doc.data(id).next_sibling;
        Some(id)
    }
}

impl Document {
    pub(crate) const DOCUMENT_NODE: NodeId = NodeId(0);

    /// Create a document with no root element
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData::new(
                NodeKind::Document,
                QualifiedName::default(),
                String::new(),
            )],
            attrs: Vec::new(),
        }
    }

    /// Parse XML text into a document
    pub fn parse(xml: &str) -> Result<Self> {
        super::parser::parse(xml)
    }

    #[inline]
    pub(crate) fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    #[inline]
    pub(crate) fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0]
    }

    #[inline]
    pub(crate) fn attr(&self, id: AttrId) -> &AttrData {
        &self.attrs[id.0]
    }

    pub(crate) fn child_ids(&self, id: NodeId) -> Children<'_> {
        Children {
            doc: self,
            next: self.data(id).first_child,
        }
    }

    /// Root element
    pub fn root(&self) -> Option<NodeId> {
        self.child_ids(Self::DOCUMENT_NODE)
            .find(|&id| self.data(id).kind == NodeKind::Element)
    }

    /// Replace the whole tree with a fresh root element
    ///
    /// With a prefix, the root is named `prefix:name` and carries an
    /// `xmlns:prefix` declaration for `ns_uri`. Without one, no namespace
    /// attribute is added.
    pub fn create_root_node(
        &mut self,
        name: &str,
        ns_uri: &str,
        ns_prefix: Option<&str>,
    ) -> NodeId {
        let existing: Vec<NodeId> = self.child_ids(Self::DOCUMENT_NODE).collect();
        for id in existing {
            self.detach(id);
        }

        let name = QualifiedName::join(name, ns_prefix);
        let root = self.alloc(NodeKind::Element, name, String::new());
        self.link(Self::DOCUMENT_NODE, root, false);

        if let Some(prefix) = ns_prefix.filter(|p| !p.is_empty()) {
            let decl = QualifiedName::join(prefix, Some("xmlns"));
            self.push_attribute(root, decl, ns_uri.to_string());
        }
        root
    }

    /// Typed handle for a tree node
    pub fn node(&self, id: NodeId) -> Node {
        match self.data(id).kind {
            NodeKind::Text => Node::Text(id),
            NodeKind::CData => Node::CData(id),
            NodeKind::Element | NodeKind::Document => Node::Element(id),
        }
    }

    /// Local name (after the first colon); empty for text and CDATA
    pub fn name(&self, node: Node) -> &str {
        match node {
            Node::Attribute(id) => self.attr(id).name.local(),
            Node::Element(id) | Node::Text(id) | Node::CData(id) => self.data(id).name.local(),
        }
    }

    /// Name including any namespace prefix
    pub fn qualified_name(&self, node: Node) -> &str {
        match node {
            Node::Attribute(id) => self.attr(id).name.as_str(),
            Node::Element(id) | Node::Text(id) | Node::CData(id) => self.data(id).name.as_str(),
        }
    }

    /// Namespace prefix (before the first colon)
    pub fn namespace_prefix(&self, node: Node) -> Option<&str> {
        match node {
            Node::Attribute(id) => self.attr(id).name.prefix(),
            Node::Element(id) | Node::Text(id) | Node::CData(id) => self.data(id).name.prefix(),
        }
    }

    /// Text value of a node
    ///
    /// Text/CDATA return their data, attributes their value, elements the
    /// data of their first text or CDATA child (empty if none).
    pub fn content(&self, node: Node) -> &str {
        match node {
            Node::Attribute(id) => &self.attr(id).value,
            Node::Text(id) | Node::CData(id) => &self.data(id).value,
            Node::Element(id) => self
                .child_text(id)
                .map(|text| self.data(text).value.as_str())
                .unwrap_or(""),
        }
    }

    /// First text or CDATA child of an element
    pub fn child_text(&self, id: NodeId) -> Option<NodeId> {
        self.child_ids(id)
            .find(|&child| matches!(self.data(child).kind, NodeKind::Text | NodeKind::CData))
    }

    /// Parent element; `None` for the root and for detached nodes
    pub fn parent(&self, node: Node) -> Option<NodeId> {
        let parent = match node {
            Node::Attribute(id) => Some(self.attr(id).owner),
            Node::Element(id) | Node::Text(id) | Node::CData(id) => self.data(id).parent,
        }?;
        (self.data(parent).kind != NodeKind::Document).then_some(parent)
    }

    /// First child node of any kind
    pub fn first_child(&self, id: NodeId) -> Option<Node> {
        self.data(id).first_child.map(|child| self.node(child))
    }

    /// Children whose qualified name equals `name`; an empty name matches all
    pub fn children(&self, id: NodeId, name: &str) -> Vec<Node> {
        self.child_ids(id)
            .filter(|&child| name.is_empty() || self.data(child).name.as_str() == name)
            .map(|child| self.node(child))
            .collect()
    }

    /// Next sibling; for attributes, the next attribute of the same element
    pub fn next_sibling(&self, node: Node) -> Option<Node> {
        match node {
            Node::Attribute(id) => {
                let siblings = &self.data(self.attr(id).owner).attributes;
                let pos = siblings.iter().position(|&a| a == id)?;
                siblings.get(pos + 1).map(|&next| Node::Attribute(next))
            }
            Node::Element(id) | Node::Text(id) | Node::CData(id) => {
                self.data(id).next_sibling.map(|next| self.node(next))
            }
        }
    }

    /// Attributes of an element in document order
    pub fn attributes(&self, id: NodeId) -> &[AttrId] {
        &self.data(id).attributes
    }

    /// First attribute of an element
    pub fn first_attribute(&self, id: NodeId) -> Option<AttrId> {
        self.data(id).attributes.first().copied()
    }

    /// Attribute by local name and optional prefix
    pub fn attribute(&self, id: NodeId, name: &str, prefix: Option<&str>) -> Option<AttrId> {
        let wanted = QualifiedName::join(name, prefix);
        self.attribute_by_qname(id, wanted.as_str())
    }

    pub(crate) fn attribute_by_qname(&self, id: NodeId, qname: &str) -> Option<AttrId> {
        self.data(id)
            .attributes
            .iter()
            .copied()
            .find(|&attr| self.attr(attr).name.as_str() == qname)
    }

    /// Attribute value by qualified name
    pub fn attribute_value(&self, id: NodeId, qname: &str) -> Option<&str> {
        self.attribute_by_qname(id, qname)
            .map(|attr| self.attr(attr).value.as_str())
    }

    /// Set an attribute, updating the value if it already exists
    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: &str,
        value: &str,
        prefix: Option<&str>,
    ) -> Result<AttrId> {
        self.expect_element(id)?;
        let qname = QualifiedName::join(name, prefix);
        if let Some(existing) = self.attribute_by_qname(id, qname.as_str()) {
            self.attrs[existing.0].value = value.to_string();
            return Ok(existing);
        }
        Ok(self.push_attribute(id, qname, value.to_string()))
    }

    /// Declare a namespace on an element (`xmlns` or `xmlns:prefix`)
    pub fn set_namespace_declaration(
        &mut self,
        id: NodeId,
        uri: &str,
        prefix: Option<&str>,
    ) -> Result<AttrId> {
        match prefix.filter(|p| !p.is_empty()) {
            Some(prefix) => self.set_attribute(id, prefix, uri, Some("xmlns")),
            None => self.set_attribute(id, "xmlns", uri, None),
        }
    }

    /// Append a child element
    pub fn add_child(
        &mut self,
        parent: NodeId,
        name: &str,
        prefix: Option<&str>,
    ) -> Result<NodeId> {
        self.expect_element(parent)?;
        let child = self.alloc(NodeKind::Element, QualifiedName::join(name, prefix), String::new());
        self.link(parent, child, false);
        Ok(child)
    }

    /// Append a text child
    pub fn add_child_text(&mut self, parent: NodeId, content: &str) -> Result<NodeId> {
        self.expect_element(parent)?;
        let child = self.alloc(NodeKind::Text, QualifiedName::default(), content.to_string());
        self.link(parent, child, false);
        Ok(child)
    }

    /// Append a CDATA child
    pub fn add_child_cdata(&mut self, parent: NodeId, content: &str) -> Result<NodeId> {
        self.expect_element(parent)?;
        let child = self.alloc(NodeKind::CData, QualifiedName::default(), content.to_string());
        self.link(parent, child, false);
        Ok(child)
    }

    /// Copy a node from another document under `parent`
    ///
    /// Elements are cloned with their attributes, and with their whole subtree
    /// when `recursive` is set. Importing an attribute sets it on `parent`.
    pub fn import_node(
        &mut self,
        parent: NodeId,
        source: &Document,
        node: Node,
        recursive: bool,
        prepend: bool,
    ) -> Result<Node> {
        self.expect_element(parent)?;
        match node {
            Node::Attribute(attr) => {
                let data = source.attr(attr);
                let id = self.set_attribute(parent, data.name.as_str(), &data.value, None)?;
                Ok(Node::Attribute(id))
            }
            Node::Element(id) | Node::Text(id) | Node::CData(id) => {
                let copy = self.clone_from(source, id, recursive);
                self.link(parent, copy, prepend);
                Ok(self.node(copy))
            }
        }
    }

    /// Build a standalone document from a subtree of another one
    pub fn from_subtree(source: &Document, id: NodeId) -> Self {
        let mut doc = Self::new();
        let copy = doc.clone_from(source, id, true);
        doc.link(Self::DOCUMENT_NODE, copy, false);
        doc
    }

    /// Move a node of this document under a new parent
    pub fn move_node(&mut self, parent: NodeId, node: NodeId, prepend: bool) -> Result<()> {
        self.expect_element(parent)?;
        if self.data(node).kind == NodeKind::Document {
            return Err(Error::Usage("the document node cannot be moved".to_string()));
        }
        let mut cursor = Some(parent);
        while let Some(id) = cursor {
            if id == node {
                return Err(Error::Usage("cannot move a node into its own subtree".to_string()));
            }
            cursor = self.data(id).parent;
        }
        self.detach(node);
        self.link(parent, node, prepend);
        Ok(())
    }

    /// Remove a node from its parent; the handle stays valid
    pub fn detach_node(&mut self, node: NodeId) {
        if self.data(node).kind != NodeKind::Document {
            self.detach(node);
        }
    }

    /// Rename an element or attribute; a colon in `name` sets the prefix
    pub fn set_name(&mut self, node: Node, name: &str) {
        let name = QualifiedName::new(name);
        match node {
            Node::Attribute(id) => self.attrs[id.0].name = name,
            Node::Element(id) | Node::Text(id) | Node::CData(id) => self.nodes[id.0].name = name,
        }
    }

    /// Replace the namespace prefix, keeping the local name
    pub fn set_namespace_prefix(&mut self, node: Node, prefix: Option<&str>) {
        let local = self.name(node).to_string();
        let name = QualifiedName::join(&local, prefix);
        self.set_name(node, name.as_str());
    }

    /// Replace the value of a text, CDATA or attribute node
    pub fn set_content(&mut self, node: Node, value: &str) {
        match node {
            Node::Attribute(id) => self.attrs[id.0].value = value.to_string(),
            Node::Text(id) | Node::CData(id) => self.nodes[id.0].value = value.to_string(),
            Node::Element(id) => {
                if let Some(text) = self.child_text(id) {
                    self.nodes[text.0].value = value.to_string();
                } else {
                    let text =
                        self.alloc(NodeKind::Text, QualifiedName::default(), value.to_string());
                    self.link(id, text, false);
                }
            }
        }
    }

    /// Element without children, or text made only of spaces
    pub fn is_blank(&self, node: Node) -> bool {
        match node {
            Node::Element(id) => self.data(id).first_child.is_none(),
            Node::Text(id) => self.data(id).value.bytes().all(|b| b == b' '),
            Node::CData(_) | Node::Attribute(_) => false,
        }
    }

    fn expect_element(&self, id: NodeId) -> Result<()> {
        match self.nodes.get(id.0).map(|data| data.kind) {
            Some(NodeKind::Element) => Ok(()),
            _ => Err(Error::Usage("operation requires an element node".to_string())),
        }
    }

    pub(crate) fn alloc(&mut self, kind: NodeKind, name: QualifiedName, value: String) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData::new(kind, name, value));
        id
    }

    pub(crate) fn push_attribute(
        &mut self,
        owner: NodeId,
        name: QualifiedName,
        value: String,
    ) -> AttrId {
        let id = AttrId(self.attrs.len());
        self.attrs.push(AttrData { name, value, owner });
        self.nodes[owner.0].attributes.push(id);
        id
    }

    pub(crate) fn link(&mut self, parent: NodeId, id: NodeId, prepend: bool) {
        if prepend {
            let first = self.data(parent).first_child;
            {
                let node = self.data_mut(id);
                node.prev_sibling = None;
                node.next_sibling = first;
            }
            match first {
                Some(first) => self.data_mut(first).prev_sibling = Some(id),
                None => self.data_mut(parent).last_child = Some(id),
            }
            self.data_mut(parent).first_child = Some(id);
        } else {
            let last = self.data(parent).last_child;
            {
                let node = self.data_mut(id);
                node.prev_sibling = last;
                node.next_sibling = None;
            }
            match last {
                Some(last) => self.data_mut(last).next_sibling = Some(id),
                None => self.data_mut(parent).first_child = Some(id),
            }
            self.data_mut(parent).last_child = Some(id);
        }
        self.data_mut(id).parent = Some(parent);
    }

    fn detach(&mut self, id: NodeId) {
        let (parent, prev, next) = {
            let node = self.data(id);
            (node.parent, node.prev_sibling, node.next_sibling)
        };
        match prev {
            Some(prev) => self.data_mut(prev).next_sibling = next,
            None => {
                if let Some(parent) = parent {
                    self.data_mut(parent).first_child = next;
                }
            }
        }
        match next {
            Some(next) => self.data_mut(next).prev_sibling = prev,
            None => {
                if let Some(parent) = parent {
                    self.data_mut(parent).last_child = prev;
                }
            }
        }
        let node = self.data_mut(id);
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
    }

    fn clone_from(&mut self, source: &Document, id: NodeId, recursive: bool) -> NodeId {
        let copy = self.clone_single(source, id);
        if !recursive {
            return copy;
        }

        // (source node, parent copy) pairs in document order
        let mut pending: Vec<(NodeId, NodeId)> =
            source.child_ids(id).map(|c| (c, copy)).collect();
        pending.reverse();
        while let Some((child, parent)) = pending.pop() {
            let child_copy = self.clone_single(source, child);
            self.link(parent, child_copy, false);
            let start = pending.len();
            pending.extend(source.child_ids(child).map(|c| (c, child_copy)));
            pending[start..].reverse();
        }
        copy
    }

    fn clone_single(&mut self, source: &Document, id: NodeId) -> NodeId {
        let data = source.data(id);
        let kind = match data.kind {
            NodeKind::Document => NodeKind::Element,
            kind => kind,
        };
        let copy = self.alloc(kind, data.name.clone(), data.value.clone());
        for &attr in &data.attributes {
            let attr = source.attr(attr);
            self.push_attribute(copy, attr.name.clone(), attr.value.clone());
        }
        copy
    }
}
