// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Tree model of R25 XML documents with per-node change status.

use std::borrow::Cow;
use std::io::Cursor;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::R25Error;

/// Change status carried in the `status` attribute of editable nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeStatus {
    /// `est`: the node is unchanged since it was fetched.
    Established,
    /// `mod`: the node or one of its descendants changed.
    Modified,
    /// `new`: the node was added on the client side.
    New,
    /// `del`: the node is to be removed by the server.
    Deleted,
}

impl ChangeStatus {
    /// The attribute value used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Established => "est",
            Self::Modified => "mod",
            Self::New => "new",
            Self::Deleted => "del",
        }
    }

    /// Parses the attribute value used on the wire.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "est" => Some(Self::Established),
            "mod" => Some(Self::Modified),
            "new" => Some(Self::New),
            "del" => Some(Self::Deleted),
            _ => None,
        }
    }
}

/// Handle to a node inside a [`Document`].
///
/// Handles are only meaningful for the document that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct Node {
    /// Qualified name, e.g. `r25:event`.
    name: String,
    attributes: Vec<(String, String)>,
    status: Option<ChangeStatus>,
    text: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// An R25 document held as an arena of nodes.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Document {
    /// Creates a document with a single, untagged root element.
    #[must_use]
    pub fn new(root_name: &str) -> Self {
        Self {
            nodes: vec![Node {
                name: root_name.to_string(),
                attributes: Vec::new(),
                status: None,
                text: None,
                parent: None,
                children: Vec::new(),
            }],
            root: NodeId(0),
        }
    }

    /// Parses a document from XML.
    ///
    /// # Errors
    ///
    /// Returns an error if the XML is malformed or has no root element.
    pub fn from_xml(xml: &str) -> Result<Self, R25Error> {
        let mut reader = Reader::from_str(xml.trim());
        reader.config_mut().check_end_names = true;

        let mut nodes: Vec<Node> = Vec::new();
        let mut stack: Vec<NodeId> = Vec::new();
        let mut root: Option<NodeId> = None;

        loop {
            let (start, empty) = match reader.read_event()? {
                Event::Start(e) => (e, false),
                Event::Empty(e) => (e, true),
                Event::End(_) => {
                    if let Some(id) = stack.pop() {
                        normalize_text(&mut nodes, id);
                    }
                    continue;
                }
                Event::Text(t) => {
                    let text = reader.decoder().decode(&t).map_err(xml_error)?;
                    push_text(&mut nodes, stack.last().copied(), &text);
                    continue;
                }
                Event::CData(c) => {
                    let text = reader.decoder().decode(&c).map_err(xml_error)?;
                    push_text(&mut nodes, stack.last().copied(), &text);
                    continue;
                }
                Event::GeneralRef(r) => {
                    let name = reader.decoder().decode(&r).map_err(xml_error)?;
                    let resolved = resolve_reference(&name)?;
                    push_text(&mut nodes, stack.last().copied(), &resolved);
                    continue;
                }
                Event::Eof if stack.is_empty() => break,
                Event::Eof => return Err(R25Error::Xml("unclosed element".to_string())),
                _ => continue,
            };

            let parent = stack.last().copied();
            if parent.is_none() && root.is_some() {
                return Err(R25Error::Xml("multiple root elements".to_string()));
            }

            let name = reader
                .decoder()
                .decode(start.name().as_ref())
                .map_err(xml_error)?
                .into_owned();

            let mut attributes = Vec::new();
            let mut status = None;
            for attr in start.attributes() {
                let attr = attr.map_err(xml_error)?;
                let key = reader
                    .decoder()
                    .decode(attr.key.as_ref())
                    .map_err(xml_error)?
                    .into_owned();
                let raw = reader.decoder().decode(&attr.value).map_err(xml_error)?;
                let value = quick_xml::escape::unescape(&raw)
                    .map_err(xml_error)?
                    .into_owned();

                match (key.as_str(), ChangeStatus::parse(&value)) {
                    ("status", Some(s)) => status = Some(s),
                    _ => attributes.push((key, value)),
                }
            }

            let id = NodeId(nodes.len());
            nodes.push(Node {
                name,
                attributes,
                status,
                text: None,
                parent,
                children: Vec::new(),
            });
            match parent {
                Some(p) => node_mut(&mut nodes, p).children.push(id),
                None => root = Some(id),
            }
            if !empty {
                stack.push(id);
            }
        }

        let root = root.ok_or_else(|| R25Error::InvalidResponse("empty document".to_string()))?;
        Ok(Self { nodes, root })
    }

    /// Serializes the document, including its XML declaration.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn to_xml(&self) -> Result<String, R25Error> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        self.write_node(&mut writer, self.root)?;

        String::from_utf8(writer.into_inner().into_inner())
            .map_err(|e| R25Error::Xml(format!("UTF-8 error: {e}")))
    }

    fn write_node(&self, writer: &mut Writer<Cursor<Vec<u8>>>, id: NodeId) -> Result<(), R25Error> {
        let node = self.node(id);
        let mut start = BytesStart::new(node.name.as_str());
        for (key, value) in &node.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }
        if let Some(status) = node.status {
            start.push_attribute(("status", status.as_str()));
        }

        if node.children.is_empty() && node.text.is_none() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        if let Some(text) = &node.text {
            writer.write_event(Event::Text(BytesText::new(text)))?;
        }
        for &child in &node.children {
            self.write_node(writer, child)?;
        }
        writer.write_event(Event::End(BytesEnd::new(node.name.as_str())))?;
        Ok(())
    }

    /// The root element.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Qualified name of a node, e.g. `r25:event`.
    #[must_use]
    pub fn name(&self, id: NodeId) -> &str {
        &self.node(id).name
    }

    /// Name of a node without its namespace prefix.
    #[must_use]
    pub fn local_name(&self, id: NodeId) -> &str {
        let name = self.name(id);
        name.split_once(':').map_or(name, |(_, local)| local)
    }

    /// Change status of a node, `None` if the node is not tracked.
    #[must_use]
    pub fn status(&self, id: NodeId) -> Option<ChangeStatus> {
        self.node(id).status
    }

    /// Overwrites the change status of a single node.
    pub fn set_status(&mut self, id: NodeId, status: Option<ChangeStatus>) {
        self.node_mut(id).status = status;
    }

    /// Whether a node is tagged as modified, new or deleted.
    #[must_use]
    pub fn is_dirty(&self, id: NodeId) -> bool {
        matches!(
            self.status(id),
            Some(ChangeStatus::Modified | ChangeStatus::New | ChangeStatus::Deleted)
        )
    }

    /// Text content of a node.
    #[must_use]
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.node(id).text.as_deref()
    }

    /// Value of a non-status attribute.
    #[must_use]
    pub fn attribute(&self, id: NodeId, key: &str) -> Option<&str> {
        self.node(id)
            .attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Parent of a node, `None` for the root or a detached node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// All children of a node, including those marked deleted.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// First live (not marked deleted) child with the given local name.
    #[must_use]
    pub fn child(&self, id: NodeId, local_name: &str) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|&c| self.is_live(c) && self.local_name(c) == local_name)
    }

    /// All live children with the given local name, in document order.
    #[must_use]
    pub fn children_named(&self, id: NodeId, local_name: &str) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&c| self.is_live(c) && self.local_name(c) == local_name)
            .collect()
    }

    /// Text of the first live child with the given local name.
    #[must_use]
    pub fn child_text(&self, id: NodeId, local_name: &str) -> Option<&str> {
        self.child(id, local_name).and_then(|c| self.text(c))
    }

    /// Follows a path of local names through first live children.
    #[must_use]
    pub fn descend(&self, id: NodeId, path: &[&str]) -> Option<NodeId> {
        path.iter()
            .try_fold(id, |current, name| self.child(current, name))
    }

    fn is_live(&self, id: NodeId) -> bool {
        self.status(id) != Some(ChangeStatus::Deleted)
    }

    /// Appends a child element, qualified with the parent's namespace prefix.
    ///
    /// No change marking happens; see [`Document::add_node`] for that.
    pub fn append(
        &mut self,
        parent: NodeId,
        local_name: &str,
        status: Option<ChangeStatus>,
    ) -> NodeId {
        let name = match self.name(parent).split_once(':') {
            Some((prefix, _)) => format!("{prefix}:{local_name}"),
            None => local_name.to_string(),
        };

        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name,
            attributes: Vec::new(),
            status,
            text: None,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.node_mut(parent).children.push(id);
        id
    }

    /// Adds a new child tagged `new` and marks its ancestors modified.
    pub fn add_node(&mut self, parent: NodeId, local_name: &str) -> NodeId {
        tracing::debug!(parent = self.name(parent), local_name, "adding node");
        let id = self.append(parent, local_name, Some(ChangeStatus::New));
        self.mark_dirty_upward(id);
        id
    }

    /// Tags a node `del` and marks its ancestors modified.
    ///
    /// The node stays in the tree so the server learns about the removal.
    pub fn delete_node(&mut self, id: NodeId) {
        tracing::debug!(name = self.name(id), "deleting node");
        self.set_status(id, Some(ChangeStatus::Deleted));
        self.mark_dirty_upward(id);
    }

    /// Removes a node from its parent outright, without telling the server.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.node_mut(id).parent.take() {
            self.node_mut(parent).children.retain(|&c| c != id);
        }
    }

    /// Sets the text of a leaf child, creating the child if needed.
    ///
    /// The value is only rewritten when it differs from the current one,
    /// ignoring case; an absent value equals an empty one. On change, every
    /// strict ancestor of the leaf is marked modified. Returns whether the
    /// value changed.
    pub fn set_value(&mut self, parent: NodeId, local_name: &str, value: Option<&str>) -> bool {
        let value = value.filter(|v| !v.is_empty());
        let leaf = match (self.child(parent, local_name), value) {
            (Some(leaf), _) => leaf,
            (None, None) => return false,
            (None, Some(_)) => self.append(parent, local_name, None),
        };

        let current = self.text(leaf).filter(|v| !v.is_empty());
        let unchanged = match (current, value) {
            (None, None) => true,
            (Some(a), Some(b)) => a == b || a.to_lowercase() == b.to_lowercase(),
            _ => false,
        };
        if unchanged {
            return false;
        }

        tracing::debug!(
            node = self.name(leaf),
            from = current.unwrap_or_default(),
            to = value.unwrap_or_default(),
            "changing value"
        );
        self.node_mut(leaf).text = value.map(ToString::to_string);
        self.mark_dirty_upward(leaf);
        true
    }

    /// Marks the strict ancestors of `id` as modified.
    ///
    /// Walks upward while the ancestor is tagged `est`; the first ancestor
    /// that is untracked or already dirty ends the walk, since everything
    /// above a dirty node is dirty already.
    pub fn mark_dirty_upward(&mut self, id: NodeId) {
        let mut current = self.parent(id);
        while let Some(ancestor) = current {
            if self.status(ancestor) != Some(ChangeStatus::Established) {
                break;
            }
            self.set_status(ancestor, Some(ChangeStatus::Modified));
            current = self.parent(ancestor);
        }
    }

    // NodeIds are only minted by this document, so they always index into it.
    #[allow(clippy::indexing_slicing)]
    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        node_mut(&mut self.nodes, id)
    }
}

#[allow(clippy::indexing_slicing)]
fn node_mut(nodes: &mut [Node], id: NodeId) -> &mut Node {
    &mut nodes[id.0]
}

fn push_text(nodes: &mut [Node], current: Option<NodeId>, text: &str) {
    if let Some(id) = current {
        node_mut(nodes, id)
            .text
            .get_or_insert_with(String::new)
            .push_str(text);
    }
}

fn normalize_text(nodes: &mut [Node], id: NodeId) {
    let node = node_mut(nodes, id);
    node.text = node
        .text
        .take()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
}

fn resolve_reference(name: &str) -> Result<Cow<'static, str>, R25Error> {
    let predefined = match name {
        "amp" => Some("&"),
        "lt" => Some("<"),
        "gt" => Some(">"),
        "quot" => Some("\""),
        "apos" => Some("'"),
        _ => None,
    };
    if let Some(s) = predefined {
        return Ok(Cow::Borrowed(s));
    }

    let code = name.strip_prefix('#').and_then(|num| match num.strip_prefix('x') {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => num.parse().ok(),
    });
    code.and_then(char::from_u32)
        .map(|c| Cow::Owned(c.to_string()))
        .ok_or_else(|| R25Error::Xml(format!("unknown entity reference: &{name};")))
}

fn xml_error(e: impl std::fmt::Display) -> R25Error {
    R25Error::Xml(e.to_string())
}
