//! Lossless tree of every chunk in a terrain buffer.

use bitflags::bitflags;
use indexmap::IndexMap;
use serde::Serialize;

use super::boundary::{BoundaryData, BoundaryKind, Vertex};
use super::{HEADER, LAYER};
use crate::codec::chunk::{ChunkHeader, Tag};
use crate::codec::name::header_name;
use crate::codec::reader::u32_le_at;
use crate::codec::walk::ChunkVisitor;
use crate::config::ParseOptions;

/// Id assigned in walk order; only stable within one parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
    #[serde(transparent)]
    pub struct NodeFlags: u8 {
        /// Declared length ran past the enclosing payload
        const TRUNCATED = 1 << 0;
        /// Garbage bytes were skipped between children
        const RESYNCED = 1 << 1;
        /// Nested deeper than the walk limit, children not read
        const DEPTH_LIMIT = 1 << 2;
        const ERROR = 1 << 3;
        const WARNING = 1 << 4;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    U32(u32),
    F32(f32),
    Bool(bool),
    Text(String),
    Vertices(Vec<Vertex>),
}

pub type PayloadBag = IndexMap<String, FieldValue>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode {
    pub id: NodeId,
    pub tag: Tag,
    pub form_type: Option<Tag>,
    pub name: String,
    pub offset: usize,
    /// Header plus payload
    pub length: usize,
    pub children: Vec<TreeNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<PayloadBag>,
    pub flags: NodeFlags,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,
}

impl TreeNode {
    fn from_header(id: NodeId, header: &ChunkHeader) -> Self {
        let mut flags = NodeFlags::empty();
        flags.set(NodeFlags::TRUNCATED, header.truncated);
        Self {
            id,
            tag: header.tag,
            form_type: header.form_type,
            name: header.form_type.unwrap_or(header.tag).to_string(),
            offset: header.offset,
            length: header.total_len(),
            children: Vec::new(),
            payload: None,
            flags,
            messages: Vec::new(),
        }
    }

    pub fn is_form(&self) -> bool {
        self.form_type.is_some()
    }

    pub fn is_form_of(&self, form_type: Tag) -> bool {
        self.form_type == Some(form_type)
    }

    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    pub fn boundary_kind(&self) -> Option<BoundaryKind> {
        self.form_type.and_then(BoundaryKind::from_form_type)
    }

    /// Name recovered from this group's own header, if any.
    ///
    /// Header groups and version wrappers are searched. A boundary also looks
    /// inside unknown groups, but a nested layer or boundary keeps its header
    /// to itself, as does an affector under a layer.
    pub fn descendant_name(&self) -> Option<&str> {
        self.header_name_below(self.boundary_kind().is_some())
    }

    fn header_name_below(&self, through_groups: bool) -> Option<&str> {
        for child in &self.children {
            let descend = match child.form_type {
                Some(form_type) if form_type == HEADER || form_type.is_version() => true,
                Some(form_type) => {
                    through_groups
                        && form_type != LAYER
                        && BoundaryKind::from_form_type(form_type).is_none()
                }
                None => {
                    if let Some(FieldValue::Text(name)) =
                        child.payload.as_ref().and_then(|bag| bag.get("name"))
                    {
                        return Some(name);
                    }
                    false
                }
            };
            if descend {
                if let Some(name) = child.header_name_below(through_groups) {
                    return Some(name);
                }
            }
        }
        None
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter { stack: vec![self] }
    }

    pub fn count(&self) -> usize {
        self.iter().count()
    }

    pub fn find(&self, id: NodeId) -> Option<&TreeNode> {
        self.iter().find(|n| n.id == id)
    }

    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut TreeNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }

    /// Node whose chunk starts exactly at `offset`
    pub fn find_by_offset(&self, offset: usize) -> Option<&TreeNode> {
        if self.offset == offset {
            return Some(self);
        }
        self.children
            .iter()
            .find(|c| c.offset <= offset && offset < c.end())
            .and_then(|c| c.find_by_offset(offset))
    }

    pub fn find_by_offset_mut(&mut self, offset: usize) -> Option<&mut TreeNode> {
        if self.offset == offset {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find(|c| c.offset <= offset && offset < c.end())
            .and_then(|c| c.find_by_offset_mut(offset))
    }

    pub fn mark_error(&mut self, message: impl Into<String>) {
        self.flags |= NodeFlags::ERROR;
        self.messages.push(message.into());
    }

    pub fn mark_warning(&mut self, message: impl Into<String>) {
        self.flags |= NodeFlags::WARNING;
        self.messages.push(message.into());
    }

    /// Drop validator flags and messages in this subtree
    pub fn clear_diagnostics(&mut self) {
        self.flags.remove(NodeFlags::ERROR | NodeFlags::WARNING);
        self.messages.clear();
        for child in &mut self.children {
            child.clear_diagnostics();
        }
    }
}

/// Pre-order traversal
pub struct Iter<'a> {
    stack: Vec<&'a TreeNode>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a TreeNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TerrainTree {
    pub root: TreeNode,
    pub node_count: usize,
    /// Bytes skipped while resynchronizing on a valid tag
    pub resync_bytes: usize,
}

impl TerrainTree {
    pub fn find(&self, id: NodeId) -> Option<&TreeNode> {
        self.root.find(id)
    }

    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut TreeNode> {
        self.root.find_mut(id)
    }

    pub fn find_by_offset(&self, offset: usize) -> Option<&TreeNode> {
        self.root.find_by_offset(offset)
    }

    pub fn find_by_offset_mut(&mut self, offset: usize) -> Option<&mut TreeNode> {
        self.root.find_by_offset_mut(offset)
    }

    pub fn iter(&self) -> Iter<'_> {
        self.root.iter()
    }
}

/// Builds a [`TerrainTree`] from walk events.
pub struct TreeBuilder<'o> {
    options: &'o ParseOptions,
    next_id: u32,
    stack: Vec<TreeNode>,
    root: Option<TreeNode>,
    node_count: usize,
    resync_bytes: usize,
}

impl<'o> TreeBuilder<'o> {
    pub fn new(options: &'o ParseOptions) -> Self {
        Self {
            options,
            next_id: 0,
            stack: Vec::new(),
            root: None,
            node_count: 0,
            resync_bytes: 0,
        }
    }

    pub fn finish(self) -> Option<TerrainTree> {
        let root = self.root?;
        Some(TerrainTree {
            root,
            node_count: self.node_count,
            resync_bytes: self.resync_bytes,
        })
    }

    fn new_node(&mut self, header: &ChunkHeader) -> TreeNode {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.node_count += 1;
        TreeNode::from_header(id, header)
    }

    fn attach(&mut self, node: TreeNode) {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.root = Some(node),
        }
    }

    fn decode_leaf(&self, header: &ChunkHeader, payload: &[u8]) -> Option<PayloadBag> {
        if header.tag != Tag::DATA {
            return None;
        }
        if self.stack.iter().any(|n| n.is_form_of(HEADER)) {
            return Some(decode_header_payload(payload));
        }
        let kind = self.stack.iter().rev().find_map(|n| n.boundary_kind())?;
        let data = BoundaryData::decode(
            kind,
            payload,
            self.options.vertex_layout,
            self.options.world_limit,
        );
        Some(data.to_fields())
    }
}

/// Fields of a header `DATA` payload: enabled flag and name
pub fn decode_header_payload(payload: &[u8]) -> PayloadBag {
    let mut bag = PayloadBag::new();
    if let Ok(flag) = u32_le_at(payload, 0) {
        bag.insert("enabled".into(), FieldValue::Bool(flag != 0));
    }
    if let Some(name) = header_name(payload) {
        bag.insert("name".into(), FieldValue::Text(name));
    }
    bag
}

impl ChunkVisitor for TreeBuilder<'_> {
    fn enter_form(&mut self, header: &ChunkHeader, _depth: usize) {
        let node = self.new_node(header);
        self.stack.push(node);
    }

    fn leave_form(&mut self, _header: &ChunkHeader, _depth: usize) {
        if let Some(mut node) = self.stack.pop() {
            if let Some(name) = node.descendant_name() {
                node.name = name.to_string();
            }
            self.attach(node);
        }
    }

    fn leaf(&mut self, header: &ChunkHeader, payload: &[u8], _depth: usize) {
        let mut node = self.new_node(header);
        node.payload = self.decode_leaf(header, payload);
        self.attach(node);
    }

    fn skipped(&mut self, _offset: usize, _depth: usize) {
        self.resync_bytes += 1;
        if let Some(parent) = self.stack.last_mut() {
            parent.flags |= NodeFlags::RESYNCED;
        }
    }

    fn depth_limited(&mut self, header: &ChunkHeader, _depth: usize) {
        let mut node = self.new_node(header);
        node.flags |= NodeFlags::DEPTH_LIMIT;
        self.attach(node);
    }
}
