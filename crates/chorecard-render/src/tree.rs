#![forbid(unsafe_code)]

//! The live render tree.
//!
//! [`RenderTree`] is a generational arena of element and text nodes under one
//! root. Node identifiers stay valid across patches that do not touch the
//! node, which is what lets gesture state key on them, and a removed node's
//! identifier never aliases a later node in the same slot.
//!
//! Every structural or visual change is recorded in a [`Mutation`] log the
//! host drains after each step to mirror the tree onto its real surface.
//!
//! # Invariants
//!
//! 1. A node's `parent` and its parent's `children` agree.
//! 2. Removal frees the whole subtree and logs every freed identifier.
//! 3. Operations on identifiers that are not live are no-ops.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chorecard_core::node::NodeId;
use chorecard_core::surface::GestureSurface;

use crate::markup::{self, MarkupError};
use crate::vnode::VNode;

static NEXT_ROOT: AtomicU64 = AtomicU64::new(1);

/// Identity of one render tree, used to key per-root caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RootId(u64);

impl RootId {
    fn next() -> Self {
        Self(NEXT_ROOT.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// One recorded change to the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Inserted {
        parent: NodeId,
        index: usize,
        node: NodeId,
    },
    Removed {
        parent: NodeId,
        node: NodeId,
    },
    TextSet {
        node: NodeId,
    },
    AttributeSet {
        node: NodeId,
        name: String,
    },
    AttributeRemoved {
        node: NodeId,
        name: String,
    },
    PointerEvents {
        node: NodeId,
        enabled: bool,
    },
}

#[derive(Debug, Clone)]
enum NodeData {
    Root,
    Element {
        tag: String,
        attributes: BTreeMap<String, String>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    pointer_events: bool,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// A live tree of elements and text under a single root.
#[derive(Debug)]
pub struct RenderTree {
    id: RootId,
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
    mutations: Vec<Mutation>,
    removed: Vec<NodeId>,
}

impl Default for RenderTree {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderTree {
    /// Create a tree holding only an empty root.
    #[must_use]
    pub fn new() -> Self {
        let root = Node {
            data: NodeData::Root,
            parent: None,
            children: Vec::new(),
            pointer_events: true,
        };
        Self {
            id: RootId::next(),
            slots: vec![Slot {
                generation: 0,
                node: Some(root),
            }],
            free: Vec::new(),
            root: NodeId::new(0, 0),
            mutations: Vec::new(),
            removed: Vec::new(),
        }
    }

    /// Create a tree whose root holds the parsed `markup`.
    pub fn from_markup(input: &str) -> Result<Self, MarkupError> {
        let nodes = markup::parse(input)?;
        let mut tree = Self::new();
        let root = tree.root;
        for node in &nodes {
            tree.append(root, node);
        }
        tree.mutations.clear();
        Ok(tree)
    }

    /// Tree identity.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> RootId {
        self.id
    }

    /// The root node.
    #[inline]
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.node.is_some()).count()
    }

    /// Whether the root has no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children(self.root).is_empty()
    }

    fn get(&self, id: NodeId) -> Option<&Node> {
        let slot = self.slots.get(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.node.as_ref()
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.node.as_mut()
    }

    // --- queries -----------------------------------------------------------

    /// Ordered children of `node`.
    #[must_use]
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.get(node).map_or(&[], |n| n.children.as_slice())
    }

    /// Tag name of an element.
    #[must_use]
    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match &self.get(node)?.data {
            NodeData::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    /// Content of a text node.
    #[must_use]
    pub fn text(&self, node: NodeId) -> Option<&str> {
        match &self.get(node)?.data {
            NodeData::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Attributes of an element.
    #[must_use]
    pub fn attributes(&self, node: NodeId) -> Option<&BTreeMap<String, String>> {
        match &self.get(node)?.data {
            NodeData::Element { attributes, .. } => Some(attributes),
            _ => None,
        }
    }

    /// Whether `node` is an element.
    #[must_use]
    pub fn is_element(&self, node: NodeId) -> bool {
        self.tag(node).is_some()
    }

    /// Concatenated text of `node` and its descendants.
    #[must_use]
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            let Some(n) = self.get(id) else { continue };
            if let NodeData::Text(text) = &n.data {
                out.push_str(text);
            }
            stack.extend(n.children.iter().rev().copied());
        }
        out
    }

    /// First element in document order whose `name` attribute equals `value`.
    #[must_use]
    pub fn find_by_attribute(&self, name: &str, value: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .find(|&id| self.attribute_of(id, name) == Some(value))
    }

    /// Descendants of `node` in document order (excluding `node`).
    pub fn descendants(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut stack: Vec<NodeId> = self.children(node).iter().rev().copied().collect();
        std::iter::from_fn(move || {
            let id = stack.pop()?;
            stack.extend(self.children(id).iter().rev().copied());
            Some(id)
        })
    }

    fn attribute_of(&self, node: NodeId, name: &str) -> Option<&str> {
        self.attributes(node)?.get(name).map(String::as_str)
    }

    /// Virtual form of the children of `node`.
    #[must_use]
    pub fn to_vnodes(&self, node: NodeId) -> Vec<VNode> {
        self.children(node)
            .iter()
            .filter_map(|&child| self.to_vnode(child))
            .collect()
    }

    /// Virtual form of one node.
    #[must_use]
    pub fn to_vnode(&self, node: NodeId) -> Option<VNode> {
        match &self.get(node)?.data {
            NodeData::Root => None,
            NodeData::Text(text) => Some(VNode::text(text.clone())),
            NodeData::Element { tag, attributes } => Some(VNode::element(
                tag.clone(),
                attributes.clone(),
                self.to_vnodes(node),
            )),
        }
    }

    /// Serialize the root's children.
    #[must_use]
    pub fn to_markup(&self) -> String {
        markup::to_markup(&self.to_vnodes(self.root))
    }

    // --- structural mutation -----------------------------------------------

    fn alloc(&mut self, node: Node) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.node = Some(node);
            NodeId::new(index, slot.generation)
        } else {
            let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId::new(index, 0)
        }
    }

    fn build(&mut self, vnode: &VNode, parent: NodeId) -> NodeId {
        let (data, children) = match vnode {
            VNode::Text { raw, .. } => (NodeData::Text(raw.clone()), &[][..]),
            VNode::Element(el) => (
                NodeData::Element {
                    tag: el.tag.clone(),
                    attributes: el.attributes.clone(),
                },
                el.children.as_slice(),
            ),
        };
        let id = self.alloc(Node {
            data,
            parent: Some(parent),
            children: Vec::with_capacity(children.len()),
            pointer_events: true,
        });
        for child in children {
            let child_id = self.build(child, id);
            if let Some(n) = self.get_mut(id) {
                n.children.push(child_id);
            }
        }
        id
    }

    /// Insert `vnode` as child `index` of `parent`.
    ///
    /// Returns `None` when `parent` is not live or `index` is past the end.
    pub fn insert(&mut self, parent: NodeId, index: usize, vnode: &VNode) -> Option<NodeId> {
        let len = self.get(parent)?.children.len();
        if index > len || self.text(parent).is_some() {
            return None;
        }
        let id = self.build(vnode, parent);
        if let Some(p) = self.get_mut(parent) {
            p.children.insert(index, id);
        }
        self.mutations.push(Mutation::Inserted {
            parent,
            index,
            node: id,
        });
        Some(id)
    }

    /// Append `vnode` to `parent`.
    pub fn append(&mut self, parent: NodeId, vnode: &VNode) -> Option<NodeId> {
        let len = self.get(parent)?.children.len();
        self.insert(parent, len, vnode)
    }

    /// Remove `node` and its subtree. The root cannot be removed.
    pub fn remove(&mut self, node: NodeId) -> bool {
        if node == self.root {
            return false;
        }
        let Some(parent) = self.get(node).and_then(|n| n.parent) else {
            return false;
        };
        if let Some(p) = self.get_mut(parent) {
            p.children.retain(|&c| c != node);
        }
        self.free_subtree(node);
        self.mutations.push(Mutation::Removed { parent, node });
        true
    }

    fn free_subtree(&mut self, node: NodeId) {
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if self.get(id).is_none() {
                continue;
            }
            let Some(n) = self.slots[id.index() as usize].node.take() else {
                continue;
            };
            stack.extend(n.children);
            self.free.push(id.index());
            self.removed.push(id);
        }
    }

    /// Replace `node` with a new subtree at the same position.
    pub fn replace(&mut self, node: NodeId, vnode: &VNode) -> Option<NodeId> {
        let parent = self.get(node)?.parent?;
        let index = self.children(parent).iter().position(|&c| c == node)?;
        self.remove(node);
        self.insert(parent, index, vnode)
    }

    /// Replace every child of `parent`.
    pub fn replace_children(&mut self, parent: NodeId, nodes: &[VNode]) {
        let existing = self.children(parent).to_vec();
        for child in existing {
            self.remove(child);
        }
        for vnode in nodes {
            self.append(parent, vnode);
        }
    }

    /// Set the content of a text node. Returns `false` for non-text nodes.
    pub fn set_text(&mut self, node: NodeId, content: &str) -> bool {
        match self.get_mut(node).map(|n| &mut n.data) {
            Some(NodeData::Text(text)) => {
                content.clone_into(text);
                self.mutations.push(Mutation::TextSet { node });
                true
            }
            _ => false,
        }
    }

    /// Set an attribute. Returns `false` for non-element nodes.
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> bool {
        match self.get_mut(node).map(|n| &mut n.data) {
            Some(NodeData::Element { attributes, .. }) => {
                attributes.insert(name.to_owned(), value.to_owned());
                self.mutations.push(Mutation::AttributeSet {
                    node,
                    name: name.to_owned(),
                });
                true
            }
            _ => false,
        }
    }

    /// Remove an attribute. Returns whether it was present.
    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> bool {
        let removed = match self.get_mut(node).map(|n| &mut n.data) {
            Some(NodeData::Element { attributes, .. }) => attributes.remove(name).is_some(),
            _ => false,
        };
        if removed {
            self.mutations.push(Mutation::AttributeRemoved {
                node,
                name: name.to_owned(),
            });
        }
        removed
    }

    /// Drain the mutation log.
    pub fn take_mutations(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.mutations)
    }

    /// Drain identifiers freed since the last call.
    pub fn take_removed(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.removed)
    }

    fn class_tokens(&self, node: NodeId) -> impl Iterator<Item = &str> {
        self.attribute_of(node, "class")
            .unwrap_or_default()
            .split_ascii_whitespace()
    }
}

impl GestureSurface for RenderTree {
    fn contains(&self, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            if id == self.root {
                return true;
            }
            cursor = self.get(id).and_then(|n| n.parent);
        }
        false
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.get(node)?.parent.filter(|&p| p != self.root)
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.attribute_of(node, name)
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.class_tokens(node).any(|token| token == class)
    }

    fn add_class(&mut self, node: NodeId, class: &str) {
        if !self.is_element(node) || self.has_class(node, class) {
            return;
        }
        let mut value: Vec<&str> = self.class_tokens(node).collect();
        value.push(class);
        let joined = value.join(" ");
        self.set_attribute(node, "class", &joined);
    }

    fn remove_class(&mut self, node: NodeId, class: &str) {
        if !self.has_class(node, class) {
            return;
        }
        let joined = self
            .class_tokens(node)
            .filter(|&token| token != class)
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attribute(node, "class", &joined);
    }

    fn find_descendant(&self, node: NodeId, name: &str) -> Option<NodeId> {
        self.descendants(node)
            .find(|&id| self.attribute_of(id, name).is_some())
    }

    fn pointer_events_enabled(&self, node: NodeId) -> bool {
        self.get(node).is_some_and(|n| n.pointer_events)
    }

    fn set_pointer_events(&mut self, node: NodeId, enabled: bool) {
        if !self.is_element(node) {
            return;
        }
        if let Some(n) = self.get_mut(node)
            && n.pointer_events != enabled
        {
            n.pointer_events = enabled;
            self.mutations.push(Mutation::PointerEvents { node, enabled });
        }
    }
}
