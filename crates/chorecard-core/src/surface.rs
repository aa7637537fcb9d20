#![forbid(unsafe_code)]

//! The tree interface the gesture recognizer sees.
//!
//! [`GestureSurface`] is a narrow view of a live render tree: structural
//! queries plus the few mutations gestures are allowed to make (class toggles
//! and pointer-event blocking). The render tree itself is written only by the
//! differ inside a scheduler cycle.
//!
//! [`resolve_target`] walks a target's ancestors once and returns every marker
//! the recognizer needs, so no other code inspects attributes ad hoc.

use crate::node::NodeId;

/// Markup attributes that opt nodes into gestures.
pub mod markers {
    /// Action name on an activatable control.
    pub const ACTION: &str = "data-action";
    /// Target identifier passed along with the action.
    pub const ID: &str = "data-id";
    /// Marks a node as long-pressable.
    pub const LONG_PRESS: &str = "data-long-press";
    /// Overrides the action dispatched by a confirmed delete.
    pub const DELETE_ACTION: &str = "data-delete-action";
    /// Marks a node as swipeable.
    pub const SWIPE: &str = "data-swipe";
    /// Overrides the action dispatched by a left swipe commit.
    pub const SWIPE_LEFT_ACTION: &str = "data-swipe-left";
    /// Overrides the action dispatched by a right swipe commit.
    pub const SWIPE_RIGHT_ACTION: &str = "data-swipe-right";
    /// Reserved confirmation block inside a long-pressable node.
    pub const CONFIRM_BLOCK: &str = "data-confirm";
    /// Control inside the confirmation block; value is `confirm` or `cancel`.
    pub const CONFIRM_CONTROL: &str = "data-confirm-control";

    /// Default action of a confirmed delete.
    pub const DEFAULT_DELETE_ACTION: &str = "delete";
    /// Default action of a left swipe commit.
    pub const DEFAULT_SWIPE_LEFT_ACTION: &str = "swipe-left";
    /// Default action of a right swipe commit.
    pub const DEFAULT_SWIPE_RIGHT_ACTION: &str = "swipe-right";
}

/// Visual state classes toggled by gestures.
pub mod classes {
    pub const LONG_PRESSING: &str = "long-pressing";
    pub const SWIPING_LEFT: &str = "swiping-left";
    pub const SWIPING_RIGHT: &str = "swiping-right";
    pub const HIDDEN: &str = "hidden";
}

/// Read access plus gesture-scoped mutations on a live tree.
///
/// Queries on a node that is not in the tree return `None`/`false`, and
/// mutations on such a node do nothing.
pub trait GestureSurface {
    /// Whether `node` is live in this tree.
    fn contains(&self, node: NodeId) -> bool;

    /// Parent element of `node`, if any. The root has no parent.
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Attribute value on `node`.
    fn attribute(&self, node: NodeId, name: &str) -> Option<&str>;

    /// Whether `node` carries `class`.
    fn has_class(&self, node: NodeId, class: &str) -> bool;

    /// Add `class` to `node`.
    fn add_class(&mut self, node: NodeId, class: &str);

    /// Remove `class` from `node`.
    fn remove_class(&mut self, node: NodeId, class: &str);

    /// First descendant of `node` (document order) carrying attribute `name`.
    fn find_descendant(&self, node: NodeId, name: &str) -> Option<NodeId>;

    /// Whether `node` currently accepts pointer interaction.
    fn pointer_events_enabled(&self, node: NodeId) -> bool;

    /// Enable or disable pointer interaction on `node`.
    fn set_pointer_events(&mut self, node: NodeId, enabled: bool);

    /// Whether `node` has attribute `name`.
    fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }
}

/// Which control of a confirmation block was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfirmChoice {
    Confirm,
    Cancel,
}

impl ConfirmChoice {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "confirm" => Some(Self::Confirm),
            "cancel" => Some(Self::Cancel),
            _ => None,
        }
    }
}

/// A confirm/cancel control and the long-pressable node that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmControl {
    pub node: NodeId,
    pub owner: NodeId,
    pub choice: ConfirmChoice,
}

/// Everything the recognizer needs to know about an event target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedTarget {
    /// Closest ancestor-or-self carrying an action marker.
    pub action_node: Option<NodeId>,
    /// That node's action name.
    pub action: Option<String>,
    /// That node's target id.
    pub id: Option<String>,
    /// Closest long-pressable ancestor-or-self.
    pub long_press: Option<NodeId>,
    /// Closest swipeable ancestor-or-self.
    pub swipe: Option<NodeId>,
    /// Confirmation control hit by the event.
    pub confirm: Option<ConfirmControl>,
    /// Closest ancestor-or-self in the long-pressing state.
    pub long_pressing: Option<NodeId>,
    /// Closest ancestor-or-self showing a swipe direction class.
    pub swiping: Option<NodeId>,
    /// Some ancestor-or-self has pointer interaction disabled.
    pub blocked: bool,
}

/// Resolve `target` against the gesture markers in one ancestor walk.
///
/// Returns an empty resolution for a node that is not in the tree.
#[must_use]
pub fn resolve_target<S: GestureSurface + ?Sized>(surface: &S, target: NodeId) -> ResolvedTarget {
    let mut resolved = ResolvedTarget::default();
    let mut pending_control: Option<(NodeId, ConfirmChoice)> = None;
    let mut cursor = surface.contains(target).then_some(target);

    while let Some(node) = cursor {
        if resolved.action_node.is_none()
            && let Some(action) = surface.attribute(node, markers::ACTION)
        {
            resolved.action_node = Some(node);
            resolved.action = Some(action.to_owned());
            resolved.id = surface.attribute(node, markers::ID).map(str::to_owned);
        }
        if pending_control.is_none()
            && resolved.confirm.is_none()
            && let Some(choice) = surface
                .attribute(node, markers::CONFIRM_CONTROL)
                .and_then(ConfirmChoice::parse)
        {
            pending_control = Some((node, choice));
        }
        if resolved.long_press.is_none() && surface.has_attribute(node, markers::LONG_PRESS) {
            resolved.long_press = Some(node);
            if let Some((control, choice)) = pending_control.take() {
                resolved.confirm = Some(ConfirmControl {
                    node: control,
                    owner: node,
                    choice,
                });
            }
        }
        if resolved.swipe.is_none() && surface.has_attribute(node, markers::SWIPE) {
            resolved.swipe = Some(node);
        }
        if resolved.long_pressing.is_none() && surface.has_class(node, classes::LONG_PRESSING) {
            resolved.long_pressing = Some(node);
        }
        if resolved.swiping.is_none()
            && (surface.has_class(node, classes::SWIPING_LEFT)
                || surface.has_class(node, classes::SWIPING_RIGHT))
        {
            resolved.swiping = Some(node);
        }
        if !surface.pointer_events_enabled(node) {
            resolved.blocked = true;
        }
        cursor = surface.parent(node);
    }

    resolved
}

#[cfg(test)]
pub(crate) mod mock {
    //! Minimal in-memory surface for unit tests.

    use std::collections::{BTreeMap, BTreeSet};

    use super::GestureSurface;
    use crate::node::NodeId;

    #[derive(Debug, Default)]
    struct MockNode {
        parent: Option<NodeId>,
        children: Vec<NodeId>,
        attributes: BTreeMap<String, String>,
        classes: BTreeSet<String>,
        pointer_events: bool,
    }

    #[derive(Debug, Default)]
    pub struct MockSurface {
        nodes: Vec<MockNode>,
    }

    impl MockSurface {
        pub fn new() -> Self {
            let mut surface = Self::default();
            surface.nodes.push(MockNode {
                pointer_events: true,
                ..MockNode::default()
            });
            surface
        }

        pub fn root(&self) -> NodeId {
            NodeId::new(0, 0)
        }

        pub fn add(&mut self, parent: NodeId, attrs: &[(&str, &str)]) -> NodeId {
            let id = NodeId::new(self.nodes.len() as u32, 0);
            self.nodes.push(MockNode {
                parent: Some(parent),
                attributes: attrs
                    .iter()
                    .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                    .collect(),
                pointer_events: true,
                ..MockNode::default()
            });
            self.nodes[parent.index() as usize].children.push(id);
            id
        }

        pub fn classes(&self, node: NodeId) -> Vec<&str> {
            self.nodes[node.index() as usize]
                .classes
                .iter()
                .map(String::as_str)
                .collect()
        }

        pub fn detach(&mut self, node: NodeId) {
            if let Some(parent) = self.nodes[node.index() as usize].parent.take() {
                self.nodes[parent.index() as usize]
                    .children
                    .retain(|c| *c != node);
            }
        }

        fn get(&self, node: NodeId) -> Option<&MockNode> {
            if !self.contains(node) {
                return None;
            }
            self.nodes.get(node.index() as usize)
        }
    }

    impl GestureSurface for MockSurface {
        fn contains(&self, node: NodeId) -> bool {
            let mut cursor = Some(node);
            while let Some(n) = cursor {
                if n == self.root() {
                    return true;
                }
                cursor = self.nodes.get(n.index() as usize).and_then(|m| m.parent);
            }
            false
        }

        fn parent(&self, node: NodeId) -> Option<NodeId> {
            self.get(node).and_then(|n| n.parent)
        }

        fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
            self.get(node)
                .and_then(|n| n.attributes.get(name))
                .map(String::as_str)
        }

        fn has_class(&self, node: NodeId, class: &str) -> bool {
            self.get(node).is_some_and(|n| n.classes.contains(class))
        }

        fn add_class(&mut self, node: NodeId, class: &str) {
            if self.contains(node) {
                self.nodes[node.index() as usize]
                    .classes
                    .insert(class.to_owned());
            }
        }

        fn remove_class(&mut self, node: NodeId, class: &str) {
            if self.contains(node) {
                self.nodes[node.index() as usize].classes.remove(class);
            }
        }

        fn find_descendant(&self, node: NodeId, name: &str) -> Option<NodeId> {
            let start = self.get(node)?;
            let mut stack: Vec<NodeId> = start.children.iter().rev().copied().collect();
            while let Some(n) = stack.pop() {
                let entry = &self.nodes[n.index() as usize];
                if entry.attributes.contains_key(name) {
                    return Some(n);
                }
                stack.extend(entry.children.iter().rev().copied());
            }
            None
        }

        fn pointer_events_enabled(&self, node: NodeId) -> bool {
            self.get(node).is_some_and(|n| n.pointer_events)
        }

        fn set_pointer_events(&mut self, node: NodeId, enabled: bool) {
            if self.contains(node) {
                self.nodes[node.index() as usize].pointer_events = enabled;
            }
        }
    }
}
