//! Scene node tree
//!
//! Nodes live in an arena and are addressed by generational [`NodeId`]s.
//! Each node has a name, an optional parent, ordered children and a single
//! user-data slot. Top-level nodes hang off the scene root in insertion order.
//!
//! Traversal is in document order: a node is visited before its children,
//! children in attachment order, top-level nodes in attachment order.

use std::fmt;

use crate::foundation::any::AsAny;
use crate::foundation::collections::{new_key_type, HandleMap};

new_key_type! {
    /// Handle to a node in a [`Scene`]
    pub struct NodeId;
}

/// Payload stored in a node's user-data slot
///
/// Every system that tags nodes claims a distinct integer id and reports it
/// here, so [`Scene::user_data`] can check the id before downcasting.
pub trait NodeUserData: AsAny {
    /// Id claimed by the system that owns this payload
    fn node_user_data_id(&self) -> i32;
}

/// A single scene node
pub struct Node {
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    user_data: Option<Box<dyn NodeUserData>>,
}

impl Node {
    fn new(name: String) -> Self {
        Self {
            name,
            parent: None,
            children: Vec::new(),
            user_data: None,
        }
    }

    /// Node name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent node, `None` for top-level and detached nodes
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in attachment order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Id of the payload in the user-data slot, if any
    pub fn user_data_id(&self) -> Option<i32> {
        self.user_data.as_ref().map(|data| data.node_user_data_id())
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("user_data_id", &self.user_data_id())
            .finish()
    }
}

/// Node tree hanging off an implicit root
#[derive(Debug, Default)]
pub struct Scene {
    nodes: HandleMap<NodeId, Node>,
    roots: Vec<NodeId>,
}

impl Scene {
    /// Create a new empty scene
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detached node
    ///
    /// Detached nodes are not part of any traversal until attached with
    /// [`Scene::add_node`] or [`Scene::add_child`].
    pub fn create_node(&mut self, name: impl Into<String>) -> NodeId {
        self.nodes.insert(Node::new(name.into()))
    }

    /// Attach a node under the scene root, detaching it from any previous parent
    pub fn add_node(&mut self, node: NodeId) -> bool {
        if !self.nodes.contains_key(node) {
            return false;
        }
        self.detach(node);
        self.roots.push(node);
        true
    }

    /// Attach `child` as the last child of `parent`
    ///
    /// Fails if either node is unknown or if `parent` is `child` or one of its
    /// descendants.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if !self.nodes.contains_key(parent)
            || !self.nodes.contains_key(child)
            || self.is_ancestor_or_self(child, parent)
        {
            return false;
        }
        self.detach(child);
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
        true
    }

    /// Detach a node from its parent or from the scene root
    ///
    /// The node and its subtree stay alive but are no longer traversed.
    pub fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.nodes.get(node).map(|n| n.parent) else {
            return;
        };
        match parent {
            Some(parent) => {
                if let Some(parent) = self.nodes.get_mut(parent) {
                    parent.children.retain(|&c| c != node);
                }
                self.nodes[node].parent = None;
            }
            None => self.roots.retain(|&r| r != node),
        }
    }

    /// Detach and release a node together with its whole subtree
    ///
    /// Returns the number of nodes released.
    pub fn remove_node(&mut self, node: NodeId) -> usize {
        if !self.nodes.contains_key(node) {
            return 0;
        }
        self.detach(node);

        let mut released = 0;
        let mut stack = vec![node];
        while let Some(next) = stack.pop() {
            if let Some(removed) = self.nodes.remove(next) {
                stack.extend(removed.children);
                released += 1;
            }
        }
        released
    }

    /// Get a node
    pub fn node(&self, node: NodeId) -> Option<&Node> {
        self.nodes.get(node)
    }

    /// Whether the node exists
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(node)
    }

    /// Parent of a node
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node).and_then(|n| n.parent)
    }

    /// Children of a node, empty for unknown nodes
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes.get(node).map_or(&[], |n| n.children.as_slice())
    }

    /// Top-level nodes in attachment order
    pub fn root_nodes(&self) -> &[NodeId] {
        &self.roots
    }

    /// First top-level node
    pub fn first_node(&self) -> Option<NodeId> {
        self.roots.first().copied()
    }

    /// Walk parent links up to the top-most ancestor of `node`
    pub fn top_ancestor(&self, node: NodeId) -> Option<NodeId> {
        let mut current = node;
        if !self.nodes.contains_key(current) {
            return None;
        }
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        Some(current)
    }

    /// Find the first node with the given name in document order
    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.document_order()
            .into_iter()
            .find(|&node| self.nodes[node].name == name)
    }

    /// All attached nodes in document order
    pub fn document_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        for &root in &self.roots {
            self.collect_subtree(root, &mut order);
        }
        order
    }

    /// `node` followed by its descendants in document order
    pub fn subtree_order(&self, node: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        if self.nodes.contains_key(node) {
            self.collect_subtree(node, &mut order);
        }
        order
    }

    fn collect_subtree(&self, node: NodeId, order: &mut Vec<NodeId>) {
        let mut stack = vec![node];
        while let Some(next) = stack.pop() {
            order.push(next);
            if let Some(n) = self.nodes.get(next) {
                stack.extend(n.children.iter().rev().copied());
            }
        }
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// Replace the payload of a node's user-data slot
    ///
    /// Returns the previous payload.
    pub fn set_user_data(
        &mut self,
        node: NodeId,
        data: Option<Box<dyn NodeUserData>>,
    ) -> Option<Box<dyn NodeUserData>> {
        let slot = &mut self.nodes.get_mut(node)?.user_data;
        std::mem::replace(slot, data)
    }

    /// Typed access to a node's user data
    ///
    /// Returns `None` unless the slot holds a payload claiming `id` whose
    /// concrete type is `T`.
    pub fn user_data<T: NodeUserData>(&self, node: NodeId, id: i32) -> Option<&T> {
        let data = self.nodes.get(node)?.user_data.as_deref()?;
        if data.node_user_data_id() != id {
            return None;
        }
        data.as_any().downcast_ref::<T>()
    }

    /// Total number of nodes, attached or not
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Release every node
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.roots.clear();
    }
}
