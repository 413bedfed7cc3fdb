//! Arena snapshot of the accessibility tree.
//!
//! A snapshot is built once per query from the platform's nested node
//! description and dropped when the query ends, so no node outlives the
//! call that read it. Nodes are stored in pre-order: index 0 is the root and
//! iterating indices in ascending order is a depth-first pre-order walk.
use serde::{Deserialize, Serialize};

use crate::tree::types::{Bounds, Element, NodeHandle};

/// Index of a node inside one [`TreeSnapshot`].
pub type NodeId = usize;

/// Nested node description as delivered by a platform (or read from a
/// device fixture).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UiNode {
    pub handle: u64,
    pub id: String,
    pub text: String,
    pub content_description: String,
    pub class_name: String,
    pub package_name: String,
    pub bounds: Bounds,
    pub visible: bool,
    pub enabled: bool,
    pub clickable: bool,
    pub editable: bool,
    pub scrollable: bool,
    pub focusable: bool,
    pub children: Vec<UiNode>,
}

impl Default for UiNode {
    fn default() -> Self {
        Self {
            handle: 0,
            id: String::new(),
            text: String::new(),
            content_description: String::new(),
            class_name: String::new(),
            package_name: String::new(),
            bounds: Bounds::default(),
            visible: true,
            enabled: true,
            clickable: false,
            editable: false,
            scrollable: false,
            focusable: false,
            children: Vec::new(),
        }
    }
}

impl UiNode {
    fn to_element(&self) -> Element {
        Element {
            handle: NodeHandle(self.handle),
            id: self.id.clone(),
            text: self.text.clone(),
            content_description: self.content_description.clone(),
            class_name: self.class_name.clone(),
            package_name: self.package_name.clone(),
            bounds: self.bounds,
            visible: self.visible,
            enabled: self.enabled,
            clickable: self.clickable,
            editable: self.editable,
            scrollable: self.scrollable,
            focusable: self.focusable,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotNode {
    pub element: Element,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone, Default)]
pub struct TreeSnapshot {
    nodes: Vec<SnapshotNode>,
    window_count: usize,
}

impl TreeSnapshot {
    pub fn build(root: &UiNode, window_count: usize) -> Self {
        let mut nodes: Vec<SnapshotNode> = Vec::new();
        let mut stack: Vec<(&UiNode, Option<NodeId>)> = vec![(root, None)];

        while let Some((node, parent)) = stack.pop() {
            let id = nodes.len();
            nodes.push(SnapshotNode {
                element: node.to_element(),
                parent,
                children: Vec::with_capacity(node.children.len()),
            });
            if let Some(p) = parent {
                nodes[p].children.push(id);
            }
            // Reverse push so the leftmost child is popped first.
            for child in node.children.iter().rev() {
                stack.push((child, Some(id)));
            }
        }

        Self { nodes, window_count }
    }

    pub fn root(&self) -> Option<NodeId> {
        if self.nodes.is_empty() {
            None
        } else {
            Some(0)
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn window_count(&self) -> usize {
        self.window_count
    }

    pub fn node(&self, id: NodeId) -> Option<&SnapshotNode> {
        self.nodes.get(id)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.nodes.get(id).map(|n| &n.element)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Ancestors of `id`, nearest first. Does not include `id` itself.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            snapshot: self,
            next: self.parent(id),
        }
    }

    /// Node ids in depth-first pre-order.
    pub fn preorder(&self) -> impl Iterator<Item = NodeId> + '_ {
        0..self.nodes.len()
    }
}

pub struct Ancestors<'a> {
    snapshot: &'a TreeSnapshot,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.snapshot.parent(current);
        Some(current)
    }
}
