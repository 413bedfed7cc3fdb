//! Depth-first search over a tree snapshot.
//!
//! A walker borrows one snapshot; a fresh query against the live tree needs a
//! fresh snapshot. A missing snapshot (no root window) yields no results.
use crate::errors::{AutomationError, AutomationResult};
use crate::tree::selector::Selector;
use crate::tree::snapshot::{NodeId, TreeSnapshot};
use crate::tree::types::Element;

pub struct TreeWalker<'a> {
    snapshot: Option<&'a TreeSnapshot>,
}

impl<'a> TreeWalker<'a> {
    pub fn new(snapshot: Option<&'a TreeSnapshot>) -> Self {
        Self { snapshot }
    }

    /// All matches in pre-order.
    pub fn find_all(&self, selector: &Selector) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.walk(|id, element| {
            if selector.matches(element) {
                out.push(id);
            }
            true
        });
        tracing::debug!(selector = %selector, count = out.len(), "find_all finished");
        out
    }

    /// First match in pre-order; stops walking as soon as it is found.
    pub fn find_first(&self, selector: &Selector) -> AutomationResult<NodeId> {
        let mut found = None;
        self.walk(|id, element| {
            if selector.matches(element) {
                found = Some(id);
                return false;
            }
            true
        });
        found.ok_or_else(|| AutomationError::ElementNotFound(selector.to_string()))
    }

    pub fn find_all_elements(&self, selector: &Selector) -> Vec<Element> {
        let Some(snapshot) = self.snapshot else {
            return Vec::new();
        };
        self.find_all(selector)
            .into_iter()
            .filter_map(|id| snapshot.element(id).cloned())
            .collect()
    }

    /// Number of nodes reachable from the root.
    pub fn count(&self) -> usize {
        let mut n = 0;
        self.walk(|_, _| {
            n += 1;
            true
        });
        n
    }

    /// Pre-order walk from the root. `visit` returns `false` to stop early.
    fn walk<F>(&self, mut visit: F)
    where
        F: FnMut(NodeId, &Element) -> bool,
    {
        let Some(snapshot) = self.snapshot else {
            tracing::debug!("no root window; nothing to walk");
            return;
        };
        let Some(root) = snapshot.root() else {
            return;
        };

        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = snapshot.node(id) else {
                continue;
            };
            if !visit(id, &node.element) {
                return;
            }
            stack.extend(node.children.iter().rev().copied());
        }
    }
}
