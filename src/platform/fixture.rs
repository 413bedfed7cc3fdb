//! In-memory platform backed by a JSON device description.
//!
//! Used by the binary to replay a captured screen and by tests as the live
//! device. The tree is mutable: `set_text` updates the node, launches move the
//! foreground package, and `set_root` swaps the whole window.
use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::errors::{AutomationError, AutomationResult};
use crate::platform::{AccessibilityPlatform, Gesture, NodeAction};
use crate::tree::snapshot::{TreeSnapshot, UiNode};
use crate::tree::types::NodeHandle;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceFixture {
    pub root: Option<UiNode>,
    #[serde(default)]
    pub launchable_packages: Vec<String>,
    #[serde(default = "default_true")]
    pub gestures_supported: bool,
    #[serde(default = "default_window_count")]
    pub window_count: usize,
}

fn default_true() -> bool {
    true
}

fn default_window_count() -> usize {
    1
}

/// Everything the device was asked to do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Performed {
    Node { handle: NodeHandle, action: NodeAction },
    Gesture(Gesture),
    Launch(String),
}

struct FixtureState {
    root: Option<UiNode>,
    launchable: HashSet<String>,
    window_count: usize,
    refused: HashSet<u64>,
    performed: Vec<Performed>,
    foreground: Option<String>,
    next_handle: u64,
}

pub struct FixtureDevice {
    state: Mutex<FixtureState>,
    /// Fixed at construction; read without taking the state lock.
    gestures_supported: bool,
}

impl FixtureDevice {
    pub fn new(fixture: DeviceFixture) -> Self {
        let mut root = fixture.root;
        let mut next_handle = 1;
        if let Some(node) = root.as_mut() {
            assign_handles(node, &mut next_handle);
        }
        let foreground = root
            .as_ref()
            .map(|r| r.package_name.clone())
            .filter(|p| !p.is_empty());

        Self {
            gestures_supported: fixture.gestures_supported,
            state: Mutex::new(FixtureState {
                root,
                launchable: fixture.launchable_packages.into_iter().collect(),
                window_count: fixture.window_count,
                refused: HashSet::new(),
                performed: Vec::new(),
                foreground,
                next_handle,
            }),
        }
    }

    pub fn from_json(json: &str) -> AutomationResult<Self> {
        let fixture: DeviceFixture = serde_json::from_str(json)?;
        Ok(Self::new(fixture))
    }

    pub async fn load(path: &Path) -> AutomationResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let device = Self::from_json(&content)?;
        tracing::info!(path = %path.display(), "device fixture loaded");
        Ok(device)
    }

    /// Overrides gesture support (e.g. to emulate an old platform version).
    pub fn with_gestures(mut self, supported: bool) -> Self {
        self.gestures_supported = supported;
        self
    }

    /// Replaces the active window. `None` emulates a backgrounded app.
    pub async fn set_root(&self, root: Option<UiNode>) {
        let mut state = self.state.lock().await;
        let mut root = root;
        if let Some(node) = root.as_mut() {
            let mut next = state.next_handle;
            assign_handles(node, &mut next);
            state.next_handle = next;
        }
        state.root = root;
    }

    /// Makes every later action on `handle` report failure.
    pub async fn refuse_actions_on(&self, handle: NodeHandle) {
        self.state.lock().await.refused.insert(handle.0);
    }

    pub async fn performed(&self) -> Vec<Performed> {
        self.state.lock().await.performed.clone()
    }

    pub async fn foreground(&self) -> Option<String> {
        self.state.lock().await.foreground.clone()
    }

    /// Handle of the first node (pre-order) whose resource id equals `id`.
    pub async fn handle_of(&self, id: &str) -> Option<NodeHandle> {
        let state = self.state.lock().await;
        state
            .root
            .as_ref()
            .and_then(|r| find_node(r, &|n: &UiNode| n.id == id))
            .map(|n| NodeHandle(n.handle))
    }

    /// Current text of the node with `handle`.
    pub async fn text_of(&self, handle: NodeHandle) -> Option<String> {
        let state = self.state.lock().await;
        state
            .root
            .as_ref()
            .and_then(|r| find_node(r, &|n: &UiNode| n.handle == handle.0))
            .map(|n| n.text.clone())
    }
}

#[async_trait]
impl AccessibilityPlatform for FixtureDevice {
    async fn snapshot(&self) -> AutomationResult<Option<TreeSnapshot>> {
        let state = self.state.lock().await;
        Ok(state
            .root
            .as_ref()
            .map(|root| TreeSnapshot::build(root, state.window_count)))
    }

    async fn perform_action(&self, node: NodeHandle, action: &NodeAction) -> AutomationResult<bool> {
        let mut state = self.state.lock().await;
        state.performed.push(Performed::Node {
            handle: node,
            action: action.clone(),
        });

        if state.refused.contains(&node.0) {
            return Ok(false);
        }
        let Some(root) = state.root.as_mut() else {
            return Ok(false);
        };
        // Stale handles are refused, the same way a recycled node would be.
        let Some(target) = find_node_mut(root, node.0) else {
            return Ok(false);
        };
        if !target.enabled {
            return Ok(false);
        }

        let accepted = match action {
            NodeAction::SetText(text) => {
                if target.editable {
                    target.text = text.clone();
                    true
                } else {
                    false
                }
            }
            NodeAction::ScrollForward | NodeAction::ScrollBackward => target.scrollable,
            NodeAction::Click | NodeAction::LongClick | NodeAction::Focus => true,
        };
        Ok(accepted)
    }

    fn supports_gestures(&self) -> bool {
        self.gestures_supported
    }

    async fn dispatch_gesture(&self, gesture: &Gesture) -> AutomationResult<bool> {
        if !self.gestures_supported {
            return Err(AutomationError::Unsupported("gesture dispatch".into()));
        }
        let mut state = self.state.lock().await;
        state.performed.push(Performed::Gesture(*gesture));
        Ok(true)
    }

    async fn launch_app(&self, package: &str) -> AutomationResult<bool> {
        let mut state = self.state.lock().await;
        if !state.launchable.contains(package) {
            return Err(AutomationError::AppNotLaunchable(package.to_string()));
        }
        state.performed.push(Performed::Launch(package.to_string()));
        state.foreground = Some(package.to_string());
        Ok(true)
    }
}

fn assign_handles(node: &mut UiNode, next: &mut u64) {
    node.handle = *next;
    *next += 1;
    for child in node.children.iter_mut() {
        assign_handles(child, next);
    }
}

fn find_node<'a>(node: &'a UiNode, pred: &dyn Fn(&UiNode) -> bool) -> Option<&'a UiNode> {
    if pred(node) {
        return Some(node);
    }
    node.children.iter().find_map(|c| find_node(c, pred))
}

fn find_node_mut(node: &mut UiNode, handle: u64) -> Option<&mut UiNode> {
    if node.handle == handle {
        return Some(node);
    }
    node.children
        .iter_mut()
        .find_map(|c| find_node_mut(c, handle))
}
