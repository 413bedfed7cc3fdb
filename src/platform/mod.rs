pub mod fixture;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::AutomationResult;
use crate::tree::snapshot::TreeSnapshot;
use crate::tree::types::NodeHandle;

/// Action performed on a single node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "text", rename_all = "snake_case")]
pub enum NodeAction {
    Click,
    LongClick,
    Focus,
    SetText(String),
    ScrollForward,
    ScrollBackward,
}

impl NodeAction {
    pub fn name(&self) -> &'static str {
        match self {
            NodeAction::Click => "click",
            NodeAction::LongClick => "long_click",
            NodeAction::Focus => "focus",
            NodeAction::SetText(_) => "set_text",
            NodeAction::ScrollForward | NodeAction::ScrollBackward => "scroll",
        }
    }
}

/// Straight-line timed stroke in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gesture {
    pub start_x: i32,
    pub start_y: i32,
    pub end_x: i32,
    pub end_y: i32,
    pub duration_ms: u64,
}

/// Raw notification delivered by the platform's accessibility event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlatformEvent {
    WindowStateChanged { package_name: String, class_name: String },
    WindowContentChanged { package_name: String, class_name: String },
    ViewClicked { text: String },
    ViewFocused { text: String },
}

/// The device-side accessibility service.
///
/// Implementations own the live UI tree. Every read hands back an owned
/// snapshot; actions address nodes by the handle found in that snapshot.
#[async_trait]
pub trait AccessibilityPlatform: Send + Sync {
    /// Snapshot of the active window, `None` when no root window exists.
    async fn snapshot(&self) -> AutomationResult<Option<TreeSnapshot>>;

    /// Performs `action` on the node. `Ok(false)` means the platform refused.
    async fn perform_action(&self, node: NodeHandle, action: &NodeAction) -> AutomationResult<bool>;

    fn supports_gestures(&self) -> bool;

    /// Returns once the gesture is accepted, not when it finishes on screen.
    async fn dispatch_gesture(&self, gesture: &Gesture) -> AutomationResult<bool>;

    /// Starts the package's launch entry point.
    /// Fails with `AppNotLaunchable` when the package has none.
    async fn launch_app(&self, package: &str) -> AutomationResult<bool>;

    fn is_service_enabled(&self) -> bool {
        true
    }
}
