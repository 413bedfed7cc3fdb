use std::str::FromStr;
use std::sync::Arc;

use crate::automation::events::{AutomationEvent, EventBus};
use crate::errors::{AutomationError, AutomationResult};
use crate::platform::{AccessibilityPlatform, Gesture, NodeAction};
use crate::tree::snapshot::{NodeId, TreeSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Forward,
    Backward,
}

impl FromStr for ScrollDirection {
    type Err = AutomationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "forward" => Ok(ScrollDirection::Forward),
            "backward" => Ok(ScrollDirection::Backward),
            _ => Err(AutomationError::InvalidDirection(s.to_string())),
        }
    }
}

/// Node the click actually lands on: the element itself when clickable,
/// otherwise its nearest clickable ancestor, otherwise the element again.
pub fn click_target(snapshot: &TreeSnapshot, node: NodeId) -> NodeId {
    let clickable = |id: NodeId| snapshot.element(id).is_some_and(|e| e.clickable);
    if clickable(node) {
        return node;
    }
    snapshot
        .ancestors(node)
        .find(|&id| clickable(id))
        .unwrap_or(node)
}

/// Performs actions on resolved elements and reports each outcome on the
/// event bus.
pub struct ActionExecutor {
    platform: Arc<dyn AccessibilityPlatform>,
    events: EventBus,
}

impl ActionExecutor {
    pub fn new(platform: Arc<dyn AccessibilityPlatform>, events: EventBus) -> Self {
        Self { platform, events }
    }

    pub async fn click(&self, snapshot: &TreeSnapshot, node: NodeId) -> AutomationResult<()> {
        let target = click_target(snapshot, node);
        if target != node {
            tracing::debug!(node, target, "element not clickable; clicking ancestor");
        }
        let outcome = self.perform(snapshot, target, NodeAction::Click).await;
        self.report("click", &outcome);
        outcome
    }

    pub async fn long_click(&self, snapshot: &TreeSnapshot, node: NodeId) -> AutomationResult<()> {
        let outcome = self.perform(snapshot, node, NodeAction::LongClick).await;
        self.report("long_click", &outcome);
        outcome
    }

    pub async fn focus(&self, snapshot: &TreeSnapshot, node: NodeId) -> AutomationResult<()> {
        let outcome = self.perform(snapshot, node, NodeAction::Focus).await;
        self.report("focus", &outcome);
        outcome
    }

    pub async fn set_text(
        &self,
        snapshot: &TreeSnapshot,
        node: NodeId,
        text: &str,
    ) -> AutomationResult<()> {
        let editable = snapshot.element(node).is_some_and(|e| e.editable);
        let outcome = if editable {
            self.perform(snapshot, node, NodeAction::SetText(text.to_string()))
                .await
        } else {
            Err(AutomationError::NotEditable)
        };
        self.report("set_text", &outcome);
        outcome
    }

    /// `direction` must be `forward` or `backward`; anything else performs
    /// no action.
    pub async fn scroll(
        &self,
        snapshot: &TreeSnapshot,
        node: NodeId,
        direction: &str,
    ) -> AutomationResult<()> {
        let outcome = match direction.parse::<ScrollDirection>() {
            Ok(ScrollDirection::Forward) => {
                self.perform(snapshot, node, NodeAction::ScrollForward).await
            }
            Ok(ScrollDirection::Backward) => {
                self.perform(snapshot, node, NodeAction::ScrollBackward).await
            }
            Err(e) => Err(e),
        };
        self.report("scroll", &outcome);
        outcome
    }

    /// Success means the platform accepted the gesture; it may still be
    /// animating when this returns.
    pub async fn swipe(&self, gesture: Gesture) -> AutomationResult<()> {
        let outcome = if !self.platform.supports_gestures() {
            Err(AutomationError::Unsupported("gesture dispatch".into()))
        } else {
            match self.platform.dispatch_gesture(&gesture).await {
                Ok(true) => Ok(()),
                Ok(false) => Err(AutomationError::ActionNotPerformed("swipe".into())),
                Err(e) => Err(e),
            }
        };
        tracing::debug!(?gesture, ok = outcome.is_ok(), "swipe dispatched");
        self.report("swipe", &outcome);
        outcome
    }

    async fn perform(
        &self,
        snapshot: &TreeSnapshot,
        node: NodeId,
        action: NodeAction,
    ) -> AutomationResult<()> {
        let element = snapshot
            .element(node)
            .ok_or_else(|| AutomationError::ElementNotFound(format!("node #{node}")))?;
        let accepted = self.platform.perform_action(element.handle, &action).await?;
        tracing::debug!(
            action = action.name(),
            element = %element.label(),
            accepted,
            "action performed"
        );
        if accepted {
            Ok(())
        } else {
            Err(AutomationError::ActionNotPerformed(format!(
                "{} on '{}'",
                action.name(),
                element.label()
            )))
        }
    }

    fn report(&self, action: &str, outcome: &AutomationResult<()>) {
        if let Err(e) = outcome {
            tracing::info!(action, error = %e, "action failed");
        }
        self.events.emit(AutomationEvent::ActionCompleted {
            action: action.to_string(),
            success: outcome.is_ok(),
        });
    }
}
