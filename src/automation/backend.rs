use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard, RwLock};

use crate::automation::actions::ActionExecutor;
use crate::automation::app_switcher::AppSwitcher;
use crate::automation::events::{AutomationEvent, EventBus};
use crate::errors::{AutomationError, AutomationResult};
use crate::platform::{AccessibilityPlatform, Gesture, PlatformEvent};
use crate::tree::selector::Selector;
use crate::tree::snapshot::{NodeId, TreeSnapshot};
use crate::tree::types::{Element, ScreenInfo};
use crate::tree::walker::TreeWalker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SequenceActionType {
    Click,
    LongClick,
    SetText,
    Focus,
    ScrollForward,
    ScrollBackward,
}

impl SequenceActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SequenceActionType::Click => "CLICK",
            SequenceActionType::LongClick => "LONG_CLICK",
            SequenceActionType::SetText => "SET_TEXT",
            SequenceActionType::Focus => "FOCUS",
            SequenceActionType::ScrollForward => "SCROLL_FORWARD",
            SequenceActionType::ScrollBackward => "SCROLL_BACKWARD",
        }
    }
}

/// One entry of an action sequence.
///
/// The target is located by the first non-empty of `text`, `id` and
/// `class_name`. `SET_TEXT` writes `value`, or `text` when `value` is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceAction {
    #[serde(rename = "type")]
    pub action: SequenceActionType,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub class_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl SequenceAction {
    fn locator(&self) -> Option<Selector> {
        if !self.text.is_empty() {
            Some(Selector::Text(self.text.clone()))
        } else if !self.id.is_empty() {
            Some(Selector::Id(self.id.clone()))
        } else if !self.class_name.is_empty() {
            Some(Selector::Class(self.class_name.clone()))
        } else {
            None
        }
    }
}

/// One live automation session bound to a platform.
///
/// Every selector-level operation takes a fresh snapshot, resolves against
/// it and drops it before returning.
pub struct AutomationBackend {
    platform: Arc<dyn AccessibilityPlatform>,
    executor: ActionExecutor,
    switcher: AppSwitcher,
    events: EventBus,
    run_lock: Mutex<()>,
}

impl AutomationBackend {
    pub fn new(platform: Arc<dyn AccessibilityPlatform>, events: EventBus) -> Self {
        Self {
            executor: ActionExecutor::new(platform.clone(), events.clone()),
            switcher: AppSwitcher::new(platform.clone(), events.clone()),
            platform,
            events,
            run_lock: Mutex::new(()),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn is_service_enabled(&self) -> bool {
        self.platform.is_service_enabled()
    }

    /// Serializes workflow runs against this backend. Held for the whole run.
    pub async fn lock_runs(&self) -> MutexGuard<'_, ()> {
        self.run_lock.lock().await
    }

    pub async fn snapshot(&self) -> AutomationResult<Option<TreeSnapshot>> {
        self.platform.snapshot().await
    }

    pub async fn find_elements(&self, selector: &Selector) -> AutomationResult<Vec<Element>> {
        let snapshot = self.snapshot().await?;
        if snapshot.is_none() {
            tracing::warn!(selector = %selector, "root node is null");
        }
        let found = TreeWalker::new(snapshot.as_ref()).find_all_elements(selector);
        self.events.emit(AutomationEvent::ElementFound {
            selector: selector.to_string(),
            count: found.len(),
        });
        Ok(found)
    }

    pub async fn find_first(&self, selector: &Selector) -> AutomationResult<Element> {
        let snapshot = self.snapshot().await?;
        let walker = TreeWalker::new(snapshot.as_ref());
        let id = walker.find_first(selector)?;
        snapshot
            .as_ref()
            .and_then(|s| s.element(id).cloned())
            .ok_or_else(|| AutomationError::ElementNotFound(selector.to_string()))
    }

    pub async fn click(&self, selector: &Selector) -> AutomationResult<()> {
        let (snapshot, node) = self.resolve(selector).await?;
        self.executor.click(&snapshot, node).await
    }

    pub async fn long_press(&self, selector: &Selector) -> AutomationResult<()> {
        let (snapshot, node) = self.resolve(selector).await?;
        self.executor.long_click(&snapshot, node).await
    }

    pub async fn focus(&self, selector: &Selector) -> AutomationResult<()> {
        let (snapshot, node) = self.resolve(selector).await?;
        self.executor.focus(&snapshot, node).await
    }

    pub async fn fill_field(&self, selector: &Selector, text: &str) -> AutomationResult<()> {
        let (snapshot, node) = self.resolve(selector).await?;
        self.executor.set_text(&snapshot, node, text).await
    }

    pub async fn scroll(&self, selector: &Selector, direction: &str) -> AutomationResult<()> {
        let (snapshot, node) = self.resolve(selector).await?;
        self.executor.scroll(&snapshot, node, direction).await
    }

    /// Runs `actions` in order, stopping at the first one that cannot be
    /// located or is refused. The stop is also published as an `Error` event.
    pub async fn perform_sequence(&self, actions: &[SequenceAction]) -> AutomationResult<()> {
        for (index, action) in actions.iter().enumerate() {
            let kind = action.action.as_str();
            let located = match action.locator() {
                Some(selector) => self.resolve(&selector).await,
                None => Err(AutomationError::MissingParam("text/id/className".into())),
            };
            let (snapshot, node) = match located {
                Ok(found) => found,
                Err(e) => {
                    tracing::warn!(index, action = kind, error = %e, "sequence target not found");
                    self.events.emit(AutomationEvent::Error {
                        message: format!("Element not found for action: {kind}"),
                    });
                    return Err(e);
                }
            };

            let outcome = match action.action {
                SequenceActionType::Click => self.executor.click(&snapshot, node).await,
                SequenceActionType::LongClick => self.executor.long_click(&snapshot, node).await,
                SequenceActionType::SetText => {
                    let text = action.value.as_deref().unwrap_or(&action.text);
                    self.executor.set_text(&snapshot, node, text).await
                }
                SequenceActionType::Focus => self.executor.focus(&snapshot, node).await,
                SequenceActionType::ScrollForward => {
                    self.executor.scroll(&snapshot, node, "forward").await
                }
                SequenceActionType::ScrollBackward => {
                    self.executor.scroll(&snapshot, node, "backward").await
                }
            };
            if let Err(e) = outcome {
                tracing::warn!(index, action = kind, error = %e, "sequence stopped");
                self.events.emit(AutomationEvent::Error {
                    message: format!("Action {kind} failed on element"),
                });
                return Err(e);
            }
        }
        Ok(())
    }

    pub async fn swipe(&self, gesture: Gesture) -> AutomationResult<()> {
        self.executor.swipe(gesture).await
    }

    pub async fn switch_to_app(&self, package: &str) -> AutomationResult<()> {
        self.switcher.switch_to(package).await
    }

    pub async fn current_app(&self) -> Option<String> {
        self.switcher.current_app().await
    }

    pub async fn screen_info(&self) -> AutomationResult<ScreenInfo> {
        let snapshot = self.snapshot().await?;
        let Some(snapshot) = snapshot else {
            return Ok(ScreenInfo::default());
        };
        let root = snapshot.root().and_then(|r| snapshot.element(r));
        Ok(ScreenInfo {
            package_name: root.map(|e| e.package_name.clone()).unwrap_or_default(),
            activity_name: root.map(|e| e.class_name.clone()).unwrap_or_default(),
            element_count: TreeWalker::new(Some(&snapshot)).count(),
            windows_count: snapshot.window_count(),
        })
    }

    /// Feeds a raw platform notification in; window changes become
    /// `ScreenChanged` events.
    pub fn handle_platform_event(&self, event: PlatformEvent) {
        match event {
            PlatformEvent::WindowStateChanged {
                package_name,
                class_name,
            }
            | PlatformEvent::WindowContentChanged {
                package_name,
                class_name,
            } => {
                tracing::debug!(package = %package_name, class = %class_name, "screen changed");
                self.events.emit(AutomationEvent::ScreenChanged {
                    package_name,
                    activity_name: class_name,
                });
            }
            PlatformEvent::ViewClicked { text } => tracing::debug!(text = %text, "view clicked"),
            PlatformEvent::ViewFocused { text } => tracing::debug!(text = %text, "view focused"),
        }
    }

    async fn resolve(&self, selector: &Selector) -> AutomationResult<(TreeSnapshot, NodeId)> {
        let snapshot = self.snapshot().await?.ok_or(AutomationError::NoRootWindow)?;
        let node = TreeWalker::new(Some(&snapshot)).find_first(selector)?;
        Ok((snapshot, node))
    }
}

/// Holder of the connected backend, if any.
///
/// Callers receive the slot by injection and ask it for the live backend on
/// each use; a disconnected slot answers `BackendUnavailable`.
pub struct BackendSlot {
    current: RwLock<Option<Arc<AutomationBackend>>>,
    events: EventBus,
}

impl BackendSlot {
    pub fn new(events: EventBus) -> Self {
        Self {
            current: RwLock::new(None),
            events,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Installs a new session for `platform`, replacing any previous one.
    pub async fn connect(&self, platform: Arc<dyn AccessibilityPlatform>) -> Arc<AutomationBackend> {
        let backend = Arc::new(AutomationBackend::new(platform, self.events.clone()));
        let previous = self.current.write().await.replace(backend.clone());
        if previous.is_some() {
            tracing::warn!("replacing an already connected backend");
        }
        tracing::info!("automation backend connected");
        self.events.emit(AutomationEvent::BackendConnected);
        backend
    }

    /// Clears the session. Returns whether one was connected.
    pub async fn disconnect(&self) -> bool {
        let was_connected = self.current.write().await.take().is_some();
        if was_connected {
            tracing::info!("automation backend disconnected");
            self.events.emit(AutomationEvent::BackendDisconnected);
        }
        was_connected
    }

    pub async fn current(&self) -> Option<Arc<AutomationBackend>> {
        self.current.read().await.clone()
    }

    pub async fn require(&self) -> AutomationResult<Arc<AutomationBackend>> {
        self.current().await.ok_or(AutomationError::BackendUnavailable)
    }

    pub async fn is_connected(&self) -> bool {
        self.current.read().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::fixture::FixtureDevice;

    const DEVICE: &str = r#"{
        "root": {
            "packageName": "com.google.android.gm",
            "className": "com.google.android.gm.ConversationListActivity",
            "children": [
                { "id": "com.google.android.gm:id/compose", "contentDescription": "Compose", "clickable": true },
                { "id": "com.google.android.gm:id/subject", "className": "android.widget.EditText", "editable": true },
                { "text": "Inbox", "children": [ { "text": "Primary" } ] }
            ]
        },
        "windowCount": 2
    }"#;

    async fn connected() -> (Arc<FixtureDevice>, Arc<AutomationBackend>, BackendSlot) {
        let device = Arc::new(FixtureDevice::from_json(DEVICE).unwrap());
        let slot = BackendSlot::new(EventBus::default());
        let backend = slot.connect(device.clone()).await;
        (device, backend, slot)
    }

    #[tokio::test]
    async fn slot_lifecycle() {
        let slot = BackendSlot::new(EventBus::default());
        assert!(matches!(slot.require().await, Err(AutomationError::BackendUnavailable)));

        let device = Arc::new(FixtureDevice::from_json(DEVICE).unwrap());
        slot.connect(device).await;
        assert!(slot.is_connected().await);
        assert!(slot.disconnect().await);
        assert!(!slot.disconnect().await);
        assert!(slot.current().await.is_none());
    }

    #[tokio::test]
    async fn selector_operations_resolve_against_fresh_snapshot() {
        let (device, backend, _slot) = connected().await;

        let found = backend.find_elements(&Selector::parse("compose")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "com.google.android.gm:id/compose");

        backend
            .fill_field(&Selector::parse("id:subject"), "Weekly report")
            .await
            .unwrap();
        let subject = device.handle_of("com.google.android.gm:id/subject").await.unwrap();
        assert_eq!(device.text_of(subject).await.as_deref(), Some("Weekly report"));

        // The live tree changed, so a new query sees the new text.
        let again = backend.find_first(&Selector::parse("weekly")).await.unwrap();
        assert_eq!(again.handle, subject);
    }

    #[tokio::test]
    async fn actions_without_root_fail_with_no_root_window() {
        let (device, backend, _slot) = connected().await;
        device.set_root(None).await;
        assert!(matches!(
            backend.click(&Selector::parse("compose")).await,
            Err(AutomationError::NoRootWindow)
        ));
        assert!(backend.find_elements(&Selector::parse("compose")).await.unwrap().is_empty());
        assert!(matches!(
            backend.find_first(&Selector::parse("compose")).await,
            Err(AutomationError::ElementNotFound(_))
        ));
    }

    #[tokio::test]
    async fn sequence_stops_at_first_missing_target() {
        let (device, backend, slot) = connected().await;
        let mut rx = slot.events().subscribe();
        let actions: Vec<SequenceAction> = serde_json::from_str(
            r#"[
                {"type": "FOCUS", "id": "id/subject"},
                {"type": "SET_TEXT", "id": "id/subject", "value": "Draft"},
                {"type": "CLICK", "text": "Archive"},
                {"type": "CLICK", "className": "compose"}
            ]"#,
        )
        .unwrap();

        let outcome = backend.perform_sequence(&actions).await;

        assert!(matches!(outcome, Err(AutomationError::ElementNotFound(_))));
        let subject = device.handle_of("com.google.android.gm:id/subject").await.unwrap();
        assert_eq!(device.text_of(subject).await.as_deref(), Some("Draft"));
        // Focus and set text only; the trailing click never ran.
        assert_eq!(device.performed().await.len(), 2);
        let message = loop {
            if let AutomationEvent::Error { message } = rx.recv().await.unwrap() {
                break message;
            }
        };
        assert_eq!(message, "Element not found for action: CLICK");
    }

    #[tokio::test]
    async fn sequence_reports_refused_action() {
        let (device, backend, slot) = connected().await;
        let mut rx = slot.events().subscribe();
        let actions = vec![
            SequenceAction {
                action: SequenceActionType::ScrollForward,
                text: "Inbox".into(),
                id: String::new(),
                class_name: String::new(),
                value: None,
            },
            SequenceAction {
                action: SequenceActionType::Click,
                text: "Compose".into(),
                id: String::new(),
                class_name: String::new(),
                value: None,
            },
        ];

        let outcome = backend.perform_sequence(&actions).await;

        assert!(matches!(outcome, Err(AutomationError::ActionNotPerformed(_))));
        assert_eq!(device.performed().await.len(), 1);
        let message = loop {
            if let AutomationEvent::Error { message } = rx.recv().await.unwrap() {
                break message;
            }
        };
        assert_eq!(message, "Action SCROLL_FORWARD failed on element");
    }

    #[tokio::test]
    async fn screen_info_describes_root() {
        let (_device, backend, _slot) = connected().await;
        let info = backend.screen_info().await.unwrap();
        assert_eq!(info.package_name, "com.google.android.gm");
        assert_eq!(info.activity_name, "com.google.android.gm.ConversationListActivity");
        assert_eq!(info.element_count, 5);
        assert_eq!(info.windows_count, 2);
    }

    #[tokio::test]
    async fn window_events_become_screen_changed() {
        let (_device, backend, slot) = connected().await;
        let mut rx = slot.events().subscribe();
        backend.handle_platform_event(PlatformEvent::ViewClicked { text: "x".into() });
        backend.handle_platform_event(PlatformEvent::WindowStateChanged {
            package_name: "notion.id".into(),
            class_name: "MainActivity".into(),
        });
        assert_eq!(
            rx.recv().await.unwrap(),
            AutomationEvent::ScreenChanged {
                package_name: "notion.id".into(),
                activity_name: "MainActivity".into(),
            }
        );
    }
}
