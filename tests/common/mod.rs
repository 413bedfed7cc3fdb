#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tapflow::automation::backend::BackendSlot;
use tapflow::automation::events::EventBus;
use tapflow::bridge::Bridge;
use tapflow::errors::{AutomationError, AutomationResult};
use tapflow::platform::fixture::FixtureDevice;
use tapflow::workflow::engine::WorkflowEngine;
use tapflow::workflow::integration::{IntegrationRunner, UnavailableIntegration};

/// Gmail compose screen. The "Send" label sits two levels below its only
/// clickable ancestor.
pub const COMPOSE_SCREEN: &str = r#"{
    "root": {
        "packageName": "com.google.android.gm",
        "className": "com.google.android.gm.ComposeActivity",
        "bounds": { "left": 0, "top": 0, "right": 1080, "bottom": 2340 },
        "children": [
            {
                "id": "com.google.android.gm:id/send_row",
                "className": "android.widget.LinearLayout",
                "packageName": "com.google.android.gm",
                "clickable": true,
                "children": [
                    {
                        "className": "android.widget.FrameLayout",
                        "children": [
                            {
                                "text": "Send",
                                "className": "android.widget.TextView",
                                "packageName": "com.google.android.gm",
                                "bounds": { "left": 900, "top": 120, "right": 1040, "bottom": 200 }
                            }
                        ]
                    }
                ]
            },
            { "id": "com.google.android.gm:id/to", "className": "android.widget.EditText", "editable": true },
            { "id": "com.google.android.gm:id/subject", "className": "android.widget.EditText", "editable": true },
            { "text": "Draft saved", "className": "android.widget.TextView" },
            {
                "id": "com.google.android.gm:id/thread_list",
                "className": "androidx.recyclerview.widget.RecyclerView",
                "scrollable": true
            }
        ]
    },
    "launchablePackages": ["com.google.android.gm", "notion.id"],
    "windowCount": 1
}"#;

pub struct Harness {
    pub device: Arc<FixtureDevice>,
    pub slot: Arc<BackendSlot>,
    pub engine: Arc<WorkflowEngine>,
    pub bridge: Bridge,
}

pub async fn harness() -> Harness {
    harness_with(
        FixtureDevice::from_json(COMPOSE_SCREEN).unwrap(),
        Arc::new(UnavailableIntegration),
    )
    .await
}

pub async fn harness_with(device: FixtureDevice, integration: Arc<dyn IntegrationRunner>) -> Harness {
    let device = Arc::new(device);
    let slot = Arc::new(BackendSlot::new(EventBus::new(64)));
    slot.connect(device.clone()).await;
    let engine = Arc::new(WorkflowEngine::new(slot.clone(), integration));
    let bridge = Bridge::new(slot.clone(), engine.clone());
    Harness {
        device,
        slot,
        engine,
        bridge,
    }
}

/// Integration runner that replays queued outcomes and records calls.
///
/// Each call sleeps for `delay` while counted as active, so overlapping
/// runs show up in `max_active`.
pub struct ScriptedIntegration {
    outcomes: Mutex<VecDeque<AutomationResult<Value>>>,
    calls: Mutex<Vec<(String, String, Value)>>,
    delay: Duration,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl ScriptedIntegration {
    pub fn new(outcomes: Vec<AutomationResult<Value>>) -> Self {
        Self::with_delay(outcomes, Duration::ZERO)
    }

    pub fn with_delay(outcomes: Vec<AutomationResult<Value>>, delay: Duration) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            calls: Mutex::new(Vec::new()),
            delay,
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> Vec<(String, String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IntegrationRunner for ScriptedIntegration {
    async fn execute(&self, piece_name: &str, action: &str, params: &Value) -> AutomationResult<Value> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        self.calls
            .lock()
            .unwrap()
            .push((piece_name.to_string(), action.to_string(), params.clone()));

        tokio::time::sleep(self.delay).await;

        self.active.fetch_sub(1, Ordering::SeqCst);
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(AutomationError::IntegrationUnavailable))
    }
}

/// Integration runner that swaps the slot's backend out from under a run.
///
/// Every call disconnects the slot, then connects `reconnect` when given.
pub struct SlotSwappingIntegration {
    slot: Arc<BackendSlot>,
    reconnect: Option<Arc<FixtureDevice>>,
}

impl SlotSwappingIntegration {
    pub fn disconnecting(slot: Arc<BackendSlot>) -> Self {
        Self { slot, reconnect: None }
    }

    pub fn reconnecting(slot: Arc<BackendSlot>, device: Arc<FixtureDevice>) -> Self {
        Self {
            slot,
            reconnect: Some(device),
        }
    }
}

#[async_trait]
impl IntegrationRunner for SlotSwappingIntegration {
    async fn execute(&self, _piece_name: &str, _action: &str, _params: &Value) -> AutomationResult<Value> {
        self.slot.disconnect().await;
        if let Some(device) = &self.reconnect {
            self.slot.connect(device.clone()).await;
        }
        Ok(Value::Null)
    }
}
