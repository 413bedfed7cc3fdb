//! JSON method surface over the automation backend and workflow engine.
//!
//! Transport-agnostic: `handle` takes a decoded request; `serve` speaks
//! line-delimited JSON over any async reader/writer pair, and the binary
//! wires it to stdin/stdout. Every failure comes back as a response with
//! `success: false` and an error string, never as a transport error.
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::automation::backend::{BackendSlot, SequenceAction};
use crate::errors::{AutomationError, AutomationResult};
use crate::platform::{Gesture, PlatformEvent};
use crate::tree::selector::Selector;
use crate::workflow::engine::WorkflowEngine;
use crate::workflow::result::WorkflowResult;
use crate::workflow::step;

const WORKFLOW_FAILED: &str = "workflow_failed";

#[derive(Debug, Clone, Deserialize)]
pub struct BridgeRequest {
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Stable tag of the error, see [`AutomationError::kind`]. A workflow run
    /// that aborted reports `workflow_failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl BridgeResponse {
    fn ok(id: Option<Value>, result: Value) -> Self {
        Self {
            id,
            success: true,
            result: Some(result),
            error: None,
            kind: None,
        }
    }

    fn failed(id: Option<Value>, error: &AutomationError) -> Self {
        Self {
            id,
            success: false,
            result: None,
            error: Some(error.to_string()),
            kind: Some(error.kind().to_string()),
        }
    }
}

#[derive(Deserialize)]
struct SelectorParams {
    selector: String,
}

#[derive(Deserialize)]
struct FillParams {
    selector: String,
    text: String,
}

#[derive(Deserialize)]
struct ScrollParams {
    selector: String,
    direction: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwitchParams {
    #[serde(alias = "appName")]
    package_name: String,
}

#[derive(Deserialize)]
struct SequenceParams {
    actions: Vec<SequenceAction>,
}

#[derive(Deserialize)]
struct WorkflowParams {
    steps: Value,
}

pub struct Bridge {
    slot: Arc<BackendSlot>,
    engine: Arc<WorkflowEngine>,
}

impl Bridge {
    pub fn new(slot: Arc<BackendSlot>, engine: Arc<WorkflowEngine>) -> Self {
        Self { slot, engine }
    }

    pub async fn handle(&self, request: BridgeRequest) -> BridgeResponse {
        let BridgeRequest { id, method, params } = request;
        tracing::debug!(method = %method, "bridge request");

        // executeWorkflow reports the run's own success flag and abort reason.
        if method == "executeWorkflow" {
            return match self.execute_workflow(params).await {
                Ok((run, result)) => BridgeResponse {
                    id,
                    success: run.success,
                    result: Some(result),
                    kind: run.error.as_ref().map(|_| WORKFLOW_FAILED.to_string()),
                    error: run.error,
                },
                Err(e) => BridgeResponse::failed(id, &e),
            };
        }

        match self.dispatch(&method, params).await {
            Ok(result) => BridgeResponse::ok(id, result),
            Err(e) => {
                tracing::info!(method = %method, error = %e, "bridge call failed");
                BridgeResponse::failed(id, &e)
            }
        }
    }

    /// Decodes one request line and encodes its response, without the
    /// trailing newline.
    pub async fn handle_line(&self, line: &str) -> String {
        let response = match serde_json::from_str::<BridgeRequest>(line) {
            Ok(request) => self.handle(request).await,
            Err(e) => {
                tracing::warn!(error = %e, "malformed bridge request");
                BridgeResponse::failed(None, &AutomationError::Json(e))
            }
        };
        serde_json::to_string(&response).unwrap_or_else(|e| {
            format!(r#"{{"success":false,"error":"response encoding failed: {e}"}}"#)
        })
    }

    /// Serves requests until the reader hits EOF.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> AutomationResult<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let response = self.handle_line(&line).await;
            writer.write_all(response.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
        tracing::info!("bridge input closed");
        Ok(())
    }

    pub async fn serve_stdio(&self) -> AutomationResult<()> {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        self.serve(stdin, tokio::io::stdout()).await
    }

    async fn dispatch(&self, method: &str, params: Value) -> AutomationResult<Value> {
        match method {
            "findElements" => {
                let p: SelectorParams = decode(params, "selector")?;
                let elements = self
                    .slot
                    .require()
                    .await?
                    .find_elements(&Selector::parse(&p.selector))
                    .await?;
                Ok(serde_json::to_value(elements)?)
            }
            "clickElement" => {
                let p: SelectorParams = decode(params, "selector")?;
                self.slot.require().await?.click(&Selector::parse(&p.selector)).await?;
                Ok(Value::Bool(true))
            }
            "fillFormField" => {
                let p: FillParams = decode(params, "selector/text")?;
                self.slot
                    .require()
                    .await?
                    .fill_field(&Selector::parse(&p.selector), &p.text)
                    .await?;
                Ok(Value::Bool(true))
            }
            "longPressElement" => {
                let p: SelectorParams = decode(params, "selector")?;
                self.slot
                    .require()
                    .await?
                    .long_press(&Selector::parse(&p.selector))
                    .await?;
                Ok(Value::Bool(true))
            }
            "focusElement" => {
                let p: SelectorParams = decode(params, "selector")?;
                self.slot.require().await?.focus(&Selector::parse(&p.selector)).await?;
                Ok(Value::Bool(true))
            }
            "scrollElement" => {
                let p: ScrollParams = decode(params, "selector/direction")?;
                self.slot
                    .require()
                    .await?
                    .scroll(&Selector::parse(&p.selector), &p.direction)
                    .await?;
                Ok(Value::Bool(true))
            }
            "switchToApp" => {
                let p: SwitchParams = decode(params, "packageName")?;
                self.slot.require().await?.switch_to_app(&p.package_name).await?;
                Ok(Value::Bool(true))
            }
            "swipe" => {
                let gesture: Gesture = decode(params, "startX/startY/endX/endY/durationMs")?;
                self.slot.require().await?.swipe(gesture).await?;
                Ok(Value::Bool(true))
            }
            "performAutomationSequence" => {
                let p: SequenceParams = decode(params, "actions")?;
                self.slot.require().await?.perform_sequence(&p.actions).await?;
                Ok(Value::Bool(true))
            }
            "getCurrentApp" => {
                let current = self.slot.require().await?.current_app().await;
                Ok(Value::String(current.unwrap_or_default()))
            }
            "getScreenInfo" => {
                let info = self.slot.require().await?.screen_info().await?;
                Ok(serde_json::to_value(info)?)
            }
            "isServiceEnabled" => {
                let enabled = self
                    .slot
                    .current()
                    .await
                    .is_some_and(|b| b.is_service_enabled());
                Ok(Value::Bool(enabled))
            }
            "platformEvent" => {
                let event: PlatformEvent = serde_json::from_value(params)?;
                self.slot.require().await?.handle_platform_event(event);
                Ok(Value::Bool(true))
            }
            other => Err(AutomationError::Unsupported(format!("method {other}"))),
        }
    }

    async fn execute_workflow(&self, params: Value) -> AutomationResult<(WorkflowResult, Value)> {
        let p: WorkflowParams = decode(params, "steps")?;
        let steps = step::from_value(p.steps)?;
        let run = self.engine.execute(&steps).await;
        let result = serde_json::to_value(&run)?;
        Ok((run, result))
    }
}

fn decode<P: DeserializeOwned>(params: Value, expected: &str) -> AutomationResult<P> {
    serde_json::from_value(params).map_err(|e| {
        tracing::debug!(error = %e, "bridge params rejected");
        AutomationError::MissingParam(expected.to_string())
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::automation::events::EventBus;
    use crate::platform::fixture::FixtureDevice;
    use crate::workflow::integration::UnavailableIntegration;

    async fn bridge(connected: bool) -> Bridge {
        let slot = Arc::new(BackendSlot::new(EventBus::default()));
        if connected {
            let device = FixtureDevice::from_json(
                r#"{"root": {"packageName": "com.android.settings", "text": "Settings", "clickable": true}}"#,
            )
            .unwrap();
            slot.connect(Arc::new(device)).await;
        }
        let engine = Arc::new(WorkflowEngine::new(slot.clone(), Arc::new(UnavailableIntegration)));
        Bridge::new(slot, engine)
    }

    #[tokio::test]
    async fn malformed_line_is_a_structured_failure() {
        let bridge = bridge(true).await;
        let response: BridgeResponse = serde_json::from_str(&bridge.handle_line("{not json").await).unwrap();
        assert!(!response.success);
        assert_eq!(response.kind.as_deref(), Some("json"));
    }

    #[tokio::test]
    async fn request_id_is_echoed() {
        let bridge = bridge(true).await;
        let line = bridge
            .handle_line(r#"{"id": 7, "method": "clickElement", "params": {"selector": "settings"}}"#)
            .await;
        let response: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(response, json!({"id": 7, "success": true, "result": true}));
    }

    #[tokio::test]
    async fn disconnected_backend_reports_unavailable() {
        let bridge = bridge(false).await;
        let response = bridge
            .handle(BridgeRequest {
                id: None,
                method: "findElements".into(),
                params: json!({"selector": "x"}),
            })
            .await;
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("Automation backend unavailable"));

        let enabled = bridge
            .handle(BridgeRequest {
                id: None,
                method: "isServiceEnabled".into(),
                params: Value::Null,
            })
            .await;
        assert_eq!(enabled.result, Some(json!(false)));
    }

    #[tokio::test]
    async fn missing_params_and_unknown_methods_fail() {
        let bridge = bridge(true).await;
        let response = bridge
            .handle(BridgeRequest {
                id: None,
                method: "fillFormField".into(),
                params: json!({"selector": "settings"}),
            })
            .await;
        assert_eq!(response.kind.as_deref(), Some("missing_param"));

        let response = bridge
            .handle(BridgeRequest {
                id: None,
                method: "rebootDevice".into(),
                params: Value::Null,
            })
            .await;
        assert_eq!(response.kind.as_deref(), Some("unsupported"));
    }
}
