use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::AutomationResult;
use crate::tree::selector::Selector;

/// A step exactly as it arrives over the bridge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawStep {
    #[serde(rename = "type", default)]
    pub step_type: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSwitchParams {
    app_name: String,
}

#[derive(Debug, Deserialize)]
struct FormFillParams {
    fields: Map<String, Value>,
}

impl FormFillParams {
    /// Selector and text pairs in document order; `None` if a value is not a string.
    fn into_pairs(self) -> Option<Vec<(String, String)>> {
        self.fields
            .into_iter()
            .map(|(selector, text)| match text {
                Value::String(text) => Some((selector, text)),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct ClickParams {
    selector: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct McpExecuteParams {
    piece_name: String,
    action: String,
    #[serde(default)]
    params: Value,
}

/// Decoded workflow step.
///
/// Decoding never fails per step: an unrecognized type becomes `Unknown` and
/// params that do not fit their type become `Invalid`, so the engine can
/// record them at their position in the run.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowStep {
    AppSwitch {
        app_name: String,
    },
    /// `(selector, text)` pairs, filled in the order they appeared.
    FormFill {
        fields: Vec<(String, String)>,
    },
    Click {
        selector: Selector,
    },
    McpExecute {
        piece_name: String,
        action: String,
        params: Value,
    },
    Unknown {
        step_type: String,
    },
    Invalid {
        step_type: String,
        /// Name of the parameter that was missing or ill-typed.
        param: String,
    },
}

impl WorkflowStep {
    pub fn decode(raw: RawStep) -> Self {
        let RawStep { step_type, params } = raw;
        match step_type.as_str() {
            "APP_SWITCH" => match decode_params::<AppSwitchParams>(params) {
                Some(p) if !p.app_name.trim().is_empty() => WorkflowStep::AppSwitch {
                    app_name: p.app_name,
                },
                _ => invalid(&step_type, "appName"),
            },
            "FORM_FILL" => {
                let fields = decode_params::<FormFillParams>(params).and_then(FormFillParams::into_pairs);
                match fields {
                    Some(fields) => WorkflowStep::FormFill { fields },
                    None => invalid(&step_type, "fields"),
                }
            }
            "CLICK" => match decode_params::<ClickParams>(params) {
                Some(p) => WorkflowStep::Click {
                    selector: Selector::parse(&p.selector),
                },
                None => invalid(&step_type, "selector"),
            },
            "MCP_EXECUTE" => match decode_params::<McpExecuteParams>(params) {
                Some(p) => WorkflowStep::McpExecute {
                    piece_name: p.piece_name,
                    action: p.action,
                    params: p.params,
                },
                None => invalid(&step_type, "pieceName/action"),
            },
            _ => WorkflowStep::Unknown {
                step_type: step_type.clone(),
            },
        }
    }

    /// The wire name of the step type.
    pub fn type_name(&self) -> &str {
        match self {
            WorkflowStep::AppSwitch { .. } => "APP_SWITCH",
            WorkflowStep::FormFill { .. } => "FORM_FILL",
            WorkflowStep::Click { .. } => "CLICK",
            WorkflowStep::McpExecute { .. } => "MCP_EXECUTE",
            WorkflowStep::Unknown { step_type } | WorkflowStep::Invalid { step_type, .. } => {
                step_type.as_str()
            }
        }
    }

    /// Parameters echoed back in the step's result.
    pub fn echo(&self) -> Map<String, Value> {
        let mut echo = Map::new();
        match self {
            WorkflowStep::AppSwitch { app_name } => {
                echo.insert("appName".into(), Value::from(app_name.as_str()));
            }
            WorkflowStep::FormFill { fields } => {
                echo.insert("fieldCount".into(), Value::from(fields.len()));
            }
            WorkflowStep::Click { selector } => {
                echo.insert("selector".into(), Value::from(selector.to_string()));
            }
            WorkflowStep::McpExecute {
                piece_name, action, ..
            } => {
                echo.insert("pieceName".into(), Value::from(piece_name.as_str()));
                echo.insert("action".into(), Value::from(action.as_str()));
            }
            WorkflowStep::Unknown { .. } | WorkflowStep::Invalid { .. } => {}
        }
        echo
    }
}

fn invalid(step_type: &str, param: &str) -> WorkflowStep {
    tracing::debug!(step_type, param, "step params rejected");
    WorkflowStep::Invalid {
        step_type: step_type.to_string(),
        param: param.to_string(),
    }
}

fn decode_params<P: DeserializeOwned>(params: Value) -> Option<P> {
    serde_json::from_value(params).ok()
}

pub fn from_value(steps: Value) -> AutomationResult<Vec<WorkflowStep>> {
    let raw: Vec<RawStep> = serde_json::from_value(steps)?;
    Ok(raw.into_iter().map(WorkflowStep::decode).collect())
}

/// Parses a JSON array of `{type, params}` objects.
pub fn parse_steps(json: &str) -> AutomationResult<Vec<WorkflowStep>> {
    let raw: Vec<RawStep> = serde_json::from_str(json)?;
    Ok(raw.into_iter().map(WorkflowStep::decode).collect())
}
