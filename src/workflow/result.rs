use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Outcome of one attempted step. Echoed params are flattened into the
/// object next to the fixed fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    pub step_index: usize,
    #[serde(rename = "type")]
    pub step_type: String,
    pub success: bool,
    #[serde(flatten)]
    pub echo: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowResult {
    pub success: bool,
    /// Index of the last attempted step plus one.
    pub steps_executed: usize,
    pub results: Vec<StepResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkflowResult {
    pub fn empty() -> Self {
        Self {
            success: true,
            steps_executed: 0,
            results: Vec::new(),
            error: None,
        }
    }
}
