use std::sync::Arc;

use serde_json::Value;

use crate::automation::backend::{AutomationBackend, BackendSlot};
use crate::automation::events::AutomationEvent;
use crate::errors::{AutomationError, AutomationResult};
use crate::tree::selector::Selector;
use crate::workflow::integration::IntegrationRunner;
use crate::workflow::journal::RunJournal;
use crate::workflow::result::{StepResult, WorkflowResult};
use crate::workflow::step::WorkflowStep;

/// Runs step lists in order against the connected backend.
///
/// Abort policy: a failed `APP_SWITCH`, `FORM_FILL`, `CLICK` or invalid step
/// stops the run. Unknown step types and an unavailable integration are
/// recorded as failed steps and the run continues.
pub struct WorkflowEngine {
    slot: Arc<BackendSlot>,
    integration: Arc<dyn IntegrationRunner>,
    journal: Option<RunJournal>,
}

impl WorkflowEngine {
    pub fn new(slot: Arc<BackendSlot>, integration: Arc<dyn IntegrationRunner>) -> Self {
        Self {
            slot,
            integration,
            journal: None,
        }
    }

    pub fn with_journal(mut self, journal: RunJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub async fn execute(&self, steps: &[WorkflowStep]) -> WorkflowResult {
        let run_id = uuid::Uuid::new_v4().to_string();
        let started = self.slot.current().await;
        // One run at a time per backend; a second caller waits here.
        let _run_guard = match started.as_deref() {
            Some(b) => Some(b.lock_runs().await),
            None => None,
        };

        tracing::info!(run_id = %run_id, steps = steps.len(), "workflow started");
        let mut result = WorkflowResult::empty();

        for (index, step) in steps.iter().enumerate() {
            result.steps_executed = index + 1;
            let mut echo = step.echo();

            match self.run_step(started.as_ref(), step).await {
                Ok(value) => {
                    if let Some(value) = value {
                        echo.insert("result".into(), value);
                    }
                    tracing::debug!(index, step_type = step.type_name(), "step succeeded");
                    result.results.push(StepResult {
                        step_index: index,
                        step_type: step.type_name().to_string(),
                        success: true,
                        echo,
                        error: None,
                    });
                }
                Err(e) => {
                    result.results.push(StepResult {
                        step_index: index,
                        step_type: step.type_name().to_string(),
                        success: false,
                        echo,
                        error: Some(e.to_string()),
                    });
                    if continues_after(step, &e) {
                        tracing::warn!(index, step_type = step.type_name(), error = %e, "step failed, continuing");
                        continue;
                    }
                    tracing::error!(index, step_type = step.type_name(), error = %e, "step failed, aborting");
                    let message = abort_message(step, &e);
                    self.slot.events().emit(AutomationEvent::Error {
                        message: message.clone(),
                    });
                    result.success = false;
                    result.error = Some(message);
                    break;
                }
            }
        }

        tracing::info!(
            run_id = %run_id,
            success = result.success,
            steps_executed = result.steps_executed,
            "workflow finished"
        );
        self.slot.events().emit(AutomationEvent::WorkflowFinished {
            success: result.success,
            steps_executed: result.steps_executed,
        });
        if let Some(journal) = &self.journal {
            if let Err(e) = journal.append(&run_id, &result) {
                tracing::warn!(error = %e, "failed to journal workflow run");
            }
        }
        result
    }

    async fn run_step(
        &self,
        started: Option<&Arc<AutomationBackend>>,
        step: &WorkflowStep,
    ) -> AutomationResult<Option<Value>> {
        match step {
            WorkflowStep::AppSwitch { app_name } => {
                self.live_backend(started).await?.switch_to_app(app_name).await?;
                Ok(None)
            }
            WorkflowStep::FormFill { fields } => {
                let backend = self.live_backend(started).await?;
                for (selector, text) in fields {
                    backend.fill_field(&Selector::parse(selector), text).await?;
                }
                Ok(None)
            }
            WorkflowStep::Click { selector } => {
                self.live_backend(started).await?.click(selector).await?;
                Ok(None)
            }
            WorkflowStep::McpExecute {
                piece_name,
                action,
                params,
            } => self
                .integration
                .execute(piece_name, action, params)
                .await
                .map(Some),
            WorkflowStep::Unknown { step_type } => {
                Err(AutomationError::UnknownStepType(step_type.clone()))
            }
            WorkflowStep::Invalid { param, .. } => Err(AutomationError::MissingParam(param.clone())),
        }
    }

    /// The backend the run started on, provided the slot still holds it.
    ///
    /// A disconnect or reconnect during the run makes every later device step
    /// fail; the run lock belongs to the starting backend only.
    async fn live_backend(
        &self,
        started: Option<&Arc<AutomationBackend>>,
    ) -> AutomationResult<Arc<AutomationBackend>> {
        let started = started.ok_or(AutomationError::BackendUnavailable)?;
        match self.slot.current().await {
            Some(current) if Arc::ptr_eq(&current, started) => Ok(current),
            _ => Err(AutomationError::BackendUnavailable),
        }
    }
}

fn continues_after(step: &WorkflowStep, error: &AutomationError) -> bool {
    match step {
        WorkflowStep::Unknown { .. } => true,
        WorkflowStep::McpExecute { .. } => matches!(error, AutomationError::IntegrationUnavailable),
        _ => false,
    }
}

fn abort_message(step: &WorkflowStep, error: &AutomationError) -> String {
    match step {
        WorkflowStep::AppSwitch { app_name } => format!("Failed to switch to app: {app_name}: {error}"),
        WorkflowStep::FormFill { .. } => format!("Failed to fill form: {error}"),
        WorkflowStep::Click { selector } => format!("Failed to click element: {selector}: {error}"),
        WorkflowStep::McpExecute { piece_name, .. } => {
            format!("Failed to execute MCP piece: {piece_name} - {error}")
        }
        WorkflowStep::Unknown { step_type } | WorkflowStep::Invalid { step_type, .. } => {
            format!("{step_type}: {error}")
        }
    }
}
