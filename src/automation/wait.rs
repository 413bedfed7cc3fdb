use std::time::Duration;

use crate::automation::backend::AutomationBackend;
use crate::errors::{AutomationError, AutomationResult};
use crate::tree::selector::Selector;
use crate::tree::types::Element;

#[derive(Debug, Clone)]
pub struct WaitConfig {
    pub timeout_ms: u64,
    pub check_interval_ms: u64,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            check_interval_ms: 200,
        }
    }
}

/// Polls `find_first` until the selector matches or the deadline passes.
/// The engine never calls this; it is for callers that need a bounded wait.
pub async fn wait_for_element(
    backend: &AutomationBackend,
    selector: &Selector,
    config: WaitConfig,
) -> AutomationResult<Element> {
    let start_time = std::time::Instant::now();
    let deadline = Duration::from_millis(config.timeout_ms);

    loop {
        match backend.find_first(selector).await {
            Ok(element) => {
                tracing::debug!(selector = %selector, elapsed = ?start_time.elapsed(), "element appeared");
                return Ok(element);
            }
            Err(AutomationError::ElementNotFound(_)) => {}
            Err(e) => return Err(e),
        }

        if start_time.elapsed() >= deadline {
            tracing::warn!(selector = %selector, "wait for element timed out after {:?}", start_time.elapsed());
            return Err(AutomationError::ElementNotFound(selector.to_string()));
        }
        tokio::time::sleep(Duration::from_millis(config.check_interval_ms)).await;
    }
}
