use std::sync::Arc;

use tokio::sync::RwLock;

use crate::automation::events::{AutomationEvent, EventBus};
use crate::errors::{AutomationError, AutomationResult};
use crate::platform::AccessibilityPlatform;

/// Brings packages to the foreground.
///
/// `current_app` only remembers the last successful switch; the OS owns the
/// real foreground state and the user may have moved on since.
pub struct AppSwitcher {
    platform: Arc<dyn AccessibilityPlatform>,
    events: EventBus,
    current_app: RwLock<Option<String>>,
}

impl AppSwitcher {
    pub fn new(platform: Arc<dyn AccessibilityPlatform>, events: EventBus) -> Self {
        Self {
            platform,
            events,
            current_app: RwLock::new(None),
        }
    }

    pub async fn switch_to(&self, package: &str) -> AutomationResult<()> {
        if package.trim().is_empty() {
            return Err(AutomationError::MissingParam("appName".into()));
        }

        let outcome = match self.platform.launch_app(package).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(AutomationError::ActionNotPerformed(format!("launch {package}"))),
            Err(e) => Err(e),
        };

        match &outcome {
            Ok(()) => {
                *self.current_app.write().await = Some(package.to_string());
                tracing::info!(package, "switched app");
            }
            Err(e) => tracing::warn!(package, error = %e, "app switch failed"),
        }
        self.events.emit(AutomationEvent::ActionCompleted {
            action: "switch_app".into(),
            success: outcome.is_ok(),
        });
        outcome
    }

    pub async fn current_app(&self) -> Option<String> {
        self.current_app.read().await.clone()
    }
}
