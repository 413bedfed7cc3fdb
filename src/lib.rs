pub mod automation;
pub mod bridge;
pub mod config;
pub mod errors;
pub mod platform;
pub mod tree;
pub mod workflow;

use std::sync::Arc;

use crate::automation::backend::BackendSlot;
use crate::automation::events::{log_events, EventBus};
use crate::bridge::Bridge;
use crate::config::AppConfig;
use crate::errors::AutomationResult;
use crate::platform::fixture::FixtureDevice;
use crate::workflow::engine::WorkflowEngine;
use crate::workflow::journal::RunJournal;

/// Loads config, connects the configured platform and serves the bridge on
/// stdin/stdout until input closes.
pub async fn run() -> AutomationResult<()> {
    // Load .env file if present (ignore error if not found)
    let _ = dotenvy::dotenv();

    let loaded = config::load_config();
    let filter = loaded
        .as_ref()
        .map(|c| c.logging.filter.clone())
        .unwrap_or_else(|_| "info".to_string());

    // stdout carries bridge responses, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cfg = match loaded {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load config; using defaults");
            AppConfig::default()
        }
    };

    let events = EventBus::new(cfg.events.capacity);
    tokio::spawn(log_events(events.subscribe()));

    let slot = Arc::new(BackendSlot::new(events));
    if cfg.backend.connect_on_start {
        connect_fixture(&slot, &cfg).await?;
    }

    let integration = workflow::integration::from_config(&cfg.integration)?;
    let mut engine = WorkflowEngine::new(slot.clone(), integration);
    if cfg.workflow.journal_enabled {
        let journal = RunJournal::open(cfg.workflow.journal_dir.as_deref())?;
        tracing::info!(path = %journal.path().display(), "run journal enabled");
        engine = engine.with_journal(journal);
    }

    let bridge = Bridge::new(slot.clone(), Arc::new(engine));
    tracing::info!("bridge serving on stdio");
    bridge.serve_stdio().await?;

    slot.disconnect().await;
    Ok(())
}

async fn connect_fixture(slot: &BackendSlot, cfg: &AppConfig) -> AutomationResult<()> {
    let Some(path) = &cfg.backend.fixture_path else {
        tracing::warn!("no device fixture configured; backend stays disconnected");
        return Ok(());
    };
    let mut device = FixtureDevice::load(path).await?;
    if let Some(supported) = cfg.backend.gestures_supported {
        device = device.with_gestures(supported);
    }
    slot.connect(Arc::new(device)).await;
    Ok(())
}
