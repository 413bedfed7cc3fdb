use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{AutomationError, AutomationResult};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub integration: IntegrationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub events: EventsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// JSON device description loaded by the fixture platform.
    /// When absent the backend starts disconnected.
    pub fixture_path: Option<PathBuf>,
    /// Overrides the fixture's own gesture support flag.
    pub gestures_supported: Option<bool>,
    #[serde(default = "default_true")]
    pub connect_on_start: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            fixture_path: None,
            gestures_supported: None,
            connect_on_start: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorkflowConfig {
    #[serde(default)]
    pub journal_enabled: bool,
    /// Directory for `runs.jsonl`. Defaults to the platform data dir.
    pub journal_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationConfig {
    /// Base URL of the piece runner, e.g. `http://127.0.0.1:3001`.
    /// `None` means MCP steps always report the integration as unavailable.
    pub endpoint: Option<String>,
    #[serde(default = "default_integration_timeout")]
    pub timeout_secs: u64,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: default_integration_timeout(),
        }
    }
}

fn default_integration_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

fn default_filter() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

fn default_capacity() -> usize {
    100
}

fn default_true() -> bool {
    true
}

fn resolve_config_path() -> AutomationResult<PathBuf> {
    if let Ok(explicit) = std::env::var("TAPFLOW_CONFIG") {
        let candidate = PathBuf::from(explicit);
        if candidate.exists() {
            tracing::debug!(path = %candidate.display(), "config taken from TAPFLOW_CONFIG");
            return Ok(candidate);
        }
        return Err(AutomationError::Config(format!(
            "TAPFLOW_CONFIG points to missing file {}",
            candidate.display()
        )));
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("config.toml");
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(candidate);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join("config.toml");
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(candidate);
    }

    Err(AutomationError::Config(
        "config.toml not found next to executable or in working directory".into(),
    ))
}

pub fn load_config() -> AutomationResult<AppConfig> {
    let path = resolve_config_path()?;
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> AutomationResult<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    tracing::info!(
        path = %path.display(),
        fixture = ?config.backend.fixture_path,
        "config loaded"
    );
    Ok(config)
}

pub fn save_config(config: &AppConfig, path: &Path) -> AutomationResult<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}
