use thiserror::Error;

#[derive(Debug, Error)]
pub enum AutomationError {
    #[error("No root window available")]
    NoRootWindow,

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Action not performed: {0}")]
    ActionNotPerformed(String),

    #[error("Element is not editable")]
    NotEditable,

    #[error("Invalid scroll direction: {0}")]
    InvalidDirection(String),

    #[error("Unsupported on this platform: {0}")]
    Unsupported(String),

    #[error("App not launchable: {0}")]
    AppNotLaunchable(String),

    #[error("Automation backend unavailable")]
    BackendUnavailable,

    #[error("Unknown step type: {0}")]
    UnknownStepType(String),

    #[error("Missing parameter: {0}")]
    MissingParam(String),

    #[error("Node.js integration not available")]
    IntegrationUnavailable,

    #[error("Integration error: {0}")]
    Integration(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl AutomationError {
    /// Stable snake_case tag, used by the bridge next to the human message.
    pub fn kind(&self) -> &'static str {
        match self {
            AutomationError::NoRootWindow => "no_root_window",
            AutomationError::ElementNotFound(_) => "element_not_found",
            AutomationError::ActionNotPerformed(_) => "action_not_performed",
            AutomationError::NotEditable => "not_editable",
            AutomationError::InvalidDirection(_) => "invalid_direction",
            AutomationError::Unsupported(_) => "unsupported",
            AutomationError::AppNotLaunchable(_) => "app_not_launchable",
            AutomationError::BackendUnavailable => "backend_unavailable",
            AutomationError::UnknownStepType(_) => "unknown_step_type",
            AutomationError::MissingParam(_) => "missing_param",
            AutomationError::IntegrationUnavailable => "integration_unavailable",
            AutomationError::Integration(_) => "integration",
            AutomationError::Config(_) => "config",
            AutomationError::Io(_) => "io",
            AutomationError::Json(_) => "json",
            AutomationError::Http(_) => "http",
            AutomationError::TomlDe(_) | AutomationError::TomlSer(_) => "toml",
        }
    }
}

impl serde::Serialize for AutomationError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

pub type AutomationResult<T> = Result<T, AutomationError>;
