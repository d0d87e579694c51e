use crate::protocol::ElementId;

/// Why a selector could not be turned into element ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionFailure {
    /// The query was accepted but matched nothing (yet).
    NoMatch,
    /// The platform rejected the query itself.
    EvaluationFailed(String),
}

/// Errors reported to the controller, one per failed command.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum AgentError {
    // ============================================================
    // Element Errors
    // ============================================================
    #[error("Element {id} does not exist.")]
    ElementNotFound { id: ElementId },

    #[error("{}", resolution_message(.selector, .failure))]
    Resolution {
        selector: String,
        failure: ResolutionFailure,
    },

    #[error("Could not find component by selector {target}")]
    ComponentNotFound { target: String },

    #[error("Option with value \"{value}\" not found")]
    OptionNotFound { value: String },

    // ============================================================
    // Execution Errors
    // ============================================================
    #[error("Timed out after {timeout_ms}ms waiting for element {selector}")]
    Timeout { selector: String, timeout_ms: u64 },

    #[error("Error while running script: {0}")]
    ScriptError(String),

    #[error("Host error: {0}")]
    Host(String),

    // ============================================================
    // Protocol Errors
    // ============================================================
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // ============================================================
    // System Errors
    // ============================================================
    #[error("Transport error: {0}")]
    Transport(String),

    #[error(
        "Attempted to re-initialize the Screening Agent. Initialization may only be performed once per run"
    )]
    AlreadyInitialized,
}

fn resolution_message(selector: &str, failure: &ResolutionFailure) -> String {
    match failure {
        ResolutionFailure::NoMatch => format!("Could not find element with selector {}", selector),
        ResolutionFailure::EvaluationFailed(reason) => {
            format!("Failed to evaluate selector {}: {}", selector, reason)
        }
    }
}

impl AgentError {
    pub fn no_match(selector: impl Into<String>) -> Self {
        AgentError::Resolution {
            selector: selector.into(),
            failure: ResolutionFailure::NoMatch,
        }
    }

    pub fn evaluation_failed(selector: impl Into<String>, reason: impl Into<String>) -> Self {
        AgentError::Resolution {
            selector: selector.into(),
            failure: ResolutionFailure::EvaluationFailed(reason.into()),
        }
    }

    /// True for the "not yet found" case a wait may keep polling on.
    pub fn is_no_match(&self) -> bool {
        matches!(
            self,
            AgentError::Resolution {
                failure: ResolutionFailure::NoMatch,
                ..
            }
        )
    }

    /// Returns the wire error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            AgentError::ElementNotFound { .. } => "ELEMENT_NOT_FOUND",
            AgentError::Resolution { .. } => "RESOLUTION_ERROR",
            AgentError::ComponentNotFound { .. } => "COMPONENT_NOT_FOUND",
            AgentError::OptionNotFound { .. } => "OPTION_NOT_FOUND",
            AgentError::Timeout { .. } => "TIMEOUT",
            AgentError::ScriptError(_) => "SCRIPT_ERROR",
            AgentError::Host(_) => "HOST_ERROR",
            AgentError::UnknownCommand(_) => "UNKNOWN_COMMAND",
            AgentError::InvalidRequest(_) => "INVALID_REQUEST",
            AgentError::Transport(_) => "TRANSPORT_ERROR",
            AgentError::AlreadyInitialized => "ALREADY_INITIALIZED",
        }
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        AgentError::InvalidRequest(err.to_string())
    }
}
