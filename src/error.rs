use thiserror::Error;

use crate::anthropic::AnthropicError;
use crate::workflow::WorkflowState;

#[derive(Debug, Error)]
pub enum SupportError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("{step} failed: {source}")]
    Capability {
        step: Step,
        #[source]
        source: CapabilityError,
    },

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Anthropic API error: {0}")]
    Anthropic(#[from] AnthropicError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Task queue worker has shut down")]
    QueueClosed,
}

impl SupportError {
    pub fn capability(step: Step, source: CapabilityError) -> Self {
        SupportError::Capability { step, source }
    }
}

/// Failures of the natural-language capability (classify / draft / audit).
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("transport failure: {0}")]
    Transport(#[from] AnthropicError),

    #[error("malformed output: {0}")]
    Malformed(String),

    #[error("capability unavailable: {0}")]
    Unavailable(String),
}

impl CapabilityError {
    /// Whether a retry with backoff has a chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            CapabilityError::Transport(e) => e.is_transient(),
            CapabilityError::Malformed(_) | CapabilityError::Unavailable(_) => false,
        }
    }
}

/// Broken workflow invariants. Seeing one of these means a bug in the controller.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("no transition out of {0}")]
    InvalidTransition(WorkflowState),

    #[error("final response already set")]
    AlreadyFinalized,

    #[error("audit requested before any draft was produced")]
    MissingDraft,

    #[error("order facts already resolved")]
    FactsAlreadyResolved,
}

/// The capability-backed workflow steps, used to tag capability failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Step {
    Classification,
    Drafting,
    Audit,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Classification => write!(f, "Classification"),
            Step::Drafting => write!(f, "Drafting"),
            Step::Audit => write!(f, "Audit"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_error_names_step() {
        let err = SupportError::capability(
            Step::Drafting,
            CapabilityError::Malformed("empty draft".into()),
        );
        assert_eq!(err.to_string(), "Drafting failed: malformed output: empty draft");
    }

    #[test]
    fn malformed_output_is_not_transient() {
        assert!(!CapabilityError::Malformed("x".into()).is_transient());
        assert!(
            CapabilityError::Transport(AnthropicError::RateLimited { retry_after_ms: 10 })
                .is_transient()
        );
    }
}
