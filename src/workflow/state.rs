use std::fmt;

use serde::{Deserialize, Serialize};

use super::record::{MAX_DRAFT_ATTEMPTS, WorkflowRecord};
use crate::error::WorkflowError;

/// States of the reply workflow.
///
/// FETCHING → CLASSIFYING → DRAFTING → AUDITING → {ACCEPTED, RETRYING, ESCALATED},
/// with RETRYING looping back to DRAFTING.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowState {
    Fetching,
    Classifying,
    Drafting,
    Auditing,
    Retrying,
    Accepted,
    Escalated,
}

impl WorkflowState {
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkflowState::Accepted | WorkflowState::Escalated)
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowState::Fetching => write!(f, "FETCHING"),
            WorkflowState::Classifying => write!(f, "CLASSIFYING"),
            WorkflowState::Drafting => write!(f, "DRAFTING"),
            WorkflowState::Auditing => write!(f, "AUDITING"),
            WorkflowState::Retrying => write!(f, "RETRYING"),
            WorkflowState::Accepted => write!(f, "ACCEPTED"),
            WorkflowState::Escalated => write!(f, "ESCALATED"),
        }
    }
}

/// Computes transitions; the controller runs the step for each state.
pub struct StateMachine;

impl StateMachine {
    /// Next state for a record whose current-state step has just run.
    ///
    /// Terminal states have no successor. Leaving AUDITING without a verdict
    /// is also rejected: the gate needs one.
    pub fn next(record: &WorkflowRecord) -> Result<WorkflowState, WorkflowError> {
        match record.state {
            WorkflowState::Fetching => Ok(WorkflowState::Classifying),
            WorkflowState::Classifying => Ok(WorkflowState::Drafting),
            WorkflowState::Drafting => Ok(WorkflowState::Auditing),
            WorkflowState::Retrying => Ok(WorkflowState::Drafting),
            WorkflowState::Auditing => match record.is_compliant {
                Some(compliant) => Ok(Self::gate(compliant, record.retry_count)),
                None => Err(WorkflowError::InvalidTransition(WorkflowState::Auditing)),
            },
            state @ (WorkflowState::Accepted | WorkflowState::Escalated) => {
                Err(WorkflowError::InvalidTransition(state))
            }
        }
    }

    /// Accept / escalate / retry decision taken after every audit.
    pub fn gate(is_compliant: bool, retry_count: u32) -> WorkflowState {
        if is_compliant {
            WorkflowState::Accepted
        } else if retry_count >= MAX_DRAFT_ATTEMPTS {
            WorkflowState::Escalated
        } else {
            WorkflowState::Retrying
        }
    }
}
