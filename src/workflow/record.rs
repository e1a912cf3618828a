use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::WorkflowState;
use crate::capability::AuditVerdict;
use crate::error::WorkflowError;
use crate::orders::OrderFacts;

/// Upper bound on draft/audit cycles per run. Policy, not configuration.
pub const MAX_DRAFT_ATTEMPTS: u32 = 3;

/// What a caller hands in: one order and one free-text message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inquiry {
    pub order_id: String,
    pub customer_message: String,
}

/// Intent category assigned by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Shipping,
    Refund,
    General,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Shipping => write!(f, "SHIPPING"),
            Category::Refund => write!(f, "REFUND"),
            Category::General => write!(f, "GENERAL"),
        }
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SHIPPING" => Ok(Category::Shipping),
            "REFUND" => Ok(Category::Refund),
            "GENERAL" => Ok(Category::General),
            other => Err(format!("unknown category '{other}'")),
        }
    }
}

/// A draft the auditor turned down, carried into the next drafting attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedDraft {
    pub draft: String,
    pub feedback: String,
}

/// The per-run context threaded through every step.
///
/// Mutate it through its methods only: they enforce the set-once and
/// append-only rules on facts, final response and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRecord {
    pub task_id: Uuid,
    pub customer_message: String,
    pub order_id: String,
    pub order_status: Option<String>,
    pub delivery_date: Option<String>,
    pub refund_eligible: Option<bool>,
    pub message_category: Option<Category>,
    pub draft_response: Option<String>,
    pub is_compliant: Option<bool>,
    pub compliance_feedback: Option<String>,
    pub retry_count: u32,
    pub final_response: Option<String>,
    pub internal_logs: Vec<String>,
    pub state: WorkflowState,
    pub state_history: Vec<WorkflowState>,
    pub started_at: DateTime<Utc>,
}

impl WorkflowRecord {
    pub fn new(inquiry: Inquiry, task_id: Uuid) -> Self {
        Self {
            task_id,
            customer_message: inquiry.customer_message,
            order_id: inquiry.order_id,
            order_status: None,
            delivery_date: None,
            refund_eligible: None,
            message_category: None,
            draft_response: None,
            is_compliant: None,
            compliance_feedback: None,
            retry_count: 0,
            final_response: None,
            internal_logs: vec![format!("Task {task_id} started.")],
            state: WorkflowState::Fetching,
            state_history: Vec::new(),
            started_at: Utc::now(),
        }
    }

    pub fn log(&mut self, entry: impl Into<String>) {
        self.internal_logs.push(entry.into());
    }

    pub fn apply_facts(&mut self, facts: OrderFacts) -> Result<(), WorkflowError> {
        if self.order_status.is_some() {
            return Err(WorkflowError::FactsAlreadyResolved);
        }
        self.order_status = Some(facts.order_status);
        self.delivery_date = facts.delivery_date;
        self.refund_eligible = facts.refund_eligible;
        Ok(())
    }

    pub fn set_category(&mut self, category: Category) {
        self.message_category = Some(category);
    }

    /// Category for prompt building; GENERAL until the classifier has run.
    pub fn category(&self) -> Category {
        self.message_category.unwrap_or(Category::General)
    }

    /// Stores a fresh draft and bumps the attempt counter. Returns the attempt number.
    pub fn record_draft(&mut self, draft: String) -> u32 {
        self.draft_response = Some(draft);
        self.retry_count += 1;
        self.retry_count
    }

    pub fn record_verdict(&mut self, verdict: &AuditVerdict) {
        self.is_compliant = Some(verdict.is_compliant);
        self.compliance_feedback = Some(verdict.feedback.clone());
    }

    /// Sets the final response. A second call is an invariant breach.
    pub fn finalize(&mut self, response: String) -> Result<(), WorkflowError> {
        if self.final_response.is_some() {
            return Err(WorkflowError::AlreadyFinalized);
        }
        self.final_response = Some(response);
        Ok(())
    }

    /// The last draft, if the auditor rejected it.
    pub fn rejected_draft(&self) -> Option<RejectedDraft> {
        if self.is_compliant != Some(false) {
            return None;
        }
        let draft = self.draft_response.clone()?;
        let feedback = self.compliance_feedback.clone().unwrap_or_default();
        Some(RejectedDraft { draft, feedback })
    }

    pub fn transition_to(&mut self, next: WorkflowState) {
        self.state_history.push(self.state);
        self.state = next;
    }
}

/// The result contract handed back to the intake layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportReply {
    pub category: Category,
    pub final_response: String,
    pub compliance_checked: bool,
    pub logs: Vec<String>,
}

impl SupportReply {
    /// Builds the reply from a terminal record.
    pub fn from_record(record: &WorkflowRecord) -> Result<Self, WorkflowError> {
        let final_response = record
            .final_response
            .clone()
            .ok_or(WorkflowError::InvalidTransition(record.state))?;
        Ok(Self {
            category: record.category(),
            final_response,
            compliance_checked: record.is_compliant.unwrap_or(false),
            logs: record.internal_logs.clone(),
        })
    }
}

/// Operator-facing summary of a finished run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunAudit {
    pub task_id: Uuid,
    pub order_id: String,
    pub outcome: WorkflowState,
    pub state_transitions: Vec<WorkflowState>,
    pub draft_attempts: u32,
    pub max_draft_attempts: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl RunAudit {
    pub fn from_record(record: &WorkflowRecord) -> Self {
        let now = Utc::now();
        let mut transitions = record.state_history.clone();
        transitions.push(record.state);

        Self {
            task_id: record.task_id,
            order_id: record.order_id.clone(),
            outcome: record.state,
            state_transitions: transitions,
            draft_attempts: record.retry_count,
            max_draft_attempts: MAX_DRAFT_ATTEMPTS,
            started_at: record.started_at,
            completed_at: now,
            duration_ms: (now - record.started_at).num_milliseconds(),
        }
    }
}
