//! The natural-language capability behind classification, drafting and audit.
//!
//! [`SupportCapability`] is the only seam between the workflow and whatever
//! produces language. [`LlmCapability`] calls the Anthropic Messages API;
//! [`OfflineCapability`] is deterministic and needs no network, which is what
//! the demo and most tests run on.

mod llm;
mod offline;

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::{CapabilityError, WorkflowError};
use crate::workflow::{Category, RejectedDraft, WorkflowRecord};

pub use llm::{LlmCapability, LlmSettings};
pub use offline::OfflineCapability;

/// Classifier output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub category: Category,
    pub reasoning: String,
}

/// Auditor output. `feedback` is empty when the draft is compliant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditVerdict {
    pub is_compliant: bool,
    #[serde(default)]
    pub feedback: String,
}

impl AuditVerdict {
    pub fn compliant() -> Self {
        Self {
            is_compliant: true,
            feedback: String::new(),
        }
    }

    pub fn violation(feedback: impl Into<String>) -> Self {
        Self {
            is_compliant: false,
            feedback: feedback.into(),
        }
    }
}

/// Everything the drafter gets to see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftContext {
    pub order_id: String,
    pub customer_message: String,
    pub category: Category,
    pub order_status: String,
    pub delivery_date: Option<String>,
    pub refund_eligible: Option<bool>,
    /// Present only when the previous draft was rejected.
    pub rejected: Option<RejectedDraft>,
}

impl DraftContext {
    pub fn from_record(record: &WorkflowRecord) -> Self {
        Self {
            order_id: record.order_id.clone(),
            customer_message: record.customer_message.clone(),
            category: record.category(),
            order_status: record
                .order_status
                .clone()
                .unwrap_or_else(|| crate::orders::NOT_FOUND_STATUS.to_string()),
            delivery_date: record.delivery_date.clone(),
            refund_eligible: record.refund_eligible,
            rejected: record.rejected_draft(),
        }
    }
}

/// Everything the auditor gets to see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditContext {
    pub customer_message: String,
    pub category: Category,
    pub delivery_date: Option<String>,
    pub refund_eligible: Option<bool>,
    pub draft: String,
}

impl AuditContext {
    pub fn from_record(record: &WorkflowRecord) -> Result<Self, WorkflowError> {
        let draft = record
            .draft_response
            .clone()
            .ok_or(WorkflowError::MissingDraft)?;
        Ok(Self {
            customer_message: record.customer_message.clone(),
            category: record.category(),
            delivery_date: record.delivery_date.clone(),
            refund_eligible: record.refund_eligible,
            draft,
        })
    }
}

/// Classify, draft and audit.
///
/// Implementations may fail. Callers decide what a failure means: the
/// classifier degrades to GENERAL, while drafting and audit failures end the run.
pub trait SupportCapability: Send + Sync {
    fn classify(
        &self,
        message: &str,
    ) -> impl Future<Output = Result<Classification, CapabilityError>> + Send;

    fn draft(
        &self,
        ctx: &DraftContext,
    ) -> impl Future<Output = Result<String, CapabilityError>> + Send;

    fn audit(
        &self,
        ctx: &AuditContext,
    ) -> impl Future<Output = Result<AuditVerdict, CapabilityError>> + Send;
}

/// Longest single wait between capability attempts, whatever the server asks for.
pub const MAX_BACKOFF_MS: u64 = 60_000;

/// Backoff for transient capability failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Extra attempts after the first one.
    pub max_retries: u32,
    /// Base delay in milliseconds for exponential backoff.
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 1000,
        }
    }
}

impl RetryConfig {
    /// delay = base_delay_ms * 2^(attempt - 1)
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        self.base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
    }

    /// Delay before retry number `retry`: the exponential step or the server's
    /// `retry-after`, whichever is longer, capped at [`MAX_BACKOFF_MS`].
    pub fn backoff_delay(&self, retry: u32, server_hint_ms: u64) -> u64 {
        self.delay_for_attempt(retry)
            .max(server_hint_ms)
            .min(MAX_BACKOFF_MS)
    }
}

/// Pulls the JSON object out of a model answer, tolerating code fences and chatter.
pub(crate) fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}
