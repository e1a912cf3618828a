use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::capability::SupportCapability;
use crate::compliance::audit_draft;
use crate::drafting::draft_reply;
use crate::error::SupportError;
use crate::orders::{FactResolver, fetch_context};
use crate::router::categorize;
use crate::workflow::{
    Inquiry, MAX_DRAFT_ATTEMPTS, StateMachine, SupportReply, WorkflowRecord, WorkflowState,
};

/// Canned reply used when no draft passes the audit within the attempt budget.
pub const FALLBACK_RESPONSE: &str = "We're sorry, but we weren't able to prepare a verified answer to your request right now. \
Your inquiry has been escalated to a member of our support team, who will follow up with you directly.";

/// Drives one inquiry through fetch → classify → draft/audit loop → accept or escalate.
pub struct WorkflowController<R, C> {
    resolver: R,
    capability: C,
}

impl<R: FactResolver, C: SupportCapability> WorkflowController<R, C> {
    pub fn new(resolver: R, capability: C) -> Self {
        Self {
            resolver,
            capability,
        }
    }

    /// Intake boundary: inquiry in, reply contract out.
    pub async fn reply(&self, inquiry: Inquiry, task_id: Uuid) -> Result<SupportReply, SupportError> {
        let record = self.run(inquiry, task_id).await?;
        Ok(SupportReply::from_record(&record)?)
    }

    /// Runs to a terminal state and returns the finished record.
    pub async fn run(&self, inquiry: Inquiry, task_id: Uuid) -> Result<WorkflowRecord, SupportError> {
        self.run_observed(inquiry, task_id, |_| {}).await
    }

    /// Same as [`run`](Self::run), calling `observe` after every transition.
    #[instrument(skip_all, fields(task_id = %task_id, order_id = %inquiry.order_id))]
    pub async fn run_observed(
        &self,
        inquiry: Inquiry,
        task_id: Uuid,
        mut observe: impl FnMut(&WorkflowRecord) + Send,
    ) -> Result<WorkflowRecord, SupportError> {
        let mut record = WorkflowRecord::new(inquiry, task_id);
        info!("Workflow started");
        observe(&record);

        while !record.state.is_terminal() {
            match record.state {
                WorkflowState::Fetching => fetch_context(&self.resolver, &mut record)?,
                WorkflowState::Classifying => categorize(&self.capability, &mut record).await,
                WorkflowState::Drafting => draft_reply(&self.capability, &mut record)
                    .await
                    .inspect_err(|e| error!(error = %e, "Drafting failed, aborting run"))?,
                WorkflowState::Auditing => audit_draft(&self.capability, &mut record)
                    .await
                    .inspect_err(|e| error!(error = %e, "Audit failed, aborting run"))?,
                WorkflowState::Retrying => record.log(format!(
                    "Retrying draft ({}/{MAX_DRAFT_ATTEMPTS} attempts used).",
                    record.retry_count
                )),
                WorkflowState::Accepted | WorkflowState::Escalated => break,
            }

            let next = StateMachine::next(&record)?;
            record.transition_to(next);
            if next == WorkflowState::Escalated {
                escalate(&mut record)?;
            }
            observe(&record);
        }

        info!(
            outcome = %record.state,
            attempts = record.retry_count,
            "Workflow finished"
        );
        Ok(record)
    }
}

/// Fallback producer: the fixed escalation reply, whatever the drafts said.
pub fn escalate(record: &mut WorkflowRecord) -> Result<(), SupportError> {
    error!(
        task_id = %record.task_id,
        attempts = record.retry_count,
        "No compliant draft within budget, escalating"
    );
    record.log(format!(
        "CRITICAL: Max retries ({MAX_DRAFT_ATTEMPTS}) exceeded without a compliant draft. Escalated to a human agent with fallback response."
    ));
    record.finalize(FALLBACK_RESPONSE.to_string())?;
    Ok(())
}
