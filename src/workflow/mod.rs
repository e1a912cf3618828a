mod record;
mod state;

pub use record::{
    Category, Inquiry, MAX_DRAFT_ATTEMPTS, RejectedDraft, RunAudit, SupportReply, WorkflowRecord,
};
pub use state::{StateMachine, WorkflowState};
