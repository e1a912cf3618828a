//! Draft generation: the prompt context, the model call, and a fact-grounded
//! template drafter for offline runs.

use tracing::info;

use crate::anthropic::{MessageSender, MessagesRequest};
use crate::capability::{DraftContext, LlmSettings, SupportCapability};
use crate::error::{CapabilityError, Step, SupportError};
use crate::workflow::{Category, WorkflowRecord};

pub const DRAFT_SYSTEM_PROMPT: &str = "You are a professional customer support agent. Write a POLITE and CONCISE response.\n\
RULES:\n\
1. Use the provided ORDER STATUS to inform the customer.\n\
2. DO NOT promise a specific delivery date or timeframe if DELIVERY DATE is 'NOT AVAILABLE'.\n\
3. DO NOT promise a refund if REFUND ELIGIBLE is false or UNKNOWN.\n\
4. Be empathetic but do not make financial commitments or guarantees.\n\
5. If information is missing (UNKNOWN/NOT AVAILABLE), tell the customer we are investigating or remain silent on that specific point.";

const DATE_UNAVAILABLE: &str = "NOT AVAILABLE";
const ELIGIBILITY_UNKNOWN: &str = "UNKNOWN";

/// Renders the fact block the drafter works from, plus the rejection block on retries.
pub fn context_block(ctx: &DraftContext) -> String {
    let delivery = ctx.delivery_date.as_deref().unwrap_or(DATE_UNAVAILABLE);
    let refund = match ctx.refund_eligible {
        Some(eligible) => eligible.to_string(),
        None => ELIGIBILITY_UNKNOWN.to_string(),
    };

    let mut block = format!(
        "CUSTOMER MESSAGE: {}\n\
         CATEGORY: {}\n\
         ORDER STATUS: {}\n\
         DELIVERY DATE: {delivery}\n\
         REFUND ELIGIBLE: {refund}\n",
        ctx.customer_message, ctx.category, ctx.order_status
    );

    if let Some(rejected) = &ctx.rejected {
        block.push_str(&format!(
            "---\n\
             CRITICAL: Your previous draft was REJECTED by the compliance auditor.\n\
             REASON FOR REJECTION: {}\n\
             PREVIOUS REJECTED VERSION (DO NOT REPEAT THESE ERRORS):\n\
             \"{}\"\n\
             TASK: Generate a NEW version that resolves the reason for rejection.\n\
             ---\n",
            rejected.feedback, rejected.draft
        ));
    }

    block
}

/// Produces a draft with one model call.
pub async fn draft_with_llm(
    client: &impl MessageSender,
    settings: &LlmSettings,
    ctx: &DraftContext,
) -> Result<String, CapabilityError> {
    let req = MessagesRequest::single_turn(
        &settings.model,
        settings.max_tokens,
        settings.temperature,
        DRAFT_SYSTEM_PROMPT,
        format!(
            "Context and History:\n{}\nDraft the response:",
            context_block(ctx)
        ),
    );

    let response = client.send_message(&req).await?;
    if response.stop_reason.as_deref() == Some("refusal") {
        return Err(CapabilityError::Unavailable("model refused to draft".into()));
    }
    let text = response.text();
    if text.is_empty() {
        return Err(CapabilityError::Malformed("empty draft".into()));
    }
    Ok(text)
}

/// Builds replies from fixed sentences chosen by the order facts.
///
/// Every sentence follows the drafting rules, so retry feedback is not needed.
pub struct TemplateDrafter;

impl TemplateDrafter {
    pub fn compose(ctx: &DraftContext) -> String {
        let mut parts = vec![format!(
            "Hello, thank you for contacting us about order {}.",
            ctx.order_id
        )];

        if ctx.order_status == crate::orders::NOT_FOUND_STATUS {
            parts.push(
                "We could not locate this order in our system, and we are investigating."
                    .to_string(),
            );
            parts.push("Thank you for your patience.".to_string());
            return parts.join(" ");
        }

        parts.push(format!("Its current status is {}.", ctx.order_status));

        match ctx.category {
            Category::Shipping => parts.push(match &ctx.delivery_date {
                Some(date) => format!("The expected delivery date is {date}."),
                None => "A specific delivery date is not available at the moment, and we are looking into it."
                    .to_string(),
            }),
            Category::Refund => parts.push(
                match ctx.refund_eligible {
                    Some(true) => "This order is eligible for a refund, and our team will review the next steps with you.",
                    Some(false) => "Unfortunately, this order is not eligible for a refund.",
                    None => "Refund eligibility information is currently unavailable, and we are investigating.",
                }
                .to_string(),
            ),
            Category::General => {
                parts.push("Please let us know if there is anything else we can help with.".to_string())
            }
        }

        parts.push("Thank you for your patience.".to_string());
        parts.join(" ")
    }
}

/// DRAFTING step: one new draft, one more attempt on the counter.
pub async fn draft_reply(
    capability: &impl SupportCapability,
    record: &mut WorkflowRecord,
) -> Result<(), SupportError> {
    let ctx = DraftContext::from_record(record);
    let draft = capability
        .draft(&ctx)
        .await
        .map_err(|e| SupportError::capability(Step::Drafting, e))?;

    let attempt = record.record_draft(draft);
    info!(task_id = %record.task_id, attempt, "Draft generated");
    record.log(format!("Draft attempt #{attempt} generated."));
    Ok(())
}
