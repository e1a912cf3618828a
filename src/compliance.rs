//! Compliance audit of a candidate reply.
//!
//! Two contextual rules. Each one applies when the draft touches its topic
//! or the customer asked about it:
//! - **Refund rule**: when the order is not refundable, no promise of money,
//!   a return or an approved refund. When eligibility is unknown, neither
//!   confirm nor deny. Say the information is unavailable.
//! - **Delivery rule**: without a delivery date, no dates, weekdays or
//!   relative timeframes anywhere in the draft. Status words like
//!   "In Transit" are fine.
//!
//! [`ComplianceRules`] applies them deterministically, clause by clause;
//! [`audit_with_llm`] asks a model to apply the same rules.

use regex::Regex;
use tracing::{debug, info, warn};

use crate::anthropic::{MessageSender, MessagesRequest};
use crate::capability::{AuditContext, AuditVerdict, LlmSettings, SupportCapability, extract_json};
use crate::error::{CapabilityError, Step, SupportError};
use crate::workflow::{Category, WorkflowRecord};

/// Compiled patterns for the refund and delivery rules.
pub struct ComplianceRules {
    refund_topic: Regex,
    refund_outcome: Regex,
    refund_confirm: Regex,
    refund_decline: Regex,
    eager: Regex,
    info_unavailable: Regex,
    delivery_topic: Regex,
    delivery_ask: Regex,
    timeframe: Regex,
}

impl Default for ComplianceRules {
    fn default() -> Self {
        Self::standard()
    }
}

impl ComplianceRules {
    pub fn standard() -> Self {
        Self {
            refund_topic: Regex::new(
                r"(?i)\b(refund\w*|money|reimburs\w*|returns?|returned|returning|credit(ed)?|compensat\w*)\b",
            )
            .unwrap(),
            // A stated refund, money or return outcome, with or without the word "refund".
            refund_outcome: Regex::new(
                r"(?i)(\bapprov\w*|\brefunded\b|\breimbursed\b|\bcredited\b|\bcompensated\b|\bmoney back\b|\bin full\b|\bback (in|to|into|on) your\b|\b(will|we'll|you'll|going to|shall|happy to|glad to)\b[^.]*\b(refund\w*|money|return\w*|reimburs\w*|credit\w*|compensat\w*)|\b(refund\w*|money|reimburs\w*|credit)\b[^.]*\b(will|goes out|go out|be sent|been sent|on its way|processed|issued|initiated|within|is coming)\b|\bto (refund|reimburse|credit|compensate) (you|your)\b)",
            )
            .unwrap(),
            refund_confirm: Regex::new(r"(?i)\b(eligible|qualif\w*|entitled)\b").unwrap(),
            refund_decline: Regex::new(
                r"(?i)(\bnot eligible\b|\bineligible\b|\bnot able to\b|\bunable to\b|\bcannot\b|\bcan't\b|\bcan not\b|\bwon't\b|\bwill not\b|\bno refunds?\b|\bnot possible\b|\bdeclin\w*|\bnot (be )?(refund\w*|issu\w*|approv\w*|process\w*|offer\w*)\b)",
            )
            .unwrap(),
            // Negation words that do not negate anything.
            eager: Regex::new(r"(?i)\b(cannot|can't|can not|won't|will not) wait\b").unwrap(),
            info_unavailable: Regex::new(
                r"(?i)\b(unavailable|not available|investigat\w*|looking into|unable to confirm|cannot confirm|can't confirm|not yet (known|confirmed|determined))\b",
            )
            .unwrap(),
            delivery_topic: Regex::new(
                r"(?i)\b(deliver\w*|arriv\w*|ship\w*|transit|package|parcel|on the way|on its way|expect\w*|reach\w*|with you|have it|get it)\b",
            )
            .unwrap(),
            delivery_ask: Regex::new(
                r"(?i)\b(where('s| is)|track\w*|deliver\w*|arriv\w*|ship\w*|transit|package|parcel|late|delay\w*|get it|have it)\b",
            )
            .unwrap(),
            timeframe: Regex::new(
                r"(?i)\b(monday|tuesday|wednesday|thursday|friday|saturday|sunday|today|tonight|tomorrow|soon|shortly|quickly|any day now|this week|next week|this weekend|end of (the )?(day|week|month)|on the way|on its way|within \d+|in (a few|a couple of|several|\d+|one|two|three|four|five) (business )?(hours?|days?|weeks?)|(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.? \d{1,2}(st|nd|rd|th)?|\d{4}-\d{2}-\d{2}|\d{1,2}/\d{1,2}(/\d{2,4})?)\b",
            )
            .unwrap(),
        }
    }

    /// Applies both rules and collects every violation into the feedback.
    pub fn check(&self, ctx: &AuditContext) -> AuditVerdict {
        let mut violations = Vec::new();
        if let Some(v) = self.check_refund(ctx) {
            violations.push(v);
        }
        if let Some(v) = self.check_delivery(ctx) {
            violations.push(v);
        }

        if violations.is_empty() {
            AuditVerdict::compliant()
        } else {
            AuditVerdict::violation(violations.join(" "))
        }
    }

    fn refund_in_scope(&self, ctx: &AuditContext) -> bool {
        ctx.category == Category::Refund
            || self.refund_topic.is_match(&ctx.customer_message)
            || self.refund_topic.is_match(&ctx.draft)
    }

    fn delivery_in_scope(&self, ctx: &AuditContext) -> bool {
        ctx.category == Category::Shipping
            || self.delivery_ask.is_match(&ctx.customer_message)
            || self.delivery_topic.is_match(&ctx.draft)
    }

    /// A decline that actually negates, unlike "we cannot wait to refund you".
    fn declines(&self, clause: &str) -> bool {
        self.refund_decline.is_match(clause) && !self.eager.is_match(clause)
    }

    /// First sentence stating a refund outcome that no clause of it declines.
    fn promised_refund<'a>(&self, draft: &'a str) -> Option<&'a str> {
        sentences(draft).find(|s| {
            if !self.refund_outcome.is_match(s) {
                return false;
            }
            let outcome_clauses: Vec<&str> = clauses(s)
                .filter(|c| self.refund_outcome.is_match(c))
                .collect();
            if outcome_clauses.is_empty() {
                // The outcome spans clause breaks; judge the sentence as a whole.
                return !self.declines(s);
            }
            outcome_clauses.iter().any(|c| !self.declines(c))
        })
    }

    fn check_refund(&self, ctx: &AuditContext) -> Option<String> {
        if !self.refund_in_scope(ctx) {
            return None;
        }

        match ctx.refund_eligible {
            Some(true) => None,
            Some(false) => self.promised_refund(&ctx.draft).map(|s| {
                format!(
                    "Refund rule: the order is not eligible for a refund, but the draft promises or implies one (\"{s}\")."
                )
            }),
            None => {
                if let Some(c) = sentences(&ctx.draft).flat_map(clauses).find(|c| {
                    !self.info_unavailable.is_match(c)
                        && (self.refund_outcome.is_match(c)
                            || self.refund_confirm.is_match(c)
                            || self.declines(c))
                }) {
                    return Some(format!(
                        "Refund rule: refund eligibility is unknown, but the draft confirms or denies it (\"{c}\")."
                    ));
                }
                if self.refund_topic.is_match(&ctx.draft)
                    && !self.info_unavailable.is_match(&ctx.draft)
                {
                    return Some(
                        "Refund rule: refund eligibility is unknown, and the draft discusses refunds without stating that the information is unavailable."
                            .to_string(),
                    );
                }
                None
            }
        }
    }

    fn check_delivery(&self, ctx: &AuditContext) -> Option<String> {
        if ctx.delivery_date.is_some() || !self.delivery_in_scope(ctx) {
            return None;
        }
        sentences(&ctx.draft)
            .find_map(|s| self.timeframe.find(s))
            .map(|m| {
                format!(
                    "Delivery rule: no delivery date is available, but the draft gives a date or timeframe (\"{}\").",
                    m.as_str()
                )
            })
    }
}

fn sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split(['.', '!', '?', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn clauses(sentence: &str) -> impl Iterator<Item = &str> {
    sentence
        .split([',', ';', ':'])
        .flat_map(|c| c.split(" but "))
        .map(str::trim)
        .filter(|c| !c.is_empty())
}

fn describe_refund(refund_eligible: Option<bool>) -> String {
    match refund_eligible {
        Some(eligible) => eligible.to_string(),
        None => "UNKNOWN".to_string(),
    }
}

/// Builds the auditor instructions for one draft.
pub fn audit_prompt(ctx: &AuditContext) -> String {
    format!(
        "Review this support draft for business-rule violations.\n\
         Your ONLY job is to find hard violations of the rules below. If a draft is safe, you MUST mark it as compliant.\n\
         Do not be pedantic and do not invent violations.\n\
         \n\
         1. RULE CHECKING IS CONTEXTUAL. Only apply rules relevant to what the customer asked or what the draft discusses.\n\
         - ONLY CHECK THE REFUND RULE if refunds, returns or money back are asked about or mentioned.\n\
         - ONLY CHECK THE DELIVERY RULE if delivery or arrival is asked about or mentioned.\n\
         \n\
         2. REFUND RULE:\n\
         - IF Refund Eligible is 'false':\n\
           - ALLOWED: Stating the order is ineligible for a refund or politely declining.\n\
           - VIOLATION: Promising money, a return, or implying a refund is possible.\n\
         - IF Refund Eligible is 'UNKNOWN':\n\
           - VIOLATION: Confirming or denying eligibility.\n\
           - ALLOWED: Stating that the information is unavailable or being investigated.\n\
         \n\
         3. DELIVERY RULE:\n\
         - IF Delivery Date is 'NOT AVAILABLE':\n\
           - VIOLATION: Any language implying a timeframe: \"soon\", \"shortly\", \"quickly\", \"this week\", \"on the way\".\n\
           - VIOLATION: Anything implying a date (e.g. 'Oct 5th'), a day (e.g. 'Monday'), or a relative arrival time (e.g. 'in 2 days').\n\
           - ALLOWED: \"In Transit\" or \"Shipped\" are STATUSES, not timeframes. Do NOT flag them.\n\
           - ALLOWED: Saying \"A specific date is not available\".\n\
         \n\
         DATA:\n\
         - Customer Message: {}\n\
         - Category: {}\n\
         - Refund Eligible: {}\n\
         - Delivery Date: {}\n\
         \n\
         DRAFT TO AUDIT:\n\
         \"{}\"\n\
         \n\
         Does this draft violate any of the rules above? If so, name the rule and explain why.\n\
         Respond with ONLY valid JSON, no other text.\n\
         Format: {{\"is_compliant\": true|false, \"feedback\": \"<empty if compliant, otherwise the violated rule and why>\"}}",
        ctx.customer_message,
        ctx.category,
        describe_refund(ctx.refund_eligible),
        ctx.delivery_date.as_deref().unwrap_or("NOT AVAILABLE"),
        ctx.draft
    )
}

/// Audits a draft with one model call.
pub async fn audit_with_llm(
    client: &impl MessageSender,
    settings: &LlmSettings,
    ctx: &AuditContext,
) -> Result<AuditVerdict, CapabilityError> {
    let req = MessagesRequest::single_turn(
        &settings.model,
        512,
        settings.temperature,
        "You are a strict but fair compliance auditor for customer support replies.",
        audit_prompt(ctx),
    );

    let response = client.send_message(&req).await?;
    let text = response.text();
    let verdict: AuditVerdict = serde_json::from_str(extract_json(&text))
        .map_err(|e| CapabilityError::Malformed(format!("audit JSON: {e}")))?;

    if !verdict.is_compliant && verdict.feedback.trim().is_empty() {
        return Err(CapabilityError::Malformed(
            "non-compliant verdict without feedback".into(),
        ));
    }
    Ok(verdict)
}

/// AUDITING step. A compliant verdict is the only place a draft becomes the final response.
pub async fn audit_draft(
    capability: &impl SupportCapability,
    record: &mut WorkflowRecord,
) -> Result<(), SupportError> {
    let ctx = AuditContext::from_record(record)?;
    let verdict = capability
        .audit(&ctx)
        .await
        .map_err(|e| SupportError::capability(Step::Audit, e))?;

    record.record_verdict(&verdict);
    if verdict.is_compliant {
        info!(task_id = %record.task_id, attempt = record.retry_count, "Draft passed compliance");
        record.log("Compliance check: passed.");
        record.finalize(ctx.draft)?;
    } else {
        warn!(
            task_id = %record.task_id,
            attempt = record.retry_count,
            feedback = %verdict.feedback,
            "Draft failed compliance"
        );
        debug!(task_id = %record.task_id, draft = %ctx.draft, "Rejected draft");
        record.log(format!("Compliance check: failed. {}", verdict.feedback));
    }
    Ok(())
}
