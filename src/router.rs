use tracing::{error, info};

use crate::anthropic::{MessageSender, MessagesRequest};
use crate::capability::{Classification, LlmSettings, SupportCapability, extract_json};
use crate::error::{CapabilityError, Step, SupportError};
use crate::workflow::{Category, WorkflowRecord};

/// Triage instructions for the classification call.
pub const CLASSIFY_SYSTEM_PROMPT: &str = "You are a professional triage agent for an e-commerce platform. \
Your task is to categorize the user's message into EXACTLY one category based on these rules:\n\n\
- SHIPPING: Use for inquiries about order location, tracking numbers, or delivery dates.\n\
- REFUND: Use for inquiries about money back, returns, or order cancellations.\n\
- GENERAL: Use for greetings, feedback, or issues not related to a specific order status.\n\n\
Return ONLY the structured data. Do not engage in conversation.";

/// Routes a customer message to an intent category using weighted keyword scoring.
pub struct IntentRouter;

const SHIPPING_KEYWORDS: &[(&str, u32)] = &[
    ("track", 10),
    ("deliver", 10),
    ("ship", 10),
    ("arriv", 10),
    ("package", 7),
    ("parcel", 7),
    ("transit", 7),
    ("delay", 7),
    ("where", 5),
    ("late", 5),
    ("when will", 5),
];

const REFUND_KEYWORDS: &[(&str, u32)] = &[
    ("refund", 15),
    ("money back", 15),
    ("return", 10),
    ("cancel", 10),
    ("reimburs", 10),
    ("exchange", 7),
    ("charge", 5),
];

impl IntentRouter {
    /// Scores both order-related intents; refunds win ties, no match means GENERAL.
    pub fn route(message: &str) -> Classification {
        let lower = message.to_lowercase();

        let score = |keywords: &[(&'static str, u32)]| {
            let hits: Vec<&str> = keywords
                .iter()
                .filter(|(keyword, _)| lower.contains(keyword))
                .map(|(keyword, _)| *keyword)
                .collect();
            let total: u32 = keywords
                .iter()
                .filter(|(keyword, _)| lower.contains(keyword))
                .map(|(_, weight)| weight)
                .sum();
            (total, hits)
        };

        let (shipping, shipping_hits) = score(SHIPPING_KEYWORDS);
        let (refund, refund_hits) = score(REFUND_KEYWORDS);

        if refund == 0 && shipping == 0 {
            return Classification {
                category: Category::General,
                reasoning: "No order-specific keywords; treated as a general inquiry.".into(),
            };
        }

        if refund >= shipping {
            Classification {
                category: Category::Refund,
                reasoning: format!("Refund keywords matched: {}.", refund_hits.join(", ")),
            }
        } else {
            Classification {
                category: Category::Shipping,
                reasoning: format!("Shipping keywords matched: {}.", shipping_hits.join(", ")),
            }
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct LlmCategory {
    category: String,
    #[serde(default)]
    reasoning: String,
}

/// Classifies a customer message with one model call.
///
/// Anything other than a JSON object naming one of the three categories is
/// reported as malformed output.
pub async fn classify_with_llm(
    client: &impl MessageSender,
    settings: &LlmSettings,
    message: &str,
) -> Result<Classification, CapabilityError> {
    let req = MessagesRequest::single_turn(
        &settings.model,
        256,
        settings.temperature,
        CLASSIFY_SYSTEM_PROMPT,
        format!(
            "Respond with ONLY valid JSON, no other text.\n\
             Format: {{\"category\": \"SHIPPING|REFUND|GENERAL\", \"reasoning\": \"<one sentence>\"}}\n\
             \n\
             Message: {message}"
        ),
    );

    let response = client.send_message(&req).await?;
    let text = response.text();

    let parsed: LlmCategory = serde_json::from_str(extract_json(&text))
        .map_err(|e| CapabilityError::Malformed(format!("classification JSON: {e}")))?;
    let category = parsed
        .category
        .parse::<Category>()
        .map_err(CapabilityError::Malformed)?;

    Ok(Classification {
        category,
        reasoning: parsed.reasoning,
    })
}

/// CLASSIFYING step. Never fails: any capability error degrades to GENERAL.
pub async fn categorize(capability: &impl SupportCapability, record: &mut WorkflowRecord) {
    match capability.classify(&record.customer_message).await {
        Ok(classification) => {
            info!(
                task_id = %record.task_id,
                category = %classification.category,
                "Message categorized"
            );
            record.set_category(classification.category);
            record.log(format!(
                "Categorized as {}. Reason: {}",
                classification.category, classification.reasoning
            ));
        }
        Err(e) => {
            record.log(format!(
                "CRITICAL: Categorization failed with error: {e}. Defaulted to GENERAL."
            ));
            let err = SupportError::capability(Step::Classification, e);
            error!(task_id = %record.task_id, error = %err, "Defaulting to GENERAL");
            record.set_category(Category::General);
        }
    }
}
