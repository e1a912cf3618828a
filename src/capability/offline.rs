use super::{AuditContext, AuditVerdict, Classification, DraftContext, SupportCapability};
use crate::compliance::ComplianceRules;
use crate::drafting::TemplateDrafter;
use crate::error::CapabilityError;
use crate::router::IntentRouter;

/// Deterministic capability: keyword routing, template drafts, rule-based audit.
///
/// Never fails and never calls out.
#[derive(Default)]
pub struct OfflineCapability {
    rules: ComplianceRules,
}

impl OfflineCapability {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SupportCapability for OfflineCapability {
    async fn classify(&self, message: &str) -> Result<Classification, CapabilityError> {
        Ok(IntentRouter::route(message))
    }

    async fn draft(&self, ctx: &DraftContext) -> Result<String, CapabilityError> {
        Ok(TemplateDrafter::compose(ctx))
    }

    async fn audit(&self, ctx: &AuditContext) -> Result<AuditVerdict, CapabilityError> {
        Ok(self.rules.check(ctx))
    }
}
