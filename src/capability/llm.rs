use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use super::{AuditContext, AuditVerdict, Classification, DraftContext, RetryConfig, SupportCapability};
use crate::anthropic::{AnthropicClient, MessageSender};
use crate::compliance::audit_with_llm;
use crate::config::SupportConfig;
use crate::drafting::draft_with_llm;
use crate::error::{CapabilityError, SupportError};
use crate::router::classify_with_llm;

/// Model parameters shared by the three capability calls.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "claude-haiku-4-5-20251001".to_string(),
            max_tokens: 1024,
            temperature: 0.0,
        }
    }
}

/// Capability backed by a Messages API sender.
///
/// Transient transport failures are retried with exponential backoff;
/// everything else goes straight back to the caller.
pub struct LlmCapability<S> {
    sender: S,
    settings: LlmSettings,
    retry: RetryConfig,
}

impl<S: MessageSender> LlmCapability<S> {
    pub fn new(sender: S, settings: LlmSettings, retry: RetryConfig) -> Self {
        Self {
            sender,
            settings,
            retry,
        }
    }

    async fn with_backoff<T, F, Fut>(&self, call_name: &str, mut call: F) -> Result<T, CapabilityError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CapabilityError>>,
    {
        let mut retries = 0;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && retries < self.retry.max_retries => {
                    retries += 1;
                    let server_hint = match &e {
                        CapabilityError::Transport(t) => t.retry_after_ms().unwrap_or(0),
                        _ => 0,
                    };
                    let delay_ms = self.retry.backoff_delay(retries, server_hint);
                    warn!(
                        call = call_name,
                        retry = retries,
                        max_retries = self.retry.max_retries,
                        delay_ms,
                        error = %e,
                        "Transient capability failure, backing off"
                    );
                    sleep(Duration::from_millis(delay_ms)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl LlmCapability<AnthropicClient> {
    /// Builds the HTTP client and model settings from the loaded config.
    pub fn connect(config: &SupportConfig) -> Result<Self, SupportError> {
        if !config.has_api_key() {
            return Err(SupportError::Config("no Anthropic API key configured".into()));
        }
        let client = AnthropicClient::new(
            config.api_key.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )?;
        Ok(Self::new(client, config.llm_settings(), config.retry_config()))
    }
}

impl<S: MessageSender> SupportCapability for LlmCapability<S> {
    async fn classify(&self, message: &str) -> Result<Classification, CapabilityError> {
        self.with_backoff("classify", || {
            classify_with_llm(&self.sender, &self.settings, message)
        })
        .await
    }

    async fn draft(&self, ctx: &DraftContext) -> Result<String, CapabilityError> {
        self.with_backoff("draft", || draft_with_llm(&self.sender, &self.settings, ctx))
            .await
    }

    async fn audit(&self, ctx: &AuditContext) -> Result<AuditVerdict, CapabilityError> {
        self.with_backoff("audit", || audit_with_llm(&self.sender, &self.settings, ctx))
            .await
    }
}
