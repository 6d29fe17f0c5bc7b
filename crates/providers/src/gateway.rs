//! Model gateway: the only path from the orchestrator to a provider.
//!
//! Adds what a raw [`Provider`] does not do: message normalization, fixed
//! sampling settings, exponential backoff on overload, and content-policy
//! refusals surfaced as an error event.

use std::sync::Arc;
use std::time::Duration;
use reagent_core::error::ProviderError;
use reagent_core::event::{SessionEmitter, StepEvent};
use reagent_core::message::{Message, Role};
use reagent_core::provider::{ChatReply, Provider, ProviderRequest, ToolChoice, ToolDefinition};
use tracing::{debug, info, warn};

/// Text published when the endpoint refuses a request on content grounds.
pub const CONTENT_REJECTED_NOTICE: &str =
    "The request was rejected by the provider's content policy. Please rephrase it and try again.";

/// Attempt budget and backoff schedule for overloaded endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first call included
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubles each time
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::from_millis(base_delay_ms),
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, 2000)
    }
}

/// Wraps a provider with retry, normalization and refusal handling.
pub struct ModelGateway {
    provider: Arc<dyn Provider>,
    temperature: f32,
    max_tokens: Option<u32>,
    retry: RetryPolicy,
}

impl ModelGateway {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            temperature: 0.7,
            max_tokens: None,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    /// Send one model turn.
    ///
    /// Overload responses (429 / 503) are retried with exponential backoff
    /// until the attempt budget is spent, then the last error is returned.
    /// Content-policy refusals publish an `error` event on `events` and fail
    /// at once. Every other failure is returned on first occurrence.
    pub async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        events: &SessionEmitter,
    ) -> std::result::Result<ChatReply, ProviderError> {
        let request = ProviderRequest {
            model: self.provider.model().to_string(),
            messages: normalize_messages(messages),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools: tools.to_vec(),
            tool_choice: (!tools.is_empty()).then_some(ToolChoice::Auto),
        };

        let mut attempt = 1;
        loop {
            debug!(
                provider = self.provider.name(),
                attempt,
                messages = request.messages.len(),
                "Calling model"
            );

            match self.provider.complete(request.clone()).await {
                Ok(response) => {
                    if attempt > 1 {
                        info!(provider = self.provider.name(), attempt, "Model call succeeded after retry");
                    }
                    return Ok(ChatReply::from(response));
                }
                Err(e) if e.is_content_rejection() => {
                    warn!(provider = self.provider.name(), error = %e, "Request rejected by content policy");
                    events.emit(StepEvent::error(CONTENT_REJECTED_NOTICE));
                    return Err(e);
                }
                Err(e) if e.is_transient() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        provider = self.provider.name(),
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Provider overloaded, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Make a message sequence acceptable to chat-completion endpoints.
///
/// - Consecutive non-system messages with the same role are merged, their
///   content joined by a newline and their tool calls concatenated.
/// - System messages pass through untouched and never merge.
/// - Tool results whose call was evicted from history are dropped, since
///   endpoints reject a result without its request.
pub fn normalize_messages(messages: &[Message]) -> Vec<Message> {
    let mut fixed: Vec<Message> = Vec::with_capacity(messages.len());
    let mut announced: Vec<&str> = Vec::new();

    for msg in messages {
        if msg.role == Role::Tool {
            let known = msg
                .tool_call_id
                .as_deref()
                .is_some_and(|id| announced.contains(&id));
            if !known {
                debug!(tool_call_id = ?msg.tool_call_id, "Dropping orphaned tool result");
                continue;
            }
        }
        announced.extend(msg.tool_calls.iter().map(|c| c.id.as_str()));

        match fixed.last_mut() {
            Some(last) if msg.role != Role::System && last.role == msg.role => {
                last.content.push('\n');
                last.content.push_str(&msg.content);
                last.tool_calls.extend(msg.tool_calls.iter().cloned());
            }
            _ => fixed.push(msg.clone()),
        }
    }

    fixed
}
