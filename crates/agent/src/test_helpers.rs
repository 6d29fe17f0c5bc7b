//! Shared test helpers for orchestrator tests.

use reagent_core::error::ProviderError;
use reagent_core::message::{Message, MessageToolCall};
use reagent_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use std::collections::VecDeque;
use std::sync::Mutex;

type Outcome = Result<ProviderResponse, ProviderError>;

/// A mock provider that plays back a script of outcomes.
///
/// Every request is recorded. Once the script runs out the last outcome
/// repeats if `repeat_last` was requested, otherwise calls fail.
pub struct SequentialMockProvider {
    outcomes: Mutex<VecDeque<Outcome>>,
    repeat_last: bool,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(outcomes: Vec<Outcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            repeat_last: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer every call with `response`.
    pub fn repeating(response: ProviderResponse) -> Self {
        Self {
            repeat_last: true,
            ..Self::new(vec![Ok(response)])
        }
    }

    /// Create a provider that first returns tool calls, then a final answer.
    pub fn tool_then_answer(tool_calls: Vec<MessageToolCall>, thought: &str, answer: &str) -> Self {
        Self::new(vec![
            Ok(make_tool_call_response(tool_calls, thought)),
            Ok(make_text_response(answer)),
        ])
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let mut outcomes = self.outcomes.lock().unwrap();
        if self.repeat_last && outcomes.len() == 1 {
            return outcomes[0].clone();
        }
        outcomes
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Network("SequentialMockProvider: script exhausted".into())))
    }
}

/// Create a simple text response (no tool calls).
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// Create a response with tool calls and optional thought content.
pub fn make_tool_call_response(tool_calls: Vec<MessageToolCall>, thought: &str) -> ProviderResponse {
    let mut response = make_text_response(thought);
    response.message.tool_calls = tool_calls;
    response
}

/// Helper to create a tool call.
pub fn make_tool_call(name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: format!("call_{name}"),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    }
}
