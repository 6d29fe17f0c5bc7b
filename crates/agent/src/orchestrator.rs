//! ReAct orchestrator: Thought → Action → Observation until an answer.
//!
//! One [`ReactOrchestrator::run`] is one task. The loop asks the model for
//! a turn, acts on the first tool call it proposes, feeds the observation
//! back and repeats until the model answers without a tool call or the
//! iteration cap is hit. Every step is published on the event bus, stamped
//! with the run's session id.
//!
//! Tool failures never end a run: they become the observation text. Model
//! failures do, after an `error` event and a best-effort memory record.

use reagent_core::agent::{AgentLimits, CompletionStatus};
use reagent_core::error::Result;
use reagent_core::event::{EventBus, SessionEmitter, SessionId, StepEvent, StepKind};
use reagent_core::memory::{EpisodicMemory, MemoryStats, MemoryStep};
use reagent_core::message::{Conversation, Message, MessageToolCall};
use reagent_core::tool::ToolDispatch;
use reagent_memory::format_for_prompt;
use reagent_providers::ModelGateway;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::prompt::system_prompt;

/// Answer used when the model finishes with empty text.
pub const DEFAULT_ANSWER: &str = "Task complete.";

/// The structured result of one run.
#[derive(Debug, Clone, Serialize)]
pub struct TaskOutcome {
    pub session_id: SessionId,
    pub answer: String,
    pub status: CompletionStatus,
    /// Rounds actually used
    pub iterations: u32,
    pub steps: Vec<MemoryStep>,
}

struct Completion {
    answer: String,
    status: CompletionStatus,
    iterations: u32,
}

/// Drives tasks through the model gateway and tool dispatch.
///
/// Holds only shared, read-mostly collaborators, so one orchestrator can
/// serve concurrent runs; each run builds its own conversation.
pub struct ReactOrchestrator {
    gateway: Arc<ModelGateway>,
    tools: Arc<ToolDispatch>,
    memory: Arc<dyn EpisodicMemory>,
    events: Arc<EventBus>,
    limits: AgentLimits,
}

impl ReactOrchestrator {
    pub fn new(
        gateway: Arc<ModelGateway>,
        tools: Arc<ToolDispatch>,
        memory: Arc<dyn EpisodicMemory>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            gateway,
            tools,
            memory,
            events,
            limits: AgentLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: AgentLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> &AgentLimits {
        &self.limits
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Solve `task` and return only the final answer text.
    pub async fn solve(&self, task: &str) -> Result<String> {
        Ok(self.run(task).await?.answer)
    }

    /// Solve `task` in a fresh session.
    pub async fn run(&self, task: &str) -> Result<TaskOutcome> {
        self.run_in_session(SessionId::new(), task).await
    }

    /// Solve `task` under a caller-chosen session id, so listeners can be
    /// subscribed to it before the first event.
    pub async fn run_in_session(&self, session: SessionId, task: &str) -> Result<TaskOutcome> {
        let span = info_span!("task", session = %session);
        self.run_inner(session, task).instrument(span).await
    }

    /// Read-only statistics over the episodic memory.
    pub fn memory_stats(&self) -> MemoryStats {
        self.memory.stats()
    }

    async fn run_inner(&self, session: SessionId, task: &str) -> Result<TaskOutcome> {
        let emitter = SessionEmitter::new(Arc::clone(&self.events), session.clone());
        let mut steps = Vec::new();

        info!(
            provider = self.gateway.provider_name(),
            model = self.gateway.model(),
            max_iterations = self.limits.max_iterations,
            "Task started"
        );

        match self.drive(task, &emitter, &mut steps).await {
            Ok(done) => {
                if steps.len() >= self.limits.min_steps_to_record {
                    self.record(task, steps.clone(), &done.answer, done.status.is_success())
                        .await;
                } else {
                    debug!(steps = steps.len(), "Too few steps to remember");
                }
                Ok(TaskOutcome {
                    session_id: session,
                    answer: done.answer,
                    status: done.status,
                    iterations: done.iterations,
                    steps,
                })
            }
            Err(e) => {
                error!(error = %e, steps = steps.len(), "Task failed");
                emitter.emit(StepEvent::error(format!("Agent execution failed: {e}")));
                if !steps.is_empty() {
                    self.record(task, steps, &e.to_string(), false).await;
                }
                Err(e)
            }
        }
    }

    async fn drive(
        &self,
        task: &str,
        emitter: &SessionEmitter,
        steps: &mut Vec<MemoryStep>,
    ) -> Result<Completion> {
        let definitions = self.tools.definitions();

        let mut system = system_prompt(definitions);
        let recalled = self.memory.search_similar(task, self.limits.recall_limit);
        if !recalled.is_empty() {
            debug!(count = recalled.len(), "Recalled similar past tasks");
            system.push_str(&format_for_prompt(&recalled));
        }

        let mut conversation = Conversation::new(Message::system(system), self.limits.max_messages);
        conversation.push(Message::user(task));

        let mut iteration = 0;
        while iteration < self.limits.max_iterations {
            iteration += 1;
            debug!(iteration, "ReAct iteration");
            emitter.emit(StepEvent::thought(
                iteration,
                format!("Analyzing the task... (round {iteration})"),
            ));

            let reply = self
                .gateway
                .chat(conversation.messages(), definitions, emitter)
                .await?;

            // Only the first proposed call is acted on.
            if reply.tool_calls.len() > 1 {
                debug!(dropped = reply.tool_calls.len() - 1, "Ignoring extra tool calls");
            }
            let Some(call) = reply.tool_calls.into_iter().next() else {
                let answer = if reply.content.trim().is_empty() {
                    DEFAULT_ANSWER.to_string()
                } else {
                    reply.content
                };
                emitter.emit(StepEvent::final_answer(answer.clone()));
                info!(iterations = iteration, steps = steps.len(), "Task answered");
                return Ok(Completion {
                    answer,
                    status: CompletionStatus::Answered,
                    iterations: iteration,
                });
            };

            if !reply.content.trim().is_empty() {
                emitter.emit(StepEvent::thought(iteration, reply.content.clone()));
                steps.push(MemoryStep::new(StepKind::Thought, Some(iteration), reply.content.clone()));
            }

            let action = render_action(&call);
            emitter.emit(StepEvent::action(iteration, action.clone()));
            steps.push(MemoryStep::new(StepKind::Action, Some(iteration), action));

            let observation = self
                .act(&call)
                .instrument(info_span!("tool", tool = %call.name, iteration))
                .await;
            emitter.emit(StepEvent::observation(iteration, observation.clone()));
            steps.push(MemoryStep::new(StepKind::Observation, Some(iteration), observation.clone()));

            let call_id = call.id.clone();
            conversation.push(Message::assistant_tool_call(reply.content, call));
            conversation.push(Message::tool_result(call_id, observation));
        }

        let answer = format!(
            "Reached the maximum number of iterations ({}); the task may not be fully completed.",
            self.limits.max_iterations
        );
        warn!(max_iterations = self.limits.max_iterations, "Iteration limit reached");
        emitter.emit(StepEvent::final_answer(answer.clone()));
        Ok(Completion {
            answer,
            status: CompletionStatus::IterationLimitReached,
            iterations: iteration,
        })
    }

    /// Execute one tool call. Failures come back as observation text.
    async fn act(&self, call: &MessageToolCall) -> String {
        match self.tools.execute_json(&call.name, &call.arguments).await {
            Ok(output) => {
                debug!(chars = output.chars().count(), "Tool succeeded");
                output
            }
            Err(e) => {
                warn!(error = %e, "Tool failed");
                format!("Error: {e}")
            }
        }
    }

    async fn record(&self, task: &str, steps: Vec<MemoryStep>, result: &str, success: bool) {
        match self.memory.save(task, steps, result, success).await {
            Ok(record) => debug!(id = %record.id, success, "Task remembered"),
            Err(e) => warn!(error = %e, "Failed to save task memory"),
        }
    }
}

/// Render a call as `name(arg: value, ...)`. Arguments that are not a JSON
/// object are shown as given.
pub fn render_action(call: &MessageToolCall) -> String {
    let raw = call.arguments.trim();
    let args = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map
            .iter()
            .map(|(key, value)| format!("{key}: {}", render_value(value)))
            .collect::<Vec<_>>()
            .join(", "),
        Ok(other) => render_value(&other),
        Err(_) => raw.to_string(),
    };
    format!("{}({args})", call.name)
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use reagent_core::error::{Error, ProviderError};
    use reagent_core::message::Role;
    use reagent_core::tool::ToolProvider;
    use reagent_memory::InMemoryStore;
    use reagent_providers::gateway::CONTENT_REJECTED_NOTICE;
    use serde_json::json;
    use tokio::sync::mpsc::UnboundedReceiver;

    struct Harness {
        orchestrator: ReactOrchestrator,
        provider: Arc<SequentialMockProvider>,
        memory: Arc<InMemoryStore>,
        events: Arc<EventBus>,
    }

    fn harness(provider: SequentialMockProvider) -> Harness {
        harness_with(provider, AgentLimits::default(), InMemoryStore::new())
    }

    fn harness_with(provider: SequentialMockProvider, limits: AgentLimits, memory: InMemoryStore) -> Harness {
        let provider = Arc::new(provider);
        let memory = Arc::new(memory);
        let events = Arc::new(EventBus::new());
        let providers: Vec<Arc<dyn ToolProvider>> = vec![Arc::new(reagent_tools::math_tools())];
        let tools = Arc::new(ToolDispatch::new(providers, 6000).unwrap());
        let gateway = Arc::new(ModelGateway::new(provider.clone()));

        let orchestrator = ReactOrchestrator::new(gateway, tools, memory.clone(), events.clone())
            .with_limits(limits);
        Harness {
            orchestrator,
            provider,
            memory,
            events,
        }
    }

    fn drain(rx: &mut UnboundedReceiver<StepEvent>) -> Vec<StepEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn kinds(events: &[StepEvent]) -> Vec<StepKind> {
        events.iter().map(|e| e.kind).collect()
    }

    #[tokio::test]
    async fn direct_answer_finishes_in_one_round() {
        let h = harness(SequentialMockProvider::new(vec![Ok(make_text_response("Hello!"))]));
        let (_id, mut rx) = h.events.subscribe_channel(None);

        let outcome = h.orchestrator.run("say hello").await.unwrap();
        assert_eq!(outcome.answer, "Hello!");
        assert_eq!(outcome.status, CompletionStatus::Answered);
        assert_eq!(outcome.iterations, 1);
        assert!(outcome.steps.is_empty());

        let events = drain(&mut rx);
        assert_eq!(kinds(&events), vec![StepKind::Thought, StepKind::FinalAnswer]);
        assert_eq!(events[0].iteration, Some(1));
        assert!(events[0].content.contains("round 1"));
        assert_eq!(events[1].iteration, None);

        // Fewer than three steps are not remembered.
        assert!(h.memory.is_empty());
    }

    #[tokio::test]
    async fn empty_answer_uses_default_text() {
        let h = harness(SequentialMockProvider::new(vec![Ok(make_text_response("  "))]));
        assert_eq!(h.orchestrator.solve("anything").await.unwrap(), DEFAULT_ANSWER);
    }

    #[tokio::test]
    async fn tool_round_then_answer_is_remembered() {
        let h = harness(SequentialMockProvider::tool_then_answer(
            vec![make_tool_call("add", json!({"a": 12, "b": 8}))],
            "I need to add",
            "12 + 8 = 20",
        ));
        let (_id, mut rx) = h.events.subscribe_channel(None);

        let outcome = h.orchestrator.run("compute 12 + 8").await.unwrap();
        assert_eq!(outcome.answer, "12 + 8 = 20");
        assert_eq!(outcome.iterations, 2);

        let events = drain(&mut rx);
        assert_eq!(
            kinds(&events),
            vec![
                StepKind::Thought,
                StepKind::Thought,
                StepKind::Action,
                StepKind::Observation,
                StepKind::Thought,
                StepKind::FinalAnswer,
            ]
        );
        assert_eq!(events[1].content, "I need to add");
        assert_eq!(events[2].content, "add(a: 12, b: 8)");
        assert_eq!(events[3].content, "Result: 12 + 8 = 20");

        let records = h.memory.records();
        assert_eq!(records.len(), 1);
        assert!(records[0].success);
        assert_eq!(records[0].tools_used, vec!["add"]);
        assert_eq!(records[0].complexity, 3);
        assert_eq!(records[0].result, "12 + 8 = 20");
    }

    #[tokio::test]
    async fn tool_result_is_fed_back_with_its_call() {
        let h = harness(SequentialMockProvider::tool_then_answer(
            vec![make_tool_call("multiply", json!({"a": 3, "b": 4}))],
            "",
            "12",
        ));
        h.orchestrator.solve("3 times 4").await.unwrap();

        let requests = h.provider.requests();
        assert_eq!(requests.len(), 2);
        let second = &requests[1].messages;
        assert_eq!(second[0].role, Role::System);
        assert_eq!(second[1].role, Role::User);
        assert_eq!(second[2].role, Role::Assistant);
        assert_eq!(second[2].tool_calls.len(), 1);
        assert_eq!(second[3].role, Role::Tool);
        assert_eq!(second[3].tool_call_id.as_deref(), Some("call_multiply"));
        assert_eq!(second[3].content, "Result: 3 × 4 = 12");
    }

    #[tokio::test]
    async fn only_first_tool_call_is_executed() {
        let h = harness(SequentialMockProvider::tool_then_answer(
            vec![
                make_tool_call("add", json!({"a": 1, "b": 1})),
                make_tool_call("divide", json!({"a": 1, "b": 0})),
            ],
            "",
            "2",
        ));
        let outcome = h.orchestrator.run("one plus one").await.unwrap();

        let actions: Vec<&MemoryStep> = outcome.steps.iter().filter(|s| s.kind == StepKind::Action).collect();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].content, "add(a: 1, b: 1)");

        let second = &h.provider.requests()[1].messages;
        let assistant = second.iter().find(|m| m.role == Role::Assistant).unwrap();
        assert_eq!(assistant.tool_calls.len(), 1);
        assert_eq!(assistant.tool_calls[0].name, "add");
    }

    #[tokio::test]
    async fn tool_failures_become_observations() {
        let h = harness(SequentialMockProvider::new(vec![
            Ok(make_tool_call_response(vec![make_tool_call("divide", json!({"a": 1, "b": 0}))], "")),
            Ok(make_tool_call_response(vec![make_tool_call("teleport", json!({}))], "")),
            Ok(make_tool_call_response(
                vec![MessageToolCall {
                    id: "bad".into(),
                    name: "add".into(),
                    arguments: "{not json".into(),
                }],
                "",
            )),
            Ok(make_text_response("Could not divide by zero")),
        ]));

        let outcome = h.orchestrator.run("divide one by zero").await.unwrap();
        assert_eq!(outcome.status, CompletionStatus::Answered);

        let observations: Vec<&str> = outcome
            .steps
            .iter()
            .filter(|s| s.kind == StepKind::Observation)
            .map(|s| s.content.as_str())
            .collect();
        assert_eq!(observations.len(), 3);
        assert!(observations[0].contains("Division by zero"));
        assert!(observations[1].contains("Unknown tool: teleport"));
        assert!(observations[2].contains("Invalid arguments"));
        assert_eq!(outcome.steps[4].content, "add({not json)");
    }

    #[tokio::test]
    async fn iteration_limit_synthesizes_answer_and_records_failure() {
        let limits = AgentLimits {
            max_iterations: 3,
            ..AgentLimits::default()
        };
        let looping = make_tool_call_response(vec![make_tool_call("add", json!({"a": 1, "b": 2}))], "");
        let h = harness_with(SequentialMockProvider::repeating(looping), limits, InMemoryStore::new());
        let (_id, mut rx) = h.events.subscribe_channel(None);

        let outcome = h.orchestrator.run("loop forever").await.unwrap();
        assert_eq!(outcome.status, CompletionStatus::IterationLimitReached);
        assert_eq!(outcome.iterations, 3);
        assert!(outcome.answer.contains("maximum number of iterations (3)"));
        assert!(outcome.answer.contains("may not be fully completed"));
        assert_eq!(h.provider.call_count(), 3);

        let events = drain(&mut rx);
        assert_eq!(events.last().unwrap().kind, StepKind::FinalAnswer);
        assert_eq!(events.iter().filter(|e| e.kind == StepKind::FinalAnswer).count(), 1);

        let records = h.memory.records();
        assert_eq!(records.len(), 1);
        assert!(!records[0].success);
        assert_eq!(records[0].complexity, 6);
    }

    #[tokio::test]
    async fn history_stays_within_cap() {
        let limits = AgentLimits {
            max_iterations: 8,
            max_messages: 4,
            ..AgentLimits::default()
        };
        let looping = make_tool_call_response(vec![make_tool_call("add", json!({"a": 1, "b": 2}))], "");
        let h = harness_with(SequentialMockProvider::repeating(looping), limits, InMemoryStore::new());
        h.orchestrator.run("keep adding").await.unwrap();

        for request in h.provider.requests() {
            assert!(request.messages.len() <= 4);
            assert_eq!(request.messages[0].role, Role::System);
            // No tool result may lead the history without its call.
            assert_ne!(request.messages[1].role, Role::Tool);
        }
    }

    #[tokio::test]
    async fn provider_failure_emits_error_and_saves_partial_run() {
        let h = harness(SequentialMockProvider::new(vec![
            Ok(make_tool_call_response(vec![make_tool_call("add", json!({"a": 2, "b": 2}))], "")),
            Err(ProviderError::AuthenticationFailed("bad key".into())),
        ]));
        let (_id, mut rx) = h.events.subscribe_channel(None);

        let err = h.orchestrator.solve("add two and two").await.unwrap_err();
        assert!(matches!(err, Error::Provider(ProviderError::AuthenticationFailed(_))));

        let events = drain(&mut rx);
        let last = events.last().unwrap();
        assert_eq!(last.kind, StepKind::Error);
        assert!(last.content.starts_with("Agent execution failed:"));

        let records = h.memory.records();
        assert_eq!(records.len(), 1);
        assert!(!records[0].success);
        assert_eq!(records[0].complexity, 2);
        assert!(records[0].result.contains("bad key"));
    }

    #[tokio::test]
    async fn failure_before_any_step_saves_nothing() {
        let h = harness(SequentialMockProvider::new(vec![Err(ProviderError::Timeout("slow".into()))]));
        assert!(h.orchestrator.solve("anything").await.is_err());
        assert!(h.memory.is_empty());
    }

    #[tokio::test]
    async fn content_rejection_publishes_notice() {
        let h = harness(SequentialMockProvider::new(vec![Err(ProviderError::ContentRejected {
            code: "data_inspection_failed".into(),
            message: "blocked".into(),
        })]));
        let (_id, mut rx) = h.events.subscribe_channel(None);

        let err = h.orchestrator.solve("something rejected").await.unwrap_err();
        assert!(matches!(err, Error::Provider(ProviderError::ContentRejected { .. })));

        let errors: Vec<StepEvent> = drain(&mut rx).into_iter().filter(|e| e.kind == StepKind::Error).collect();
        assert_eq!(errors[0].content, CONTENT_REJECTED_NOTICE);
        assert!(errors[1].content.starts_with("Agent execution failed:"));
    }

    #[tokio::test]
    async fn events_carry_the_session_id() {
        let h = harness(SequentialMockProvider::tool_then_answer(
            vec![make_tool_call("add", json!({"a": 1, "b": 2}))],
            "",
            "3",
        ));
        let session = SessionId::from("session-under-test");
        let (_mine, mut mine) = h.events.subscribe_channel(Some(session.clone()));
        let (_other, mut other) = h.events.subscribe_channel(Some(SessionId::from("someone-else")));

        let outcome = h.orchestrator.run_in_session(session.clone(), "add").await.unwrap();
        assert_eq!(outcome.session_id, session);

        let events = drain(&mut mine);
        assert!(!events.is_empty());
        assert!(events.iter().all(|e| e.session_id.as_ref() == Some(&session)));
        assert!(drain(&mut other).is_empty());
    }

    #[tokio::test]
    async fn similar_successes_are_recalled_into_the_prompt() {
        let memory = InMemoryStore::new();
        memory
            .save(
                "compute 12 + 8",
                vec![MemoryStep::new(StepKind::Action, Some(1), "add(a: 12, b: 8)")],
                "20",
                true,
            )
            .await
            .unwrap();
        let h = harness_with(
            SequentialMockProvider::new(vec![Ok(make_text_response("30"))]),
            AgentLimits::default(),
            memory,
        );

        h.orchestrator.solve("compute 12 + 18").await.unwrap();
        let system = &h.provider.requests()[0].messages[0].content;
        assert!(system.contains("Past Successful Cases"));
        assert!(system.contains("add(a: 12, b: 8)"));
    }

    #[tokio::test]
    async fn memory_stats_pass_through() {
        let h = harness(SequentialMockProvider::tool_then_answer(
            vec![make_tool_call("add", json!({"a": 1, "b": 2}))],
            "adding",
            "3",
        ));
        h.orchestrator.solve("add one and two").await.unwrap();

        let stats = h.orchestrator.memory_stats();
        assert_eq!(stats.total_tasks, 1);
        assert_eq!(stats.most_used_tools[0].tool, "add");
    }

    #[test]
    fn render_action_formats_arguments() {
        let call = make_tool_call("writeFile", json!({"filePath": "a.txt", "content": "hi"}));
        assert_eq!(render_action(&call), "writeFile(content: hi, filePath: a.txt)");

        let empty = MessageToolCall {
            id: "1".into(),
            name: "listDirectory".into(),
            arguments: String::new(),
        };
        assert_eq!(render_action(&empty), "listDirectory()");
    }
}
