//! Step events and the synchronous event bus.
//!
//! Every observable moment of a task run (a thought, an action, an
//! observation, the final answer, an error) is published as a
//! [`StepEvent`]. Publishing is synchronous: listeners run on the
//! publisher's thread, in registration order, before `publish` returns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

/// What a step event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Thought,
    Action,
    Observation,
    FinalAnswer,
    Error,
}

impl StepKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Thought => "thought",
            Self::Action => "action",
            Self::Observation => "observation",
            Self::FinalAnswer => "final_answer",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one task run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One published step. Created, emitted, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepEvent {
    #[serde(rename = "type")]
    pub kind: StepKind,

    /// 1-based loop round; absent for final answers and errors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration: Option<u32>,

    pub content: String,

    pub timestamp: DateTime<Utc>,

    /// The run that produced this event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
}

impl StepEvent {
    fn new(kind: StepKind, iteration: Option<u32>, content: impl Into<String>) -> Self {
        Self {
            kind,
            iteration,
            content: content.into(),
            timestamp: Utc::now(),
            session_id: None,
        }
    }

    pub fn thought(iteration: u32, content: impl Into<String>) -> Self {
        Self::new(StepKind::Thought, Some(iteration), content)
    }

    pub fn action(iteration: u32, content: impl Into<String>) -> Self {
        Self::new(StepKind::Action, Some(iteration), content)
    }

    pub fn observation(iteration: u32, content: impl Into<String>) -> Self {
        Self::new(StepKind::Observation, Some(iteration), content)
    }

    pub fn final_answer(content: impl Into<String>) -> Self {
        Self::new(StepKind::FinalAnswer, None, content)
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::new(StepKind::Error, None, content)
    }

    pub fn with_session(mut self, session: SessionId) -> Self {
        self.session_id = Some(session);
        self
    }

    /// Whether this event ends a run.
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, StepKind::FinalAnswer | StepKind::Error)
    }
}

/// Error a listener may report back to the bus. It is logged, nothing more.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// Receives published events.
///
/// Plain closures `Fn(&StepEvent)` are listeners too.
pub trait StepListener: Send + Sync {
    fn on_event(&self, event: &StepEvent) -> std::result::Result<(), ListenerError>;
}

impl<F> StepListener for F
where
    F: Fn(&StepEvent) + Send + Sync,
{
    fn on_event(&self, event: &StepEvent) -> std::result::Result<(), ListenerError> {
        self(event);
        Ok(())
    }
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    session: Option<SessionId>,
    listener: Arc<dyn StepListener>,
}

impl Subscription {
    fn accepts(&self, event: &StepEvent) -> bool {
        match &self.session {
            None => true,
            Some(session) => event.session_id.as_ref() == Some(session),
        }
    }
}

/// Synchronous fan-out of step events.
///
/// A failing or panicking listener is logged and skipped; it never stops
/// delivery to the others and never reaches the publisher.
pub struct EventBus {
    subscriptions: RwLock<Vec<Subscription>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Receive every event.
    pub fn subscribe(&self, listener: impl StepListener + 'static) -> SubscriptionId {
        self.add(None, Arc::new(listener))
    }

    /// Receive only events stamped with `session`.
    pub fn subscribe_session(&self, session: SessionId, listener: impl StepListener + 'static) -> SubscriptionId {
        self.add(Some(session), Arc::new(listener))
    }

    /// Bridge events into an async channel. `session` filters as in
    /// [`EventBus::subscribe_session`]; `None` receives everything.
    pub fn subscribe_channel(
        &self,
        session: Option<SessionId>,
    ) -> (SubscriptionId, mpsc::UnboundedReceiver<StepEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let listener = move |event: &StepEvent| {
            // Receiver gone means nobody is relaying any more.
            let _ = tx.send(event.clone());
        };
        (self.add(session, Arc::new(listener)), rx)
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.subscriptions.write().unwrap_or_else(PoisonError::into_inner);
        let before = subs.len();
        subs.retain(|s| s.id != id);
        subs.len() != before
    }

    pub fn clear(&self) {
        self.subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn listener_count(&self) -> usize {
        self.subscriptions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Deliver `event` to every matching listener, in registration order.
    pub fn publish(&self, event: &StepEvent) {
        // Snapshot so listeners may subscribe or unsubscribe re-entrantly.
        let targets: Vec<(SubscriptionId, Arc<dyn StepListener>)> = self
            .subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|s| s.accepts(event))
            .map(|s| (s.id, Arc::clone(&s.listener)))
            .collect();

        for (id, listener) in targets {
            match catch_unwind(AssertUnwindSafe(|| listener.on_event(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(subscription = id.0, kind = %event.kind, error = %e, "Step listener failed");
                }
                Err(_) => {
                    warn!(subscription = id.0, kind = %event.kind, "Step listener panicked");
                }
            }
        }
    }

    fn add(&self, session: Option<SessionId>, listener: Arc<dyn StepListener>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscription { id, session, listener });
        id
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Publishes on a shared bus with one session stamped on every event.
#[derive(Clone)]
pub struct SessionEmitter {
    bus: Arc<EventBus>,
    session: SessionId,
}

impl SessionEmitter {
    pub fn new(bus: Arc<EventBus>, session: SessionId) -> Self {
        Self { bus, session }
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    pub fn emit(&self, event: StepEvent) {
        self.bus.publish(&event.with_session(self.session.clone()));
    }
}
