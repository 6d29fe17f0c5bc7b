//! # reagent core
//!
//! Domain types, traits, and error definitions for the reagent ReAct runtime.
//! This crate carries no I/O of its own: it defines the model that the
//! provider, memory, tool and agent crates implement against.
//!
//! ## Layout
//!
//! - [`event`]: step events and the synchronous event bus
//! - [`message`]: conversation messages and history capping
//! - [`provider`]: chat-completion provider trait and wire-neutral types
//! - [`tool`]: tool providers, tool dispatch, response truncation
//! - [`memory`]: episodic memory records and the store trait
//! - [`agent`]: loop limits shared by config and orchestrator

pub mod agent;
pub mod error;
pub mod event;
pub mod memory;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use agent::{AgentLimits, CompletionStatus};
pub use error::{Error, MemoryError, ProviderError, Result, ToolError};
pub use event::{EventBus, SessionEmitter, SessionId, StepEvent, StepKind, StepListener, SubscriptionId};
pub use memory::{EpisodicMemory, MemoryRecord, MemoryStats, MemoryStep, ToolUsage};
pub use message::{Conversation, Message, MessageToolCall, Role};
pub use provider::{ChatReply, Provider, ProviderRequest, ProviderResponse, ToolChoice, ToolDefinition, Usage};
pub use tool::{Tool, ToolDispatch, ToolProvider, ToolSet, limit_response};
