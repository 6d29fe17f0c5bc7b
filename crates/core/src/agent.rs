//! Loop limits and completion status shared by config and orchestrator.

use serde::{Deserialize, Serialize};

/// Bounds applied to a single task run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentLimits {
    /// Maximum reason/act rounds per task
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Conversation cap, system message included
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,

    /// How many past successes to recall into the system prompt
    #[serde(default = "default_recall_limit")]
    pub recall_limit: usize,

    /// Runs with fewer recorded steps are not persisted
    #[serde(default = "default_min_steps")]
    pub min_steps_to_record: usize,
}

fn default_max_iterations() -> u32 {
    15
}
fn default_max_messages() -> usize {
    10
}
fn default_recall_limit() -> usize {
    2
}
fn default_min_steps() -> usize {
    3
}

impl Default for AgentLimits {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_messages: default_max_messages(),
            recall_limit: default_recall_limit(),
            min_steps_to_record: default_min_steps(),
        }
    }
}

/// How a run reached its final answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    /// The model answered without requesting a tool
    Answered,
    /// The loop ran out of rounds and the answer was synthesized
    IterationLimitReached,
}

impl CompletionStatus {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Answered)
    }
}
