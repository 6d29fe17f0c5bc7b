//! Episodic memory: a capped log of past task runs.
//!
//! Each finished run that did enough work is kept as a [`MemoryRecord`]:
//! the task, its steps, the result and the tools it used. Later runs look
//! up similar successful records and show them to the model as worked
//! examples.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::error::MemoryError;
use crate::event::StepKind;

/// One recorded step of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryStep {
    #[serde(rename = "type")]
    pub kind: StepKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration: Option<u32>,

    pub content: String,
}

impl MemoryStep {
    pub fn new(kind: StepKind, iteration: Option<u32>, content: impl Into<String>) -> Self {
        Self {
            kind,
            iteration,
            content: content.into(),
        }
    }
}

/// A finished run. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryRecord {
    pub id: String,

    pub timestamp: DateTime<Utc>,

    pub task: String,

    pub steps: Vec<MemoryStep>,

    pub result: String,

    pub success: bool,

    /// Distinct tool names, in order of first use
    #[serde(default)]
    pub tools_used: Vec<String>,

    /// Number of recorded steps
    #[serde(default)]
    pub complexity: usize,
}

impl MemoryRecord {
    pub fn new(
        task: impl Into<String>,
        steps: Vec<MemoryStep>,
        result: impl Into<String>,
        success: bool,
    ) -> Self {
        let tools_used = extract_tools_used(&steps);
        let complexity = steps.len();
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            task: task.into(),
            steps,
            result: result.into(),
            success,
            tools_used,
            complexity,
        }
    }
}

/// Tool names from action steps rendered as `name(...)`.
pub fn extract_tools_used(steps: &[MemoryStep]) -> Vec<String> {
    let mut tools: Vec<String> = Vec::new();
    for step in steps.iter().filter(|s| s.kind == StepKind::Action) {
        let name: String = step
            .content
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        let opens_call = step.content[name.len()..].starts_with('(');
        if !name.is_empty() && opens_call && !tools.contains(&name) {
            tools.push(name);
        }
    }
    tools
}

/// How often a tool shows up across records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolUsage {
    pub tool: String,
    pub count: usize,
}

/// Aggregate counters over the whole store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    pub total_tasks: usize,
    pub success_tasks: usize,
    /// Percent, one decimal place
    pub success_rate: f64,
    /// Mean step count, one decimal place
    pub avg_steps: f64,
    /// At most five, most used first
    pub most_used_tools: Vec<ToolUsage>,
}

/// Store contract shared by the file-backed and in-memory stores.
///
/// Reads are synchronous snapshots; writes suspend on persistence.
#[async_trait]
pub trait EpisodicMemory: Send + Sync {
    /// The store name (e.g., "file", "memory").
    fn name(&self) -> &str;

    /// Load persisted records. A missing or unreadable document yields an
    /// empty store, never an error.
    async fn initialize(&self) -> std::result::Result<(), MemoryError>;

    /// Record a finished run as the newest entry.
    async fn save(
        &self,
        task: &str,
        steps: Vec<MemoryStep>,
        result: &str,
        success: bool,
    ) -> std::result::Result<MemoryRecord, MemoryError>;

    /// Successful records whose task resembles `task`, best match first.
    fn search_similar(&self, task: &str, limit: usize) -> Vec<MemoryRecord>;

    /// Successful records with at least `min_steps` steps, newest first.
    fn complex_tasks(&self, min_steps: usize, limit: usize) -> Vec<MemoryRecord>;

    fn stats(&self) -> MemoryStats;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
