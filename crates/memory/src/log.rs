//! The capped, newest-first record log both stores are built on.

use reagent_core::memory::{MemoryRecord, MemoryStats, ToolUsage};
use crate::similarity::{jaccard_similarity, token_set};

pub const DEFAULT_CAPACITY: usize = 100;
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.3;
const TOP_TOOLS: usize = 5;

/// Records ordered newest first, never longer than `capacity`.
#[derive(Debug, Clone)]
pub struct EpisodeLog {
    records: Vec<MemoryRecord>,
    capacity: usize,
    threshold: f32,
}

impl EpisodeLog {
    pub fn new(capacity: usize, threshold: f32) -> Self {
        Self {
            records: Vec::new(),
            capacity: capacity.max(1),
            threshold,
        }
    }

    /// Replace the contents, keeping at most `capacity` of the given
    /// records (which are expected newest first).
    pub fn replace(&mut self, mut records: Vec<MemoryRecord>) {
        records.truncate(self.capacity);
        self.records = records;
    }

    /// Insert as newest, evicting the oldest beyond capacity.
    pub fn push_front(&mut self, record: MemoryRecord) {
        self.records.insert(0, record);
        self.records.truncate(self.capacity);
    }

    pub fn records(&self) -> &[MemoryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Successful records scoring strictly above the threshold, best first.
    /// Equal scores keep newest-first order.
    pub fn search_similar(&self, task: &str, limit: usize) -> Vec<MemoryRecord> {
        if task.trim().is_empty() || limit == 0 {
            return Vec::new();
        }
        let query = token_set(task);

        let mut scored: Vec<(f32, &MemoryRecord)> = self
            .records
            .iter()
            .filter(|r| r.success)
            .map(|r| (jaccard_similarity(&query, &token_set(&r.task)), r))
            .filter(|(score, _)| *score > self.threshold)
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.into_iter().take(limit).map(|(_, r)| r.clone()).collect()
    }

    /// Successful records with at least `min_steps` steps, newest first.
    pub fn complex_tasks(&self, min_steps: usize, limit: usize) -> Vec<MemoryRecord> {
        self.records
            .iter()
            .filter(|r| r.success && r.complexity >= min_steps)
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn stats(&self) -> MemoryStats {
        let total_tasks = self.records.len();
        let success_tasks = self.records.iter().filter(|r| r.success).count();
        let total_steps: usize = self.records.iter().map(|r| r.complexity).sum();

        let success_rate = if total_tasks > 0 {
            round1(success_tasks as f64 / total_tasks as f64 * 100.0)
        } else {
            0.0
        };
        let avg_steps = round1(total_steps as f64 / total_tasks.max(1) as f64);

        // First-seen order, so the stable sort breaks ties by first use.
        let mut usage: Vec<ToolUsage> = Vec::new();
        for tool in self.records.iter().flat_map(|r| r.tools_used.iter()) {
            match usage.iter_mut().find(|u| &u.tool == tool) {
                Some(entry) => entry.count += 1,
                None => usage.push(ToolUsage {
                    tool: tool.clone(),
                    count: 1,
                }),
            }
        }
        usage.sort_by(|a, b| b.count.cmp(&a.count));
        usage.truncate(TOP_TOOLS);

        MemoryStats {
            total_tasks,
            success_tasks,
            success_rate,
            avg_steps,
            most_used_tools: usage,
        }
    }
}

impl Default for EpisodeLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_SIMILARITY_THRESHOLD)
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
