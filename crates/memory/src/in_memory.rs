//! In-memory store, useful for tests and ephemeral sessions.

use async_trait::async_trait;
use reagent_core::error::MemoryError;
use reagent_core::memory::{EpisodicMemory, MemoryRecord, MemoryStats, MemoryStep};
use std::sync::{PoisonError, RwLock};
use crate::log::EpisodeLog;

/// An episodic store that never touches disk.
#[derive(Default)]
pub struct InMemoryStore {
    log: RwLock<EpisodeLog>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(capacity: usize, threshold: f32) -> Self {
        Self {
            log: RwLock::new(EpisodeLog::new(capacity, threshold)),
        }
    }

    /// Snapshot of all records, newest first.
    pub fn records(&self) -> Vec<MemoryRecord> {
        self.log
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .records()
            .to_vec()
    }

    fn with_log<T>(&self, f: impl FnOnce(&EpisodeLog) -> T) -> T {
        f(&self.log.read().unwrap_or_else(PoisonError::into_inner))
    }
}

#[async_trait]
impl EpisodicMemory for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn initialize(&self) -> Result<(), MemoryError> {
        Ok(())
    }

    async fn save(
        &self,
        task: &str,
        steps: Vec<MemoryStep>,
        result: &str,
        success: bool,
    ) -> Result<MemoryRecord, MemoryError> {
        let record = MemoryRecord::new(task, steps, result, success);
        self.log
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push_front(record.clone());
        Ok(record)
    }

    fn search_similar(&self, task: &str, limit: usize) -> Vec<MemoryRecord> {
        self.with_log(|log| log.search_similar(task, limit))
    }

    fn complex_tasks(&self, min_steps: usize, limit: usize) -> Vec<MemoryRecord> {
        self.with_log(|log| log.complex_tasks(min_steps, limit))
    }

    fn stats(&self) -> MemoryStats {
        self.with_log(EpisodeLog::stats)
    }

    fn len(&self) -> usize {
        self.with_log(EpisodeLog::len)
    }
}
