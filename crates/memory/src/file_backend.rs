//! File-backed episodic store: one pretty-printed JSON array.
//!
//! Storage location: `~/.reagent/data/task-memory.json` by default.
//!
//! The whole document is rewritten on every save. Saves are serialized
//! through a single write gate and each rewrite lands in a `.tmp` sibling
//! first, then is renamed over the document.

use async_trait::async_trait;
use reagent_core::error::MemoryError;
use reagent_core::memory::{EpisodicMemory, MemoryRecord, MemoryStats, MemoryStep};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use crate::log::EpisodeLog;

/// A JSON-document episodic memory store.
///
/// Records are held in memory for synchronous search and stats; every
/// save flushes the full log to disk.
pub struct FileStore {
    path: PathBuf,
    log: RwLock<EpisodeLog>,
    write_gate: Mutex<()>,
}

impl FileStore {
    /// Create a store at `path`. Nothing is read until [`EpisodicMemory::initialize`].
    pub fn new(path: PathBuf) -> Self {
        Self::with_log(path, EpisodeLog::default())
    }

    /// Create a store with a custom capacity and similarity threshold.
    pub fn with_limits(path: PathBuf, capacity: usize, threshold: f32) -> Self {
        Self::with_log(path, EpisodeLog::new(capacity, threshold))
    }

    fn with_log(path: PathBuf, log: EpisodeLog) -> Self {
        Self {
            path,
            log: RwLock::new(log),
            write_gate: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of all records, newest first.
    pub fn records(&self) -> Vec<MemoryRecord> {
        self.read_log().records().to_vec()
    }

    fn read_log(&self) -> std::sync::RwLockReadGuard<'_, EpisodeLog> {
        self.log.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_log(&self) -> std::sync::RwLockWriteGuard<'_, EpisodeLog> {
        self.log.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Parse the document. Anything unusable yields an empty list;
    /// individual malformed records are skipped.
    async fn load_from_disk(path: &Path) -> Vec<MemoryRecord> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "No memory document, starting empty");
                return Vec::new();
            }
        };

        let raw: Vec<serde_json::Value> = match serde_json::from_str(&content) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Memory document is malformed, starting empty");
                return Vec::new();
            }
        };

        raw.into_iter()
            .filter_map(|value| match serde_json::from_value::<MemoryRecord>(value) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(error = %e, "Skipping corrupted memory record");
                    None
                }
            })
            .collect()
    }

    /// Write `records` to a temporary sibling, then rename it into place.
    async fn persist(&self, records: &[MemoryRecord]) -> Result<(), MemoryError> {
        let json = serde_json::to_string_pretty(records).map_err(|e| {
            error!(error = %e, "Failed to serialize memory records");
            MemoryError::Serialization(format!("Failed to serialize memory records: {e}"))
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                MemoryError::Storage(format!("Failed to create memory directory: {e}"))
            })?;
        }

        let tmp_path = self.path.with_extension("json.tmp");

        tokio::fs::write(&tmp_path, json).await.map_err(|e| {
            error!(path = %tmp_path.display(), error = %e, "Failed to write memory document");
            MemoryError::Storage(format!("Failed to write {}: {e}", tmp_path.display()))
        })?;

        tokio::fs::rename(&tmp_path, &self.path).await.map_err(|e| {
            error!(
                from = %tmp_path.display(),
                to = %self.path.display(),
                error = %e,
                "Failed to move memory document into place"
            );
            MemoryError::Storage(format!("Failed to replace {}: {e}", self.path.display()))
        })?;

        Ok(())
    }
}

#[async_trait]
impl EpisodicMemory for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn initialize(&self) -> Result<(), MemoryError> {
        let _gate = self.write_gate.lock().await;
        let records = Self::load_from_disk(&self.path).await;
        let mut log = self.write_log();
        log.replace(records);
        info!(path = %self.path.display(), count = log.len(), "Episodic memory loaded");
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

        // Held across mutate and persist so documents hit disk in save order.
        let _gate = self.write_gate.lock().await;
        let snapshot = {
            let mut log = self.write_log();
            log.push_front(record.clone());
            log.records().to_vec()
        };
        self.persist(&snapshot).await?;

        debug!(
            id = %record.id,
            success,
            steps = record.complexity,
            total = snapshot.len(),
            "Task memory saved"
        );
        Ok(record)
    }

    fn search_similar(&self, task: &str, limit: usize) -> Vec<MemoryRecord> {
        self.read_log().search_similar(task, limit)
    }

    fn complex_tasks(&self, min_steps: usize, limit: usize) -> Vec<MemoryRecord> {
        self.read_log().complex_tasks(min_steps, limit)
    }

    fn stats(&self) -> MemoryStats {
        self.read_log().stats()
    }

    fn len(&self) -> usize {
        self.read_log().len()
    }
}
