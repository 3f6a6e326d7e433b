//! Bounded, newest-first run history persisted as JSON.

use crate::run::RunReport;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Oldest entries fall off once the log holds this many runs.
pub const HISTORY_LIMIT: usize = 50;

/// One persisted run record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub date: DateTime<Utc>,
    pub repetitions: u32,
    pub avg_single_ms: Option<u64>,
    pub avg_chunk_ms: Option<u64>,
    pub avg_single_speed_bps: Option<u64>,
    pub avg_chunk_speed_bps: Option<u64>,
    pub correlation_ids: Vec<Option<String>>,
    pub chunk_size: u64,
    pub single_file_name: String,
    pub chunk_file_name: String,
    pub single_file_size: u64,
    pub chunk_file_size: u64,
}

impl From<&RunReport> for HistoryEntry {
    fn from(report: &RunReport) -> Self {
        Self {
            date: report.date,
            repetitions: report.repetitions,
            avg_single_ms: report.single.mean_elapsed.map(|d| d.as_millis() as u64),
            avg_chunk_ms: report.chunked.mean_elapsed.map(|d| d.as_millis() as u64),
            avg_single_speed_bps: report.single.mean_speed_bps.map(|s| s.round() as u64),
            avg_chunk_speed_bps: report.chunked.mean_speed_bps.map(|s| s.round() as u64),
            correlation_ids: report.correlation_ids.clone(),
            chunk_size: report.chunk_size,
            single_file_name: report.single_file.name.clone(),
            chunk_file_name: report.chunk_file.name.clone(),
            single_file_size: report.single_file.size,
            chunk_file_size: report.chunk_file.size,
        }
    }
}

/// File-backed store. A missing or unreadable file is an empty history, not
/// an error; the benchmark must never die over its own bookkeeping.
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn default_location() -> Option<Self> {
        ProjectDirs::from("", "", "upbench")
            .map(|dirs| Self::new(dirs.data_dir().join("history.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Vec<HistoryEntry> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                tracing::warn!(path = %self.path.display(), error = %err, "history file unreadable, starting empty");
                Vec::new()
            }),
            Err(_) => Vec::new(),
        }
    }

    /// Prepend `entry` and drop anything beyond [`HISTORY_LIMIT`].
    pub fn record(&self, entry: HistoryEntry) -> Result<()> {
        let mut entries = self.load();
        entries.insert(0, entry);
        entries.truncate(HISTORY_LIMIT);
        self.save(&entries)
    }

    pub fn clear(&self) -> Result<()> {
        self.save(&[])
    }

    fn save(&self, entries: &[HistoryEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
        let raw = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, raw)
            .with_context(|| format!("cannot write {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(repetitions: u32) -> HistoryEntry {
        HistoryEntry {
            date: Utc::now(),
            repetitions,
            avg_single_ms: Some(120),
            avg_chunk_ms: Some(80),
            avg_single_speed_bps: Some(1_000_000),
            avg_chunk_speed_bps: Some(1_500_000),
            correlation_ids: vec![None],
            chunk_size: 10 * 1024 * 1024,
            single_file_name: "a.bin".to_string(),
            chunk_file_name: "b.bin".to_string(),
            single_file_size: 1024,
            chunk_file_size: 2048,
        }
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn newest_entry_comes_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));

        store.record(entry(1)).unwrap();
        store.record(entry(2)).unwrap();

        let entries = store.load();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].repetitions, 2);
        assert_eq!(entries[1].repetitions, 1);
    }

    #[test]
    fn history_is_capped_at_limit() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));

        for i in 0..(HISTORY_LIMIT as u32 + 5) {
            store.record(entry(i)).unwrap();
        }

        let entries = store.load();
        assert_eq!(entries.len(), HISTORY_LIMIT);
        // Newest kept, oldest dropped
        assert_eq!(entries[0].repetitions, HISTORY_LIMIT as u32 + 4);
        assert_eq!(entries.last().unwrap().repetitions, 5);
    }

    #[test]
    fn clear_empties_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));

        store.record(entry(1)).unwrap();
        store.clear().unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "not json at all").unwrap();

        let store = HistoryStore::new(path);
        assert!(store.load().is_empty());
    }
}
