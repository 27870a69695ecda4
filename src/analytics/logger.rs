//! Structured JSONL fetch log.
//!
//! One line per fetch attempt, success or failure, appended best-effort:
//! a logging problem must never fail the fetch that produced the entry.
//! Read-back silently skips malformed lines.

use std::fs::{self, OpenOptions, create_dir_all};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::{self, TransitoConfig};

// ---------------------------------------------------------------------------
// Fetch log entry
// ---------------------------------------------------------------------------

/// A single entry in the fetch log (`~/.transito/fetch-log.jsonl`).
///
/// Records one complete fetch attempt against a layer: how many page
/// requests it took, how many records came back, how long it ran, and how
/// it ended. `transito health` reads these back to report the last known
/// state per layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchLogEntry {
    pub timestamp: String,
    pub layer: String,
    pub endpoint: String,
    pub pages: u32,
    pub records: usize,
    pub duration_ms: u64,
    #[serde(default = "default_true")]
    pub success: bool,
    /// Error tag and message for failed fetches.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

fn default_true() -> bool {
    true
}

impl FetchLogEntry {
    /// Entry for a completed fetch.
    pub fn success(
        layer: &str,
        endpoint: &str,
        pages: u32,
        records: usize,
        duration_ms: u64,
    ) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            layer: layer.to_string(),
            endpoint: endpoint.to_string(),
            pages,
            records,
            duration_ms,
            success: true,
            error: None,
        }
    }

    /// Entry for a failed fetch. No page/record counts: the fetch contract
    /// discards partial results, so there is nothing truthful to report.
    pub fn failure(layer: &str, endpoint: &str, duration_ms: u64, error: String) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            layer: layer.to_string(),
            endpoint: endpoint.to_string(),
            pages: 0,
            records: 0,
            duration_ms,
            success: false,
            error: Some(error),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging functions
// ---------------------------------------------------------------------------

/// Append a fetch entry according to the logging config. Disabled logging
/// and I/O failures are both silent no-ops.
pub fn log_fetch(config: &TransitoConfig, entry: &FetchLogEntry) {
    if !config.logging.enabled {
        return;
    }
    let Some(path) = fetch_log_path(config) else {
        return;
    };
    let _ = append_entry(&path, entry);
}

/// Resolve the configured log path, expanding a leading `~`.
pub fn fetch_log_path(config: &TransitoConfig) -> Option<PathBuf> {
    config::expand_tilde(&config.logging.path)
}

/// Append one entry to the log file at `path`, creating parent directories
/// as needed.
pub fn append_entry(path: &Path, entry: &FetchLogEntry) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let json = serde_json::to_string(entry)?;
    writeln!(file, "{json}")?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Reading log entries
// ---------------------------------------------------------------------------

/// Read all entries from the log file at `path`.
///
/// Silently skips malformed lines. Returns an empty vec if the file does
/// not exist or cannot be read.
pub fn read_entries(path: &Path) -> Vec<FetchLogEntry> {
    let Ok(file) = fs::File::open(path) else {
        return Vec::new();
    };

    let reader = BufReader::new(file);
    reader
        .lines()
        .map_while(Result::ok)
        .filter_map(|line| serde_json::from_str::<FetchLogEntry>(&line).ok())
        .collect()
}

/// Read entries filtered to a time window (last N days).
///
/// If `days` is `None`, returns all entries.
pub fn read_entries_since_days(path: &Path, days: Option<u32>) -> Vec<FetchLogEntry> {
    let entries = read_entries(path);

    let Some(days) = days else {
        return entries;
    };

    let cutoff = Utc::now() - chrono::Duration::days(i64::from(days));
    let cutoff_str = cutoff.to_rfc3339();

    entries
        .into_iter()
        .filter(|e| e.timestamp >= cutoff_str)
        .collect()
}

/// The most recent entry for a layer, if any. Entries are appended in time
/// order, so the last match wins.
pub fn last_entry_for_layer<'a>(
    entries: &'a [FetchLogEntry],
    layer: &str,
) -> Option<&'a FetchLogEntry> {
    entries.iter().rev().find(|e| e.layer == layer)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_log(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("transito-logger-{name}-{}.jsonl", std::process::id()))
    }

    #[test]
    fn append_then_read_round_trips() {
        let path = temp_log("roundtrip");
        let _ = fs::remove_file(&path);

        let entry = FetchLogEntry::success(
            "alerts",
            "https://example.org/FeatureServer/0",
            3,
            4120,
            871,
        );
        append_entry(&path, &entry).unwrap();

        let read = read_entries(&path);
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].layer, "alerts");
        assert_eq!(read[0].pages, 3);
        assert_eq!(read[0].records, 4120);
        assert!(read[0].success);
        assert!(read[0].error.is_none());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let path = temp_log("malformed");
        let _ = fs::remove_file(&path);

        let entry = FetchLogEntry::failure(
            "congestion",
            "https://example.org/FeatureServer/0",
            42,
            "authentication: token endpoint returned HTTP 500".to_string(),
        );
        append_entry(&path, &entry).unwrap();
        fs::write(
            &path,
            format!(
                "{}\nnot json at all\n{{\"half\": ",
                fs::read_to_string(&path).unwrap().trim_end()
            ),
        )
        .unwrap();

        let read = read_entries(&path);
        assert_eq!(read.len(), 1);
        assert!(!read[0].success);
        assert!(read[0].error.as_deref().unwrap().contains("HTTP 500"));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_file_reads_empty() {
        let path = temp_log("missing");
        let _ = fs::remove_file(&path);
        assert!(read_entries(&path).is_empty());
    }

    #[test]
    fn last_entry_per_layer_picks_newest() {
        let mut older = FetchLogEntry::success("alerts", "e", 1, 10, 5);
        older.timestamp = "2026-08-01T00:00:00+00:00".to_string();
        let mut newer = FetchLogEntry::success("alerts", "e", 2, 20, 5);
        newer.timestamp = "2026-08-02T00:00:00+00:00".to_string();
        let congestion = FetchLogEntry::success("congestion", "e", 1, 3, 5);

        let entries = vec![older, congestion, newer];
        let last = last_entry_for_layer(&entries, "alerts").unwrap();
        assert_eq!(last.records, 20);
        assert!(last_entry_for_layer(&entries, "potholes").is_none());
    }

    #[test]
    fn disabled_logging_writes_nothing() {
        let path = temp_log("disabled");
        let _ = fs::remove_file(&path);

        let mut config = TransitoConfig::default();
        config.logging.enabled = false;
        config.logging.path = path.to_string_lossy().to_string();

        log_fetch(
            &config,
            &FetchLogEntry::success("alerts", "e", 1, 1, 1),
        );
        assert!(!path.exists());
    }
}
