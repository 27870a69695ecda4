//! Fetch analytics: the JSONL log and its read-back helpers.

pub mod logger;

pub use logger::{FetchLogEntry, fetch_log_path, log_fetch};
