//! # Logger Service
//!
//! This crate implements structured logging for drivers.
//!
//! ## Philosophy
//!
//! Logging is explicit and structured, not text-based or printf-style.
//! A driver is handed a [`KernelLog`] at init and records [`LogEntry`]
//! values into it; the host decides what to do with them.

use core_types::SessionId;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    /// Debug information
    Debug,
    /// Informational messages
    Info,
    /// Warnings
    Warn,
    /// Errors
    Error,
}

/// A structured log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Log level
    pub level: LogLevel,
    /// Subsystem that emitted the entry (e.g. the device name)
    pub subsystem: String,
    /// Session the entry is about (if any)
    pub source: Option<SessionId>,
    /// Log message
    pub message: String,
    /// Structured fields
    pub fields: Vec<(String, String)>,
}

impl LogEntry {
    /// Creates a new log entry
    pub fn new(level: LogLevel, subsystem: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            subsystem: subsystem.into(),
            source: None,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Sets the source session
    pub fn with_source(mut self, source: SessionId) -> Self {
        self.source = Some(source);
        self
    }

    /// Adds a field to the log entry
    pub fn with_field(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.fields.push((key.into(), value.to_string()));
        self
    }

    /// Looks up a field by key
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Append-only, shareable log sink
///
/// Clones share the same underlying entries.
#[derive(Debug, Clone, Default)]
pub struct KernelLog {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl KernelLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry
    pub fn record(&self, entry: LogEntry) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    /// Snapshot of every entry recorded so far, oldest first
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Entries at or above `level`
    pub fn filter_level(&self, level: LogLevel) -> Vec<LogEntry> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.level >= level)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
    }

    #[test]
    fn test_log_entry_creation() {
        let entry = LogEntry::new(LogLevel::Info, "scull", "test message");
        assert_eq!(entry.level, LogLevel::Info);
        assert_eq!(entry.subsystem, "scull");
        assert_eq!(entry.message, "test message");
        assert!(entry.source.is_none());
        assert!(entry.fields.is_empty());
    }

    #[test]
    fn test_log_entry_with_source() {
        let session = SessionId::new();
        let entry = LogEntry::new(LogLevel::Info, "scull", "test").with_source(session);
        assert_eq!(entry.source, Some(session));
    }

    #[test]
    fn test_log_entry_with_fields() {
        let entry = LogEntry::new(LogLevel::Info, "scull", "test")
            .with_field("bytes", 10)
            .with_field("position", 20);

        assert_eq!(entry.fields.len(), 2);
        assert_eq!(entry.field("bytes"), Some("10"));
        assert_eq!(entry.field("position"), Some("20"));
        assert_eq!(entry.field("missing"), None);
    }

    #[test]
    fn test_kernel_log_clones_share_entries() {
        let log = KernelLog::new();
        let other = log.clone();
        other.record(LogEntry::new(LogLevel::Warn, "scull", "one"));
        log.record(LogEntry::new(LogLevel::Info, "scull", "two"));

        assert_eq!(log.len(), 2);
        let messages: Vec<_> = log.entries().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["one", "two"]);
    }

    #[test]
    fn test_kernel_log_filter_level() {
        let log = KernelLog::new();
        assert!(log.is_empty());
        log.record(LogEntry::new(LogLevel::Debug, "scull", "noise"));
        log.record(LogEntry::new(LogLevel::Warn, "scull", "fault"));
        log.record(LogEntry::new(LogLevel::Error, "scull", "fatal"));

        let important = log.filter_level(LogLevel::Warn);
        assert_eq!(important.len(), 2);
        assert_eq!(important[0].message, "fault");
    }

    #[test]
    fn test_log_entry_serializes() {
        let entry = LogEntry::new(LogLevel::Info, "scull", "opened").with_field("major", 254);
        let json = serde_json::to_string(&entry).unwrap();
        let back: LogEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
