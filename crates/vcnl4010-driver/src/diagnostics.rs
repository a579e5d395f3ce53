//! Per-device diagnostic log
//!
//! Failures that are reported to a caller (attribute reads/writes) or
//! swallowed by policy (default register programming, release steps during
//! teardown) leave an entry here. Every entry is also emitted via `tracing`.
//! The log holds a bounded number of entries; once full, the oldest entry is
//! evicted for each new one.

use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

/// Entries kept by [`Diagnostics::new`]
pub const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Component that produced the entry ("attributes", "lifecycle", ...)
    pub source: &'static str,
    pub message: String,
}

/// Bounded diagnostic log, cheap to clone and share
#[derive(Debug, Clone)]
pub struct Diagnostics {
    entries: Arc<RwLock<VecDeque<Diagnostic>>>,
    capacity: usize,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log keeping at most `capacity` entries (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn record(&self, severity: Severity, source: &'static str, message: impl Into<String>) {
        let message = message.into();
        match severity {
            Severity::Info => tracing::info!(source = source, "{}", message),
            Severity::Warning => tracing::warn!(source = source, "{}", message),
            Severity::Error => tracing::error!(source = source, "{}", message),
        }

        if let Ok(mut entries) = self.entries.write() {
            if entries.len() == self.capacity {
                entries.pop_front();
            }
            entries.push_back(Diagnostic {
                severity,
                source,
                message,
            });
        }
    }

    pub fn warn(&self, source: &'static str, message: impl Into<String>) {
        self.record(Severity::Warning, source, message);
    }

    pub fn error(&self, source: &'static str, message: impl Into<String>) {
        self.record(Severity::Error, source, message);
    }

    /// Snapshot of retained entries in recording order
    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries
            .read()
            .map(|e| e.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Remove and return every retained entry
    pub fn drain(&self) -> Vec<Diagnostic> {
        self.entries
            .write()
            .map(|mut e| std::mem::take(&mut *e).into())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether any entry's message contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.entries
            .read()
            .map(|e| e.iter().any(|d| d.message.contains(needle)))
            .unwrap_or(false)
    }
}
