//! # Bounded operations log
//!
//! Every command invocation, result, and rejection lands here as a
//! timestamped entry. The log is a ring: once `capacity` is reached the
//! oldest entry drops. Rendered newest-at-the-bottom in the operations
//! panel.

use std::collections::VecDeque;

use chrono::{DateTime, Local};
use compact_str::CompactString;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum LogLevel {
    #[default]
    Info = 0,
    Success = 1,
    Warning = 2,
    Error = 3,
    /// De-emphasized chatter (ignored keys, skipped work).
    Dimmed = 4,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpsEntry {
    pub at: DateTime<Local>,
    pub level: LogLevel,
    pub text: CompactString,
}

#[derive(Debug, Clone)]
pub struct OpsLog {
    entries: VecDeque<OpsEntry>,
    capacity: usize,
}

impl OpsLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, level: LogLevel, text: impl Into<CompactString>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(OpsEntry {
            at: Local::now(),
            level,
            text: text.into(),
        });
    }

    pub fn info(&mut self, text: impl Into<CompactString>) {
        self.push(LogLevel::Info, text);
    }

    pub fn success(&mut self, text: impl Into<CompactString>) {
        self.push(LogLevel::Success, text);
    }

    pub fn warning(&mut self, text: impl Into<CompactString>) {
        self.push(LogLevel::Warning, text);
    }

    pub fn error(&mut self, text: impl Into<CompactString>) {
        self.push(LogLevel::Error, text);
    }

    pub fn dimmed(&mut self, text: impl Into<CompactString>) {
        self.push(LogLevel::Dimmed, text);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &OpsEntry> {
        self.entries.iter()
    }

    /// The `n` most recent entries, oldest of those first.
    pub fn tail(&self, n: usize) -> impl Iterator<Item = &OpsEntry> {
        self.entries.iter().skip(self.entries.len().saturating_sub(n))
    }
}

impl Default for OpsLog {
    fn default() -> Self {
        Self::new(100)
    }
}
