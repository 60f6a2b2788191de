//! Combat log shown alongside the encounter.
use std::collections::VecDeque;

/// Severity level for messages produced by the engine.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MessageLevel {
    Info,
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEntry {
    pub text: String,
    /// Round of the snapshot current when the message was logged.
    pub round: Option<u32>,
    pub level: MessageLevel,
    /// Times the same line was logged back to back within the round.
    pub repeats: u32,
}

impl MessageEntry {
    pub fn new(text: impl Into<String>, round: Option<u32>, level: MessageLevel) -> Self {
        Self {
            text: text.into(),
            round,
            level,
            repeats: 1,
        }
    }

    fn same_line(&self, other: &MessageEntry) -> bool {
        self.text == other.text && self.round == other.round && self.level == other.level
    }
}

/// Bounded combat log. The oldest line is evicted at capacity and an
/// identical line logged twice in a row within one round is folded into the
/// previous entry.
#[derive(Clone, Debug)]
pub struct MessageLog {
    entries: VecDeque<MessageEntry>,
    capacity: usize,
}

impl MessageLog {
    pub fn new(capacity: usize) -> Self {
        let bounded_capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(bounded_capacity),
            capacity: bounded_capacity,
        }
    }

    /// Logs `entry` and returns the entry as stored.
    pub fn record(&mut self, entry: MessageEntry) -> &MessageEntry {
        match self.entries.back_mut() {
            Some(last) if last.same_line(&entry) => last.repeats += 1,
            _ => {
                if self.entries.len() == self.capacity {
                    self.entries.pop_front();
                }
                self.entries.push_back(entry);
            }
        }
        // Non-empty after either arm.
        &self.entries[self.entries.len() - 1]
    }

    pub fn iter(&self) -> impl Iterator<Item = &MessageEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
