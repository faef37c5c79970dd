//! Recently used template patterns

use std::collections::VecDeque;

pub const DEFAULT_TEMPLATE_MEMORY: usize = 5;

/// FIFO of the most recently rendered patterns, never longer than its capacity
#[derive(Debug, Clone)]
pub struct TemplateHistory {
    entries: VecDeque<String>,
    capacity: usize,
}

impl Default for TemplateHistory {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE_MEMORY)
    }
}

impl TemplateHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, pattern: &str) -> bool {
        self.entries.iter().any(|p| p == pattern)
    }

    /// Record a pattern, evicting the oldest entries beyond capacity
    pub fn push(&mut self, pattern: impl Into<String>) {
        if self.capacity == 0 {
            return;
        }
        self.entries.push_back(pattern.into());
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Oldest first
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}
