use std::collections::VecDeque;

pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Commands sent by a session, newest last, with a browsing cursor.
#[derive(Debug, Clone)]
pub struct CommandHistory {
    entries: VecDeque<String>,
    limit: usize,
    /// Index into `entries` while browsing; `None` means "at the prompt".
    cursor: Option<usize>,
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl CommandHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            limit: limit.max(1),
            cursor: None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a sent command and reset the cursor. Repeating the previous
    /// command does not add a second entry.
    pub fn push(&mut self, command: impl Into<String>) {
        let command = command.into();
        self.cursor = None;
        if self.entries.back() == Some(&command) {
            return;
        }
        self.entries.push_back(command);
        while self.entries.len() > self.limit {
            self.entries.pop_front();
        }
    }

    /// The entry under the cursor, or an empty string at the prompt.
    pub fn read(&self) -> &str {
        self.cursor
            .and_then(|i| self.entries.get(i))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Step to an older entry, stopping at the oldest.
    pub fn back(&mut self) -> &str {
        self.cursor = match self.cursor {
            _ if self.entries.is_empty() => None,
            None => Some(self.entries.len() - 1),
            Some(i) => Some(i.saturating_sub(1)),
        };
        self.read()
    }

    /// Step to a newer entry; stepping past the newest returns to the prompt.
    pub fn forward(&mut self) -> &str {
        self.cursor = match self.cursor {
            Some(i) if i + 1 < self.entries.len() => Some(i + 1),
            _ => None,
        };
        self.read()
    }
}
