use std::collections::HashMap;

use crate::category::PROMPT_TAG;
use crate::element::Element;
use crate::error::FeedError;

/// Key under which the text of the latest prompt is stored.
pub const PROMPT_TEXT_KEY: &str = "prompt.text";
/// Used when no prompt has been seen yet.
pub const DEFAULT_PROMPT_TEXT: &str = ">";

/// Accumulates non-transcript game state from routed elements.
///
/// The router never interprets element content; everything it does not
/// render goes here.
pub trait StateStore: Send {
    fn consume(&mut self, element: &Element) -> Result<(), FeedError>;

    fn get(&self, key: &str) -> Option<&str>;

    /// The text shown before echoed commands.
    fn prompt_text(&self) -> &str {
        self.get(PROMPT_TEXT_KEY).unwrap_or(DEFAULT_PROMPT_TEXT)
    }
}

/// Keeps the latest text seen for each tag and for each `tag.id` pair.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    values: HashMap<String, String>,
    consumed: u64,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of elements consumed so far.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl StateStore for MemoryStateStore {
    fn consume(&mut self, element: &Element) -> Result<(), FeedError> {
        let tag = element.tag.to_ascii_lowercase();
        let text = element.text();
        if tag == PROMPT_TAG {
            self.values
                .insert(PROMPT_TEXT_KEY.to_string(), text.trim_end().to_string());
        }
        if let Some(id) = &element.id {
            self.values.insert(format!("{tag}.{id}"), text.clone());
        }
        self.values.insert(tag, text);
        self.consumed += 1;
        Ok(())
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}
