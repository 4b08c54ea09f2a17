use std::collections::VecDeque;
use tracing::trace;

use crate::element::Element;

/// Default number of elements retained by a session's main feed.
pub const DEFAULT_FEED_CAPACITY: usize = 1000;
/// Default number of elements retained per stream.
pub const DEFAULT_STREAM_CAPACITY: usize = 500;

/// How a buffer treats consecutive prompts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromptRule {
    /// A prompt arriving on top of a prompt replaces it.
    Collapse,
    /// Every element is retained as-is.
    RetainAll,
}

/// Outcome of [`BoundedBuffer::append`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Appended {
    Pushed,
    ReplacedTail,
}

/// Ordered, capacity-limited element history.
///
/// `len() <= capacity()` holds after every mutation. Overflow evicts from the
/// front and the evicted elements are gone for good.
#[derive(Debug, Clone)]
pub struct BoundedBuffer {
    entries: VecDeque<Element>,
    capacity: usize,
    prompt_rule: PromptRule,
    evicted: u64,
}

impl BoundedBuffer {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize, prompt_rule: PromptRule) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            prompt_rule,
            evicted: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn prompt_rule(&self) -> PromptRule {
        self.prompt_rule
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of elements evicted over the buffer's lifetime.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn tail(&self) -> Option<&Element> {
        self.entries.back()
    }

    pub fn tail_is_prompt(&self) -> bool {
        self.tail().is_some_and(Element::is_prompt)
    }

    /// Oldest first.
    pub fn contents(&self) -> impl DoubleEndedIterator<Item = &Element> + ExactSizeIterator {
        self.entries.iter()
    }

    /// The newest `n` elements, oldest first.
    pub fn last_n(&self, n: usize) -> impl Iterator<Item = &Element> {
        self.entries.iter().skip(self.entries.len().saturating_sub(n))
    }

    pub fn append(&mut self, element: Element) -> Appended {
        if self.prompt_rule == PromptRule::Collapse && element.is_prompt() {
            if let Err(element) = self.replace_tail_if(Element::is_prompt, element) {
                self.push(element);
                return Appended::Pushed;
            }
            return Appended::ReplacedTail;
        }
        self.push(element);
        Appended::Pushed
    }

    /// Swap the tail for `element` when `predicate` holds for the current
    /// tail. Returns the replaced tail, or hands `element` back untouched.
    pub fn replace_tail_if<F>(&mut self, predicate: F, element: Element) -> Result<Element, Element>
    where
        F: FnOnce(&Element) -> bool,
    {
        match self.entries.back_mut() {
            Some(tail) if predicate(tail) => Ok(std::mem::replace(tail, element)),
            _ => Err(element),
        }
    }

    /// Drop oldest entries until the buffer fits its capacity.
    pub fn evict_overflow(&mut self) -> usize {
        let mut dropped = 0;
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
            dropped += 1;
        }
        if dropped > 0 {
            self.evicted += dropped as u64;
            trace!(dropped, total = self.evicted, "evicted overflow");
        }
        dropped
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn push(&mut self, element: Element) {
        self.entries.push_back(element);
        self.evict_overflow();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: usize) -> Element {
        Element::new("pre").with_text(format!("line {n}"))
    }

    fn prompt(text: &str) -> Element {
        Element::new("prompt").with_text(text)
    }

    #[test]
    fn keeps_newest_when_over_capacity() {
        let mut buf = BoundedBuffer::new(3, PromptRule::Collapse);
        for n in 0..5 {
            buf.append(line(n));
        }
        let texts: Vec<_> = buf.contents().map(Element::text).collect();
        assert_eq!(texts, vec!["line 2", "line 3", "line 4"]);
        assert_eq!(buf.evicted(), 2);
    }

    #[test]
    fn consecutive_prompts_collapse() {
        let mut buf = BoundedBuffer::new(10, PromptRule::Collapse);
        buf.append(line(0));
        assert_eq!(buf.append(prompt("H>")), Appended::Pushed);
        assert_eq!(buf.append(prompt("R>")), Appended::ReplacedTail);
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.tail().map(Element::text).as_deref(), Some("R>"));
    }

    #[test]
    fn prompt_after_text_is_pushed() {
        let mut buf = BoundedBuffer::new(10, PromptRule::Collapse);
        buf.append(prompt(">"));
        buf.append(line(1));
        buf.append(prompt(">"));
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn retain_all_keeps_every_prompt() {
        let mut buf = BoundedBuffer::new(10, PromptRule::RetainAll);
        buf.append(prompt(">"));
        buf.append(prompt(">"));
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn replace_tail_if_hands_back_on_miss() {
        let mut buf = BoundedBuffer::new(2, PromptRule::RetainAll);
        let rejected = buf.replace_tail_if(|_| true, line(0));
        assert!(rejected.is_err());

        buf.append(line(1));
        let replaced = buf.replace_tail_if(|t| t.text() == "line 1", line(2));
        assert_eq!(replaced.map(|e| e.text()), Ok("line 1".to_string()));
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn zero_capacity_holds_one() {
        let mut buf = BoundedBuffer::new(0, PromptRule::RetainAll);
        buf.append(line(0));
        buf.append(line(1));
        assert_eq!(buf.capacity(), 1);
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn last_n_is_oldest_first() {
        let mut buf = BoundedBuffer::new(10, PromptRule::RetainAll);
        for n in 0..6 {
            buf.append(line(n));
        }
        let texts: Vec<_> = buf.last_n(2).map(Element::text).collect();
        assert_eq!(texts, vec!["line 4", "line 5"]);
        assert_eq!(buf.last_n(100).count(), 6);
    }
}
