use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use crate::buffer::{BoundedBuffer, DEFAULT_STREAM_CAPACITY, PromptRule};
use crate::element::Element;
use crate::render::RenderSurface;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamConfig {
    pub capacity: usize,
    /// Channel ids routed into their own buffer instead of the main feed.
    pub subscribed: Vec<String>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_STREAM_CAPACITY,
            subscribed: ["thoughts", "logons", "death", "familiar", "atmospherics"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// One named sub-channel. Prompts are a feed concept; streams keep everything.
#[derive(Debug)]
pub struct Stream {
    id: String,
    buffer: BoundedBuffer,
}

impl Stream {
    fn new(id: String, capacity: usize) -> Self {
        Self {
            id,
            buffer: BoundedBuffer::new(capacity, PromptRule::RetainAll),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn contents(&self) -> impl Iterator<Item = &Element> {
        self.buffer.contents()
    }
}

/// Per-session registry of streams and the subscription predicate.
#[derive(Debug)]
pub struct StreamTable {
    capacity: usize,
    subscribed: HashSet<String>,
    streams: BTreeMap<String, Stream>,
    attached: bool,
    pending: Vec<(String, Element)>,
}

impl StreamTable {
    pub fn new(config: &StreamConfig) -> Self {
        Self {
            capacity: config.capacity,
            subscribed: config.subscribed.iter().cloned().collect(),
            streams: BTreeMap::new(),
            attached: false,
            pending: Vec::new(),
        }
    }

    /// Evaluated for every stream element; nothing is cached.
    pub fn wants(&self, id: &str) -> bool {
        self.subscribed.contains(id)
    }

    pub fn subscribe(&mut self, id: impl Into<String>) -> bool {
        self.subscribed.insert(id.into())
    }

    /// Stops routing `id` here. Already retained elements stay.
    pub fn unsubscribe(&mut self, id: &str) -> bool {
        self.subscribed.remove(id)
    }

    /// Retain a stream element under its channel id. Elements without an id
    /// or for unwanted channels are handed back.
    pub fn insert(&mut self, element: Element) -> Result<(), Element> {
        let Some(id) = element.id.clone().filter(|id| self.wants(id)) else {
            return Err(element);
        };
        if self.attached {
            self.pending.push((id.clone(), element.clone()));
        }
        let capacity = self.capacity;
        self.streams
            .entry(id.clone())
            .or_insert_with(|| {
                debug!(stream = %id, "opening stream");
                Stream::new(id, capacity)
            })
            .buffer
            .append(element);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Stream> {
        self.streams.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.streams.keys().map(String::as_str)
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Start forwarding to the surface, replaying every stream's contents.
    pub fn attach(&mut self) {
        self.attached = true;
        self.pending = self
            .streams
            .values()
            .flat_map(|s| s.contents().map(|e| (s.id.clone(), e.clone())))
            .collect();
    }

    pub fn detach(&mut self) {
        self.attached = false;
        self.pending.clear();
    }

    pub fn flush_render(&mut self, session: &str, surface: &dyn RenderSurface) -> usize {
        let pending = std::mem::take(&mut self.pending);
        let delivered = pending.len();
        for (id, element) in pending {
            surface.append_stream(session, &id, &element);
        }
        delivered
    }

    /// Release every stream and cancel pending work.
    pub fn clear(&mut self) {
        self.detach();
        self.streams.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::testing::RecordingSurface;

    fn table(capacity: usize) -> StreamTable {
        StreamTable::new(&StreamConfig {
            capacity,
            subscribed: vec!["thoughts".into()],
        })
    }

    fn thought(text: &str) -> Element {
        Element::new("stream").with_id("thoughts").with_text(text)
    }

    #[test]
    fn wants_only_subscribed_channels() {
        let mut t = table(5);
        assert!(t.wants("thoughts"));
        assert!(!t.wants("logons"));
        t.subscribe("logons");
        assert!(t.wants("logons"));
        t.unsubscribe("logons");
        assert!(!t.wants("logons"));
    }

    #[test]
    fn insert_hands_back_unwanted() {
        let mut t = table(5);
        let logon = Element::new("stream").with_id("logons");
        assert_eq!(t.insert(logon.clone()), Err(logon));
        assert!(t.insert(Element::new("stream")).is_err());
        assert!(t.insert(thought("hm")).is_ok());
        assert_eq!(t.get("thoughts").map(Stream::len), Some(1));
    }

    #[test]
    fn streams_are_bounded_and_keep_prompts() {
        let mut t = table(2);
        for n in 0..4 {
            t.insert(thought(&n.to_string())).unwrap();
        }
        t.insert(Element::new("stream").with_id("thoughts").with_class("prompt"))
            .unwrap();
        t.insert(Element::new("stream").with_id("thoughts").with_class("prompt"))
            .unwrap();
        assert_eq!(t.get("thoughts").unwrap().len(), 2);
        assert!(t.get("thoughts").unwrap().contents().all(Element::is_prompt));
    }

    #[test]
    fn attach_replays_and_forwards() {
        let surface = RecordingSurface::default();
        let mut t = table(5);
        t.insert(thought("old")).unwrap();
        assert_eq!(t.flush_render("mal", &surface), 0);

        t.attach();
        t.insert(thought("new")).unwrap();
        assert_eq!(t.flush_render("mal", &surface), 2);
        assert_eq!(
            surface.events(),
            vec!["mal:thoughts:old", "mal:thoughts:new"]
        );

        t.detach();
        t.insert(thought("quiet")).unwrap();
        assert_eq!(t.flush_render("mal", &surface), 0);
    }
}
