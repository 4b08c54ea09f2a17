//! The boundary to whatever draws the transcript.
//!
//! Buffers are mutated synchronously during routing; what the surface sees
//! is queued as [`RenderOp`]s and drained on the refresh tick, after the
//! decorators have run.

use tracing::trace;

use crate::decoration::Decorations;
use crate::element::Element;

/// Receives feed notifications. Implementations use interior mutability;
/// a single surface is shared by every session.
pub trait RenderSurface: Send + Sync {
    fn append(&self, session: &str, element: &Element);

    /// The tail prompt was swapped for a newer one.
    fn replace_tail(&self, session: &str, element: &Element);

    /// The session lost focus; drop whatever is shown for it.
    fn idle(&self, session: &str);

    /// Scroll back to the newest element and keep following it.
    fn reattach_head(&self, session: &str);

    /// An element landed in one of the session's streams.
    fn append_stream(&self, _session: &str, _stream: &str, _element: &Element) {}

    /// Whether the reader scrolled away from the tail by hand.
    fn is_scrolled_away(&self, _session: &str) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOp {
    Append(Element),
    ReplaceTail(Element),
    ReattachHead,
}

/// Pending surface work for one feed.
#[derive(Debug, Default)]
pub struct RenderQueue {
    ops: Vec<RenderOp>,
}

impl RenderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Queue an op, folding a tail replacement into the op it supersedes.
    pub fn push(&mut self, op: RenderOp) {
        if let RenderOp::ReplaceTail(element) = op {
            match self.ops.last_mut() {
                Some(RenderOp::Append(tail)) | Some(RenderOp::ReplaceTail(tail)) => {
                    *tail = element;
                }
                _ => self.ops.push(RenderOp::ReplaceTail(element)),
            }
            return;
        }
        self.ops.push(op);
    }

    /// Drop everything pending.
    pub fn cancel(&mut self) -> usize {
        let dropped = self.ops.len();
        self.ops.clear();
        dropped
    }

    /// Decorate and deliver all pending ops. Returns the number delivered.
    pub fn drain(
        &mut self,
        session: &str,
        decorations: &Decorations,
        surface: &dyn RenderSurface,
    ) -> usize {
        let ops = std::mem::take(&mut self.ops);
        let delivered = ops.len();
        for op in ops {
            match op {
                RenderOp::Append(element) => {
                    surface.append(session, &decorate(decorations, element));
                }
                RenderOp::ReplaceTail(element) => {
                    surface.replace_tail(session, &decorate(decorations, element));
                }
                RenderOp::ReattachHead => surface.reattach_head(session),
            }
        }
        if delivered > 0 {
            trace!(session, delivered, "render queue drained");
        }
        delivered
    }
}

fn decorate(decorations: &Decorations, element: Element) -> Element {
    if element.is_prompt() {
        element
    } else {
        decorations.apply(element)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Records every notification as a short string.
    #[derive(Default)]
    pub struct RecordingSurface {
        pub events: Mutex<Vec<String>>,
        pub scrolled_away: Mutex<bool>,
    }

    impl RecordingSurface {
        pub fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }

        fn record(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl RenderSurface for RecordingSurface {
        fn append(&self, session: &str, element: &Element) {
            self.record(format!("{session}:append:{}", element.text()));
        }

        fn replace_tail(&self, session: &str, element: &Element) {
            self.record(format!("{session}:replace:{}", element.text()));
        }

        fn idle(&self, session: &str) {
            self.record(format!("{session}:idle"));
        }

        fn reattach_head(&self, session: &str) {
            self.record(format!("{session}:reattach"));
        }

        fn append_stream(&self, session: &str, stream: &str, element: &Element) {
            self.record(format!("{session}:{stream}:{}", element.text()));
        }

        fn is_scrolled_away(&self, _session: &str) -> bool {
            *self.scrolled_away.lock().unwrap()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingSurface;
    use super::*;

    #[test]
    fn replacement_folds_into_pending_append() {
        let mut queue = RenderQueue::new();
        queue.push(RenderOp::Append(Element::new("prompt").with_text("H>")));
        queue.push(RenderOp::ReplaceTail(Element::new("prompt").with_text("R>")));
        assert_eq!(queue.len(), 1);

        let surface = RecordingSurface::default();
        queue.drain("s", &Decorations::new(), &surface);
        assert_eq!(surface.events(), vec!["s:append:R>"]);
    }

    #[test]
    fn replacement_without_pending_append_is_kept() {
        let mut queue = RenderQueue::new();
        queue.push(RenderOp::ReattachHead);
        queue.push(RenderOp::ReplaceTail(Element::new("prompt").with_text(">")));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn drain_decorates_content_but_not_prompts() {
        let mut queue = RenderQueue::new();
        queue.push(RenderOp::Append(Element::new("pre").with_text("hi")));
        queue.push(RenderOp::Append(Element::new("prompt").with_text(">")));
        let decorations = Decorations::new().with(|e: Element| e.with_text("!"));

        let surface = RecordingSurface::default();
        assert_eq!(queue.drain("s", &decorations, &surface), 2);
        assert_eq!(surface.events(), vec!["s:append:hi!", "s:append:>"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn cancel_discards_pending_work() {
        let mut queue = RenderQueue::new();
        queue.push(RenderOp::Append(Element::new("pre")));
        assert_eq!(queue.cancel(), 1);
        let surface = RecordingSurface::default();
        assert_eq!(queue.drain("s", &Decorations::new(), &surface), 0);
        assert!(surface.events().is_empty());
    }
}
