use tracing::debug;

use crate::buffer::{Appended, BoundedBuffer, DEFAULT_FEED_CAPACITY, PromptRule};
use crate::decoration::Decorations;
use crate::element::Element;
use crate::render::{RenderOp, RenderQueue, RenderSurface};

/// Number of retained elements re-rendered when a feed is activated.
pub const DEFAULT_REPLAY_ENTRIES: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeedConfig {
    pub capacity: usize,
    pub replay: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_FEED_CAPACITY,
            replay: DEFAULT_REPLAY_ENTRIES,
        }
    }
}

/// Whether the feed is currently wired to the render surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attachment {
    Attached,
    Idle,
}

/// A session's main transcript.
#[derive(Debug)]
pub struct Feed {
    session: String,
    buffer: BoundedBuffer,
    replay: usize,
    attachment: Attachment,
    focused: bool,
    following: bool,
    pending: RenderQueue,
}

impl Feed {
    pub fn new(session: impl Into<String>, config: FeedConfig) -> Self {
        Self {
            session: session.into(),
            buffer: BoundedBuffer::new(config.capacity, PromptRule::Collapse),
            replay: config.replay,
            attachment: Attachment::Idle,
            focused: false,
            following: true,
            pending: RenderQueue::new(),
        }
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    pub fn rename(&mut self, session: impl Into<String>) {
        self.session = session.into();
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    pub fn contents(&self) -> impl Iterator<Item = &Element> {
        self.buffer.contents()
    }

    pub fn tail(&self) -> Option<&Element> {
        self.buffer.tail()
    }

    /// If the newest retained element is a prompt.
    pub fn has_prompt(&self) -> bool {
        self.buffer.tail_is_prompt()
    }

    pub fn attachment(&self) -> Attachment {
        self.attachment
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn is_following(&self) -> bool {
        self.following
    }

    pub fn pending_renders(&self) -> usize {
        self.pending.len()
    }

    /// Retain `element` and, when attached, queue it for the surface.
    pub fn append(&mut self, element: Element) -> Appended {
        let rendered = (self.attachment == Attachment::Attached).then(|| element.clone());
        let appended = self.buffer.append(element);
        if let Some(element) = rendered {
            self.pending.push(match appended {
                Appended::Pushed => RenderOp::Append(element),
                Appended::ReplacedTail => RenderOp::ReplaceTail(element),
            });
        }
        appended
    }

    /// Take focus and re-render the newest retained elements.
    ///
    /// Siblings are idled by the session registry, not here.
    pub fn activate(&mut self, surface: &dyn RenderSurface) {
        self.focused = true;
        self.attachment = Attachment::Attached;
        self.pending.cancel();
        for element in self.buffer.last_n(self.replay) {
            self.pending.push(RenderOp::Append(element.clone()));
        }
        self.following = !surface.is_scrolled_away(&self.session);
        if self.following {
            self.pending.push(RenderOp::ReattachHead);
        } else {
            debug!(session = %self.session, "reader scrolled away, not following tail");
        }
    }

    /// Drop focus and detach from the surface. Retained elements stay.
    pub fn idle(&mut self, surface: &dyn RenderSurface) {
        if self.attachment == Attachment::Idle && !self.focused {
            return;
        }
        self.focused = false;
        self.attachment = Attachment::Idle;
        self.pending.cancel();
        surface.idle(&self.session);
    }

    /// Explicit gesture from the reader: jump back to the tail and follow it.
    pub fn reattach_head(&mut self, surface: &dyn RenderSurface) {
        self.following = true;
        if self.attachment == Attachment::Attached {
            surface.reattach_head(&self.session);
        }
    }

    /// The reader scrolled away; stop following until [`Feed::reattach_head`].
    pub fn detach_head(&mut self) {
        self.following = false;
    }

    /// Deliver queued work to the surface. Called once per refresh tick.
    pub fn flush_render(&mut self, decorations: &Decorations, surface: &dyn RenderSurface) -> usize {
        if self.attachment == Attachment::Idle {
            self.pending.cancel();
            return 0;
        }
        self.pending.drain(&self.session, decorations, surface)
    }

    /// Idle, cancel pending render work and release retained elements.
    pub fn destroy(&mut self, surface: &dyn RenderSurface) {
        self.idle(surface);
        self.pending.cancel();
        self.buffer.clear();
    }
}
