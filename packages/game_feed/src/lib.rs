//! Game Feed - routing and buffering for tag-annotated game transcripts
//!
//! This crate holds the synchronous core of the client: it takes decoded
//! [`Document`]s and distributes their elements between a session's main
//! [`Feed`], its [`StreamTable`] and its [`StateStore`]. It does no I/O and
//! knows nothing about sockets or terminals.
//!
//! # Example
//!
//! ```
//! use game_feed::{
//!     Destinations, Document, Element, Feed, FeedConfig, MemoryStateStore, StreamConfig,
//!     StreamTable, route,
//! };
//!
//! let mut feed = Feed::new("mal", FeedConfig::default());
//! let mut streams = StreamTable::new(&StreamConfig::default());
//! let mut state = MemoryStateStore::new();
//!
//! let doc = Document::new()
//!     .with_body(Element::new("pre").with_text("A cold wind blows."))
//!     .with_body(Element::new("prompt").with_text(">"));
//!
//! let report = route(
//!     doc,
//!     &mut Destinations {
//!         feed: &mut feed,
//!         streams: &mut streams,
//!         state: &mut state,
//!     },
//! );
//!
//! assert_eq!(report.ingested, 1);
//! assert!(feed.has_prompt());
//! ```

mod buffer;
pub mod category;
mod decoration;
mod element;
mod error;
mod feed;
mod render;
mod router;
mod store;
mod stream;

pub use buffer::{
    Appended, BoundedBuffer, DEFAULT_FEED_CAPACITY, DEFAULT_STREAM_CAPACITY, PromptRule,
};
pub use category::{Category, classify};
pub use decoration::{Decorations, TextDecorator};
pub use element::{Document, Element, Node};
pub use error::FeedError;
pub use feed::{Attachment, DEFAULT_REPLAY_ENTRIES, Feed, FeedConfig};
pub use render::{RenderOp, RenderQueue, RenderSurface};
pub use router::{Destinations, RouteReport, route, strip_line_breaks};
pub use store::{DEFAULT_PROMPT_TEXT, MemoryStateStore, PROMPT_TEXT_KEY, StateStore};
pub use stream::{Stream, StreamConfig, StreamTable};
