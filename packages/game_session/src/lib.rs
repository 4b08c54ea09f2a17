//! Game Session - connections, command dispatch and the focus lifecycle
//!
//! Each [`Session`] owns one connection to a game. A reader task decodes what
//! arrives into documents and routes them through [`game_feed`]; a render
//! task delivers queued work to the shared [`RenderSurface`](game_feed::RenderSurface)
//! while the session holds the focus. The [`SessionRegistry`] keeps sessions
//! by name and makes sure at most one of them is focused.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use game_feed::{Decorations, Element, RenderSurface};
//! use game_session::{PlainTextDecoder, SessionConfig, SessionEvent, SessionRegistry};
//!
//! struct Print;
//!
//! impl RenderSurface for Print {
//!     fn append(&self, _session: &str, element: &Element) {
//!         println!("{}", element.text());
//!     }
//!     fn replace_tail(&self, _session: &str, element: &Element) {
//!         println!("{}", element.text());
//!     }
//!     fn idle(&self, _session: &str) {}
//!     fn reattach_head(&self, _session: &str) {}
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = SessionRegistry::new(Arc::new(Print), Decorations::new());
//!     let mut events = registry.subscribe();
//!
//!     let config = SessionConfig::new("localhost", 4000).with_name("mal");
//!     let session = registry
//!         .connect(config, Box::new(PlainTextDecoder::new()))
//!         .await
//!         .unwrap();
//!     registry.activate(&session).await;
//!     registry.send_to_focused("look").await.unwrap();
//!
//!     while let Ok(event) = events.recv().await {
//!         if let SessionEvent::Closed { session } = event {
//!             println!("{session} closed");
//!             break;
//!         }
//!     }
//!     registry.shutdown().await;
//! }
//! ```

mod decoder;
mod error;
mod history;
mod registry;
mod session;
mod transport;

#[cfg(test)]
mod testing;

pub use decoder::{Decoder, PlainTextDecoder, Utf8StreamDecoder};
pub use error::SessionError;
pub use history::{CommandHistory, DEFAULT_HISTORY_LIMIT};
pub use registry::SessionRegistry;
pub use session::{
    CONNECTION_CLOSED_NOTICE, CommandOutcome, DEFAULT_REFRESH_INTERVAL, Session, SessionConfig,
    SessionContext, SessionEvent,
};
pub use transport::{BoxedReader, BoxedWriter, Connection};
