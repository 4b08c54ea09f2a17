use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock as StdRwLock};
use std::time::Duration;

use game_feed::category::CONTENT_BLOCK_TAG;
use game_feed::{
    Decorations, Destinations, Document, Element, Feed, FeedConfig, MemoryStateStore,
    RenderSurface, RouteReport, StateStore, StreamConfig, StreamTable, route,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::{Mutex, broadcast};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::decoder::Decoder;
use crate::error::SessionError;
use crate::history::{CommandHistory, DEFAULT_HISTORY_LIMIT};
use crate::transport::{BoxedReader, BoxedWriter, Connection};

/// Appended to the feed once the transport is gone.
pub const CONNECTION_CLOSED_NOTICE: &str = "\n*** Connection Closed ***\n";

/// Default cadence at which queued render work is delivered.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(16);

const READ_BUFFER_SIZE: usize = 4096;

/// Configuration for opening a session
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub host: String,
    pub port: u16,
    /// Registry key; the port is used when absent.
    pub name: Option<String>,
    pub feed: FeedConfig,
    pub streams: StreamConfig,
    pub history_limit: usize,
    pub refresh_interval: Duration,
}

impl SessionConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            name: None,
            feed: FeedConfig::default(),
            streams: StreamConfig::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Collaborators shared by every session of a registry.
#[derive(Clone)]
pub struct SessionContext {
    pub surface: Arc<dyn RenderSurface>,
    pub decorations: Decorations,
    pub events: broadcast::Sender<SessionEvent>,
}

/// Events emitted by sessions
#[derive(Clone, Debug)]
pub enum SessionEvent {
    /// A document was routed
    Routed {
        session: String,
        tags: Vec<String>,
        report: RouteReport,
    },
    /// The transport failed; the session stays registered
    Error { session: String, message: String },
    /// The transport is gone
    Closed { session: String },
}

/// Result of [`Session::send_command`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Nothing but whitespace; nothing was echoed or written.
    Empty,
    Sent,
}

/// Everything routing writes to. Gone once the session is destroyed.
struct SessionState {
    feed: Feed,
    streams: StreamTable,
    store: Box<dyn StateStore>,
    history: CommandHistory,
}

/// One connection to a game and everything received over it.
pub struct Session {
    host: String,
    port: u16,
    name: StdRwLock<String>,
    state: Mutex<Option<SessionState>>,
    writer: Mutex<Option<BoxedWriter>>,
    context: SessionContext,
    /// Cancels everything, on destroy.
    cancel: CancellationToken,
    /// Cancels just the reader, on close.
    reader_cancel: CancellationToken,
    broken: AtomicBool,
    closed_notice: AtomicBool,
    destroyed: AtomicBool,
}

impl Session {
    /// Start routing `connection` through `decoder`. Spawns the reader and
    /// the render tick; both stop when the session is destroyed.
    pub fn spawn(
        config: SessionConfig,
        connection: Connection,
        decoder: Box<dyn Decoder>,
        context: SessionContext,
    ) -> Arc<Self> {
        let name = config
            .name
            .clone()
            .unwrap_or_else(|| config.port.to_string());
        let cancel = CancellationToken::new();
        let reader_cancel = cancel.child_token();

        let state = SessionState {
            feed: Feed::new(name.clone(), config.feed),
            streams: StreamTable::new(&config.streams),
            store: Box::new(MemoryStateStore::new()),
            history: CommandHistory::new(config.history_limit),
        };

        let session = Arc::new(Self {
            host: config.host.clone(),
            port: config.port,
            name: StdRwLock::new(name),
            state: Mutex::new(Some(state)),
            writer: Mutex::new(Some(connection.writer)),
            context,
            cancel,
            reader_cancel,
            broken: AtomicBool::new(false),
            closed_notice: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
        });

        info!(
            "Session '{}' opened for {}:{}",
            session.name(),
            session.host,
            session.port
        );

        tokio::spawn(read_loop(session.clone(), connection.reader, decoder));
        tokio::spawn(render_loop(session.clone(), config.refresh_interval));

        session
    }

    pub fn name(&self) -> String {
        self.name
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// The transport reported an error or closed.
    pub fn is_broken(&self) -> bool {
        self.broken.load(Ordering::SeqCst)
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub async fn is_focused(&self) -> bool {
        self.state
            .lock()
            .await
            .as_ref()
            .is_some_and(|state| state.feed.is_focused())
    }

    /// Route one document. Documents for a session are routed one at a
    /// time; a destroyed session drops them.
    pub async fn ingest(&self, document: Document) -> Option<RouteReport> {
        let tags: Vec<String> = document.top_level_tags().map(String::from).collect();
        let report = {
            let mut guard = self.state.lock().await;
            let state = guard.as_mut()?;
            route(
                document,
                &mut Destinations {
                    feed: &mut state.feed,
                    streams: &mut state.streams,
                    state: state.store.as_mut(),
                },
            )
        };

        let _ = self.context.events.send(SessionEvent::Routed {
            session: self.name(),
            tags,
            report: report.clone(),
        });
        Some(report)
    }

    /// Echo `raw` into the feed and write it to the game.
    ///
    /// The echo is not rolled back when the write fails.
    pub async fn send_command(&self, raw: &str) -> Result<CommandOutcome, SessionError> {
        let command = raw.trim();
        if command.is_empty() {
            return Ok(CommandOutcome::Empty);
        }

        {
            let mut guard = self.state.lock().await;
            let state = guard
                .as_mut()
                .ok_or_else(|| SessionError::Destroyed(self.name()))?;
            let echo = Element::new(CONTENT_BLOCK_TAG)
                .with_class("cli sent")
                .with_text(format!("{}{}", state.store.prompt_text(), command));
            state.feed.append(echo);
            state.history.push(command);
        }

        let mut writer = self.writer.lock().await;
        let writer = writer
            .as_mut()
            .ok_or_else(|| SessionError::Closed(self.name()))?;
        let line = format!("{command}\r\n");
        let written = match writer.write_all(line.as_bytes()).await {
            Ok(()) => writer.flush().await,
            Err(e) => Err(e),
        };
        written.map_err(|source| {
            self.broken.store(true, Ordering::SeqCst);
            SessionError::WriteFailed {
                session: self.name(),
                source,
            }
        })?;

        debug!(session = %self.name(), command, "command sent");
        Ok(CommandOutcome::Sent)
    }

    /// The entry under the history cursor.
    pub async fn current_command(&self) -> String {
        self.with_history(|h| h.read().to_string()).await
    }

    pub async fn history_back(&self) -> String {
        self.with_history(|h| h.back().to_string()).await
    }

    pub async fn history_forward(&self) -> String {
        self.with_history(|h| h.forward().to_string()).await
    }

    async fn with_history<F>(&self, f: F) -> String
    where
        F: FnOnce(&mut CommandHistory) -> String,
    {
        self.state
            .lock()
            .await
            .as_mut()
            .map(|state| f(&mut state.history))
            .unwrap_or_default()
    }

    /// Snapshot of the retained transcript, oldest first.
    pub async fn transcript(&self) -> Vec<Element> {
        self.state
            .lock()
            .await
            .as_ref()
            .map(|state| state.feed.contents().cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot of one stream, oldest first.
    pub async fn stream_contents(&self, id: &str) -> Vec<Element> {
        self.state
            .lock()
            .await
            .as_ref()
            .and_then(|state| state.streams.get(id))
            .map(|stream| stream.contents().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn state_value(&self, key: &str) -> Option<String> {
        self.state
            .lock()
            .await
            .as_ref()
            .and_then(|state| state.store.get(key).map(String::from))
    }

    /// Reader gesture: jump back to the tail of the feed.
    pub async fn reattach_head(&self) {
        if let Some(state) = self.state.lock().await.as_mut() {
            state.feed.reattach_head(self.context.surface.as_ref());
        }
    }

    /// Reader scrolled away from the tail.
    pub async fn detach_head(&self) {
        if let Some(state) = self.state.lock().await.as_mut() {
            state.feed.detach_head();
        }
    }

    pub(crate) async fn activate(&self) {
        if let Some(state) = self.state.lock().await.as_mut() {
            state.feed.activate(self.context.surface.as_ref());
            state.streams.attach();
        }
    }

    pub(crate) async fn idle(&self) {
        if let Some(state) = self.state.lock().await.as_mut() {
            state.feed.idle(self.context.surface.as_ref());
            state.streams.detach();
        }
    }

    pub(crate) fn set_name(&self, name: String) {
        *self.name.write().unwrap_or_else(PoisonError::into_inner) = name;
    }

    pub(crate) async fn rename_feed(&self, name: &str) {
        if let Some(state) = self.state.lock().await.as_mut() {
            state.feed.rename(name);
        }
    }

    /// Deliver queued render work for this tick.
    pub async fn flush_render(&self) -> usize {
        let name = self.name();
        let surface = self.context.surface.as_ref();
        match self.state.lock().await.as_mut() {
            Some(state) => {
                state.feed.flush_render(&self.context.decorations, surface)
                    + state.streams.flush_render(&name, surface)
            }
            None => 0,
        }
    }

    /// Shut the transport down and leave the closed notice in the feed.
    /// The session stays registered.
    pub async fn close(&self) {
        self.reader_cancel.cancel();
        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }
        self.on_closed().await;
    }

    /// Cancel background work, release the transport and clear the feed
    /// and streams. Returns false if the session was already destroyed.
    pub async fn destroy(&self) -> bool {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.cancel.cancel();
        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }
        if let Some(mut state) = self.state.lock().await.take() {
            state.feed.destroy(self.context.surface.as_ref());
            state.streams.clear();
        }
        info!("Session '{}' destroyed", self.name());
        true
    }

    async fn on_error(&self, err: std::io::Error) {
        warn!("Session '{}' transport error: {}", self.name(), err);
        self.broken.store(true, Ordering::SeqCst);
        let _ = self.context.events.send(SessionEvent::Error {
            session: self.name(),
            message: err.to_string(),
        });
        self.on_closed().await;
    }

    async fn on_closed(&self) {
        self.broken.store(true, Ordering::SeqCst);
        if self.closed_notice.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(state) = self.state.lock().await.as_mut() {
            state
                .feed
                .append(Element::new(CONTENT_BLOCK_TAG).with_text(CONNECTION_CLOSED_NOTICE));
        }
        info!("Session '{}' connection closed", self.name());
        let _ = self.context.events.send(SessionEvent::Closed {
            session: self.name(),
        });
    }
}

async fn read_loop(session: Arc<Session>, mut reader: BoxedReader, mut decoder: Box<dyn Decoder>) {
    let cancel = session.reader_cancel.clone();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            read = reader.read(&mut buffer) => match read {
                Ok(0) => {
                    session.on_closed().await;
                    break;
                }
                Ok(n) => {
                    let document = decoder.decode(&buffer[..n]);
                    if !document.is_empty() {
                        session.ingest(document).await;
                    }
                }
                Err(e) => {
                    session.on_error(e).await;
                    break;
                }
            }
        }
    }
    debug!("Session '{}' reader exiting", session.name());
}

async fn render_loop(session: Arc<Session>, refresh: Duration) {
    let cancel = session.cancel.clone();
    let mut interval = tokio::time::interval(refresh.max(Duration::from_millis(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                session.flush_render().await;
            }
        }
    }
}
