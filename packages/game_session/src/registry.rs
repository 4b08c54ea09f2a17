use std::collections::HashMap;
use std::sync::Arc;

use game_feed::{Decorations, RenderSurface};
use tokio::sync::{Mutex, RwLock, broadcast};
use tracing::{debug, info};

use crate::decoder::Decoder;
use crate::error::SessionError;
use crate::session::{CommandOutcome, Session, SessionConfig, SessionContext, SessionEvent};
use crate::transport::Connection;

/// Every open session, keyed by name, and the single focus shared among them.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    /// The session holding the focus, registered or not. Locked before
    /// `sessions` whenever both are needed.
    focus: Mutex<Option<Arc<Session>>>,
    context: SessionContext,
}

impl SessionRegistry {
    pub fn new(surface: Arc<dyn RenderSurface>, decorations: Decorations) -> Self {
        let (events, _) = broadcast::channel(1024);
        Self {
            sessions: RwLock::new(HashMap::new()),
            focus: Mutex::new(None),
            context: SessionContext {
                surface,
                decorations,
                events,
            },
        }
    }

    /// Subscribe to events from all sessions
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.context.events.subscribe()
    }

    /// Open a TCP connection and register a session for it
    pub async fn connect(
        &self,
        config: SessionConfig,
        decoder: Box<dyn Decoder>,
    ) -> Result<Arc<Session>, SessionError> {
        let connection = Connection::connect(&config.host, config.port).await?;
        Ok(self.open(config, connection, decoder).await)
    }

    /// Register a session over an already open connection
    pub async fn open(
        &self,
        config: SessionConfig,
        connection: Connection,
        decoder: Box<dyn Decoder>,
    ) -> Arc<Session> {
        let session = Session::spawn(config, connection, decoder, self.context.clone());
        self.register(session.clone()).await;
        session
    }

    /// Insert under the session's name. An existing entry with the same
    /// name is replaced.
    pub async fn register(&self, session: Arc<Session>) {
        let name = session.name();
        let previous = self
            .sessions
            .write()
            .await
            .insert(name.clone(), session.clone());
        if let Some(previous) = previous.filter(|p| !Arc::ptr_eq(p, &session)) {
            debug!(
                "Session '{}' replaced a session on port {}",
                name,
                previous.port()
            );
            self.release_focus(&previous).await;
        }
    }

    pub async fn unregister(&self, name: &str) -> Option<Arc<Session>> {
        self.sessions.write().await.remove(name)
    }

    pub async fn lookup(&self, name: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(name).cloned()
    }

    /// All sessions ordered by port, then name.
    pub async fn list(&self) -> Vec<Arc<Session>> {
        let mut sessions: Vec<_> = self.sessions.read().await.values().cloned().collect();
        sessions.sort_by_key(|s| (s.port(), s.name()));
        sessions
    }

    /// Move `session` to `new_name`. Whatever was registered under
    /// `new_name` is overwritten. Returns false, changing nothing, when
    /// `session` is destroyed or not registered under its current name.
    pub async fn rename(&self, session: &Arc<Session>, new_name: &str) -> bool {
        let displaced = {
            let mut sessions = self.sessions.write().await;
            let old_name = session.name();
            let registered = sessions
                .get(&old_name)
                .is_some_and(|s| Arc::ptr_eq(s, session));
            if session.is_destroyed() || !registered {
                debug!("Not renaming unregistered session '{}'", old_name);
                return false;
            }
            sessions.remove(&old_name);
            let displaced = sessions
                .insert(new_name.to_string(), session.clone())
                .filter(|d| !Arc::ptr_eq(d, session));
            if let Some(displaced) = &displaced {
                info!(
                    "Renaming '{}' to '{}' overwrote the session on port {}",
                    old_name,
                    new_name,
                    displaced.port()
                );
            }
            session.set_name(new_name.to_string());
            session.rename_feed(new_name).await;
            displaced
        };
        if let Some(displaced) = displaced {
            self.release_focus(&displaced).await;
        }
        true
    }

    /// Sessions whose name contains `query`. Case-sensitive matches win;
    /// without any, matching falls back to case-insensitive.
    pub async fn fuzzy_find(&self, query: &str) -> Vec<Arc<Session>> {
        let sessions = self.list().await;
        let exact: Vec<_> = sessions
            .iter()
            .filter(|s| s.name().contains(query))
            .cloned()
            .collect();
        if !exact.is_empty() {
            return exact;
        }

        let query = query.to_lowercase();
        sessions
            .into_iter()
            .filter(|s| s.name().to_lowercase().contains(&query))
            .collect()
    }

    /// Give `session` the focus, idling the previous holder and every
    /// other registered session first.
    pub async fn activate(&self, session: &Arc<Session>) {
        let mut focus = self.focus.lock().await;
        if let Some(previous) = focus.take() {
            if !Arc::ptr_eq(&previous, session) {
                previous.idle().await;
            }
        }
        for other in self.list().await {
            if !Arc::ptr_eq(&other, session) {
                other.idle().await;
            }
        }
        session.activate().await;
        *focus = Some(session.clone());
        debug!("Session '{}' focused", session.name());
    }

    /// Take the focus away from `session`. Its buffers are untouched.
    pub async fn idle(&self, session: &Arc<Session>) {
        let mut focus = self.focus.lock().await;
        session.idle().await;
        if focus.as_ref().is_some_and(|f| Arc::ptr_eq(f, session)) {
            *focus = None;
        }
    }

    /// Idle `session` if it holds the focus.
    async fn release_focus(&self, session: &Arc<Session>) {
        let mut focus = self.focus.lock().await;
        if focus.as_ref().is_some_and(|f| Arc::ptr_eq(f, session)) {
            session.idle().await;
            *focus = None;
        }
    }

    /// The focused session, if any
    pub async fn focused(&self) -> Option<Arc<Session>> {
        let session = self.focus.lock().await.clone()?;
        let live = !session.is_destroyed() && session.is_focused().await;
        live.then_some(session)
    }

    /// History entry under the focused session's cursor.
    pub async fn current_command(&self) -> String {
        match self.focused().await {
            Some(session) => session.current_command().await,
            None => String::new(),
        }
    }

    pub async fn send_to_focused(&self, command: &str) -> Result<CommandOutcome, SessionError> {
        let session = self.focused().await.ok_or(SessionError::NoFocus)?;
        session.send_command(command).await
    }

    /// Unregister and tear down `session`. Safe to call more than once.
    pub async fn destroy(&self, session: &Arc<Session>) -> bool {
        {
            let mut sessions = self.sessions.write().await;
            let name = session.name();
            if sessions
                .get(&name)
                .is_some_and(|registered| Arc::ptr_eq(registered, session))
            {
                sessions.remove(&name);
            }
        }
        self.release_focus(session).await;
        session.destroy().await
    }

    /// Destroy every session.
    pub async fn shutdown(&self) {
        self.focus.lock().await.take();
        let sessions: Vec<_> = self.sessions.write().await.drain().map(|(_, s)| s).collect();
        info!("Shutting down {} session(s)", sessions.len());
        for session in sessions {
            session.destroy().await;
        }
    }
}
