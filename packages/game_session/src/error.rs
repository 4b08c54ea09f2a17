use thiserror::Error;

/// Errors that can occur during session operations
#[derive(Debug, Error)]
pub enum SessionError {
    /// Failed to open the connection
    #[error("Failed to connect to {host}:{port}: {source}")]
    ConnectFailed {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write to the connection
    #[error("Failed to write to session '{session}': {source}")]
    WriteFailed {
        session: String,
        #[source]
        source: std::io::Error,
    },

    /// The connection was closed or broke
    #[error("Connection for session '{0}' is closed")]
    Closed(String),

    /// The session has been destroyed
    #[error("Session '{0}' has been destroyed")]
    Destroyed(String),

    /// No session currently has focus
    #[error("No session has focus")]
    NoFocus,
}
