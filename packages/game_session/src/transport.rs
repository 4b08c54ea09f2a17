use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::info;

use crate::error::SessionError;

pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// The two halves of a session's byte stream.
pub struct Connection {
    pub reader: BoxedReader,
    pub writer: BoxedWriter,
}

impl Connection {
    /// Open a TCP connection to the game.
    pub async fn connect(host: &str, port: u16) -> Result<Self, SessionError> {
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|source| SessionError::ConnectFailed {
                host: host.to_string(),
                port,
                source,
            })?;
        // Commands are a few bytes each, send them right away
        let _ = stream.set_nodelay(true);
        info!("Connected to {}:{}", host, port);

        let (reader, writer) = stream.into_split();
        Ok(Self::from_io(reader, writer))
    }

    /// Wrap any reader/writer pair, e.g. an in-memory duplex in tests.
    pub fn from_io<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
        }
    }
}
