/// Errors that can occur in Provider and Consumer operations.
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    /// Transport-level error (bind, connect, accept, socket I/O).
    #[error("transport error: {0}")]
    Transport(#[from] eventwire_transport::TransportError),

    /// Frame-level error (encode, decode, oversized frame, stream I/O).
    #[error("frame error: {0}")]
    Frame(#[from] eventwire_frame::FrameError),

    /// `emit` was called after `end`.
    #[error("provider has ended; no further events can be sent")]
    Ended,

    /// The outbound connection is gone or was never established.
    #[error("provider is not connected")]
    NotConnected,

    /// `connect` was called on a Provider that already has a connection.
    #[error("provider is already connected")]
    AlreadyConnected,

    /// `listen` was called on a Consumer that is already listening.
    #[error("consumer is already listening")]
    AlreadyListening,

    /// `close` was called on a Consumer that is not listening.
    #[error("consumer is not listening")]
    NotListening,

    /// A worker thread could not be stopped cleanly.
    #[error("shutdown failed: {0}")]
    ShutdownFailed(String),
}

impl PeerError {
    /// Whether this error came from decoding or encoding a frame.
    pub fn is_codec(&self) -> bool {
        matches!(self, PeerError::Frame(err) if err.is_codec())
    }
}

pub type Result<T> = std::result::Result<T, PeerError>;
