/// Errors that can occur while encoding, splitting or decoding frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The message cannot be represented on the wire.
    #[error("failed to serialize message: {0}")]
    Serialization(#[source] serde_json::Error),

    /// A frame is not well-formed JSON or does not have the message shape.
    #[error("failed to deserialize frame: {0}")]
    Deserialization(#[source] serde_json::Error),

    /// Unterminated data grew past the configured maximum frame size.
    #[error("frame too large ({size} bytes buffered, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection stopped accepting bytes.
    #[error("connection closed")]
    ConnectionClosed,
}

impl FrameError {
    /// Whether this error came from the codec rather than the stream.
    pub fn is_codec(&self) -> bool {
        matches!(
            self,
            FrameError::Serialization(_)
                | FrameError::Deserialization(_)
                | FrameError::FrameTooLarge { .. }
        )
    }
}

pub(crate) fn transport_to_frame_error(err: eventwire_transport::TransportError) -> FrameError {
    use eventwire_transport::TransportError;

    match err {
        TransportError::Io(io) | TransportError::Accept(io) => FrameError::Io(io),
        TransportError::Bind { source, .. } | TransportError::Connect { source, .. } => {
            FrameError::Io(source)
        }
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
