use std::path::PathBuf;

use crate::address::Address;

/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind to the specified address.
    #[error("failed to bind to {address}: {source}")]
    Bind {
        address: Address,
        source: std::io::Error,
    },

    /// Failed to connect to the specified address.
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: Address,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The socket path is too long for the platform.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    /// The address string could not be parsed.
    #[error("invalid address '{0}'")]
    InvalidAddress(String),

    /// The transport has been shut down.
    #[error("transport shut down")]
    Shutdown,
}

impl TransportError {
    /// The underlying I/O error, if this error wraps one.
    pub fn io_error(&self) -> Option<&std::io::Error> {
        match self {
            TransportError::Bind { source, .. } | TransportError::Connect { source, .. } => {
                Some(source)
            }
            TransportError::Accept(err) | TransportError::Io(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
