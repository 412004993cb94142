use std::fmt;
use std::io;

use eventwire_frame::FrameError;
use eventwire_peer::PeerError;
use eventwire_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: &io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        _ => TRANSPORT_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: &TransportError) -> CliError {
    match err {
        TransportError::InvalidAddress(_) | TransportError::PathTooLong { .. } => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        other => {
            let code = other
                .io_error()
                .map_or(TRANSPORT_ERROR, |source| io_error(context, source).code);
            CliError::new(code, format!("{context}: {other}"))
        }
    }
}

pub fn frame_error(context: &str, err: &FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        FrameError::Serialization(_)
        | FrameError::Deserialization(_)
        | FrameError::FrameTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}

pub fn peer_error(context: &str, err: &PeerError) -> CliError {
    match err {
        PeerError::Transport(err) => transport_error(context, err),
        PeerError::Frame(err) => frame_error(context, err),
        PeerError::Ended | PeerError::NotConnected => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use eventwire_transport::Address;

    use super::*;

    #[test]
    fn connect_refused_is_transport_error() {
        let err = PeerError::Transport(TransportError::Connect {
            address: Address::tcp_port(1),
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        });
        let cli = peer_error("connect failed", &err);
        assert_eq!(cli.code, TRANSPORT_ERROR);
        assert!(cli.message.starts_with("connect failed: "));
    }

    #[test]
    fn permission_denied_keeps_its_code() {
        let err = TransportError::Bind {
            address: Address::tcp_port(80),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert_eq!(transport_error("bind failed", &err).code, PERMISSION_DENIED);
    }

    #[test]
    fn codec_failures_are_invalid_data() {
        let err = PeerError::Frame(FrameError::FrameTooLarge { size: 10, max: 1 });
        assert_eq!(peer_error("emit failed", &err).code, DATA_INVALID);
    }

    #[test]
    fn bad_address_is_usage() {
        let err = TransportError::InvalidAddress("tcp://nope".into());
        assert_eq!(transport_error("listen", &err).code, USAGE);
    }

    #[test]
    fn misuse_is_internal() {
        assert_eq!(peer_error("close", &PeerError::NotListening).code, INTERNAL);
    }
}
