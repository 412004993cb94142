use std::io::ErrorKind;

use crate::address::Address;
use crate::error::{Result, TransportError};
use crate::stream::Stream;
use crate::tcp::TcpSocket;
#[cfg(unix)]
use crate::uds::UnixDomainSocket;

/// A bound, listening endpoint of either transport.
pub enum Listener {
    #[cfg(unix)]
    Unix(UnixDomainSocket),
    Tcp(TcpSocket),
}

impl Listener {
    /// Bind `address` with default socket permissions.
    pub fn bind(address: &Address) -> Result<Self> {
        #[cfg(unix)]
        {
            Self::bind_with_mode(address, UnixDomainSocket::DEFAULT_SOCKET_MODE)
        }
        #[cfg(not(unix))]
        {
            Self::bind_with_mode(address, 0)
        }
    }

    /// Bind `address`; `mode` applies to Unix socket files only.
    pub fn bind_with_mode(address: &Address, mode: u32) -> Result<Self> {
        match address {
            #[cfg(unix)]
            Address::Unix(path) => Ok(Listener::Unix(UnixDomainSocket::bind_with_mode(
                path, mode,
            )?)),
            #[cfg(not(unix))]
            Address::Unix(_) => {
                let _ = mode;
                Err(unsupported(address, TransportErrorKind::Bind))
            }
            Address::Tcp(addr) => Ok(Listener::Tcp(TcpSocket::bind(addr)?)),
        }
    }

    /// Accept an incoming connection.
    pub fn accept(&self) -> Result<Stream> {
        match self {
            #[cfg(unix)]
            Listener::Unix(socket) => socket.accept(),
            Listener::Tcp(socket) => socket.accept(),
        }
    }

    /// Accept without blocking (after `set_nonblocking(true)`).
    ///
    /// Returns `Ok(None)` when no client is waiting.
    pub fn try_accept(&self) -> Result<Option<Stream>> {
        match self.accept() {
            Ok(stream) => Ok(Some(stream)),
            Err(TransportError::Accept(err))
                if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) =>
            {
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Switch the listener between blocking and non-blocking accept.
    pub fn set_nonblocking(&self, nonblocking: bool) -> Result<()> {
        match self {
            #[cfg(unix)]
            Listener::Unix(socket) => socket.set_nonblocking(nonblocking),
            Listener::Tcp(socket) => socket.set_nonblocking(nonblocking),
        }
    }

    /// The address this listener is bound to, with the real port for TCP.
    pub fn local_address(&self) -> Address {
        match self {
            #[cfg(unix)]
            Listener::Unix(socket) => Address::Unix(socket.path().to_path_buf()),
            Listener::Tcp(socket) => Address::from(socket.local_addr()),
        }
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match self {
            #[cfg(unix)]
            Listener::Unix(socket) => socket.transport_name(),
            Listener::Tcp(socket) => socket.transport_name(),
        }
    }
}

/// Connect to a listening endpoint.
pub fn connect(address: &Address) -> Result<Stream> {
    match address {
        #[cfg(unix)]
        Address::Unix(path) => UnixDomainSocket::connect(path),
        #[cfg(not(unix))]
        Address::Unix(_) => Err(unsupported(address, TransportErrorKind::Connect)),
        Address::Tcp(addr) => TcpSocket::connect(addr),
    }
}

#[cfg(not(unix))]
enum TransportErrorKind {
    Bind,
    Connect,
}

#[cfg(not(unix))]
fn unsupported(address: &Address, kind: TransportErrorKind) -> TransportError {
    let source = std::io::Error::new(
        ErrorKind::Unsupported,
        "unix domain sockets are not available on this platform",
    );
    match kind {
        TransportErrorKind::Bind => TransportError::Bind {
            address: address.clone(),
            source,
        },
        TransportErrorKind::Connect => TransportError::Connect {
            address: address.clone(),
            source,
        },
    }
}
