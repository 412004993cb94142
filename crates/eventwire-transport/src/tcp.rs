use std::net::{SocketAddr, TcpListener, TcpStream};

use tracing::{debug, info};

use crate::address::Address;
use crate::error::{Result, TransportError};
use crate::stream::Stream;

/// TCP transport.
///
/// Mirrors [`UnixDomainSocket`](crate::UnixDomainSocket) for `host:port`
/// endpoints. Binding port 0 picks a free port; see [`TcpSocket::local_addr`].
pub struct TcpSocket {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl TcpSocket {
    /// Bind and listen on `addr` (`host:port`).
    pub fn bind(addr: &str) -> Result<Self> {
        let bind_err = |source: std::io::Error| TransportError::Bind {
            address: Address::Tcp(addr.to_string()),
            source,
        };

        let listener = TcpListener::bind(addr).map_err(bind_err)?;
        let local_addr = listener.local_addr().map_err(bind_err)?;

        info!(%local_addr, "listening on tcp");

        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Accept an incoming connection (blocking unless non-blocking mode is set).
    pub fn accept(&self) -> Result<Stream> {
        let (stream, peer) = self.listener.accept().map_err(TransportError::Accept)?;
        stream.set_nonblocking(false)?;
        stream.set_nodelay(true)?;
        debug!(%peer, "accepted connection");
        Ok(Stream::from_tcp(stream))
    }

    /// Switch the listener between blocking and non-blocking accept.
    pub fn set_nonblocking(&self, nonblocking: bool) -> Result<()> {
        self.listener
            .set_nonblocking(nonblocking)
            .map_err(Into::into)
    }

    /// Connect to a listening TCP endpoint (blocking).
    pub fn connect(addr: &str) -> Result<Stream> {
        let stream = TcpStream::connect(addr).map_err(|e| TransportError::Connect {
            address: Address::Tcp(addr.to_string()),
            source: e,
        })?;
        stream.set_nodelay(true)?;
        debug!(addr, "connected to tcp endpoint");
        Ok(Stream::from_tcp(stream))
    }

    /// The address actually bound, with the real port when 0 was requested.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        "tcp"
    }
}
