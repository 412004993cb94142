use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use crate::error::Result;

/// A connected byte stream: implements Read + Write.
///
/// This is the fundamental I/O type returned by transport operations.
/// It wraps either a Unix domain socket stream or a TCP stream.
pub struct Stream {
    inner: StreamInner,
}

enum StreamInner {
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
    Tcp(TcpStream),
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            StreamInner::Unix(stream) => stream.read(buf),
            StreamInner::Tcp(stream) => stream.read(buf),
        }
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            StreamInner::Unix(stream) => stream.write(buf),
            StreamInner::Tcp(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            StreamInner::Unix(stream) => stream.flush(),
            StreamInner::Tcp(stream) => stream.flush(),
        }
    }
}

impl Stream {
    /// Create a Stream from a Unix domain socket stream.
    #[cfg(unix)]
    pub(crate) fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: StreamInner::Unix(stream),
        }
    }

    /// Create a Stream from a TCP stream.
    pub(crate) fn from_tcp(stream: TcpStream) -> Self {
        Self {
            inner: StreamInner::Tcp(stream),
        }
    }

    /// Set read timeout on the underlying stream.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            StreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            StreamInner::Tcp(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            StreamInner::Unix(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
            StreamInner::Tcp(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
        }
    }

    /// Switch the stream between blocking and non-blocking mode.
    pub fn set_nonblocking(&self, nonblocking: bool) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            StreamInner::Unix(stream) => stream.set_nonblocking(nonblocking).map_err(Into::into),
            StreamInner::Tcp(stream) => stream.set_nonblocking(nonblocking).map_err(Into::into),
        }
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            #[cfg(unix)]
            StreamInner::Unix(stream) => Ok(Self::from_unix(stream.try_clone()?)),
            StreamInner::Tcp(stream) => Ok(Self::from_tcp(stream.try_clone()?)),
        }
    }

    /// Shut down the write half; the peer observes end-of-stream.
    pub fn shutdown_write(&self) -> Result<()> {
        self.shutdown(Shutdown::Write)
    }

    /// Shut down one or both halves of the connection.
    pub fn shutdown(&self, how: Shutdown) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            StreamInner::Unix(stream) => stream.shutdown(how).map_err(Into::into),
            StreamInner::Tcp(stream) => stream.shutdown(how).map_err(Into::into),
        }
    }

    /// Human-readable description of the remote end, for logs.
    pub fn peer_label(&self) -> String {
        match &self.inner {
            #[cfg(unix)]
            StreamInner::Unix(_) => "unix".to_string(),
            StreamInner::Tcp(stream) => stream
                .peer_addr()
                .map(|addr| addr.to_string())
                .unwrap_or_else(|_| "tcp".to_string()),
        }
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match &self.inner {
            #[cfg(unix)]
            StreamInner::Unix(_) => "unix-domain-socket",
            StreamInner::Tcp(_) => "tcp",
        }
    }
}

impl std::fmt::Debug for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            #[cfg(unix)]
            StreamInner::Unix(_) => f.debug_struct("Stream").field("type", &"unix").finish(),
            StreamInner::Tcp(stream) => f
                .debug_struct("Stream")
                .field("type", &"tcp")
                .field("peer", &stream.peer_addr().ok())
                .finish(),
        }
    }
}
