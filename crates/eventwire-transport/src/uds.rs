use std::io::ErrorKind;
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::address::Address;
use crate::error::{Result, TransportError};
use crate::stream::Stream;

/// Unix domain socket transport.
///
/// Provides bind/accept/connect over filesystem-path UDS on Linux and macOS.
/// The socket file is removed on `Drop` if it is still the one we created.
pub struct UnixDomainSocket {
    listener: UnixListener,
    path: PathBuf,
    created_inode: Option<(u64, u64)>,
}

impl UnixDomainSocket {
    /// Default permission mode for created socket paths.
    pub const DEFAULT_SOCKET_MODE: u32 = 0o600;
    /// Maximum socket path length.
    /// Unix `sockaddr_un.sun_path` is typically 108 bytes on Linux, 104 on macOS.
    #[cfg(target_os = "linux")]
    const MAX_PATH_LEN: usize = 108;
    #[cfg(not(target_os = "linux"))]
    const MAX_PATH_LEN: usize = 104;

    /// Bind and listen on a filesystem-path Unix domain socket.
    ///
    /// An existing socket file at `path` fails with `AddrInUse` and is left
    /// alone; the owner is never contacted. A non-socket file fails with
    /// `AlreadyExists`.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        Self::bind_with_mode(path, Self::DEFAULT_SOCKET_MODE)
    }

    /// Bind and listen on a filesystem-path Unix domain socket with explicit mode.
    pub fn bind_with_mode(path: impl AsRef<Path>, mode: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let path_bytes = path.as_os_str().len();
        if path_bytes >= Self::MAX_PATH_LEN {
            return Err(TransportError::PathTooLong {
                path,
                len: path_bytes,
                max: Self::MAX_PATH_LEN,
            });
        }

        let bind_err = |source: std::io::Error| TransportError::Bind {
            address: Address::Unix(path.clone()),
            source,
        };

        if let Ok(metadata) = std::fs::symlink_metadata(&path) {
            let (kind, reason) = if metadata.file_type().is_socket() {
                (
                    ErrorKind::AddrInUse,
                    "socket path already exists; remove it if nothing listens on it",
                )
            } else {
                (ErrorKind::AlreadyExists, "existing path is not a unix socket")
            };
            return Err(bind_err(std::io::Error::new(kind, reason)));
        }

        let listener = UnixListener::bind(&path).map_err(bind_err)?;

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode))
            .map_err(bind_err)?;
        let created_metadata = std::fs::symlink_metadata(&path).map_err(bind_err)?;
        let created_inode = Some((created_metadata.dev(), created_metadata.ino()));

        info!(?path, "listening on unix domain socket");

        Ok(Self {
            listener,
            path,
            created_inode,
        })
    }

    /// Accept an incoming connection (blocking unless non-blocking mode is set).
    pub fn accept(&self) -> Result<Stream> {
        let (stream, _addr) = self.listener.accept().map_err(TransportError::Accept)?;
        stream.set_nonblocking(false)?;
        debug!(path = ?self.path, "accepted connection");
        Ok(Stream::from_unix(stream))
    }

    /// Switch the listener between blocking and non-blocking accept.
    pub fn set_nonblocking(&self, nonblocking: bool) -> Result<()> {
        self.listener
            .set_nonblocking(nonblocking)
            .map_err(Into::into)
    }

    /// Connect to a listening Unix domain socket (blocking).
    pub fn connect(path: impl AsRef<Path>) -> Result<Stream> {
        let path = path.as_ref();
        let stream = UnixStream::connect(path).map_err(|e| TransportError::Connect {
            address: Address::Unix(path.to_path_buf()),
            source: e,
        })?;
        debug!(?path, "connected to unix domain socket");
        Ok(Stream::from_unix(stream))
    }

    /// The path this socket is bound to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        "unix-domain-socket"
    }
}

impl Drop for UnixDomainSocket {
    fn drop(&mut self) {
        if let Some((expected_dev, expected_ino)) = self.created_inode {
            if let Ok(metadata) = std::fs::symlink_metadata(&self.path) {
                if metadata.file_type().is_socket()
                    && metadata.dev() == expected_dev
                    && metadata.ino() == expected_ino
                {
                    debug!(path = ?self.path, "cleaning up socket file");
                    let _ = std::fs::remove_file(&self.path);
                } else {
                    debug!(
                        path = ?self.path,
                        "socket path identity changed; skipping cleanup"
                    );
                }
            }
        }
    }
}
