//! Byte-stream transports for eventwire.
//!
//! Provides a unified interface over:
//! - Unix domain sockets (Linux/macOS)
//! - TCP
//!
//! This is the lowest layer of eventwire. Everything else builds on top of
//! the [`Stream`] and [`Listener`] types provided here.

pub mod address;
pub mod error;
pub mod listener;
pub mod stream;
pub mod tcp;

#[cfg(unix)]
pub mod uds;

pub use address::Address;
pub use error::{Result, TransportError};
pub use listener::{connect, Listener};
pub use stream::Stream;
pub use tcp::TcpSocket;

#[cfg(unix)]
pub use uds::UnixDomainSocket;
