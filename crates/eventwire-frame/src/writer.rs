use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use eventwire_transport::Stream;

use crate::codec::{encode_frame, FrameConfig, Message};
use crate::error::{transport_to_frame_error, FrameError, Result};
use crate::separator::SEPARATOR;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes complete messages to any `Write` stream.
pub struct MessageWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> MessageWriter<T> {
    /// Create a message writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a message writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Encode and send one message (blocking).
    ///
    /// Nothing reaches the stream if the message cannot be encoded.
    pub fn send(&mut self, message: &Message) -> Result<()> {
        let mut buf = std::mem::take(&mut self.buf);
        buf.clear();
        let result = encode_frame(message, &mut buf).and_then(|()| self.write_frame(&buf));
        self.buf = buf;
        result
    }

    /// Write one already-encoded frame, separator included, and flush.
    ///
    /// `WouldBlock` and `TimedOut` are returned as errors: on a blocking
    /// stream they mean the configured write timeout expired.
    pub fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        let body = frame.len().saturating_sub(SEPARATOR.len());
        if body > self.config.max_frame_size {
            return Err(FrameError::FrameTooLarge {
                size: body,
                max: self.config.max_frame_size,
            });
        }

        let mut offset = 0usize;
        while offset < frame.len() {
            match self.inner.write(&frame[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl MessageWriter<Stream> {
    /// Create a writer for a transport `Stream` and apply the write timeout from config.
    pub fn with_config_stream(inner: Stream, config: FrameConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}
