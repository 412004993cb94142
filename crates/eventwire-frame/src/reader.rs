use std::io::{ErrorKind, Read};

use bytes::Bytes;
use eventwire_transport::Stream;
use tracing::trace;

use crate::codec::{decode, FrameConfig, Message};
use crate::error::{transport_to_frame_error, FrameError, Result};
use crate::splitter::FrameSplitter;

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete messages from any `Read` stream.
///
/// Handles partial reads internally: callers always get complete messages.
/// At end-of-stream an unterminated trailing frame is still delivered.
pub struct MessageReader<T> {
    inner: T,
    splitter: FrameSplitter,
    config: FrameConfig,
    eof: bool,
}

impl<T: Read> MessageReader<T> {
    /// Create a message reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a message reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            splitter: FrameSplitter::with_max_frame_size(config.max_frame_size),
            config,
            eof: false,
        }
    }

    /// Read the next raw frame (separator stripped), blocking as needed.
    ///
    /// Returns `Ok(None)` once the stream has ended and nothing is left.
    pub fn read_frame(&mut self) -> Result<Option<Bytes>> {
        loop {
            if let Some(frame) = self.splitter.next_frame()? {
                return Ok(Some(frame));
            }
            if self.eof {
                return Ok(None);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                self.eof = true;
                if let Some(rest) = self.splitter.finish()? {
                    trace!(len = rest.len(), "flushing unterminated frame at end of stream");
                    return Ok(Some(rest));
                }
                return Ok(None);
            }

            self.splitter.append(&chunk[..read]);
        }
    }

    /// Read and decode the next message.
    ///
    /// Returns `Ok(None)` after a clean end-of-stream. A decode error leaves
    /// the stream positioned after the bad frame, but callers are expected to
    /// treat it as fatal for the connection.
    pub fn read_message(&mut self) -> Result<Option<Message>> {
        match self.read_frame()? {
            Some(frame) => decode(&frame).map(Some),
            None => Ok(None),
        }
    }

    /// Whether end-of-stream has been observed.
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl MessageReader<Stream> {
    /// Create a reader for a transport `Stream` and apply the read timeout from config.
    pub fn with_config_stream(inner: Stream, config: FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};

    use bytes::BytesMut;
    use serde_json::json;

    use super::*;
    use crate::codec::encode_frame;
    use crate::writer::MessageWriter;

    fn wire(messages: &[Message]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for message in messages {
            encode_frame(message, &mut buf).unwrap();
        }
        buf.to_vec()
    }

    #[test]
    fn read_single_message() {
        let sent = Message::new("greet", vec![json!({ "name": "Ada" })]);
        let mut reader = MessageReader::new(Cursor::new(wire(&[sent.clone()])));

        assert_eq!(reader.read_message().unwrap(), Some(sent));
        assert_eq!(reader.read_message().unwrap(), None);
        assert!(reader.is_eof());
    }

    #[test]
    fn read_batched_messages_in_order() {
        let mut reader = MessageReader::new(Cursor::new(
            b"{\"event\":\"a\",\"args\":[1]}\n{\"event\":\"a\",\"args\":[2]}\n".to_vec(),
        ));

        let first = reader.read_message().unwrap().unwrap();
        let second = reader.read_message().unwrap().unwrap();
        assert_eq!(first, Message::new("a", vec![json!(1)]));
        assert_eq!(second, Message::new("a", vec![json!(2)]));
        assert!(reader.read_message().unwrap().is_none());
    }

    #[test]
    fn flushes_unterminated_message_at_eof() {
        let mut bytes = wire(&[Message::new("last", vec![json!("x")])]);
        bytes.pop();

        let mut reader = MessageReader::new(Cursor::new(bytes));
        let message = reader.read_message().unwrap().unwrap();
        assert_eq!(message.event, "last");
        assert!(reader.read_message().unwrap().is_none());
    }

    #[test]
    fn empty_stream_is_clean_eof() {
        let mut reader = MessageReader::new(Cursor::new(Vec::<u8>::new()));
        assert!(reader.read_message().unwrap().is_none());
    }

    #[test]
    fn byte_at_a_time_delivery() {
        let sent = vec![
            Message::new("one", vec![json!(1)]),
            Message::new("two", vec![json!("zwei"), json!(null)]),
        ];
        let mut reader = MessageReader::new(ByteByByteReader {
            bytes: wire(&sent),
            pos: 0,
        });

        let mut received = Vec::new();
        while let Some(message) = reader.read_message().unwrap() {
            received.push(message);
        }
        assert_eq!(received, sent);
    }

    #[test]
    fn malformed_frame_is_deserialization_error() {
        let mut reader = MessageReader::new(Cursor::new(b"not-json\n".to_vec()));
        let err = reader.read_message().unwrap_err();
        assert!(matches!(err, FrameError::Deserialization(_)));
    }

    #[test]
    fn oversized_frame_in_stream() {
        let cfg = FrameConfig {
            max_frame_size: 16,
            ..FrameConfig::default()
        };
        let bytes = wire(&[Message::new("big", vec![json!("x".repeat(64))])]);
        let mut reader = MessageReader::with_config(Cursor::new(bytes), cfg);
        let err = reader.read_message().unwrap_err();
        assert!(matches!(err, FrameError::FrameTooLarge { .. }));
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }

            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    #[test]
    #[cfg(unix)]
    fn roundtrip_over_socket_pair() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = MessageWriter::new(left);
        let mut reader = MessageReader::new(right);

        let sent = Message::new("ping", vec![json!({ "seq": 1 })]);
        writer.send(&sent).unwrap();
        assert_eq!(reader.read_message().unwrap(), Some(sent));
    }

    #[test]
    #[cfg(unix)]
    fn concurrent_reader_writer_threads() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = MessageWriter::new(left);
        let reader = Arc::new(Mutex::new(MessageReader::new(right)));

        let reader_thread = {
            let reader = Arc::clone(&reader);
            std::thread::spawn(move || {
                for expected in 0..64u64 {
                    let message = reader.lock().unwrap().read_message().unwrap().unwrap();
                    assert_eq!(message.event, format!("msg-{}", expected % 5));
                    assert_eq!(message.args, vec![json!(expected)]);
                }
            })
        };

        for i in 0..64u64 {
            writer
                .send(&Message::new(format!("msg-{}", i % 5), vec![json!(i)]))
                .unwrap();
        }

        reader_thread.join().unwrap();
    }

    #[test]
    fn accessors_and_into_inner() {
        let cursor = Cursor::new(Vec::<u8>::new());
        let mut reader = MessageReader::new(cursor);

        let _ = reader.get_ref();
        let _ = reader.get_mut();
        assert_eq!(reader.config().max_frame_size, crate::DEFAULT_MAX_FRAME);
        let _inner = reader.into_inner();
    }

    #[test]
    fn read_would_block_propagates_io_error() {
        let reader = WouldBlockThenData {
            state: 0,
            bytes: wire(&[Message::new("ok", vec![])]),
            pos: 0,
            kind: ErrorKind::WouldBlock,
        };
        let mut framed = MessageReader::new(reader);
        let err = framed.read_message().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::WouldBlock));
    }

    #[test]
    fn interrupted_read_retries() {
        let reader = WouldBlockThenData {
            state: 0,
            bytes: wire(&[Message::new("ok", vec![])]),
            pos: 0,
            kind: ErrorKind::Interrupted,
        };
        let mut framed = MessageReader::new(reader);
        let message = framed.read_message().unwrap().unwrap();
        assert_eq!(message.event, "ok");
    }

    struct WouldBlockThenData {
        state: u8,
        bytes: Vec<u8>,
        pos: usize,
        kind: ErrorKind,
    }

    impl Read for WouldBlockThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.state == 0 {
                self.state = 1;
                return Err(std::io::Error::from(self.kind));
            }
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            let remaining = self.bytes.len() - self.pos;
            let n = remaining.min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn roundtrip_over_tcp_stream() {
        let listener = eventwire_transport::TcpSocket::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().to_string();

        let server = std::thread::spawn(move || {
            let stream = listener.accept().unwrap();
            let mut reader =
                MessageReader::with_config_stream(stream, FrameConfig::default()).unwrap();
            let message = reader.read_message().unwrap().unwrap();
            assert_eq!(message, Message::new("tcp", vec![json!([1, 2])]));
            assert!(reader.read_message().unwrap().is_none());
        });

        let stream = eventwire_transport::TcpSocket::connect(&addr).unwrap();
        let mut writer = MessageWriter::new(stream);
        writer
            .send(&Message::new("tcp", vec![json!([1, 2])]))
            .unwrap();
        drop(writer);

        server.join().unwrap();
    }
}
