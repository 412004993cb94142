//! `tokio_util` codec for the newline-delimited message format.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode, encode_frame, Message, DEFAULT_MAX_FRAME};
use crate::error::{FrameError, Result};
use crate::separator::{self, SEPARATOR};

/// Codec for use with `FramedRead`, `FramedWrite` and `Framed`.
///
/// Decoding flushes an unterminated trailing frame at end-of-stream.
#[derive(Debug, Clone)]
pub struct MessageCodec {
    max_frame_size: usize,
    scanned: usize,
}

impl MessageCodec {
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME)
    }

    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            max_frame_size,
            scanned: 0,
        }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Default for MessageCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for MessageCodec {
    type Item = Message;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>> {
        // Back up so a separator split across reads is still found.
        let from = self.scanned.saturating_sub(SEPARATOR.len() - 1);
        match separator::find(&src[..], SEPARATOR, from) {
            Some(pos) => {
                self.scanned = 0;
                if pos > self.max_frame_size {
                    return Err(FrameError::FrameTooLarge {
                        size: pos,
                        max: self.max_frame_size,
                    });
                }
                let frame = src.split_to(pos);
                src.advance(SEPARATOR.len());
                decode(&frame).map(Some)
            }
            None if src.len() > self.max_frame_size => Err(FrameError::FrameTooLarge {
                size: src.len(),
                max: self.max_frame_size,
            }),
            None => {
                self.scanned = src.len();
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Message>> {
        if let Some(message) = self.decode(src)? {
            return Ok(Some(message));
        }
        if src.is_empty() {
            return Ok(None);
        }
        self.scanned = 0;
        let frame = src.split();
        decode(&frame).map(Some)
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<()> {
        <Self as Encoder<&Message>>::encode(self, &item, dst)
    }
}

impl Encoder<&Message> for MessageCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &Message, dst: &mut BytesMut) -> Result<()> {
        let start = dst.len();
        encode_frame(item, dst)?;
        let body = dst.len() - start - SEPARATOR.len();
        if body > self.max_frame_size {
            dst.truncate(start);
            return Err(FrameError::FrameTooLarge {
                size: body,
                max: self.max_frame_size,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use futures_util::{SinkExt, StreamExt};
    use serde_json::json;
    use tokio_util::codec::{FramedRead, FramedWrite};

    use super::*;

    #[tokio::test]
    async fn reads_messages_and_flushes_tail() {
        let wire: &[u8] = b"{\"event\":\"a\",\"args\":[1]}\n{\"event\":\"b\",\"args\":[]}";
        let mut framed = FramedRead::new(wire, MessageCodec::new());

        let first = framed.next().await.unwrap().unwrap();
        let second = framed.next().await.unwrap().unwrap();
        assert_eq!(first, Message::new("a", vec![json!(1)]));
        assert_eq!(second, Message::new("b", vec![]));
        assert!(framed.next().await.is_none());
    }

    #[tokio::test]
    async fn write_then_read_back() {
        let mut sink = FramedWrite::new(Vec::new(), MessageCodec::new());
        sink.send(Message::new("greet", vec![json!({ "name": "Ada" })]))
            .await
            .unwrap();
        sink.send(Message::new("bye", vec![])).await.unwrap();

        let wire = sink.into_inner();
        let mut framed = FramedRead::new(wire.as_slice(), MessageCodec::new());
        assert_eq!(framed.next().await.unwrap().unwrap().event, "greet");
        assert_eq!(framed.next().await.unwrap().unwrap().event, "bye");
        assert!(framed.next().await.is_none());
    }

    #[tokio::test]
    async fn malformed_frame_surfaces_error() {
        let wire: &[u8] = b"not-json\n";
        let mut framed = FramedRead::new(wire, MessageCodec::new());
        let err = framed.next().await.unwrap().unwrap_err();
        assert!(matches!(err, FrameError::Deserialization(_)));
    }

    #[test]
    fn decode_resumes_across_partial_input() {
        let mut codec = MessageCodec::new();
        let mut buf = BytesMut::from(&b"{\"event\":\"a\","[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"\"args\":[]}\n{\"ev");
        let message = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(message.event, "a");
        assert_eq!(&buf[..], b"{\"ev");
    }

    #[test]
    fn oversized_input_is_rejected() {
        let mut codec = MessageCodec::with_max_frame_size(4);
        let mut buf = BytesMut::from(&b"12345"[..]);
        let err = codec.decode(&mut buf).unwrap_err();
        assert!(matches!(err, FrameError::FrameTooLarge { size: 5, max: 4 }));
    }

    #[test]
    fn oversized_encode_leaves_buffer_untouched() {
        let mut codec = MessageCodec::with_max_frame_size(4);
        let mut buf = BytesMut::from(&b"keep"[..]);
        let err = Encoder::<Message>::encode(&mut codec, Message::new("toolong", vec![]), &mut buf)
            .unwrap_err();
        assert!(matches!(err, FrameError::FrameTooLarge { .. }));
        assert_eq!(&buf[..], b"keep");
    }
}
