//! Newline-delimited JSON framing for named events.
//!
//! Every frame is one compact JSON object `{"event":..,"args":[..]}`
//! followed by [`SEPARATOR`]. Bytes arrive at arbitrary boundaries; the
//! [`FrameSplitter`] reassembles them into complete frames and the codec
//! turns frames into [`Message`]s.
//!
//! No partial reads, no buffer management in user code.

pub mod buffer;
pub mod codec;
pub mod error;
#[cfg(feature = "async")]
pub mod framed;
pub mod reader;
pub mod separator;
pub mod splitter;
pub mod writer;

pub use buffer::ReceiveBuffer;
pub use codec::{decode, encode, encode_frame, FrameConfig, Message, DEFAULT_MAX_FRAME};
pub use error::{FrameError, Result};
#[cfg(feature = "async")]
pub use framed::MessageCodec;
pub use reader::MessageReader;
pub use separator::SEPARATOR;
pub use splitter::{FrameSplitter, Frames};
pub use writer::MessageWriter;
