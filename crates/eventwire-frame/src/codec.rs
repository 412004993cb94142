use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{FrameError, Result};
use crate::separator::{self, SEPARATOR};

/// Default maximum frame size: 16 MiB.
pub const DEFAULT_MAX_FRAME: usize = 16 * 1024 * 1024;

const EMPTY_EVENT: &str = "event name must not be empty";

/// One named event and its argument list: the unit of transmission.
///
/// Wire form: `{"event":"greet","args":[{"name":"Ada"}]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Event name. Never empty.
    #[serde(
        serialize_with = "serialize_event",
        deserialize_with = "deserialize_event"
    )]
    pub event: String,
    /// Positional arguments, delivered to handlers one element per argument.
    pub args: Vec<Value>,
}

impl Message {
    /// Create a message from an event name and argument list.
    pub fn new(event: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            event: event.into(),
            args,
        }
    }

    /// Build a message from any value that serializes to a JSON array.
    ///
    /// Tuples, vectors and slices all qualify; `()` means no arguments.
    pub fn from_serialize<T: Serialize + ?Sized>(
        event: impl Into<String>,
        args: &T,
    ) -> Result<Self> {
        let args = match serde_json::to_value(args).map_err(FrameError::Serialization)? {
            Value::Array(args) => args,
            Value::Null => Vec::new(),
            other => {
                return Err(FrameError::Serialization(serde::ser::Error::custom(
                    format!("arguments must serialize to a JSON array, got {}", kind(&other)),
                )))
            }
        };
        Ok(Self::new(event, args))
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn serialize_event<S: Serializer>(
    event: &str,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    if event.is_empty() {
        return Err(serde::ser::Error::custom(EMPTY_EVENT));
    }
    serializer.serialize_str(event)
}

fn deserialize_event<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<String, D::Error> {
    let event = String::deserialize(deserializer)?;
    if event.is_empty() {
        return Err(serde::de::Error::custom(EMPTY_EVENT));
    }
    Ok(event)
}

/// Serialize a message to compact JSON text (no separator).
pub fn encode(message: &Message) -> Result<String> {
    let text = serde_json::to_string(message).map_err(FrameError::Serialization)?;
    debug_assert!(!separator::contains(text.as_bytes()));
    Ok(text)
}

/// Parse one frame (separator already stripped) back into a message.
///
/// Only a JSON object qualifies; serde's positional form (`["a",[]]`) is
/// rejected.
pub fn decode(frame: &[u8]) -> Result<Message> {
    let value: Value = serde_json::from_slice(frame).map_err(FrameError::Deserialization)?;
    if !value.is_object() {
        return Err(FrameError::Deserialization(serde::de::Error::custom(
            format!("expected a JSON object, got {}", kind(&value)),
        )));
    }
    Message::deserialize(value).map_err(FrameError::Deserialization)
}

/// Encode a message into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────────────────────────────────┬──────┐
/// │ {"event":<string>,"args":<array>}        │ 0x0A │
/// │ compact UTF-8 JSON                       │ "\n" │
/// └──────────────────────────────────────────┴──────┘
/// ```
///
/// Nothing is appended to `dst` when serialization fails.
pub fn encode_frame(message: &Message, dst: &mut BytesMut) -> Result<()> {
    let text = encode(message)?;
    dst.reserve(text.len() + SEPARATOR.len());
    dst.put_slice(text.as_bytes());
    dst.put_slice(SEPARATOR);
    Ok(())
}

/// Configuration for frame reading and writing.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum size of a single frame in bytes. Default: 16 MiB.
    pub max_frame_size: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
