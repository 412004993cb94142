//! Provider and Consumer endpoints for named JSON events.
//!
//! A [`Provider`] connects to one address and emits named events with
//! positional JSON arguments. A [`Consumer`] listens, and exposes every
//! accepted connection as an [`EventSource`] whose subscribers receive the
//! decoded events in order.
//!
//! Errors and connection ends are reported as notifications on dedicated
//! channels (`on_error`, `on_close`) rather than through return values,
//! except for misuse, which is returned directly.

pub mod config;
pub mod consumer;
pub mod emitter;
pub mod error;
pub mod provider;
pub mod source;

pub use config::{ConsumerConfig, ProviderConfig, DEFAULT_SOCKET_MODE};
pub use consumer::Consumer;
pub use emitter::{
    EventEmitter, Subscription, CLOSE_EVENT, CONNECTION_EVENT, ERROR_EVENT, MESSAGE_EVENT,
};
pub use error::{PeerError, Result};
pub use provider::Provider;
pub use source::EventSource;
