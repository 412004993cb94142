use std::fmt;
use std::io::Read;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use eventwire_frame::{Message, MessageReader};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::emitter::{EventEmitter, Subscription, CLOSE_EVENT, ERROR_EVENT, MESSAGE_EVENT};
use crate::error::PeerError;

/// The receiving side of one accepted connection.
///
/// Every decoded message is published as an event named after the
/// message, with its argument list as the payload. Cloning is cheap and
/// every clone refers to the same connection.
#[derive(Clone)]
pub struct EventSource {
    inner: Arc<SourceInner>,
}

struct SourceInner {
    id: String,
    peer: String,
    events: EventEmitter<[Value]>,
    messages: EventEmitter<Message>,
    errors: EventEmitter<PeerError>,
    closes: EventEmitter<bool>,
    closed: AtomicBool,
    received: AtomicU64,
}

impl EventSource {
    pub(crate) fn new(id: String, peer: String) -> Self {
        Self {
            inner: Arc::new(SourceInner {
                id,
                peer,
                events: EventEmitter::new(),
                messages: EventEmitter::new(),
                errors: EventEmitter::new(),
                closes: EventEmitter::new(),
                closed: AtomicBool::new(false),
                received: AtomicU64::new(0),
            }),
        }
    }

    /// Connection identifier, `conn-N`, unique within its Consumer.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Human-readable label of the remote end.
    pub fn peer(&self) -> &str {
        &self.inner.peer
    }

    /// Whether the decode pipeline has finished.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Number of messages published so far.
    pub fn received(&self) -> u64 {
        self.inner.received.load(Ordering::Relaxed)
    }

    pub fn on<F>(&self, event: impl Into<String>, handler: F) -> Subscription
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        self.inner.events.on(event, handler)
    }

    pub fn once<F>(&self, event: impl Into<String>, handler: F) -> Subscription
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        self.inner.events.once(event, handler)
    }

    /// Subscribe to every message regardless of its event name.
    ///
    /// Runs after the handlers registered for that name.
    pub fn on_message<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        self.inner.messages.on(MESSAGE_EVENT, handler)
    }

    /// Subscribe to transport and decode errors on this connection.
    pub fn on_error<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&PeerError) + Send + Sync + 'static,
    {
        self.inner.errors.on(ERROR_EVENT, handler)
    }

    /// Subscribe to the end of this connection. The flag is true when the
    /// pipeline stopped because of an error.
    pub fn on_close<F>(&self, handler: F) -> Subscription
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.inner
            .closes
            .on(CLOSE_EVENT, move |had_error: &bool| handler(*had_error))
    }

    /// Remove a subscription made through any of the `on*` methods.
    pub fn off(&self, subscription: &Subscription) -> bool {
        self.inner.events.off(subscription)
            || self.inner.messages.off(subscription)
            || self.inner.errors.off(subscription)
            || self.inner.closes.off(subscription)
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.inner.events.listener_count(event)
    }

    /// Drive the decode pipeline until the stream ends or fails.
    ///
    /// Runs on the connection's reader thread. Messages are published in
    /// arrival order; the first error is published and ends the pipeline.
    pub(crate) fn run<R: Read>(&self, mut reader: MessageReader<R>) {
        let inner = &self.inner;
        let had_error = loop {
            match reader.read_message() {
                Ok(Some(message)) => {
                    inner.received.fetch_add(1, Ordering::Relaxed);
                    trace!(
                        id = %inner.id,
                        event = %message.event,
                        args = message.args.len(),
                        "event received"
                    );
                    inner.events.emit(&message.event, &message.args);
                    inner.messages.emit(MESSAGE_EVENT, &message);
                }
                Ok(None) => break false,
                Err(err) => {
                    self.publish_error(err.into());
                    break true;
                }
            }
        };
        drop(reader);

        debug!(
            id = %inner.id,
            received = inner.received.load(Ordering::Relaxed),
            had_error,
            "connection closed"
        );
        inner.closed.store(true, Ordering::Release);
        inner.closes.emit(CLOSE_EVENT, &had_error);
    }

    fn publish_error(&self, err: PeerError) {
        if !self.inner.errors.emit(ERROR_EVENT, &err) {
            warn!(id = %self.inner.id, error = %err, "unhandled connection error");
        }
    }
}

impl fmt::Debug for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSource")
            .field("id", &self.inner.id)
            .field("peer", &self.inner.peer)
            .field("closed", &self.is_closed())
            .finish()
    }
}
