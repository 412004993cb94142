use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use bytes::{Bytes, BytesMut};
use eventwire_frame::{encode_frame, FrameConfig, FrameError, Message, MessageWriter, SEPARATOR};
use eventwire_transport::Address;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::config::ProviderConfig;
use crate::emitter::{EventEmitter, Subscription, CLOSE_EVENT, ERROR_EVENT};
use crate::error::{PeerError, Result};

enum Command {
    Write(Bytes),
    End,
}

struct Channels {
    events: EventEmitter<[Value]>,
    errors: EventEmitter<PeerError>,
    closes: EventEmitter<bool>,
}

impl Channels {
    fn publish_error(&self, err: PeerError) {
        if !self.errors.emit(ERROR_EVENT, &err) {
            warn!(error = %err, "unhandled provider error");
        }
    }
}

struct State {
    tx: Option<Sender<Command>>,
    rx: Option<Receiver<Command>>,
    worker: Option<JoinHandle<()>>,
    address: Option<Address>,
    ended: bool,
}

/// The sending endpoint: one outbound connection carrying named events.
///
/// Events are encoded on the calling thread and written in call order by a
/// dedicated writer thread. Events emitted before `connect` are queued and
/// sent once the connection is up.
pub struct Provider {
    config: ProviderConfig,
    channels: Arc<Channels>,
    state: Mutex<State>,
}

impl Provider {
    pub fn new() -> Self {
        Self::with_config(ProviderConfig::default())
    }

    pub fn with_config(config: ProviderConfig) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            config,
            channels: Arc::new(Channels {
                events: EventEmitter::new(),
                errors: EventEmitter::new(),
                closes: EventEmitter::new(),
            }),
            state: Mutex::new(State {
                tx: Some(tx),
                rx: Some(rx),
                worker: None,
                address: None,
                ended: false,
            }),
        }
    }

    /// Start connecting to `destination` and return immediately.
    ///
    /// Connection failures are published on the error channel, followed by
    /// close. The returned error only reports misuse.
    pub fn connect(&self, destination: impl Into<Address>) -> Result<()> {
        let address = destination.into();
        let mut state = self.lock();
        if state.ended {
            return Err(PeerError::Ended);
        }
        let Some(rx) = state.rx.take() else {
            return Err(PeerError::AlreadyConnected);
        };

        let channels = Arc::clone(&self.channels);
        let frame = self.config.frame.clone();
        let target = address.clone();
        let worker = thread::Builder::new()
            .name("eventwire-provider".into())
            .spawn(move || run_writer(target, frame, rx, channels))
            .map_err(|err| PeerError::Transport(err.into()))?;

        state.worker = Some(worker);
        state.address = Some(address);
        Ok(())
    }

    /// Send `event` with `args` and publish it to local subscribers.
    ///
    /// Returns whether a local subscriber received it. After `end` this
    /// publishes [`PeerError::Ended`] and returns false. A message that
    /// cannot be encoded is reported on the error channel and is neither
    /// sent nor echoed locally.
    pub fn emit(&self, event: impl Into<String>, args: Vec<Value>) -> bool {
        let message = Message::new(event, args);
        if !self.enqueue(&message) {
            return false;
        }
        self.channels.events.emit(&message.event, &message.args)
    }

    /// Like [`emit`](Self::emit), with arguments taken from any value that
    /// serializes to a JSON array (tuples, vectors, slices).
    pub fn emit_serialized<T: Serialize + ?Sized>(
        &self,
        event: impl Into<String>,
        args: &T,
    ) -> bool {
        match Message::from_serialize(event, args) {
            Ok(message) => self.emit(message.event, message.args),
            Err(err) => {
                self.channels.publish_error(err.into());
                false
            }
        }
    }

    /// Returns false when the message was refused, either because the
    /// Provider ended or because it could not be encoded.
    fn enqueue(&self, message: &Message) -> bool {
        let state = self.lock();
        if state.ended {
            drop(state);
            error!(event = %message.event, "emit called after end");
            self.channels.publish_error(PeerError::Ended);
            return false;
        }

        let frame = match self.encode(message) {
            Ok(frame) => frame,
            Err(err) => {
                drop(state);
                self.channels.publish_error(err.into());
                return false;
            }
        };

        let sent = state
            .tx
            .as_ref()
            .is_some_and(|tx| tx.send(Command::Write(frame)).is_ok());
        drop(state);
        if !sent {
            self.channels.publish_error(PeerError::NotConnected);
        }
        true
    }

    fn encode(&self, message: &Message) -> std::result::Result<Bytes, FrameError> {
        let mut buf = BytesMut::new();
        encode_frame(message, &mut buf)?;
        let size = buf.len() - SEPARATOR.len();
        let max = self.config.frame.max_frame_size;
        if size > max {
            return Err(FrameError::FrameTooLarge { size, max });
        }
        Ok(buf.freeze())
    }

    /// Close the connection once every event emitted so far has been written.
    ///
    /// Idempotent. Close subscribers are notified when the writer finishes.
    pub fn end(&self) -> &Self {
        let mut state = self.lock();
        if state.ended {
            return self;
        }
        state.ended = true;
        if let Some(tx) = state.tx.take() {
            let _ = tx.send(Command::End);
        }
        debug!(address = ?state.address.as_ref().map(ToString::to_string), "provider ending");
        self
    }

    /// Block until the writer has shut the connection down.
    ///
    /// Call after [`end`](Self::end); otherwise this waits for another
    /// thread to end the Provider.
    pub fn wait(&self) -> Result<()> {
        let worker = self.lock().worker.take();
        let Some(worker) = worker else {
            return Err(PeerError::NotConnected);
        };
        worker
            .join()
            .map_err(|_| PeerError::ShutdownFailed("provider writer thread panicked".into()))
    }

    pub fn is_ended(&self) -> bool {
        self.lock().ended
    }

    /// The destination passed to `connect`, if any.
    pub fn address(&self) -> Option<Address> {
        self.lock().address.clone()
    }

    pub fn on<F>(&self, event: impl Into<String>, handler: F) -> Subscription
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        self.channels.events.on(event, handler)
    }

    pub fn once<F>(&self, event: impl Into<String>, handler: F) -> Subscription
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        self.channels.events.once(event, handler)
    }

    pub fn on_error<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&PeerError) + Send + Sync + 'static,
    {
        self.channels.errors.on(ERROR_EVENT, handler)
    }

    /// Subscribe to the end of the connection. The flag is true when it
    /// ended because of an error (including a failed connect).
    pub fn on_close<F>(&self, handler: F) -> Subscription
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.channels
            .closes
            .on(CLOSE_EVENT, move |had_error: &bool| handler(*had_error))
    }

    pub fn off(&self, subscription: &Subscription) -> bool {
        self.channels.events.off(subscription)
            || self.channels.errors.off(subscription)
            || self.channels.closes.off(subscription)
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.channels.events.listener_count(event)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Provider {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Provider {
    fn drop(&mut self) {
        self.end();
    }
}

fn run_writer(
    address: Address,
    config: FrameConfig,
    rx: Receiver<Command>,
    channels: Arc<Channels>,
) {
    let stream = match eventwire_transport::connect(&address) {
        Ok(stream) => stream,
        Err(err) => {
            debug!(%address, error = %err, "provider connect failed");
            channels.publish_error(err.into());
            channels.closes.emit(CLOSE_EVENT, &true);
            return;
        }
    };
    debug!(%address, peer = %stream.peer_label(), "provider connected");

    let mut writer = match MessageWriter::with_config_stream(stream, config) {
        Ok(writer) => writer,
        Err(err) => {
            channels.publish_error(err.into());
            channels.closes.emit(CLOSE_EVENT, &true);
            return;
        }
    };

    let mut written = 0u64;
    let mut had_error = false;
    for command in rx.iter() {
        match command {
            Command::Write(frame) => {
                if let Err(err) = writer.write_frame(&frame) {
                    had_error = true;
                    channels.publish_error(err.into());
                    break;
                }
                written += 1;
            }
            Command::End => break,
        }
    }
    drop(rx);

    if let Err(err) = writer.get_ref().shutdown_write() {
        debug!(%address, error = %err, "shutdown after write failed");
    }
    drop(writer);

    debug!(%address, written, had_error, "provider connection closed");
    channels.closes.emit(CLOSE_EVENT, &had_error);
}
