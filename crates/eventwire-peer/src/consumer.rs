use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use eventwire_frame::{FrameConfig, MessageReader};
use eventwire_transport::{Address, Listener, Stream};
use tracing::{debug, info, warn};

use crate::config::ConsumerConfig;
use crate::emitter::{EventEmitter, Subscription, CONNECTION_EVENT, ERROR_EVENT};
use crate::error::{PeerError, Result};
use crate::source::EventSource;

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(25);

struct Channels {
    connections: EventEmitter<EventSource>,
    errors: EventEmitter<PeerError>,
}

impl Channels {
    fn publish_error(&self, err: PeerError) {
        if !self.errors.emit(ERROR_EVENT, &err) {
            warn!(error = %err, "unhandled consumer error");
        }
    }
}

struct Running {
    address: Address,
    stop: Arc<AtomicBool>,
    accept: JoinHandle<()>,
}

/// The receiving endpoint: accepts any number of connections and exposes
/// each one as an [`EventSource`].
pub struct Consumer {
    config: ConsumerConfig,
    channels: Arc<Channels>,
    next_id: Arc<AtomicU64>,
    running: Mutex<Option<Running>>,
}

impl Consumer {
    pub fn new() -> Self {
        Self::with_config(ConsumerConfig::default())
    }

    pub fn with_config(config: ConsumerConfig) -> Self {
        Self {
            config,
            channels: Arc::new(Channels {
                connections: EventEmitter::new(),
                errors: EventEmitter::new(),
            }),
            next_id: Arc::new(AtomicU64::new(1)),
            running: Mutex::new(None),
        }
    }

    /// Bind `address` and start accepting connections in the background.
    ///
    /// Returns once the endpoint is accepting.
    pub fn listen(&self, address: impl Into<Address>) -> Result<()> {
        let address = address.into();
        let mut running = self.lock();
        if running.is_some() {
            return Err(PeerError::AlreadyListening);
        }

        let listener = Listener::bind_with_mode(&address, self.config.socket_mode)?;
        listener.set_nonblocking(true)?;
        let local = listener.local_address();
        info!(address = %local, transport = listener.transport_name(), "consumer listening");

        let stop = Arc::new(AtomicBool::new(false));
        let accept = {
            let stop = Arc::clone(&stop);
            let channels = Arc::clone(&self.channels);
            let next_id = Arc::clone(&self.next_id);
            let frame = self.config.frame.clone();
            thread::Builder::new()
                .name("eventwire-accept".into())
                .spawn(move || accept_loop(listener, stop, channels, next_id, frame))
                .map_err(|err| PeerError::Transport(err.into()))?
        };

        *running = Some(Running {
            address: local,
            stop,
            accept,
        });
        Ok(())
    }

    /// Stop accepting and release the endpoint.
    ///
    /// Connections already accepted keep running until their peers hang up.
    pub fn close(&self) -> Result<()> {
        let Some(running) = self.lock().take() else {
            return Err(PeerError::NotListening);
        };
        running.stop.store(true, Ordering::Release);
        running.accept.join().map_err(|_| {
            PeerError::ShutdownFailed(format!("accept loop for {} panicked", running.address))
        })?;
        debug!(address = %running.address, "consumer closed");
        Ok(())
    }

    pub fn is_listening(&self) -> bool {
        self.lock().is_some()
    }

    /// The bound address, with the real port when TCP port 0 was requested.
    pub fn local_address(&self) -> Option<Address> {
        self.lock().as_ref().map(|running| running.address.clone())
    }

    /// Subscribe to new connections.
    ///
    /// The handler runs before any byte of the connection is read, so
    /// subscriptions made on the source inside it see every message.
    pub fn on_connection<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&EventSource) + Send + Sync + 'static,
    {
        self.channels.connections.on(CONNECTION_EVENT, handler)
    }

    /// Subscribe to accept failures.
    pub fn on_error<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&PeerError) + Send + Sync + 'static,
    {
        self.channels.errors.on(ERROR_EVENT, handler)
    }

    pub fn off(&self, subscription: &Subscription) -> bool {
        self.channels.connections.off(subscription) || self.channels.errors.off(subscription)
    }

    fn lock(&self) -> MutexGuard<'_, Option<Running>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Consumer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Consumer {
    fn drop(&mut self) {
        if self.is_listening() {
            if let Err(err) = self.close() {
                warn!(error = %err, "consumer close on drop failed");
            }
        }
    }
}

fn accept_loop(
    listener: Listener,
    stop: Arc<AtomicBool>,
    channels: Arc<Channels>,
    next_id: Arc<AtomicU64>,
    frame: FrameConfig,
) {
    while !stop.load(Ordering::Acquire) {
        match listener.try_accept() {
            Ok(Some(stream)) => {
                let id = format!("conn-{}", next_id.fetch_add(1, Ordering::Relaxed));
                if let Err(err) = start_source(id, stream, &channels, frame.clone()) {
                    channels.publish_error(err);
                }
            }
            Ok(None) => thread::sleep(ACCEPT_POLL_INTERVAL),
            Err(err) => {
                channels.publish_error(err.into());
                thread::sleep(ACCEPT_POLL_INTERVAL);
            }
        }
    }
    debug!(address = %listener.local_address(), "accept loop stopped");
}

fn start_source(id: String, stream: Stream, channels: &Channels, frame: FrameConfig) -> Result<()> {
    let peer = stream.peer_label();
    let reader = MessageReader::with_config_stream(stream, frame)?;
    let source = EventSource::new(id, peer);
    debug!(id = source.id(), peer = source.peer(), "connection accepted");

    channels.connections.emit(CONNECTION_EVENT, &source);

    let name = format!("eventwire-{}", source.id());
    thread::Builder::new()
        .name(name)
        .spawn(move || source.run(reader))
        .map_err(|err| PeerError::Transport(err.into()))?;
    Ok(())
}
