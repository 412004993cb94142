use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use eventwire_frame::Message;
use eventwire_peer::{Consumer, EventSource, PeerError};
use tracing::{info, warn};

use crate::cmd::ListenArgs;
use crate::exit::{peer_error, CliError, CliResult, SUCCESS};
use crate::output::{render_event, OutputFormat};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

struct Received {
    connection: String,
    message: Message,
}

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let consumer = Consumer::new();
    let (tx, rx) = mpsc::channel::<Received>();
    let filter = args.event.clone();
    consumer.on_connection(move |source: &EventSource| {
        info!(id = source.id(), peer = source.peer(), "connection opened");
        subscribe(source, tx.clone(), filter.clone());
    });
    consumer.on_error(|err: &PeerError| warn!(error = %err, "accept failed"));
    consumer
        .listen(&args.address)
        .map_err(|err| peer_error("listen failed", &err))?;

    let mut printed = 0usize;
    while running.load(Ordering::SeqCst) && !reached(args.count, printed) {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(received) => {
                let Received {
                    connection,
                    message,
                } = received;
                println!(
                    "{}",
                    render_event(&connection, &message.event, &message.args, format)
                );
                printed = printed.saturating_add(1);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    consumer
        .close()
        .map_err(|err| peer_error("close failed", &err))?;
    Ok(SUCCESS)
}

fn subscribe(source: &EventSource, tx: mpsc::Sender<Received>, filter: Option<Vec<String>>) {
    let id = source.id().to_string();
    source.on_message(move |message: &Message| {
        if !wanted(filter.as_deref(), &message.event) {
            return;
        }
        let _ = tx.send(Received {
            connection: id.clone(),
            message: message.clone(),
        });
    });

    let id = source.id().to_string();
    source.on_error(move |err: &PeerError| warn!(id = %id, error = %err, "connection error"));

    let id = source.id().to_string();
    source.on_close(move |had_error| info!(id = %id, had_error, "connection closed"));
}

fn wanted(filter: Option<&[String]>, event: &str) -> bool {
    filter.is_none_or(|names| names.iter().any(|name| name == event))
}

fn reached(count: Option<usize>, printed: usize) -> bool {
    count.is_some_and(|count| printed >= count)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
