//! In-process publish/subscribe keyed by event name.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Name used for the error channel of every endpoint.
pub const ERROR_EVENT: &str = "error";
/// Name used for the close channel of every endpoint.
pub const CLOSE_EVENT: &str = "close";
/// Name used for the Consumer's new-connection channel.
pub const CONNECTION_EVENT: &str = "connection";
/// Name used for an event source's catch-all message channel.
pub const MESSAGE_EVENT: &str = "message";

static NEXT_SUBSCRIPTION: AtomicU64 = AtomicU64::new(1);

type Handler<P> = Arc<dyn Fn(&P) + Send + Sync>;

struct Entry<P: ?Sized> {
    id: u64,
    once: bool,
    handler: Handler<P>,
}

/// Handle returned by `on`/`once`, used to unsubscribe.
///
/// Ids are unique across every emitter in the process.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    event: String,
    id: u64,
}

impl Subscription {
    /// The event name this subscription listens to.
    pub fn event(&self) -> &str {
        &self.event
    }
}

/// Ordered handler lists keyed by event name.
///
/// Handlers run on the publishing thread, in subscription order, without
/// the registry lock held: a handler may subscribe or unsubscribe while it
/// runs. A handler removed during a publish still sees that publish.
pub struct EventEmitter<P: ?Sized> {
    handlers: Mutex<HashMap<String, Vec<Entry<P>>>>,
}

impl<P: ?Sized> EventEmitter<P> {
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe `handler` to every publish of `event`.
    pub fn on<F>(&self, event: impl Into<String>, handler: F) -> Subscription
    where
        F: Fn(&P) + Send + Sync + 'static,
    {
        self.register(event.into(), false, Arc::new(handler))
    }

    /// Subscribe `handler` to the next publish of `event` only.
    pub fn once<F>(&self, event: impl Into<String>, handler: F) -> Subscription
    where
        F: Fn(&P) + Send + Sync + 'static,
    {
        self.register(event.into(), true, Arc::new(handler))
    }

    fn register(&self, event: String, once: bool, handler: Handler<P>) -> Subscription {
        let id = NEXT_SUBSCRIPTION.fetch_add(1, Ordering::Relaxed);
        self.lock()
            .entry(event.clone())
            .or_default()
            .push(Entry { id, once, handler });
        Subscription { event, id }
    }

    /// Remove a subscription. Returns false if it was not registered here.
    pub fn off(&self, subscription: &Subscription) -> bool {
        let mut handlers = self.lock();
        let Some(list) = handlers.get_mut(&subscription.event) else {
            return false;
        };
        let before = list.len();
        list.retain(|entry| entry.id != subscription.id);
        let removed = list.len() != before;
        if list.is_empty() {
            handlers.remove(&subscription.event);
        }
        removed
    }

    /// Publish `payload` to every handler of `event`.
    ///
    /// Returns true if at least one handler ran.
    pub fn emit(&self, event: &str, payload: &P) -> bool {
        let snapshot: Vec<Handler<P>> = {
            let mut handlers = self.lock();
            let Some(list) = handlers.get_mut(event) else {
                return false;
            };
            let snapshot = list.iter().map(|entry| Arc::clone(&entry.handler)).collect();
            list.retain(|entry| !entry.once);
            if list.is_empty() {
                handlers.remove(event);
            }
            snapshot
        };

        for handler in &snapshot {
            handler(payload);
        }
        !snapshot.is_empty()
    }

    /// Number of handlers currently subscribed to `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.lock().get(event).map_or(0, Vec::len)
    }

    /// Drop every handler of every event.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Entry<P>>>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<P: ?Sized> Default for EventEmitter<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: ?Sized> fmt::Debug for EventEmitter<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.lock();
        let mut events: Vec<(&str, usize)> = handlers
            .iter()
            .map(|(event, list)| (event.as_str(), list.len()))
            .collect();
        events.sort_unstable();
        f.debug_struct("EventEmitter").field("events", &events).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::{json, Value};

    use super::*;

    type Recorded = Box<dyn Fn(&[Value]) + Send + Sync>;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> Recorded) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let make = {
            let log = Arc::clone(&log);
            move |tag: &str| -> Recorded {
                let log = Arc::clone(&log);
                let tag = tag.to_string();
                Box::new(move |args: &[Value]| {
                    let rendered = Value::from(args.to_vec());
                    log.lock().unwrap().push(format!("{tag}:{rendered}"));
                })
            }
        };
        (log, make)
    }

    #[test]
    fn handlers_run_in_subscription_order() {
        let emitter: EventEmitter<[Value]> = EventEmitter::new();
        let (log, make) = recorder();
        let first = make("first");
        let second = make("second");
        emitter.on("greet", move |args: &[Value]| first(args));
        emitter.on("greet", move |args: &[Value]| second(args));

        assert!(emitter.emit("greet", &[json!({ "name": "Ada" })]));
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                r#"first:[{"name":"Ada"}]"#.to_string(),
                r#"second:[{"name":"Ada"}]"#.to_string(),
            ]
        );
    }

    #[test]
    fn emit_without_listeners_returns_false() {
        let emitter: EventEmitter<[Value]> = EventEmitter::new();
        assert!(!emitter.emit("nobody", &[]));
    }

    #[test]
    fn once_runs_a_single_time() {
        let emitter: EventEmitter<[Value]> = EventEmitter::new();
        let (log, make) = recorder();
        let handler = make("once");
        emitter.once("tick", move |args: &[Value]| handler(args));

        assert!(emitter.emit("tick", &[json!(1)]));
        assert!(!emitter.emit("tick", &[json!(2)]));
        assert_eq!(*log.lock().unwrap(), vec!["once:[1]".to_string()]);
        assert_eq!(emitter.listener_count("tick"), 0);
    }

    #[test]
    fn off_removes_only_that_subscription() {
        let emitter: EventEmitter<[Value]> = EventEmitter::new();
        let (log, make) = recorder();
        let a = make("a");
        let b = make("b");
        let sub_a = emitter.on("x", move |args: &[Value]| a(args));
        emitter.on("x", move |args: &[Value]| b(args));

        assert!(emitter.off(&sub_a));
        assert!(!emitter.off(&sub_a));
        assert_eq!(sub_a.event(), "x");
        emitter.emit("x", &[]);
        assert_eq!(*log.lock().unwrap(), vec!["b:[]".to_string()]);
    }

    #[test]
    fn subscription_ids_do_not_collide_across_emitters() {
        let left: EventEmitter<[Value]> = EventEmitter::new();
        let right: EventEmitter<[Value]> = EventEmitter::new();
        let sub = left.on("same", |_: &[Value]| {});
        right.on("same", |_: &[Value]| {});

        assert!(!right.off(&sub));
        assert_eq!(right.listener_count("same"), 1);
        assert!(left.off(&sub));
    }

    #[test]
    fn handler_may_resubscribe_while_running() {
        let emitter: Arc<EventEmitter<[Value]>> = Arc::new(EventEmitter::new());
        let hits = Arc::new(AtomicU64::new(0));

        let inner = Arc::clone(&emitter);
        let counter = Arc::clone(&hits);
        emitter.once("chain", move |_: &[Value]| {
            counter.fetch_add(1, Ordering::SeqCst);
            let counter = Arc::clone(&counter);
            inner.on("chain", move |_: &[Value]| {
                counter.fetch_add(10, Ordering::SeqCst);
            });
        });

        emitter.emit("chain", &[]);
        emitter.emit("chain", &[]);
        assert_eq!(hits.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn sized_payloads_work_too() {
        let emitter: EventEmitter<bool> = EventEmitter::new();
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        emitter.on(CLOSE_EVENT, move |had_error: &bool| {
            *sink.lock().unwrap() = Some(*had_error);
        });

        emitter.emit(CLOSE_EVENT, &true);
        assert_eq!(*seen.lock().unwrap(), Some(true));
    }

    #[test]
    fn debug_lists_event_counts() {
        let emitter: EventEmitter<[Value]> = EventEmitter::new();
        emitter.on("b", |_: &[Value]| {});
        emitter.on("a", |_: &[Value]| {});
        emitter.on("a", |_: &[Value]| {});
        assert_eq!(
            format!("{emitter:?}"),
            r#"EventEmitter { events: [("a", 2), ("b", 1)] }"#
        );
        emitter.clear();
        assert_eq!(emitter.listener_count("a"), 0);
    }
}
