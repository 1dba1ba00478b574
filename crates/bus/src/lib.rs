//! Priority-ordered, pattern-subscribable event bus.
//!
//! Two subscription tables back the bus: an exact-match table keyed by
//! event type string and a pattern table of compiled regexes (patterns
//! beginning with `re:`). Publishing snapshots the matching handler list,
//! so a handler unsubscribing mid-publish never corrupts the traversal.
//!
//! Handlers run in descending priority order, ties broken by registration
//! order. In await-all mode each handler completes (or hits its timeout)
//! before the next starts; in fire-and-forget mode tasks are spawned
//! synchronously in the same order, which fixes their start order while
//! letting them overlap.

pub mod error;

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
    time::Duration,
};

use {
    futures::future::BoxFuture,
    tokio::runtime::Handle,
    tracing::{debug, error, warn},
};

use kotori_protocol::Event;

pub use error::{Error, Result};

/// Prefix marking a subscription pattern as a regex over event types.
pub const REGEX_PREFIX: &str = "re:";

/// A subscribed handler: takes the shared event, returns a future.
pub type Handler = Arc<dyn Fn(Arc<Event>) -> BoxFuture<'static, ()> + Send + Sync>;

/// Wrap an async closure into a [`Handler`].
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |event| Box::pin(f(event)))
}

/// Process-wide unique id for one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(uuid::Uuid);

impl SubscriptionId {
    fn fresh() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Options for [`EventBus::subscribe`].
#[derive(Debug, Clone, Default)]
pub struct SubscribeOpts {
    /// Higher runs earlier. Defaults to 0.
    pub priority: i32,
    /// Per-invocation execution bound. `None` means unbounded.
    pub timeout: Option<Duration>,
    /// Owning plugin, for bulk unsubscription on unload.
    pub owner: Option<String>,
}

impl SubscribeOpts {
    #[must_use]
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }
}

enum Pattern {
    Exact(String),
    Regex(regex::Regex),
}

struct Subscription {
    id: SubscriptionId,
    pattern: Pattern,
    handler: Handler,
    priority: i32,
    timeout: Option<Duration>,
    owner: Option<String>,
    /// Registration order, the tie-breaker within a priority level.
    seq: u64,
}

#[derive(Default)]
struct Tables {
    exact: HashMap<String, Vec<Subscription>>,
    patterns: Vec<Subscription>,
    next_seq: u64,
}

impl Tables {
    /// Snapshot the handlers matching `event_type`, in execution order.
    fn matching(&self, event_type: &str) -> Vec<(Handler, Option<Duration>, SubscriptionId)> {
        let mut hits: Vec<(&Subscription, Handler)> = Vec::new();

        if let Some(subs) = self.exact.get(event_type) {
            for sub in subs {
                hits.push((sub, Arc::clone(&sub.handler)));
            }
        }
        for sub in &self.patterns {
            if let Pattern::Regex(re) = &sub.pattern
                && re.is_match(event_type)
            {
                hits.push((sub, Arc::clone(&sub.handler)));
            }
        }

        hits.sort_by(|(a, _), (b, _)| b.priority.cmp(&a.priority).then(a.seq.cmp(&b.seq)));
        hits.into_iter()
            .map(|(sub, h)| (h, sub.timeout, sub.id))
            .collect()
    }

    fn remove(&mut self, id: SubscriptionId) -> bool {
        for subs in self.exact.values_mut() {
            if let Some(pos) = subs.iter().position(|s| s.id == id) {
                subs.remove(pos);
                return true;
            }
        }
        if let Some(pos) = self.patterns.iter().position(|s| s.id == id) {
            self.patterns.remove(pos);
            return true;
        }
        false
    }
}

/// The bus. Cheap to clone; all clones share the subscription tables.
#[derive(Clone)]
pub struct EventBus {
    tables: Arc<RwLock<Tables>>,
    /// Captured at construction for the cross-thread blocking helper.
    runtime: Option<Handle>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables::default())),
            runtime: Handle::try_current().ok(),
        }
    }

    /// Register a handler for an exact event type, or a regex over event
    /// types when `pattern` starts with `re:`.
    pub fn subscribe(
        &self,
        pattern: &str,
        handler: Handler,
        opts: SubscribeOpts,
    ) -> Result<SubscriptionId> {
        let compiled = match pattern.strip_prefix(REGEX_PREFIX) {
            Some(expr) => Pattern::Regex(regex::Regex::new(expr).map_err(|source| {
                Error::InvalidPattern {
                    pattern: pattern.to_string(),
                    source,
                }
            })?),
            None => Pattern::Exact(pattern.to_string()),
        };

        let id = SubscriptionId::fresh();
        let mut tables = self.write_tables();
        let seq = tables.next_seq;
        tables.next_seq += 1;

        let subscription = Subscription {
            id,
            pattern: compiled,
            handler,
            priority: opts.priority,
            timeout: opts.timeout,
            owner: opts.owner,
            seq,
        };

        debug!(pattern = %pattern, id = %id, priority = opts.priority, "subscribed");
        let exact_key = match &subscription.pattern {
            Pattern::Exact(key) => Some(key.clone()),
            Pattern::Regex(_) => None,
        };
        match exact_key {
            Some(key) => tables.exact.entry(key).or_default().push(subscription),
            None => tables.patterns.push(subscription),
        }
        Ok(id)
    }

    /// Remove a subscription. Unsubscribing twice is a no-op.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.write_tables().remove(id)
    }

    /// Remove every subscription owned by `owner`; returns how many.
    pub fn unsubscribe_owner(&self, owner: &str) -> usize {
        let mut tables = self.write_tables();
        let mut removed = 0;

        for subs in tables.exact.values_mut() {
            let before = subs.len();
            subs.retain(|s| s.owner.as_deref() != Some(owner));
            removed += before - subs.len();
        }
        let before = tables.patterns.len();
        tables.patterns.retain(|s| s.owner.as_deref() != Some(owner));
        removed += before - tables.patterns.len();

        removed
    }

    /// Count of live subscriptions owned by `owner`.
    #[must_use]
    pub fn owner_subscription_count(&self, owner: &str) -> usize {
        let tables = self.read_tables();
        tables
            .exact
            .values()
            .flatten()
            .chain(tables.patterns.iter())
            .filter(|s| s.owner.as_deref() == Some(owner))
            .count()
    }

    /// Publish in await-all mode: returns once every matching handler has
    /// completed or been cancelled by its timeout.
    pub async fn publish(&self, event: Arc<Event>) {
        let event_type = event.event_type().to_string();
        let matched = self.read_tables().matching(&event_type);
        debug!(event_type = %event_type, handlers = matched.len(), "publish");

        for (handler, timeout, id) in matched {
            let fut = handler(Arc::clone(&event));
            // Spawned so a panicking handler cannot unwind through the
            // publisher; awaited immediately to keep strict ordering.
            let task = tokio::spawn(async move {
                match timeout {
                    Some(t) => tokio::time::timeout(t, fut).await.is_ok(),
                    None => {
                        fut.await;
                        true
                    },
                }
            });
            match task.await {
                Ok(true) => {},
                Ok(false) => warn!(id = %id, event_type = %event_type, "handler timed out"),
                Err(e) => error!(id = %id, event_type = %event_type, error = %e, "handler panicked"),
            }
        }
    }

    /// Publish in fire-and-forget mode: tasks are spawned synchronously in
    /// priority order and left to run. There is no upper bound on in-flight
    /// handlers beyond their individual timeouts.
    pub fn publish_nowait(&self, event: Arc<Event>) {
        let event_type = event.event_type().to_string();
        let matched = self.read_tables().matching(&event_type);

        for (handler, timeout, id) in matched {
            let fut = handler(Arc::clone(&event));
            let event_type = event_type.clone();
            tokio::spawn(async move {
                let done = match timeout {
                    Some(t) => tokio::time::timeout(t, fut).await.is_ok(),
                    None => {
                        fut.await;
                        true
                    },
                };
                if !done {
                    warn!(id = %id, event_type = %event_type, "handler timed out");
                }
            });
        }
    }

    /// Publish from a non-async thread, blocking up to `timeout`.
    pub fn publish_blocking(&self, event: Arc<Event>, timeout: Duration) -> Result<()> {
        let handle = self.runtime.clone().ok_or(Error::NoRuntime)?;
        let bus = self.clone();
        // block_on must not run on a runtime worker; hop through a throwaway
        // thread so callers inside the runtime get an error-free path too.
        std::thread::spawn(move || {
            handle.block_on(async move {
                let _ = tokio::time::timeout(timeout, bus.publish(event)).await;
            });
        })
        .join()
        .map_err(|_| Error::Message("blocking publish thread panicked".into()))?;
        Ok(())
    }

    #[allow(clippy::unwrap_used)]
    fn read_tables(&self) -> std::sync::RwLockReadGuard<'_, Tables> {
        // Poisoning cannot happen: no code path panics while holding the lock.
        self.tables.read().unwrap()
    }

    #[allow(clippy::unwrap_used)]
    fn write_tables(&self) -> std::sync::RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        std::sync::Mutex,
        tokio::time::{Duration, sleep},
    };

    fn custom(name: &str) -> Arc<Event> {
        Arc::new(Event::Custom {
            name: name.to_string(),
            data: serde_json::Value::Null,
        })
    }

    fn recording(log: Arc<Mutex<Vec<&'static str>>>, tag: &'static str) -> Handler {
        handler(move |_event| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(tag);
            }
        })
    }

    #[tokio::test]
    async fn handlers_run_in_descending_priority_order() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        bus.subscribe(
            "test.event",
            recording(Arc::clone(&log), "low"),
            SubscribeOpts::default().priority(1),
        )
        .unwrap();
        bus.subscribe(
            "test.event",
            recording(Arc::clone(&log), "high"),
            SubscribeOpts::default().priority(10),
        )
        .unwrap();
        bus.subscribe(
            "test.event",
            recording(Arc::clone(&log), "mid"),
            SubscribeOpts::default().priority(5),
        )
        .unwrap();

        bus.publish(custom("test.event")).await;
        assert_eq!(*log.lock().unwrap(), vec!["high", "mid", "low"]);
    }

    #[tokio::test]
    async fn equal_priority_ties_break_by_registration_order() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        bus.subscribe(
            "test.event",
            recording(Arc::clone(&log), "first"),
            SubscribeOpts::default(),
        )
        .unwrap();
        bus.subscribe(
            "test.event",
            recording(Arc::clone(&log), "second"),
            SubscribeOpts::default(),
        )
        .unwrap();

        bus.publish(custom("test.event")).await;
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn regex_patterns_match_event_types() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        bus.subscribe(
            "re:kotori\\..*_message_event",
            recording(Arc::clone(&log), "messages"),
            SubscribeOpts::default(),
        )
        .unwrap();

        bus.publish(custom("kotori.group_message_event")).await;
        bus.publish(custom("kotori.private_message_event")).await;
        bus.publish(custom("kotori.notice_event")).await;

        assert_eq!(*log.lock().unwrap(), vec!["messages", "messages"]);
    }

    #[test]
    fn invalid_regex_is_rejected() {
        let bus = EventBus::new();
        let err = bus
            .subscribe("re:(unclosed", handler(|_| async {}), SubscribeOpts::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { .. }));
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent_and_stops_delivery() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let id = bus
            .subscribe(
                "test.event",
                recording(Arc::clone(&log), "x"),
                SubscribeOpts::default(),
            )
            .unwrap();

        bus.publish(custom("test.event")).await;
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(custom("test.event")).await;

        assert_eq!(*log.lock().unwrap(), vec!["x"]);
    }

    #[tokio::test]
    async fn owner_unsubscription_clears_all_of_a_plugin() {
        let bus = EventBus::new();
        let opts = SubscribeOpts::default().owner("demo");

        bus.subscribe("a", handler(|_| async {}), opts.clone()).unwrap();
        bus.subscribe("b", handler(|_| async {}), opts.clone()).unwrap();
        bus.subscribe("re:c.*", handler(|_| async {}), opts).unwrap();
        bus.subscribe("a", handler(|_| async {}), SubscribeOpts::default().owner("other"))
            .unwrap();

        assert_eq!(bus.owner_subscription_count("demo"), 3);
        assert_eq!(bus.unsubscribe_owner("demo"), 3);
        assert_eq!(bus.owner_subscription_count("demo"), 0);
        assert_eq!(bus.owner_subscription_count("other"), 1);
    }

    #[tokio::test]
    async fn timed_out_handler_does_not_block_later_handlers() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let slow_log = Arc::clone(&log);
        bus.subscribe(
            "test.event",
            handler(move |_| {
                let log = Arc::clone(&slow_log);
                async move {
                    sleep(Duration::from_secs(60)).await;
                    log.lock().unwrap().push("slow-finished");
                }
            }),
            SubscribeOpts::default()
                .priority(10)
                .timeout(Duration::from_millis(20)),
        )
        .unwrap();
        bus.subscribe(
            "test.event",
            recording(Arc::clone(&log), "after"),
            SubscribeOpts::default(),
        )
        .unwrap();

        bus.publish(custom("test.event")).await;
        assert_eq!(*log.lock().unwrap(), vec!["after"]);
    }

    #[tokio::test]
    async fn panicking_handler_does_not_kill_the_publish() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        bus.subscribe(
            "test.event",
            handler(|_| async { panic!("boom") }),
            SubscribeOpts::default().priority(10),
        )
        .unwrap();
        bus.subscribe(
            "test.event",
            recording(Arc::clone(&log), "survivor"),
            SubscribeOpts::default(),
        )
        .unwrap();

        bus.publish(custom("test.event")).await;
        assert_eq!(*log.lock().unwrap(), vec!["survivor"]);
    }

    #[tokio::test]
    async fn fire_and_forget_returns_before_handlers_finish() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let slow_log = Arc::clone(&log);
        bus.subscribe(
            "test.event",
            handler(move |_| {
                let log = Arc::clone(&slow_log);
                async move {
                    sleep(Duration::from_millis(50)).await;
                    log.lock().unwrap().push("done");
                }
            }),
            SubscribeOpts::default(),
        )
        .unwrap();

        bus.publish_nowait(custom("test.event"));
        assert!(log.lock().unwrap().is_empty());

        sleep(Duration::from_millis(200)).await;
        assert_eq!(*log.lock().unwrap(), vec!["done"]);
    }

    #[tokio::test]
    async fn blocking_publish_from_plain_thread() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(
            "test.event",
            recording(Arc::clone(&log), "blocking"),
            SubscribeOpts::default(),
        )
        .unwrap();

        let bus_clone = bus.clone();
        tokio::task::spawn_blocking(move || {
            bus_clone
                .publish_blocking(custom("test.event"), Duration::from_secs(5))
                .unwrap();
        })
        .await
        .unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["blocking"]);
    }
}
