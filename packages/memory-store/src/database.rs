//! The in-memory realtime database.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, trace};
use typedtree_core::{
    Error, EventCallback, EventType, OnceCallback, Path, Snapshot, SubscriptionHandle, Value,
};

use crate::config::StoreConfig;
use crate::dispatch::{lock, Dispatcher, Job, Listener};
use crate::push_id::PushIdGenerator;
use crate::reference::MemoryReference;
use crate::tree;

/// A realtime tree store held in memory.
///
/// All data lives in one `Value` tree. Observers registered through a
/// [`MemoryReference`] are notified after every write that changes what they
/// watch. Cloning the database shares the same tree.
///
/// # Example
///
/// ```rust
/// use std::sync::{Arc, Mutex};
/// use typedtree_core::{EventType, Reference, Snapshot, Value};
/// use typedtree_memory::MemoryDatabase;
///
/// let db = MemoryDatabase::new();
/// let visits = db.reference().child("counters/visits");
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = seen.clone();
/// visits.observe(EventType::Value, Box::new(move |snap: Snapshot| {
///     sink.lock().unwrap().push(snap.value);
/// }));
///
/// visits.set_value(Value::from(42i64)).unwrap();
/// assert_eq!(*seen.lock().unwrap(), vec![Value::Null, Value::from(42i64)]);
/// ```
#[derive(Clone)]
pub struct MemoryDatabase {
    inner: Arc<Inner>,
}

impl MemoryDatabase {
    /// An empty database with default configuration.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner::new(
                StoreConfig::default(),
                Dispatcher::inline(),
                Value::Null,
            )),
        }
    }

    /// An empty database with the given configuration.
    ///
    /// Fails only if a dispatch thread is needed and cannot be started.
    pub fn with_config(config: StoreConfig) -> Result<Self, Error> {
        let dispatcher = Dispatcher::new(config.dispatch)?;
        Ok(Self {
            inner: Arc::new(Inner::new(config, dispatcher, Value::Null)),
        })
    }

    /// A database seeded with `data`, with default configuration.
    pub fn with_data(data: Value) -> Self {
        Self {
            inner: Arc::new(Inner::new(
                StoreConfig::default(),
                Dispatcher::inline(),
                tree::normalize(data),
            )),
        }
    }

    /// A database seeded from a JSON document.
    pub fn from_json(json: serde_json::Value) -> Self {
        Self::with_data(typedtree_serde::json_to_value(json))
    }

    /// A reference to the root location.
    pub fn reference(&self) -> MemoryReference {
        MemoryReference::root_of(self.inner.clone())
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// The value stored at `path` right now.
    pub fn snapshot(&self, path: &Path) -> Value {
        tree::read(&lock(&self.inner.tree), path)
    }

    /// Reject writes at, above or below `prefix` with `PermissionDenied`.
    pub fn deny_writes(&self, prefix: Path) {
        debug!(prefix = %prefix, "denying writes");
        let mut denied = lock(&self.inner.denied);
        if !denied.contains(&prefix) {
            denied.push(prefix);
        }
    }

    /// Lift a rule installed with [`MemoryDatabase::deny_writes`].
    pub fn allow_writes(&self, prefix: &Path) {
        lock(&self.inner.denied).retain(|rule| rule != prefix);
    }

    /// Block until every delivery queued so far has run.
    ///
    /// In inline mode deliveries already ran before the triggering call
    /// returned, so this only matters for queued dispatch.
    pub fn flush(&self) {
        self.inner.dispatcher.flush();
    }

    /// Number of continuous observations currently registered.
    pub fn observer_count(&self) -> usize {
        lock(&self.inner.registry).listeners.len()
    }
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) struct Inner {
    config: StoreConfig,
    tree: Mutex<Value>,
    registry: Mutex<Registry>,
    denied: Mutex<Vec<Path>>,
    push_ids: Mutex<PushIdGenerator>,
    next_id: AtomicU64,
    dispatcher: Dispatcher,
}

#[derive(Default)]
struct Registry {
    listeners: Vec<Arc<Listener>>,
    pending: Vec<PendingOnce>,
}

/// A one-shot request still waiting for its event.
struct PendingOnce {
    path: Path,
    event: EventType,
    callback: OnceCallback,
}

// Lock order: tree, registry, then the dispatch queue. `denied` and
// `push_ids` are never held together with anything else.
impl Inner {
    fn new(config: StoreConfig, dispatcher: Dispatcher, data: Value) -> Self {
        Self {
            config,
            tree: Mutex::new(data),
            registry: Mutex::new(Registry::default()),
            denied: Mutex::new(Vec::new()),
            push_ids: Mutex::new(PushIdGenerator::new()),
            next_id: AtomicU64::new(1),
            dispatcher,
        }
    }

    pub(crate) fn next_push_id(&self) -> String {
        lock(&self.push_ids).next_id()
    }

    // === Writes ===

    pub(crate) fn write(&self, path: &Path, value: Value) -> Result<(), Error> {
        if let Some(rule) = lock(&self.denied).iter().find(|rule| rule.is_related(path)) {
            debug!(path = %path, rule = %rule, "write denied");
            return Err(Error::PermissionDenied { path: path.clone() });
        }
        if let Err(e) = tree::validate(path, &value, &self.config) {
            debug!(path = %path, error = %e, "write rejected");
            return Err(e);
        }
        let value = tree::normalize(value);
        trace!(path = %path, kind = value.kind(), "write");

        {
            let mut data = lock(&self.tree);
            let mut registry = lock(&self.registry);

            // Only the part of the tree on the written path can change, so
            // each observer compares the node nearest to it on that path.
            let mut points: BTreeMap<Path, (Value, Value)> = BTreeMap::new();
            for watched in registry
                .listeners
                .iter()
                .map(|l| &l.path)
                .chain(registry.pending.iter().map(|p| &p.path))
                .filter(|p| p.is_related(path))
            {
                let point = compare_path(watched, path);
                if !points.contains_key(&point) {
                    let before = tree::read(&data, &point);
                    points.insert(point, (before, Value::Null));
                }
            }
            if points.is_empty() {
                *data = tree::write(std::mem::take(&mut *data), path, value);
                return Ok(());
            }

            *data = tree::write(std::mem::take(&mut *data), path, value);
            for (p, (_, after)) in points.iter_mut() {
                *after = tree::read(&data, p);
            }

            let mut jobs = Vec::new();
            for listener in &registry.listeners {
                if listener.path.is_related(path) {
                    jobs.extend(
                        observed(&listener.path, listener.event, path, &points, &data)
                            .into_iter()
                            .map(|snapshot| Job::Each {
                                listener: listener.clone(),
                                snapshot,
                            }),
                    );
                }
            }

            for request in std::mem::take(&mut registry.pending) {
                let first = if request.path.is_related(path) {
                    observed(&request.path, request.event, path, &points, &data)
                        .into_iter()
                        .next()
                } else {
                    None
                };
                match first {
                    Some(snapshot) => jobs.push(Job::Once {
                        callback: request.callback,
                        snapshot,
                    }),
                    None => registry.pending.push(request),
                }
            }

            self.dispatcher.enqueue(jobs);
        }

        self.dispatcher.run();
        Ok(())
    }

    // === Observers ===

    pub(crate) fn observe(
        &self,
        path: Path,
        event: EventType,
        callback: EventCallback,
    ) -> SubscriptionHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let listener = Arc::new(Listener::new(id, path, event, callback));
        debug!(id, path = %listener.path, event = %event, "observer registered");

        {
            let data = lock(&self.tree);
            let current = tree::read(&data, &listener.path);
            let jobs: Vec<Job> = initial(&listener.path, event, &current)
                .into_iter()
                .map(|snapshot| Job::Each {
                    listener: listener.clone(),
                    snapshot,
                })
                .collect();
            lock(&self.registry).listeners.push(listener.clone());
            self.dispatcher.enqueue(jobs);
        }

        self.dispatcher.run();
        SubscriptionHandle::from_raw(id)
    }

    pub(crate) fn observe_once(&self, path: Path, event: EventType, callback: OnceCallback) {
        {
            let data = lock(&self.tree);
            let current = tree::read(&data, &path);
            let ready = match event {
                EventType::Value => Some(Snapshot::new(path.clone(), current)),
                EventType::ChildAdded => initial(&path, event, &current).into_iter().next(),
                _ => None,
            };

            match ready {
                Some(snapshot) => self.dispatcher.enqueue([Job::Once { callback, snapshot }]),
                None => lock(&self.registry).pending.push(PendingOnce {
                    path,
                    event,
                    callback,
                }),
            }
        }

        self.dispatcher.run();
    }

    /// Deliver `Null` to an observer of a location that cannot exist, without
    /// tracking it.
    pub(crate) fn observe_detached(
        &self,
        path: Path,
        event: EventType,
        callback: EventCallback,
    ) -> SubscriptionHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if event == EventType::Value {
            let listener = Arc::new(Listener::new(id, path.clone(), event, callback));
            self.dispatcher.enqueue([Job::Each {
                listener,
                snapshot: Snapshot::new(path, Value::Null),
            }]);
            self.dispatcher.run();
        }
        SubscriptionHandle::from_raw(id)
    }

    pub(crate) fn observe_once_detached(&self, path: Path, event: EventType, callback: OnceCallback) {
        if event == EventType::Value {
            self.dispatcher.enqueue([Job::Once {
                callback,
                snapshot: Snapshot::new(path, Value::Null),
            }]);
            self.dispatcher.run();
        }
    }

    pub(crate) fn remove_observer(&self, handle: SubscriptionHandle) {
        let id = handle.into_raw();
        let mut registry = lock(&self.registry);
        if let Some(pos) = registry.listeners.iter().position(|l| l.id == id) {
            let listener = registry.listeners.remove(pos);
            listener.deactivate();
            debug!(id, path = %listener.path, "observer removed");
        }
    }
}

fn child_path(parent: &Path, key: &str) -> Path {
    let mut path = parent.clone();
    path.components.push(key.to_string());
    path
}

/// Deliveries owed to a new continuous observer.
fn initial(path: &Path, event: EventType, current: &Value) -> Vec<Snapshot> {
    match event {
        EventType::Value => vec![Snapshot::new(path.clone(), current.clone())],
        EventType::ChildAdded => current
            .children()
            .into_iter()
            .map(|(key, value)| Snapshot::new(child_path(path, &key), value.clone()))
            .collect(),
        _ => Vec::new(),
    }
}

/// The node a write at `written` has to be compared at for an observer of
/// `watched`: the observed node itself when the write lands at or above it,
/// otherwise its one child on the written path.
fn compare_path(watched: &Path, written: &Path) -> Path {
    if written.len() > watched.len() && written.has_prefix(watched) {
        child_path(watched, &written.components[watched.len()])
    } else {
        watched.clone()
    }
}

/// Deliveries owed to an observer of `watched` after a write at `written`.
///
/// `points` holds the before and after state of every `compare_path`; `data`
/// is the tree after the write.
fn observed(
    watched: &Path,
    event: EventType,
    written: &Path,
    points: &BTreeMap<Path, (Value, Value)>,
    data: &Value,
) -> Vec<Snapshot> {
    let point = compare_path(watched, written);
    let Some((before, after)) = points.get(&point) else {
        return Vec::new();
    };
    if point == *watched {
        return changes(watched, event, before, after);
    }
    if before == after {
        return Vec::new();
    }
    match event {
        EventType::Value => vec![Snapshot::new(watched.clone(), tree::read(data, watched))],
        EventType::ChildAdded if before.is_null() => vec![Snapshot::new(point, after.clone())],
        EventType::ChildChanged if !before.is_null() && !after.is_null() => {
            vec![Snapshot::new(point, after.clone())]
        }
        EventType::ChildRemoved if after.is_null() => vec![Snapshot::new(point, before.clone())],
        _ => Vec::new(),
    }
}

/// Deliveries caused by the node at `path` going from `before` to `after`.
fn changes(path: &Path, event: EventType, before: &Value, after: &Value) -> Vec<Snapshot> {
    match event {
        EventType::Value if before != after => vec![Snapshot::new(path.clone(), after.clone())],
        EventType::Value => Vec::new(),
        EventType::ChildAdded => after
            .children()
            .into_iter()
            .filter(|(key, _)| before.child(key).is_none())
            .map(|(key, value)| Snapshot::new(child_path(path, &key), value.clone()))
            .collect(),
        EventType::ChildChanged => after
            .children()
            .into_iter()
            .filter(|(key, value)| matches!(before.child(key), Some(old) if old != *value))
            .map(|(key, value)| Snapshot::new(child_path(path, &key), value.clone()))
            .collect(),
        EventType::ChildRemoved => before
            .children()
            .into_iter()
            .filter(|(key, _)| after.child(key).is_none())
            .map(|(key, value)| Snapshot::new(child_path(path, &key), value.clone()))
            .collect(),
        EventType::ChildMoved => Vec::new(),
    }
}
