use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::topic::{InvalidPattern, TopicPattern};
use crate::value::{Revision, State, StateValue, SubscriptionId};

/// Callback type for state change notifications.
pub type ChangeHandler = Arc<dyn Fn(&str, &StateValue) + Send + Sync>;

struct Entry {
    value: StateValue,
    revision: Revision,
}

#[derive(Clone)]
struct Subscription {
    id: SubscriptionId,
    pattern: TopicPattern,
    handler: ChangeHandler,
}

/// Path-addressed state with pattern subscriptions.
///
/// The reconciler is the only writer; consumers read snapshots with
/// [`get`](Self::get) or observe writes with [`subscribe`](Self::subscribe).
/// Handlers run synchronously on the writing task, after the write lock has
/// been released, so a handler may read the store.
pub struct StateStore {
    values: RwLock<BTreeMap<String, Entry>>,
    subscriptions: RwLock<Vec<Subscription>>,
    next_id: AtomicU64,
}

impl StateStore {
    pub fn new() -> Self {
        Self {
            values: RwLock::new(BTreeMap::new()),
            subscriptions: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Store a typed value at its path and notify matching subscribers.
    pub fn set<T: State>(&self, value: T) -> Revision {
        self.set_value(T::PATH, StateValue::new(value))
    }

    /// Store a pre-built value at an arbitrary path.
    pub fn set_value(&self, path: &str, value: StateValue) -> Revision {
        let revision = {
            let mut values = self.values.write();
            let next = values
                .get(path)
                .map(|e| Revision(e.revision.0 + 1))
                .unwrap_or(Revision(1));
            values.insert(
                path.to_string(),
                Entry {
                    value: value.clone(),
                    revision: next,
                },
            );
            next
        };
        self.notify(path, &value);
        revision
    }

    /// Typed read. `None` if nothing is stored or the stored type differs.
    pub fn get<T: State>(&self) -> Option<T> {
        self.get_value(T::PATH).and_then(|v| v.to_typed::<T>())
    }

    pub fn get_value(&self, path: &str) -> Option<StateValue> {
        self.values.read().get(path).map(|e| e.value.clone())
    }

    /// Revision of the value at `path`; `Revision(0)` if never written.
    pub fn revision(&self, path: &str) -> Revision {
        self.values
            .read()
            .get(path)
            .map(|e| e.revision)
            .unwrap_or_default()
    }

    /// Register a handler for every write whose path matches `pattern`.
    pub fn subscribe<F>(&self, pattern: &str, handler: F) -> Result<SubscriptionId, InvalidPattern>
    where
        F: Fn(&str, &StateValue) + Send + Sync + 'static,
    {
        let pattern = TopicPattern::parse(pattern)?;
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscriptions.write().push(Subscription {
            id,
            pattern,
            handler: Arc::new(handler),
        });
        Ok(id)
    }

    /// Typed convenience: observe writes to `T::PATH` as `T`.
    pub fn watch<T, F>(&self, handler: F) -> SubscriptionId
    where
        T: State,
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let pattern = TopicPattern::exact(T::PATH);
        self.subscriptions.write().push(Subscription {
            id,
            pattern,
            handler: Arc::new(move |_, value| {
                if let Some(typed) = value.downcast_ref::<T>() {
                    handler(typed);
                }
            }),
        });
        id
    }

    /// Returns `true` if a subscription was removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.subscriptions.write();
        let before = subs.len();
        subs.retain(|s| s.id != id);
        subs.len() < before
    }

    fn notify(&self, path: &str, value: &StateValue) {
        let matched: Vec<ChangeHandler> = self
            .subscriptions
            .read()
            .iter()
            .filter(|s| s.pattern.matches(path))
            .map(|s| Arc::clone(&s.handler))
            .collect();
        for handler in matched {
            handler(path, value);
        }
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}
