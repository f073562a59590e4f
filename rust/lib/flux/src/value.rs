use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// A value that lives at one well-known path in the [`StateStore`].
///
/// Implementors are plain data (session snapshots, routes, notices). The
/// path is part of the type so readers never pass a mismatched path/type
/// pair.
///
/// [`StateStore`]: crate::StateStore
pub trait State: Any + Clone + Send + Sync {
    /// Store path, e.g. `session/state`.
    const PATH: &'static str;
}

/// A type-erased, reference-counted state value.
///
/// Cloning only bumps the Arc. Subscribers receive this and downcast to the
/// concrete [`State`] type they registered for.
#[derive(Clone)]
pub struct StateValue {
    inner: Arc<dyn Any + Send + Sync>,
}

impl StateValue {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
        }
    }

    /// Try to view the value as `T`. `None` on type mismatch.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Clone the inner value out as `T`.
    pub fn to_typed<T: Any + Clone>(&self) -> Option<T> {
        self.downcast_ref::<T>().cloned()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    pub fn type_id(&self) -> TypeId {
        (*self.inner).type_id()
    }
}

impl fmt::Debug for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateValue")
            .field("type_id", &(*self.inner).type_id())
            .finish()
    }
}

/// Handle returned by `StateStore::subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

/// Per-path write counter. Starts at 1 on the first write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Revision(pub u64);
