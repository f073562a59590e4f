//! Flux: path-addressed state plus a serialized reconciliation queue.
//!
//! Rust owns the state and all of the logic that mutates it; front ends
//! only read and subscribe.
//!
//! # Two halves
//!
//! - [`StateStore`]: typed values at well-known paths (`session/state`,
//!   `app/route`), revision counters, and MQTT-style subscriptions.
//! - [`TaskQueue`]: one worker that owns a [`Reconciler`] and feeds it a
//!   bootstrap step, external events, and caller tasks strictly one at a
//!   time.
//!
//! # Path addressing
//!
//! - Exact: `session/state`
//! - Single-level: `app/+` matches `app/route`, `app/notice`
//! - Multi-level: `app/#` matches everything under `app`
//! - All: `#`
//!
//! # Example
//!
//! ```ignore
//! use revu_flux::{State, StateStore};
//!
//! #[derive(Clone)]
//! struct AppRoute(String);
//! impl State for AppRoute {
//!     const PATH: &'static str = "app/route";
//! }
//!
//! let store = StateStore::new();
//! store.watch::<AppRoute, _>(|route| println!("now at {}", route.0));
//! store.set(AppRoute("/login".into()));
//! ```

pub mod queue;
pub mod store;
pub mod topic;
pub mod value;

pub use queue::{QueueClosed, Reconciler, Sequence, TaskQueue};
pub use store::{ChangeHandler, StateStore};
pub use topic::{InvalidPattern, TopicPattern};
pub use value::{Revision, State, StateValue, SubscriptionId};
