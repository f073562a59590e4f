//! Session & project state controller.
//!
//! Reconciles three asynchronous sources into one [`ControllerState`]:
//! backend auth events, the user's active project (persisted remotely), and
//! that project's UI preferences. The state is published at
//! `session/state` in a [`revu_flux::StateStore`]; front ends read it there
//! and call [`SessionController`] methods.
//!
//! ```ignore
//! let backend = Arc::new(MemoryBackend::new());
//! let controller = SessionController::start(
//!     SessionDeps {
//!         auth: backend.clone(),
//!         settings: backend.clone(),
//!         theme: Arc::new(RecordingTheme::new()),
//!         navigator: Arc::new(RecordingNavigator::new("/login")),
//!         notifier: Arc::new(RecordingNotifier::new()),
//!     },
//!     SessionConfig::default(),
//! );
//! controller.sign_in("ana@example.org", "secret").await?;
//! controller.settle().await?;
//! assert!(controller.state().active_project.is_some());
//! ```

pub mod backend;
pub mod cache;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod memory;
pub mod model;
pub mod notify;
mod reconciler;
pub mod recording;
pub mod reducer;
pub mod routing;
pub mod state;
pub mod theme;

pub use backend::{AuthBackend, ProjectSettingsStore};
pub use cache::CachedSettingsStore;
pub use config::{CacheConfig, MessagesConfig, RoutesConfig, SessionConfig};
pub use controller::SessionController;
pub use error::SessionError;
pub use events::{AuthEvent, AuthEventKind};
pub use memory::{MemoryBackend, Operation};
pub use model::{ColorMode, Preference, PreferenceSet, ProjectSetting, Session, User};
pub use notify::{Notice, NoticeLevel, Notifier};
pub use reconciler::SessionDeps;
pub use recording::{RecordingNavigator, RecordingNotifier, RecordingTheme, ThemePush};
pub use routing::{AppRoute, Navigator, RouteGuard};
pub use state::{AuthPhase, ControllerState};
pub use theme::{ThemeSink, ThemeSync};
