//! Public handle to the session controller.

use std::sync::Arc;

use chrono::Duration;
use revu_flux::{StateStore, TaskQueue};
use tokio::task::JoinHandle;
use tracing::info;

use crate::backend::ProjectSettingsStore;
use crate::cache::CachedSettingsStore;
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::model::Preference;
use crate::reconciler::{SessionDeps, SessionReconciler, Task};
use crate::routing::RouteGuard;
use crate::state::ControllerState;

/// Owns the reconciliation worker and the state store it publishes to.
///
/// Every method enqueues a task and waits for its reply. Auth events from
/// the backend are drained before queued tasks, so an event emitted while a
/// call is running is reconciled before the next call starts. Use
/// [`settle`](Self::settle) to wait for everything queued so far.
///
/// Must be started inside a tokio runtime.
pub struct SessionController {
    queue: TaskQueue<Task>,
    store: Arc<StateStore>,
    settings: Arc<dyn ProjectSettingsStore>,
    worker: JoinHandle<SessionReconciler>,
}

impl SessionController {
    pub fn start(mut deps: SessionDeps, config: SessionConfig) -> Self {
        if config.cache.ttl_secs > 0 {
            let ttl = Duration::seconds(config.cache.ttl_secs.min(u32::MAX as u64) as i64);
            let cached: Arc<dyn ProjectSettingsStore> =
                Arc::new(CachedSettingsStore::new(deps.settings.clone(), ttl));
            deps.settings = cached;
        }

        let store = Arc::new(StateStore::new());
        store.set(ControllerState::default());

        let settings = deps.settings.clone();
        let events = deps.auth.subscribe();
        let guard = RouteGuard::from(config.routes);
        let reconciler = SessionReconciler::new(deps, store.clone(), guard, config.messages);
        let (queue, worker) = TaskQueue::spawn(reconciler, Some(events));

        info!("session controller started");
        Self {
            queue,
            store,
            settings,
            worker,
        }
    }

    /// The store holding `session/state`, `app/route`, and `app/notice`.
    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    /// The settings store the controller uses, cache included. Pages read
    /// project data through it with `force_reload = false`.
    pub fn settings(&self) -> Arc<dyn ProjectSettingsStore> {
        self.settings.clone()
    }

    /// Latest published snapshot.
    pub fn state(&self) -> ControllerState {
        self.store.get::<ControllerState>().unwrap_or_default()
    }

    /// Wait until everything queued so far, including pending auth events,
    /// has been reconciled.
    pub async fn settle(&self) -> Result<(), SessionError> {
        self.queue.request(Task::Barrier).await?;
        Ok(())
    }

    /// Check credentials with the backend. The user and projects arrive
    /// through the resulting `SIGNED_IN` event, not through this call.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), SessionError> {
        self.queue
            .request(|reply| Task::SignIn {
                email: email.to_string(),
                password: password.to_string(),
                reply,
            })
            .await?
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<(), SessionError> {
        self.queue
            .request(|reply| Task::SignUp {
                email: email.to_string(),
                password: password.to_string(),
                reply,
            })
            .await?
    }

    /// Always ends signed out locally, whatever the backend answers.
    pub async fn sign_out(&self) -> Result<(), SessionError> {
        self.queue.request(Task::SignOut).await?;
        Ok(())
    }

    /// Make `project_id` the active project. A no-op if it already is.
    pub async fn select_project(&self, project_id: &str) -> Result<(), SessionError> {
        self.queue
            .request(|reply| Task::SelectProject {
                project_id: project_id.to_string(),
                reply,
            })
            .await?
    }

    /// Optimistic local edit of the active project's UI preferences.
    /// Nothing is persisted and the theme is not pushed again.
    pub async fn set_project_preference_local(
        &self,
        preference: Preference,
    ) -> Result<(), SessionError> {
        self.queue
            .request(|reply| Task::PatchPreference { preference, reply })
            .await?;
        Ok(())
    }

    /// Local edit plus persistence; rolled back if the save fails.
    pub async fn save_project_preference(
        &self,
        preference: Preference,
    ) -> Result<(), SessionError> {
        self.queue
            .request(|reply| Task::SavePreference { preference, reply })
            .await?
    }

    /// Reload the current user's projects without the overlay.
    pub async fn refresh_projects(&self) -> Result<(), SessionError> {
        self.queue.request(Task::RefreshProjects).await?
    }

    /// The front end navigated to `path`. Recorded at `app/route` and
    /// checked against the redirect guard.
    pub async fn route_changed(&self, path: &str) -> Result<(), SessionError> {
        self.queue
            .request(|reply| Task::RouteChanged {
                path: path.to_string(),
                reply,
            })
            .await?;
        Ok(())
    }

    /// Stop the worker after the backlog drains and return the final state.
    pub async fn shutdown(self) -> Result<ControllerState, SessionError> {
        let Self { queue, worker, .. } = self;
        drop(queue);
        let reconciler = worker
            .await
            .map_err(|e| SessionError::Internal(format!("session worker failed: {e}")))?;
        info!("session controller stopped");
        Ok(reconciler.into_state())
    }
}
