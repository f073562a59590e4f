//! The reconciler: sole owner of [`ControllerState`].
//!
//! Runs on the queue worker. Bootstrap, auth events, and caller tasks all
//! pass through here one at a time, so the idempotency keys below are plain
//! fields compared before acting.

use std::sync::Arc;

use revu_flux::{Reconciler, Sequence, StateStore};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::backend::{AuthBackend, ProjectSettingsStore};
use crate::config::MessagesConfig;
use crate::error::SessionError;
use crate::events::{AuthEvent, AuthEventKind};
use crate::model::{Preference, Session};
use crate::notify::{Notice, Notifier};
use crate::reducer::{reduce, Action};
use crate::routing::{AppRoute, Navigator, RouteGuard};
use crate::state::ControllerState;
use crate::theme::{ThemeSink, ThemeSync};

pub(crate) type Reply<T> = oneshot::Sender<T>;

/// Work submitted by the controller handle.
pub(crate) enum Task {
    SignIn {
        email: String,
        password: String,
        reply: Reply<Result<(), SessionError>>,
    },
    SignUp {
        email: String,
        password: String,
        reply: Reply<Result<(), SessionError>>,
    },
    SignOut(Reply<()>),
    SelectProject {
        project_id: String,
        reply: Reply<Result<(), SessionError>>,
    },
    PatchPreference {
        preference: Preference,
        reply: Reply<()>,
    },
    SavePreference {
        preference: Preference,
        reply: Reply<Result<(), SessionError>>,
    },
    RefreshProjects(Reply<Result<(), SessionError>>),
    RouteChanged {
        path: String,
        reply: Reply<()>,
    },
    /// Resolves once everything queued before it has run.
    Barrier(Reply<()>),
}

/// External collaborators of the controller.
#[derive(Clone)]
pub struct SessionDeps {
    pub auth: Arc<dyn AuthBackend>,
    pub settings: Arc<dyn ProjectSettingsStore>,
    pub theme: Arc<dyn ThemeSink>,
    pub navigator: Arc<dyn Navigator>,
    pub notifier: Arc<dyn Notifier>,
}

pub(crate) struct SessionReconciler {
    deps: SessionDeps,
    store: Arc<StateStore>,
    guard: RouteGuard,
    messages: MessagesConfig,
    state: ControllerState,
    theme: ThemeSync,

    // Idempotency keys.
    last_user_id: Option<String>,
    initial_load_attempted: bool,
    welcome_shown: bool,
}

impl SessionReconciler {
    pub(crate) fn new(
        deps: SessionDeps,
        store: Arc<StateStore>,
        guard: RouteGuard,
        messages: MessagesConfig,
    ) -> Self {
        Self {
            deps,
            store,
            guard,
            messages,
            state: ControllerState::default(),
            theme: ThemeSync::new(),
            last_user_id: None,
            initial_load_attempted: false,
            welcome_shown: false,
        }
    }

    pub(crate) fn into_state(self) -> ControllerState {
        self.state
    }

    // ========================================================================
    // State plumbing
    // ========================================================================

    fn dispatch(&mut self, action: Action) {
        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, action);
        self.store.set(self.state.clone());
    }

    fn notify(&self, notice: Notice) {
        self.deps.notifier.notify(notice.clone());
        self.store.set(notice);
    }

    fn notify_error(&self, err: &SessionError) {
        let message = err.user_message(&self.messages.fallback_error).to_string();
        self.notify(Notice::error(message));
    }

    fn user_id(&self) -> Option<String> {
        self.state.user_id().map(str::to_owned)
    }

    /// Whether `user_id` has already had its projects loaded.
    fn already_loaded(&self, user_id: &str) -> bool {
        self.initial_load_attempted && self.last_user_id.as_deref() == Some(user_id)
    }

    /// Side effects that follow every settled transition: theme push and
    /// redirect.
    fn after_transition(&mut self) {
        self.theme.sync(
            self.state.auth_initialized,
            self.state.active_project.as_ref(),
            self.deps.theme.as_ref(),
        );
        let path = self.deps.navigator.current_path();
        self.enforce_route(&path);
    }

    fn enforce_route(&self, path: &str) {
        if !self.state.auth_initialized || self.state.auth_loading {
            return;
        }
        if let Some(target) = self.guard.decide(path, self.state.is_authenticated()) {
            info!("redirecting {path} -> {target}");
            self.deps.navigator.navigate(&target);
            self.store.set(AppRoute(target));
        }
    }

    // ========================================================================
    // Projects
    // ========================================================================

    /// Force-load the user's project settings. With `overlay` the global
    /// loading overlay is raised; otherwise only `projects_loading`.
    ///
    /// A failure degrades to "signed in, no project" and is reported with a
    /// warning notice.
    async fn load_projects(&mut self, user_id: &str, overlay: bool) -> Result<(), SessionError> {
        self.initial_load_attempted = true;
        self.last_user_id = Some(user_id.to_string());
        if overlay {
            self.dispatch(Action::AuthLoading(true));
        }
        self.dispatch(Action::ProjectsLoading(true));

        let result = self
            .deps
            .settings
            .fetch_project_settings(user_id, true)
            .await;

        let outcome = match result {
            Ok(projects) => {
                let needs_activation =
                    !projects.is_empty() && !projects.iter().any(|p| p.is_active);
                let count = projects.len();
                self.dispatch(Action::ProjectsLoaded(projects));
                debug!("loaded {count} projects for {user_id}");
                if needs_activation {
                    self.persist_auto_activation(user_id).await;
                }
                Ok(())
            }
            Err(e) => {
                warn!("failed to load projects for {user_id}: {e}");
                self.dispatch(Action::ProjectsFailed);
                self.notify(Notice::warning(self.messages.projects_unavailable.clone()));
                Err(e)
            }
        };

        self.dispatch(Action::ProjectsLoading(false));
        outcome
    }

    /// No project was flagged, so the first one was activated locally.
    /// Persist that choice; a failure only costs a log line.
    async fn persist_auto_activation(&mut self, user_id: &str) {
        let Some(project_id) = self.state.active_project_id().map(str::to_owned) else {
            return;
        };
        info!("no active project for {user_id}, activating {project_id}");
        if let Err(e) = self
            .deps
            .settings
            .set_active_project(user_id, &project_id)
            .await
        {
            warn!("could not persist active project {project_id}: {e}");
        }
    }

    fn clear_identity(&mut self) {
        if let Some(user_id) = self.last_user_id.take().or_else(|| self.user_id()) {
            self.deps.settings.invalidate(&user_id);
        }
        self.initial_load_attempted = false;
        self.welcome_shown = false;
        self.dispatch(Action::IdentityCleared);
    }

    // ========================================================================
    // Auth events
    // ========================================================================

    async fn on_signed_in(&mut self, session: Option<Session>) {
        let Some(session) = live(session) else {
            warn!("SIGNED_IN without a live session, ignoring");
            return;
        };
        let user_id = session.user_id().to_string();
        self.dispatch(Action::SessionChanged(Some(session)));

        if self.already_loaded(&user_id) && self.state.active_project.is_some() {
            debug!("redundant SIGNED_IN for {user_id}, skipping reload");
            return;
        }

        let loaded = self.load_projects(&user_id, true).await.is_ok();
        if loaded && !self.welcome_shown {
            self.welcome_shown = true;
            self.notify(Notice::success(self.messages.welcome.clone()));
        }
        info!("signed in as {user_id}");
    }

    async fn on_session_refreshed(&mut self, kind: AuthEventKind, session: Option<Session>) {
        if let Some(session) = live(session) {
            self.dispatch(Action::SessionChanged(Some(session)));
        }
        let Some(user_id) = self.user_id() else {
            return;
        };
        if self.state.active_project.is_some() {
            debug!("{kind} with a cached project, no reload");
            return;
        }
        info!("{kind} without a cached project, recovering projects for {user_id}");
        let _ = self.load_projects(&user_id, false).await;
    }

    async fn on_initial_session(&mut self, session: Option<Session>) {
        let Some(session) = live(session) else {
            debug!("INITIAL_SESSION without a live session");
            return;
        };
        let user_id = session.user_id().to_string();
        self.dispatch(Action::SessionChanged(Some(session)));
        if self.already_loaded(&user_id) {
            debug!("INITIAL_SESSION for {user_id} already handled by bootstrap");
            return;
        }
        let _ = self.load_projects(&user_id, true).await;
    }

    // ========================================================================
    // Caller tasks
    // ========================================================================

    async fn sign_in(&mut self, email: &str, password: &str) -> Result<(), SessionError> {
        self.dispatch(Action::AuthLoading(true));
        let result = self
            .deps
            .auth
            .sign_in_with_password(email, password)
            .await;
        self.dispatch(Action::AuthLoading(false));

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!("sign-in failed for {email}: {e}");
                self.notify_error(&e);
                Err(e)
            }
        }
    }

    async fn sign_up(&mut self, email: &str, password: &str) -> Result<(), SessionError> {
        self.dispatch(Action::AuthLoading(true));
        let result = self.deps.auth.sign_up(email, password).await;
        self.dispatch(Action::AuthLoading(false));

        match result {
            Ok(()) => {
                info!("sign-up requested for {email}");
                self.notify(Notice::info(self.messages.sign_up_sent.clone()));
                Ok(())
            }
            Err(e) => {
                warn!("sign-up failed for {email}: {e}");
                self.notify_error(&e);
                Err(e)
            }
        }
    }

    async fn sign_out(&mut self) {
        self.dispatch(Action::SignOutLoading(true));
        if let Err(e) = self.deps.auth.sign_out().await {
            warn!("backend sign-out failed, clearing local session anyway: {e}");
        }
        self.clear_identity();
        self.dispatch(Action::SignOutLoading(false));
        self.notify(Notice::info(self.messages.signed_out.clone()));
        info!("signed out");
    }

    async fn select_project(&mut self, project_id: &str) -> Result<(), SessionError> {
        if self.state.active_project_id() == Some(project_id) {
            debug!("project {project_id} already active");
            return Ok(());
        }
        let user_id = self
            .user_id()
            .ok_or_else(|| SessionError::Unauthenticated("Not signed in".to_string()))?;

        self.dispatch(Action::SwitchLoading(true));
        let result = self.switch_project(&user_id, project_id).await;
        self.dispatch(Action::SwitchLoading(false));
        result
    }

    async fn switch_project(&mut self, user_id: &str, project_id: &str) -> Result<(), SessionError> {
        if let Err(e) = self
            .deps
            .settings
            .set_active_project(user_id, project_id)
            .await
        {
            warn!("switching to project {project_id} failed: {e}");
            self.notify_error(&e);
            return Err(e);
        }

        match self.deps.settings.fetch_project_settings(user_id, true).await {
            Ok(projects) => self.dispatch(Action::ProjectsLoaded(projects)),
            Err(e) => {
                warn!("re-fetch after switching to {project_id} failed, flipping locally: {e}");
                self.dispatch(Action::ActiveProjectMarked(project_id.to_string()));
            }
        }

        if let Some(active) = &self.state.active_project {
            info!("active project is now {}", active.project_id);
            let message = self.messages.project_switched(&active.project_name);
            self.notify(Notice::success(message));
        }
        Ok(())
    }

    async fn save_preference(&mut self, preference: Preference) -> Result<(), SessionError> {
        let Some(active) = self.state.active_project.clone() else {
            return Err(SessionError::NotFound("No active project".to_string()));
        };
        let user_id = self
            .user_id()
            .ok_or_else(|| SessionError::Unauthenticated("Not signed in".to_string()))?;

        let previous = active.preferences();
        self.dispatch(Action::PreferencePatched(preference.clone()));

        match self
            .deps
            .settings
            .save_preference(&user_id, &active.project_id, &preference)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!("saving {preference:?} for {} failed, rolling back: {e}", active.project_id);
                self.dispatch(Action::PreferencesRestored {
                    project_id: active.project_id,
                    preferences: previous,
                });
                self.notify_error(&e);
                Err(e)
            }
        }
    }

    async fn refresh_projects(&mut self) -> Result<(), SessionError> {
        let user_id = self
            .user_id()
            .ok_or_else(|| SessionError::Unauthenticated("Not signed in".to_string()))?;
        self.load_projects(&user_id, false).await
    }
}

/// Drops a session whose access token has already expired.
fn live(session: Option<Session>) -> Option<Session> {
    match session {
        Some(s) if s.is_expired() => {
            debug!("ignoring expired session of {}", s.user_id());
            None
        }
        other => other,
    }
}

impl Reconciler for SessionReconciler {
    type Task = Task;
    type Event = AuthEvent;

    async fn bootstrap(&mut self) {
        self.dispatch(Action::BootstrapStarted);

        match self.deps.auth.get_session().await {
            Ok(Some(session)) if session.is_expired() => {
                debug!("persisted session has expired");
            }
            Ok(Some(session)) => {
                let user_id = session.user_id().to_string();
                self.dispatch(Action::SessionChanged(Some(session)));
                let _ = self.load_projects(&user_id, false).await;
            }
            Ok(None) => debug!("no persisted session"),
            Err(e) => error!("bootstrap could not read the session, continuing anonymous: {e}"),
        }

        self.dispatch(Action::Settled);
        self.after_transition();
        info!("session bootstrap complete ({:?})", self.state.phase);
    }

    async fn on_event(&mut self, seq: Sequence, event: AuthEvent) {
        debug!("auth event {} (seq {})", event.kind, seq.0);

        match event.kind {
            AuthEventKind::SignedIn => self.on_signed_in(event.session).await,
            AuthEventKind::SignedOut => {
                if self.state.is_authenticated() {
                    info!("signed out by backend");
                }
                self.clear_identity();
            }
            kind @ (AuthEventKind::TokenRefreshed | AuthEventKind::UserUpdated) => {
                self.on_session_refreshed(kind, event.session).await
            }
            AuthEventKind::InitialSession => self.on_initial_session(event.session).await,
        }

        self.dispatch(Action::Settled);
        self.after_transition();
    }

    async fn on_task(&mut self, _seq: Sequence, task: Task) {
        match task {
            Task::SignIn {
                email,
                password,
                reply,
            } => {
                let result = self.sign_in(&email, &password).await;
                let _ = reply.send(result);
            }
            Task::SignUp {
                email,
                password,
                reply,
            } => {
                let result = self.sign_up(&email, &password).await;
                let _ = reply.send(result);
            }
            Task::SignOut(reply) => {
                self.sign_out().await;
                self.after_transition();
                let _ = reply.send(());
            }
            Task::SelectProject { project_id, reply } => {
                let result = self.select_project(&project_id).await;
                self.after_transition();
                let _ = reply.send(result);
            }
            Task::PatchPreference { preference, reply } => {
                self.dispatch(Action::PreferencePatched(preference));
                self.after_transition();
                let _ = reply.send(());
            }
            Task::SavePreference { preference, reply } => {
                let result = self.save_preference(preference).await;
                self.after_transition();
                let _ = reply.send(result);
            }
            Task::RefreshProjects(reply) => {
                let result = self.refresh_projects().await;
                self.after_transition();
                let _ = reply.send(result);
            }
            Task::RouteChanged { path, reply } => {
                self.store.set(AppRoute(path.clone()));
                self.enforce_route(&path);
                let _ = reply.send(());
            }
            Task::Barrier(reply) => {
                let _ = reply.send(());
            }
        }
    }
}
