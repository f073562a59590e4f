//! In-memory backend.
//!
//! Implements both [`AuthBackend`] and [`ProjectSettingsStore`] over plain
//! maps. Used by tests and by `revu replay`. Supports failure injection per
//! operation and counts every call.

use std::collections::{BTreeMap, HashMap, VecDeque};

use async_trait::async_trait;
use chrono::Duration;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::backend::{AuthBackend, ProjectSettingsStore};
use crate::error::SessionError;
use crate::events::{AuthEvent, AuthEventKind};
use crate::model::{Preference, ProjectSetting, Session, User};

/// Backend calls that can be counted and made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    GetSession,
    SignIn,
    SignUp,
    SignOut,
    FetchSettings,
    SetActive,
    SavePreference,
}

struct Account {
    user: User,
    password: String,
}

#[derive(Default)]
struct Inner {
    accounts: BTreeMap<String, Account>,
    projects: Vec<ProjectSetting>,
    session: Option<Session>,
    subscribers: Vec<mpsc::UnboundedSender<AuthEvent>>,
    failures: HashMap<Operation, VecDeque<SessionError>>,
    calls: HashMap<Operation, usize>,
}

impl Inner {
    /// Count the call and pop an injected failure, if any.
    fn enter(&mut self, op: Operation) -> Result<(), SessionError> {
        *self.calls.entry(op).or_default() += 1;
        match self.failures.get_mut(&op).and_then(|q| q.pop_front()) {
            Some(err) => {
                debug!("injected failure for {op:?}: {err}");
                Err(err)
            }
            None => Ok(()),
        }
    }

    fn emit(&mut self, event: AuthEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

pub struct MemoryBackend {
    inner: Mutex<Inner>,
    session_ttl: Duration,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            session_ttl: Duration::hours(1),
        }
    }

    /// Register an account directly. Returns its user.
    pub fn add_account(&self, email: &str, password: &str) -> User {
        let mut inner = self.inner.lock();
        if let Some(existing) = inner.accounts.get(email) {
            return existing.user.clone();
        }
        let user = User::new(new_user_id()).with_email(email);
        inner.accounts.insert(
            email.to_string(),
            Account {
                user: user.clone(),
                password: password.to_string(),
            },
        );
        user
    }

    pub fn add_project(&self, project: ProjectSetting) {
        self.inner.lock().projects.push(project);
    }

    pub fn user_id(&self, email: &str) -> Option<String> {
        self.inner.lock().accounts.get(email).map(|a| a.user.id.clone())
    }

    pub fn projects_of(&self, user_id: &str) -> Vec<ProjectSetting> {
        self.inner
            .lock()
            .projects
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Pretend `email` signed in during an earlier visit: the session is
    /// persisted but no event is emitted.
    pub fn restore_session(&self, email: &str) -> Option<Session> {
        let mut inner = self.inner.lock();
        let user = inner.accounts.get(email)?.user.clone();
        let session = Session::issue(user, self.session_ttl);
        inner.session = Some(session.clone());
        Some(session)
    }

    /// Persist `session` as is, without emitting anything.
    pub fn persist_session(&self, session: Session) {
        self.inner.lock().session = Some(session);
    }

    pub fn current_session(&self) -> Option<Session> {
        self.inner.lock().session.clone()
    }

    /// Push an event to every subscriber.
    pub fn emit(&self, event: AuthEvent) {
        self.inner.lock().emit(event);
    }

    /// Issue a new session for the current user and emit `TOKEN_REFRESHED`.
    pub fn refresh_token(&self) -> Option<Session> {
        let mut inner = self.inner.lock();
        let user = inner.session.as_ref()?.user.clone();
        let session = Session::issue(user, self.session_ttl);
        inner.session = Some(session.clone());
        inner.emit(AuthEvent::token_refreshed(session.clone()));
        Some(session)
    }

    /// Make the next call of `op` fail with a network error.
    pub fn fail_next(&self, op: Operation, message: &str) {
        self.fail_next_with(op, SessionError::Network(message.to_string()));
    }

    pub fn fail_next_with(&self, op: Operation, err: SessionError) {
        self.inner
            .lock()
            .failures
            .entry(op)
            .or_default()
            .push_back(err);
    }

    pub fn calls(&self, op: Operation) -> usize {
        self.inner.lock().calls.get(&op).copied().unwrap_or(0)
    }
}

#[async_trait]
impl AuthBackend for MemoryBackend {
    async fn get_session(&self) -> Result<Option<Session>, SessionError> {
        let mut inner = self.inner.lock();
        inner.enter(Operation::GetSession)?;
        Ok(inner.session.clone())
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, SessionError> {
        let mut inner = self.inner.lock();
        inner.enter(Operation::SignIn)?;

        let user = match inner.accounts.get(email) {
            Some(account) if account.password == password => account.user.clone(),
            _ => {
                return Err(SessionError::Credentials(
                    "Invalid login credentials".to_string(),
                ))
            }
        };
        let session = Session::issue(user, self.session_ttl);
        inner.session = Some(session.clone());
        inner.emit(AuthEvent::signed_in(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<(), SessionError> {
        {
            let mut inner = self.inner.lock();
            inner.enter(Operation::SignUp)?;
            if inner.accounts.contains_key(email) {
                return Err(SessionError::Validation(
                    "User already registered".to_string(),
                ));
            }
        }
        self.add_account(email, password);
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();
        inner.enter(Operation::SignOut)?;
        inner.session = None;
        inner.emit(AuthEvent::signed_out());
        Ok(())
    }

    /// Like a real client SDK, a new subscriber first receives
    /// `INITIAL_SESSION` with whatever session is persisted.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<AuthEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock();
        let initial = AuthEvent::new(AuthEventKind::InitialSession, inner.session.clone());
        if tx.send(initial).is_ok() {
            inner.subscribers.push(tx);
        }
        rx
    }
}

#[async_trait]
impl ProjectSettingsStore for MemoryBackend {
    async fn fetch_project_settings(
        &self,
        user_id: &str,
        _force_reload: bool,
    ) -> Result<Vec<ProjectSetting>, SessionError> {
        self.inner.lock().enter(Operation::FetchSettings)?;
        Ok(self.projects_of(user_id))
    }

    async fn set_active_project(
        &self,
        user_id: &str,
        project_id: &str,
    ) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();
        inner.enter(Operation::SetActive)?;

        let owned = inner
            .projects
            .iter()
            .any(|p| p.user_id == user_id && p.project_id == project_id);
        if !owned {
            return Err(SessionError::NotFound(format!(
                "Project {project_id} not found"
            )));
        }
        for p in inner.projects.iter_mut().filter(|p| p.user_id == user_id) {
            p.is_active = p.project_id == project_id;
        }
        Ok(())
    }

    async fn save_preference(
        &self,
        user_id: &str,
        project_id: &str,
        preference: &Preference,
    ) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();
        inner.enter(Operation::SavePreference)?;

        let project = inner
            .projects
            .iter_mut()
            .find(|p| p.user_id == user_id && p.project_id == project_id)
            .ok_or_else(|| SessionError::NotFound(format!("Project {project_id} not found")))?;
        project.apply(preference);
        Ok(())
    }
}

fn new_user_id() -> String {
    uuid::Uuid::new_v4().to_string().replace('-', "")
}
