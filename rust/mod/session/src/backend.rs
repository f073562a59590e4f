//! Seams to the backend-as-a-service.
//!
//! The controller only talks to these traits. [`MemoryBackend`] implements
//! both for tests and the replay CLI.
//!
//! [`MemoryBackend`]: crate::memory::MemoryBackend

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::SessionError;
use crate::events::AuthEvent;
use crate::model::{Preference, ProjectSetting, Session};

/// Authentication half of the backend SDK.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Current persisted session, if any.
    async fn get_session(&self) -> Result<Option<Session>, SessionError>;

    /// Check credentials. On success the backend also emits `SIGNED_IN` on
    /// every subscribed channel before returning.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, SessionError>;

    /// Register an account; the backend sends the verification email.
    async fn sign_up(&self, email: &str, password: &str) -> Result<(), SessionError>;

    /// Invalidate the current session. Emits `SIGNED_OUT` on success.
    async fn sign_out(&self) -> Result<(), SessionError>;

    /// Open a new auth-event channel.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<AuthEvent>;
}

/// Per-user project settings, persisted remotely.
#[async_trait]
pub trait ProjectSettingsStore: Send + Sync {
    /// All settings of `user_id`. `force_reload` bypasses any cache.
    async fn fetch_project_settings(
        &self,
        user_id: &str,
        force_reload: bool,
    ) -> Result<Vec<ProjectSetting>, SessionError>;

    /// Flag `project_id` active for `user_id` and clear the flag elsewhere.
    async fn set_active_project(&self, user_id: &str, project_id: &str)
        -> Result<(), SessionError>;

    async fn save_preference(
        &self,
        user_id: &str,
        project_id: &str,
        preference: &Preference,
    ) -> Result<(), SessionError>;

    /// Forget anything cached for `user_id`.
    fn invalidate(&self, _user_id: &str) {}
}
