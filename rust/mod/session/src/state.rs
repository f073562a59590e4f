//! Controller state, stored at `session/state`.

use revu_flux::State;
use serde::{Deserialize, Serialize};

use crate::model::{ProjectSetting, Session, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthPhase {
    #[default]
    Uninitialized,
    Initializing,
    Authenticated,
    Anonymous,
}

/// Everything the front end reads to decide what to show.
///
/// Only the controller writes it. `user` and `active_project` are final
/// once `auth_loading` is false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerState {
    pub phase: AuthPhase,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,

    pub auth_loading: bool,

    /// Set after bootstrap; never cleared.
    pub auth_initialized: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_project: Option<ProjectSetting>,

    pub available_projects: Vec<ProjectSetting>,

    pub projects_loading: bool,

    pub project_switch_loading: bool,

    pub sign_out_loading: bool,
}

impl State for ControllerState {
    const PATH: &'static str = "session/state";
}

impl Default for ControllerState {
    fn default() -> Self {
        Self {
            phase: AuthPhase::Uninitialized,
            user: None,
            session: None,
            auth_loading: true,
            auth_initialized: false,
            active_project: None,
            available_projects: Vec::new(),
            projects_loading: false,
            project_switch_loading: false,
            sign_out_loading: false,
        }
    }
}

impl ControllerState {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.id.as_str())
    }

    pub fn active_project_id(&self) -> Option<&str> {
        self.active_project.as_ref().map(|p| p.project_id.as_str())
    }

    /// Full-screen loading overlay.
    pub fn overlay_visible(&self) -> bool {
        self.auth_loading || self.project_switch_loading || self.sign_out_loading
    }

    pub fn can_manage_master_data(&self) -> bool {
        self.active_project
            .as_ref()
            .is_some_and(|p| p.can_manage_master_data)
    }

    /// Signed in and settled, but without a project. A valid screen
    /// ("select a project"), not an error.
    pub fn needs_project_selection(&self) -> bool {
        self.auth_initialized
            && !self.auth_loading
            && self.is_authenticated()
            && self.active_project.is_none()
    }

    pub fn project(&self, project_id: &str) -> Option<&ProjectSetting> {
        self.available_projects
            .iter()
            .find(|p| p.project_id == project_id)
    }
}
