//! Pure state transitions.
//!
//! `reduce(state, action)` is the only way [`ControllerState`] changes.
//! Preference patches rewrite fields of the active project but never its
//! id, and the theme push is keyed on that id, so a local edit cannot
//! trigger a push.

use crate::model::{Preference, PreferenceSet, ProjectSetting, Session};
use crate::state::{AuthPhase, ControllerState};

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    BootstrapStarted,
    /// New session copy from the backend (`None` = no session).
    SessionChanged(Option<Session>),
    AuthLoading(bool),
    ProjectsLoading(bool),
    /// Fresh list from the store. Active flags are normalized.
    ProjectsLoaded(Vec<ProjectSetting>),
    ProjectsFailed,
    /// Flip the active flag locally to `project_id`.
    ActiveProjectMarked(String),
    SwitchLoading(bool),
    SignOutLoading(bool),
    IdentityCleared,
    PreferencePatched(Preference),
    PreferencesRestored {
        project_id: String,
        preferences: PreferenceSet,
    },
    /// Bootstrap or a transition has finished.
    Settled,
}

pub fn reduce(mut state: ControllerState, action: Action) -> ControllerState {
    match action {
        Action::BootstrapStarted => {
            state.phase = AuthPhase::Initializing;
            state.auth_loading = true;
        }
        Action::SessionChanged(session) => {
            state.user = session.as_ref().map(|s| s.user.clone());
            state.session = session;
            if state.auth_initialized {
                state.phase = settled_phase(&state);
            }
        }
        Action::AuthLoading(on) => state.auth_loading = on,
        Action::ProjectsLoading(on) => state.projects_loading = on,
        Action::ProjectsLoaded(projects) => {
            state.available_projects = normalize(projects);
            state.active_project = state
                .available_projects
                .iter()
                .find(|p| p.is_active)
                .cloned();
        }
        Action::ProjectsFailed => {
            state.active_project = None;
            state.available_projects.clear();
        }
        Action::ActiveProjectMarked(project_id) => {
            if state.project(&project_id).is_some() {
                for p in &mut state.available_projects {
                    p.is_active = p.project_id == project_id;
                }
                state.active_project = state.project(&project_id).cloned();
            }
        }
        Action::SwitchLoading(on) => state.project_switch_loading = on,
        Action::SignOutLoading(on) => state.sign_out_loading = on,
        Action::IdentityCleared => {
            state.user = None;
            state.session = None;
            state.active_project = None;
            state.available_projects.clear();
            state.projects_loading = false;
            state.project_switch_loading = false;
            if state.auth_initialized {
                state.phase = AuthPhase::Anonymous;
            }
        }
        Action::PreferencePatched(pref) => {
            if let Some(active) = state.active_project.as_mut() {
                active.apply(&pref);
                let id = active.project_id.clone();
                if let Some(p) = state
                    .available_projects
                    .iter_mut()
                    .find(|p| p.project_id == id)
                {
                    p.apply(&pref);
                }
            }
        }
        Action::PreferencesRestored {
            project_id,
            preferences,
        } => {
            if let Some(p) = state
                .available_projects
                .iter_mut()
                .find(|p| p.project_id == project_id)
            {
                p.restore(preferences.clone());
            }
            if let Some(active) = state
                .active_project
                .as_mut()
                .filter(|p| p.project_id == project_id)
            {
                active.restore(preferences);
            }
        }
        Action::Settled => {
            state.auth_loading = false;
            state.auth_initialized = true;
            state.phase = settled_phase(&state);
        }
    }
    state
}

fn settled_phase(state: &ControllerState) -> AuthPhase {
    if state.is_authenticated() {
        AuthPhase::Authenticated
    } else {
        AuthPhase::Anonymous
    }
}

/// Exactly one active project when the list is non-empty: the first one
/// flagged, else the first one.
pub fn normalize(mut projects: Vec<ProjectSetting>) -> Vec<ProjectSetting> {
    let active = projects.iter().position(|p| p.is_active).unwrap_or(0);
    for (i, p) in projects.iter_mut().enumerate() {
        p.is_active = i == active;
    }
    projects
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::User;
    use chrono::Duration;

    fn project(id: &str, active: bool) -> ProjectSetting {
        let p = ProjectSetting::new(id, id.to_uppercase(), "u1");
        if active { p.active() } else { p }
    }

    fn signed_in() -> ControllerState {
        let session = Session::issue(User::new("u1"), Duration::hours(1));
        let state = reduce(ControllerState::default(), Action::BootstrapStarted);
        let state = reduce(state, Action::SessionChanged(Some(session)));
        let state = reduce(
            state,
            Action::ProjectsLoaded(vec![project("p1", true), project("p2", false)]),
        );
        reduce(state, Action::Settled)
    }

    // ====================================================================
    // Lifecycle
    // ====================================================================

    #[test]
    fn bootstrap_then_settle() {
        let state = reduce(ControllerState::default(), Action::BootstrapStarted);
        assert_eq!(state.phase, AuthPhase::Initializing);

        let state = reduce(state, Action::Settled);
        assert_eq!(state.phase, AuthPhase::Anonymous);
        assert!(state.auth_initialized);
        assert!(!state.auth_loading);
    }

    #[test]
    fn session_before_settle_keeps_initializing() {
        let session = Session::issue(User::new("u1"), Duration::hours(1));
        let state = reduce(ControllerState::default(), Action::BootstrapStarted);
        let state = reduce(state, Action::SessionChanged(Some(session)));
        assert_eq!(state.phase, AuthPhase::Initializing);
        assert_eq!(state.user_id(), Some("u1"));
    }

    #[test]
    fn identity_cleared_resets_everything_but_initialized() {
        let state = reduce(signed_in(), Action::IdentityCleared);
        assert_eq!(state.phase, AuthPhase::Anonymous);
        assert!(state.user.is_none());
        assert!(state.session.is_none());
        assert!(state.active_project.is_none());
        assert!(state.available_projects.is_empty());
        assert!(state.auth_initialized);
    }

    // ====================================================================
    // Projects
    // ====================================================================

    #[test]
    fn normalize_picks_first_flagged() {
        let list = normalize(vec![
            project("p1", false),
            project("p2", true),
            project("p3", true),
        ]);
        let active: Vec<_> = list.iter().filter(|p| p.is_active).collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].project_id, "p2");
    }

    #[test]
    fn normalize_activates_first_when_none_flagged() {
        let list = normalize(vec![project("p1", false), project("p2", false)]);
        assert!(list[0].is_active);
        assert!(!list[1].is_active);
        assert!(normalize(Vec::new()).is_empty());
    }

    #[test]
    fn projects_failed_keeps_user() {
        let state = reduce(signed_in(), Action::ProjectsFailed);
        assert!(state.is_authenticated());
        assert!(state.active_project.is_none());
        assert!(state.needs_project_selection());
    }

    #[test]
    fn mark_active_flips_flags() {
        let state = reduce(signed_in(), Action::ActiveProjectMarked("p2".into()));
        assert_eq!(state.active_project_id(), Some("p2"));
        assert!(!state.project("p1").unwrap().is_active);
        assert!(state.project("p2").unwrap().is_active);
    }

    #[test]
    fn mark_unknown_project_is_ignored() {
        let before = signed_in();
        let after = reduce(before.clone(), Action::ActiveProjectMarked("nope".into()));
        assert_eq!(before, after);
    }

    // ====================================================================
    // Preferences
    // ====================================================================

    #[test]
    fn patch_touches_active_only() {
        let state = reduce(signed_in(), Action::PreferencePatched(Preference::DarkMode(true)));
        assert!(state.active_project.as_ref().unwrap().dark_mode);
        assert!(state.project("p1").unwrap().dark_mode);
        assert!(!state.project("p2").unwrap().dark_mode);
        assert_eq!(state.active_project_id(), Some("p1"));
    }

    #[test]
    fn patch_without_active_project_is_noop() {
        let state = reduce(ControllerState::default(), Action::PreferencePatched(
            Preference::Theme("ocean".into()),
        ));
        assert_eq!(state, ControllerState::default());
    }

    #[test]
    fn restore_rolls_back_patch() {
        let before = signed_in();
        let saved = before.active_project.as_ref().unwrap().preferences();
        let patched = reduce(
            before.clone(),
            Action::PreferencePatched(Preference::Theme("ocean".into())),
        );
        let restored = reduce(
            patched,
            Action::PreferencesRestored {
                project_id: "p1".into(),
                preferences: saved,
            },
        );
        assert_eq!(restored, before);
    }
}
