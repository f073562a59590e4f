//! Replay scripts.
//!
//! A script seeds the in-memory backend, starts a controller on it, runs a
//! list of steps, and reports what the controller did.
//!
//! ```json
//! {
//!   "start_path": "/dashboard",
//!   "accounts": [
//!     { "email": "ana@example.org", "password": "pw",
//!       "projects": [{ "project_id": "p1", "project_name": "Interviews", "is_active": true }] }
//!   ],
//!   "steps": [
//!     { "op": "sign_in", "email": "ana@example.org", "password": "pw" },
//!     { "op": "fail_next", "operation": "set_active", "message": "timeout" },
//!     { "op": "select_project", "project_id": "p2" }
//!   ]
//! }
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use revu_session::{
    AuthEvent, AuthEventKind, ControllerState, MemoryBackend, Notice, Operation, Preference,
    ProjectSetting, RecordingNavigator, RecordingNotifier, RecordingTheme, SessionConfig,
    SessionController, SessionDeps, SessionError, ThemePush,
};

#[derive(Debug, Deserialize)]
pub struct Script {
    /// Path the front end is on when the controller starts.
    #[serde(default = "default_start_path")]
    pub start_path: String,

    #[serde(default)]
    pub accounts: Vec<AccountSeed>,

    /// Email of an account whose session is already persisted.
    #[serde(default)]
    pub restore_session: Option<String>,

    #[serde(default)]
    pub steps: Vec<Step>,
}

fn default_start_path() -> String {
    "/".to_string()
}

#[derive(Debug, Deserialize)]
pub struct AccountSeed {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub projects: Vec<ProjectSeed>,
}

/// A project setting without its user id; the account supplies it.
#[derive(Debug, Deserialize)]
pub struct ProjectSeed {
    pub project_id: String,
    pub project_name: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub can_manage_master_data: bool,
    #[serde(default = "default_true")]
    pub can_review: bool,
    #[serde(default)]
    pub theme_id: Option<String>,
    #[serde(default)]
    pub font_pair_id: Option<String>,
    #[serde(default)]
    pub dark_mode: bool,
}

fn default_true() -> bool {
    true
}

impl ProjectSeed {
    fn into_setting(self, user_id: &str) -> ProjectSetting {
        ProjectSetting {
            is_active: self.is_active,
            can_manage_master_data: self.can_manage_master_data,
            can_review: self.can_review,
            theme_id: self.theme_id,
            font_pair_id: self.font_pair_id,
            dark_mode: self.dark_mode,
            ..ProjectSetting::new(self.project_id, self.project_name, user_id)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    SignIn { email: String, password: String },
    SignUp { email: String, password: String },
    SignOut,
    SelectProject { project_id: String },
    SetPreference { preference: Preference },
    SavePreference { preference: Preference },
    RefreshProjects,
    /// The user opens `path`.
    Visit { path: String },
    /// The backend refreshes the access token.
    RefreshToken,
    /// The backend emits `kind` with the current session.
    Emit { kind: AuthEventKind },
    /// The next backend call of `operation` fails.
    FailNext { operation: Operation, message: String },
}

#[derive(Debug, Serialize)]
pub struct StepOutcome {
    pub step: Step,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<StepError>,
}

#[derive(Debug, Serialize)]
pub struct StepError {
    pub code: &'static str,
    pub message: String,
}

impl From<&SessionError> for StepError {
    fn from(err: &SessionError) -> Self {
        Self {
            code: err.error_code(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub state: ControllerState,
    pub steps: Vec<StepOutcome>,
    pub navigations: Vec<String>,
    pub theme_pushes: Vec<ThemePush>,
    pub notices: Vec<Notice>,
}

pub fn parse(json: &str) -> anyhow::Result<Script> {
    Ok(serde_json::from_str(json)?)
}

/// Run `script` against a fresh in-memory backend.
pub async fn replay(script: Script, config: SessionConfig) -> anyhow::Result<Report> {
    let backend = Arc::new(MemoryBackend::new());
    for account in script.accounts {
        let user = backend.add_account(&account.email, &account.password);
        for project in account.projects {
            backend.add_project(project.into_setting(&user.id));
        }
    }
    if let Some(email) = &script.restore_session {
        backend
            .restore_session(email)
            .ok_or_else(|| anyhow::anyhow!("restore_session: unknown account {email}"))?;
    }

    let theme = Arc::new(RecordingTheme::new());
    let navigator = Arc::new(RecordingNavigator::new(script.start_path));
    let notifier = Arc::new(RecordingNotifier::new());
    let controller = SessionController::start(
        SessionDeps {
            auth: backend.clone(),
            settings: backend.clone(),
            theme: theme.clone(),
            navigator: navigator.clone(),
            notifier: notifier.clone(),
        },
        config,
    );
    controller.settle().await?;

    let mut outcomes = Vec::with_capacity(script.steps.len());
    for step in script.steps {
        info!("step: {step:?}");
        let result = run_step(&controller, &backend, &navigator, step.clone()).await;
        controller.settle().await?;
        outcomes.push(StepOutcome {
            step,
            error: result.as_ref().err().map(StepError::from),
        });
    }

    let state = controller.shutdown().await?;
    Ok(Report {
        state,
        steps: outcomes,
        navigations: navigator.history(),
        theme_pushes: theme.pushes(),
        notices: notifier.notices(),
    })
}

async fn run_step(
    controller: &SessionController,
    backend: &MemoryBackend,
    navigator: &RecordingNavigator,
    step: Step,
) -> Result<(), SessionError> {
    match step {
        Step::SignIn { email, password } => controller.sign_in(&email, &password).await,
        Step::SignUp { email, password } => controller.sign_up(&email, &password).await,
        Step::SignOut => controller.sign_out().await,
        Step::SelectProject { project_id } => controller.select_project(&project_id).await,
        Step::SetPreference { preference } => {
            controller.set_project_preference_local(preference).await
        }
        Step::SavePreference { preference } => controller.save_project_preference(preference).await,
        Step::RefreshProjects => controller.refresh_projects().await,
        Step::Visit { path } => {
            navigator.visit(path.clone());
            controller.route_changed(&path).await
        }
        Step::RefreshToken => {
            if backend.refresh_token().is_none() {
                return Err(SessionError::Unauthenticated("No session to refresh".to_string()));
            }
            Ok(())
        }
        Step::Emit { kind } => {
            backend.emit(AuthEvent::new(kind, backend.current_session()));
            Ok(())
        }
        Step::FailNext { operation, message } => {
            backend.fail_next(operation, &message);
            Ok(())
        }
    }
}
