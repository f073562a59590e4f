//! Pushing the active project's UI preferences to the theme controllers.

use tracing::debug;

use crate::model::{ColorMode, ProjectSetting};

/// The three external theme controllers.
pub trait ThemeSink: Send + Sync {
    fn set_color_scheme(&self, theme_id: &str);
    fn set_font_theme(&self, font_pair_id: &str);
    fn set_mode(&self, mode: ColorMode);
}

/// Remembers whose project was last pushed.
///
/// The push is keyed on the (user id, project id) pair. Preference edits on
/// the project that is already active never push again; switching to another
/// project, another user's setting for the same project, or losing the
/// active project and getting one back, does.
#[derive(Debug, Default)]
pub struct ThemeSync {
    last_pushed: Option<(String, String)>,
}

impl ThemeSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the sink was called.
    pub fn sync(
        &mut self,
        initialized: bool,
        active: Option<&ProjectSetting>,
        sink: &dyn ThemeSink,
    ) -> bool {
        let Some(project) = active else {
            self.last_pushed = None;
            return false;
        };
        let key = (project.user_id.clone(), project.project_id.clone());
        if !initialized || self.last_pushed.as_ref() == Some(&key) {
            return false;
        }

        debug!(
            "pushing theme of project {} for {}",
            project.project_id, project.user_id
        );
        if let Some(theme) = &project.theme_id {
            sink.set_color_scheme(theme);
        }
        if let Some(font) = &project.font_pair_id {
            sink.set_font_theme(font);
        }
        sink.set_mode(project.mode());
        self.last_pushed = Some(key);
        true
    }

    /// Project id of the last push.
    pub fn last_pushed(&self) -> Option<&str> {
        self.last_pushed.as_ref().map(|(_, project_id)| project_id.as_str())
    }
}
