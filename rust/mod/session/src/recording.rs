//! Sinks that record what the controller did to them.

use parking_lot::Mutex;
use serde::Serialize;

use crate::model::ColorMode;
use crate::notify::{Notice, Notifier};
use crate::routing::Navigator;
use crate::theme::ThemeSink;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "target", content = "value", rename_all = "snake_case")]
pub enum ThemePush {
    ColorScheme(String),
    FontTheme(String),
    Mode(ColorMode),
}

#[derive(Debug, Default)]
pub struct RecordingTheme {
    pushes: Mutex<Vec<ThemePush>>,
}

impl RecordingTheme {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pushes(&self) -> Vec<ThemePush> {
        self.pushes.lock().clone()
    }
}

impl ThemeSink for RecordingTheme {
    fn set_color_scheme(&self, theme_id: &str) {
        self.pushes
            .lock()
            .push(ThemePush::ColorScheme(theme_id.to_string()));
    }

    fn set_font_theme(&self, font_pair_id: &str) {
        self.pushes
            .lock()
            .push(ThemePush::FontTheme(font_pair_id.to_string()));
    }

    fn set_mode(&self, mode: ColorMode) {
        self.pushes.lock().push(ThemePush::Mode(mode));
    }
}

/// Navigator with a current path and a history of redirects.
#[derive(Debug)]
pub struct RecordingNavigator {
    path: Mutex<String>,
    history: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new(initial_path: impl Into<String>) -> Self {
        Self {
            path: Mutex::new(initial_path.into()),
            history: Mutex::new(Vec::new()),
        }
    }

    /// The user opened `path` themselves (not a redirect).
    pub fn visit(&self, path: impl Into<String>) {
        *self.path.lock() = path.into();
    }

    /// Redirect targets, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.history.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn current_path(&self) -> String {
        self.path.lock().clone()
    }

    fn navigate(&self, target: &str) {
        *self.path.lock() = target.to_string();
        self.history.lock().push(target.to_string());
    }
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.notices.lock().iter().map(|n| n.message.clone()).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }
}
