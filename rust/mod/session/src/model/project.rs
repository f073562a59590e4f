use serde::{Deserialize, Serialize};

/// One user's membership in one project: permissions plus UI preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSetting {
    pub project_id: String,

    pub project_name: String,

    pub user_id: String,

    /// At most one setting per user carries this flag after reconciliation.
    #[serde(default)]
    pub is_active: bool,

    /// May edit members, roles, and dimensions.
    #[serde(default)]
    pub can_manage_master_data: bool,

    /// May preclassify and annotate articles.
    #[serde(default = "default_true")]
    pub can_review: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_pair_id: Option<String>,

    #[serde(default)]
    pub dark_mode: bool,
}

impl ProjectSetting {
    pub fn new(
        project_id: impl Into<String>,
        project_name: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            project_name: project_name.into(),
            user_id: user_id.into(),
            is_active: false,
            can_manage_master_data: false,
            can_review: true,
            theme_id: None,
            font_pair_id: None,
            dark_mode: false,
        }
    }

    pub fn active(mut self) -> Self {
        self.is_active = true;
        self
    }

    pub fn mode(&self) -> ColorMode {
        if self.dark_mode {
            ColorMode::Dark
        } else {
            ColorMode::Light
        }
    }

    pub fn apply(&mut self, pref: &Preference) {
        match pref {
            Preference::Theme(id) => self.theme_id = Some(id.clone()),
            Preference::FontPair(id) => self.font_pair_id = Some(id.clone()),
            Preference::DarkMode(on) => self.dark_mode = *on,
        }
    }

    /// Current preference fields, captured for rollback.
    pub fn preferences(&self) -> PreferenceSet {
        PreferenceSet {
            theme_id: self.theme_id.clone(),
            font_pair_id: self.font_pair_id.clone(),
            dark_mode: self.dark_mode,
        }
    }

    pub fn restore(&mut self, prefs: PreferenceSet) {
        self.theme_id = prefs.theme_id;
        self.font_pair_id = prefs.font_pair_id;
        self.dark_mode = prefs.dark_mode;
    }
}

/// The three UI preference fields of a [`ProjectSetting`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PreferenceSet {
    pub theme_id: Option<String>,
    pub font_pair_id: Option<String>,
    pub dark_mode: bool,
}

fn default_true() -> bool {
    true
}

/// A single UI preference field with its new value.
///
/// Serialized as `{"field": "theme", "value": "ocean"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum Preference {
    Theme(String),
    FontPair(String),
    DarkMode(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    Dark,
    Light,
}

impl ColorMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ColorMode::Dark => "dark",
            ColorMode::Light => "light",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_then_restore() {
        let mut p = ProjectSetting::new("p1", "Interviews", "u1");
        let before = p.preferences();

        p.apply(&Preference::Theme("ocean".into()));
        p.apply(&Preference::DarkMode(true));
        assert_eq!(p.theme_id.as_deref(), Some("ocean"));
        assert_eq!(p.mode(), ColorMode::Dark);

        p.restore(before);
        assert_eq!(p.theme_id, None);
        assert_eq!(p.mode(), ColorMode::Light);
    }

    #[test]
    fn preference_wire_format() {
        let json = serde_json::to_value(Preference::FontPair("serif-sans".into())).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "field": "font_pair", "value": "serif-sans" })
        );
        let back: Preference =
            serde_json::from_value(serde_json::json!({ "field": "dark_mode", "value": true }))
                .unwrap();
        assert_eq!(back, Preference::DarkMode(true));
    }

    #[test]
    fn missing_flags_use_defaults() {
        let p: ProjectSetting = serde_json::from_value(serde_json::json!({
            "project_id": "p1",
            "project_name": "Interviews",
            "user_id": "u1",
        }))
        .unwrap();
        assert!(!p.is_active);
        assert!(p.can_review);
        assert!(!p.can_manage_master_data);
        assert_eq!(p.mode(), ColorMode::Light);
    }
}
