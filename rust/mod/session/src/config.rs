//! Controller configuration.
//!
//! Reads/writes a TOML file such as `revu.toml`. Every field has a default,
//! so a missing file or a partial one is fine.

use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub routes: RoutesConfig,

    #[serde(default)]
    pub messages: MessagesConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

/// Route classes used by the redirect guard.
///
/// A path matches a route when it is equal to it or continues it on a `/`
/// boundary. Anything not listed is protected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutesConfig {
    /// Where anonymous users are sent.
    pub login: String,

    /// Where signed-in users are sent away from public-only routes.
    pub root: String,

    /// Only for anonymous users (login, signup, ...).
    pub public_only: Vec<String>,

    /// Reachable signed in or not.
    pub public: Vec<String>,

    /// Never redirected, whatever the auth state.
    pub exempt: Vec<String>,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            login: "/login".into(),
            root: "/".into(),
            public_only: vec!["/login".into(), "/signup".into(), "/forgot-password".into()],
            public: Vec::new(),
            exempt: vec!["/reset-password".into()],
        }
    }
}

/// Notification texts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagesConfig {
    pub welcome: String,
    pub signed_out: String,
    pub sign_up_sent: String,
    /// `{name}` is replaced by the project name.
    pub project_switched: String,
    pub projects_unavailable: String,
    pub fallback_error: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            welcome: "Welcome back!".into(),
            signed_out: "You have been signed out.".into(),
            sign_up_sent: "Check your email to confirm your account.".into(),
            project_switched: "Switched to {name}.".into(),
            projects_unavailable: "Your projects could not be loaded.".into(),
            fallback_error: "Something went wrong. Please try again.".into(),
        }
    }
}

impl MessagesConfig {
    pub fn project_switched(&self, name: &str) -> String {
        self.project_switched.replace("{name}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Lifetime of cached project settings; 0 disables the cache.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 60 }
    }
}

impl SessionConfig {
    /// Load config from disk, or return default if file doesn't exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: SessionConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to disk.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.routes.login, "/login");
        assert_eq!(config.routes.exempt, vec!["/reset-password".to_string()]);
        assert_eq!(config.cache.ttl_secs, 60);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfig::load(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("revu.toml");
        std::fs::write(
            &path,
            "[routes]\nlogin = \"/auth\"\n\n[messages]\nwelcome = \"Hi\"\n",
        )
        .unwrap();

        let config = SessionConfig::load(&path).unwrap();
        assert_eq!(config.routes.login, "/auth");
        assert_eq!(config.routes.root, "/");
        assert_eq!(config.messages.welcome, "Hi");
        assert_eq!(config.messages.signed_out, "You have been signed out.");
        assert_eq!(config.cache.ttl_secs, 60);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("revu.toml");

        let mut config = SessionConfig::default();
        config.routes.public.push("/about".into());
        config.cache.ttl_secs = 5;
        config.save(&path).unwrap();

        let loaded = SessionConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("revu.toml");
        std::fs::write(&path, "[cache]\nttl_secs = \"soon\"\n").unwrap();
        assert!(SessionConfig::load(&path).is_err());
    }

    #[test]
    fn test_project_switched_placeholder() {
        let messages = MessagesConfig::default();
        assert_eq!(messages.project_switched("Interviews"), "Switched to Interviews.");
    }
}
