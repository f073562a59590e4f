use serde::{Deserialize, Serialize};

/// Identity attached to a [`Session`](super::Session).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Backend user id.
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Free-form profile metadata (display name, avatar, ...).
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: serde_json::Value,
}

impl User {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// `metadata.display_name`, else the email, else the id.
    pub fn display_name(&self) -> &str {
        self.metadata
            .get("display_name")
            .and_then(|v| v.as_str())
            .or(self.email.as_deref())
            .unwrap_or(&self.id)
    }
}
