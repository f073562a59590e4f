use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::User;

/// Backend-issued credential bundle.
///
/// The controller only ever holds a read-only copy; the backend owns the
/// real thing. Tokens are skipped when a snapshot is serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default, skip_serializing)]
    pub access_token: String,

    #[serde(default, skip_serializing)]
    pub refresh_token: String,

    pub expires_at: DateTime<Utc>,

    pub user: User,
}

impl Session {
    /// Issue a fresh session for `user` valid for `ttl`.
    pub fn issue(user: User, ttl: Duration) -> Self {
        Self {
            access_token: new_token(),
            refresh_token: new_token(),
            expires_at: Utc::now() + ttl,
            user,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    pub fn user_id(&self) -> &str {
        &self.user.id
    }
}

fn new_token() -> String {
    uuid::Uuid::new_v4().to_string().replace('-', "")
}
