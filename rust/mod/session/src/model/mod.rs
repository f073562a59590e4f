mod project;
mod session;
mod user;

pub use project::{ColorMode, Preference, PreferenceSet, ProjectSetting};
pub use session::Session;
pub use user::User;
