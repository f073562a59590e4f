//! TTL cache in front of a [`ProjectSettingsStore`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use tracing::debug;

use crate::backend::ProjectSettingsStore;
use crate::error::SessionError;
use crate::model::{Preference, ProjectSetting};

struct CachedList {
    fetched_at: DateTime<Utc>,
    settings: Vec<ProjectSetting>,
}

#[derive(Default)]
struct Entries {
    lists: HashMap<String, CachedList>,
    /// Bumped on every invalidation. A fetch only fills the cache if the
    /// user's generation did not move while it was in flight.
    generations: HashMap<String, u64>,
}

impl Entries {
    fn generation(&self, user_id: &str) -> u64 {
        self.generations.get(user_id).copied().unwrap_or(0)
    }
}

/// Caches `fetch_project_settings` per user.
///
/// `force_reload` always goes to the inner store and refreshes the entry.
/// Any write for a user drops that user's entry, both before and after the
/// inner write, and a read that overlapped the write is not stored.
pub struct CachedSettingsStore {
    inner: Arc<dyn ProjectSettingsStore>,
    ttl: Duration,
    entries: Mutex<Entries>,
}

impl CachedSettingsStore {
    pub fn new(inner: Arc<dyn ProjectSettingsStore>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(Entries::default()),
        }
    }

    fn fresh(&self, user_id: &str) -> Option<Vec<ProjectSetting>> {
        let entries = self.entries.lock();
        let cached = entries.lists.get(user_id)?;
        (Utc::now() - cached.fetched_at < self.ttl).then(|| cached.settings.clone())
    }

    pub fn cached_users(&self) -> usize {
        self.entries.lock().lists.len()
    }
}

#[async_trait]
impl ProjectSettingsStore for CachedSettingsStore {
    async fn fetch_project_settings(
        &self,
        user_id: &str,
        force_reload: bool,
    ) -> Result<Vec<ProjectSetting>, SessionError> {
        if !force_reload {
            if let Some(settings) = self.fresh(user_id) {
                debug!("project settings for {user_id} served from cache");
                return Ok(settings);
            }
        }
        let generation = self.entries.lock().generation(user_id);
        let settings = self.inner.fetch_project_settings(user_id, true).await?;

        let mut entries = self.entries.lock();
        if entries.generation(user_id) == generation {
            entries.lists.insert(
                user_id.to_string(),
                CachedList {
                    fetched_at: Utc::now(),
                    settings: settings.clone(),
                },
            );
        } else {
            debug!("project settings for {user_id} changed during fetch, not caching");
        }
        Ok(settings)
    }

    async fn set_active_project(
        &self,
        user_id: &str,
        project_id: &str,
    ) -> Result<(), SessionError> {
        self.invalidate(user_id);
        let result = self.inner.set_active_project(user_id, project_id).await;
        self.invalidate(user_id);
        result
    }

    async fn save_preference(
        &self,
        user_id: &str,
        project_id: &str,
        preference: &Preference,
    ) -> Result<(), SessionError> {
        self.invalidate(user_id);
        let result = self
            .inner
            .save_preference(user_id, project_id, preference)
            .await;
        self.invalidate(user_id);
        result
    }

    fn invalidate(&self, user_id: &str) {
        {
            let mut entries = self.entries.lock();
            entries.lists.remove(user_id);
            *entries.generations.entry(user_id.to_string()).or_default() += 1;
        }
        self.inner.invalidate(user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryBackend, Operation};

    fn setup(ttl: Duration) -> (Arc<MemoryBackend>, CachedSettingsStore) {
        let backend = Arc::new(MemoryBackend::new());
        let user = backend.add_account("ana@example.org", "pw");
        backend.add_project(ProjectSetting::new("p1", "Interviews", &user.id).active());
        let cache = CachedSettingsStore::new(backend.clone(), ttl);
        (backend, cache)
    }

    #[tokio::test]
    async fn second_fetch_hits_cache() {
        let (backend, cache) = setup(Duration::seconds(60));
        let uid = backend.user_id("ana@example.org").unwrap();

        cache.fetch_project_settings(&uid, false).await.unwrap();
        cache.fetch_project_settings(&uid, false).await.unwrap();
        assert_eq!(backend.calls(Operation::FetchSettings), 1);
        assert_eq!(cache.cached_users(), 1);
    }

    #[tokio::test]
    async fn force_reload_bypasses_cache() {
        let (backend, cache) = setup(Duration::seconds(60));
        let uid = backend.user_id("ana@example.org").unwrap();

        cache.fetch_project_settings(&uid, false).await.unwrap();
        cache.fetch_project_settings(&uid, true).await.unwrap();
        assert_eq!(backend.calls(Operation::FetchSettings), 2);
    }

    #[tokio::test]
    async fn expired_entries_are_refetched() {
        let (backend, cache) = setup(Duration::zero());
        let uid = backend.user_id("ana@example.org").unwrap();

        cache.fetch_project_settings(&uid, false).await.unwrap();
        cache.fetch_project_settings(&uid, false).await.unwrap();
        assert_eq!(backend.calls(Operation::FetchSettings), 2);
    }

    #[tokio::test]
    async fn writes_invalidate_the_user() {
        let (backend, cache) = setup(Duration::seconds(60));
        let uid = backend.user_id("ana@example.org").unwrap();

        cache.fetch_project_settings(&uid, false).await.unwrap();
        cache
            .save_preference(&uid, "p1", &Preference::DarkMode(true))
            .await
            .unwrap();
        assert_eq!(cache.cached_users(), 0);

        let settings = cache.fetch_project_settings(&uid, false).await.unwrap();
        assert!(settings[0].dark_mode);
    }

    /// Holds `set_active_project` until released.
    struct GatedStore {
        inner: Arc<MemoryBackend>,
        entered: tokio::sync::Notify,
        release: tokio::sync::Notify,
    }

    #[async_trait]
    impl ProjectSettingsStore for GatedStore {
        async fn fetch_project_settings(
            &self,
            user_id: &str,
            force_reload: bool,
        ) -> Result<Vec<ProjectSetting>, SessionError> {
            self.inner.fetch_project_settings(user_id, force_reload).await
        }

        async fn set_active_project(
            &self,
            user_id: &str,
            project_id: &str,
        ) -> Result<(), SessionError> {
            self.entered.notify_one();
            self.release.notified().await;
            self.inner.set_active_project(user_id, project_id).await
        }

        async fn save_preference(
            &self,
            user_id: &str,
            project_id: &str,
            preference: &Preference,
        ) -> Result<(), SessionError> {
            self.inner.save_preference(user_id, project_id, preference).await
        }
    }

    #[tokio::test]
    async fn read_during_write_is_not_served_afterwards() {
        let (backend, _) = setup(Duration::seconds(60));
        let uid = backend.user_id("ana@example.org").unwrap();
        backend.add_project(ProjectSetting::new("p2", "Surveys", &uid));
        let gated = Arc::new(GatedStore {
            inner: backend.clone(),
            entered: tokio::sync::Notify::new(),
            release: tokio::sync::Notify::new(),
        });
        let cache = CachedSettingsStore::new(gated.clone(), Duration::seconds(60));

        let write = cache.set_active_project(&uid, "p2");
        let read = async {
            gated.entered.notified().await;
            let during = cache.fetch_project_settings(&uid, false).await.unwrap();
            gated.release.notify_one();
            during
        };
        let (written, during) = tokio::join!(write, read);
        written.unwrap();
        assert!(during[0].is_active);

        let after = cache.fetch_project_settings(&uid, false).await.unwrap();
        let active: Vec<_> = after
            .iter()
            .filter(|p| p.is_active)
            .map(|p| p.project_id.as_str())
            .collect();
        assert_eq!(active, ["p2"]);
    }

    #[tokio::test]
    async fn failed_fetch_is_not_cached() {
        let (backend, cache) = setup(Duration::seconds(60));
        let uid = backend.user_id("ana@example.org").unwrap();
        backend.fail_next(Operation::FetchSettings, "connection reset");

        let err = cache.fetch_project_settings(&uid, false).await.unwrap_err();
        assert_eq!(err, SessionError::Network("connection reset".into()));
        assert_eq!(cache.cached_users(), 0);
    }
}
