// Persisted key-value slices restored at process start.
// In-memory state is authoritative: a failed save still updates memory and
// returns the error, and the next successful save writes the whole slice.

pub mod memory;
pub mod sqlite;

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;

use crate::domain::models::{PlaybackSession, ServerConfig, User};

pub use memory::MemoryStateRepo;
pub use sqlite::SeaOrmStateRepo;

pub const SERVER_SLICE: &str = "server-storage";
pub const PLAYER_SLICE: &str = "player-storage";

/// Whole-slice storage keyed by slice name.
#[async_trait::async_trait]
pub trait StateRepo: Send + Sync {
    async fn load(&self, name: &str) -> anyhow::Result<Option<String>>;
    async fn save(&self, name: &str, value: String) -> anyhow::Result<()>;
    async fn remove(&self, name: &str) -> anyhow::Result<()>;
}

async fn load_slice<T: DeserializeOwned + Default>(repo: &dyn StateRepo, name: &str) -> anyhow::Result<T> {
    match repo.load(name).await? {
        Some(raw) => match serde_json::from_str(&raw) {
            Ok(slice) => Ok(slice),
            Err(e) => {
                tracing::warn!(error = %e, slice = %name, "discarding unreadable persisted slice");
                Ok(T::default())
            }
        },
        None => Ok(T::default()),
    }
}

async fn save_slice<T: Serialize>(repo: &dyn StateRepo, name: &str, slice: &T) -> anyhow::Result<()> {
    let raw = serde_json::to_string(slice).with_context(|| format!("Failed to serialize {}", name))?;
    repo.save(name, raw)
        .await
        .with_context(|| format!("Failed to persist {}", name))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerSlice {
    pub server: Option<ServerConfig>,
    pub user: Option<User>,
}

/// Server connection and signed-in user. The whole slice is persisted.
pub struct ServerStore {
    repo: Arc<dyn StateRepo>,
    slice: RwLock<ServerSlice>,
}

impl ServerStore {
    #[tracing::instrument(level = "debug", skip(repo))]
    pub async fn restore(repo: Arc<dyn StateRepo>) -> anyhow::Result<Self> {
        let slice: ServerSlice = load_slice(repo.as_ref(), SERVER_SLICE).await?;
        tracing::debug!(has_server = slice.server.is_some(), has_user = slice.user.is_some(), "restored server slice");
        Ok(ServerStore {
            repo,
            slice: RwLock::new(slice),
        })
    }

    pub async fn snapshot(&self) -> ServerSlice {
        self.slice.read().await.clone()
    }

    /// Replace server and user in one write.
    pub async fn sign_in(&self, server: ServerConfig, user: User) -> anyhow::Result<()> {
        let mut slice = self.slice.write().await;
        slice.server = Some(server);
        slice.user = Some(user);
        save_slice(self.repo.as_ref(), SERVER_SLICE, &*slice).await
    }

    pub async fn clear(&self) -> anyhow::Result<()> {
        let mut slice = self.slice.write().await;
        *slice = ServerSlice::default();
        self.repo.remove(SERVER_SLICE).await
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSlice {
    pub playback_rate: f64,
    pub sessions: BTreeMap<String, PlaybackSession>,
}

impl Default for PlayerSlice {
    fn default() -> Self {
        PlayerSlice {
            playback_rate: 1.0,
            sessions: BTreeMap::new(),
        }
    }
}

/// Player preferences: only the playback rate and the session map persist.
/// Whether something is playing is never stored.
pub struct PlayerStore {
    repo: Arc<dyn StateRepo>,
    slice: RwLock<PlayerSlice>,
}

impl PlayerStore {
    #[tracing::instrument(level = "debug", skip(repo))]
    pub async fn restore(repo: Arc<dyn StateRepo>) -> anyhow::Result<Self> {
        let slice: PlayerSlice = load_slice(repo.as_ref(), PLAYER_SLICE).await?;
        tracing::debug!(sessions = slice.sessions.len(), rate = slice.playback_rate, "restored player slice");
        Ok(PlayerStore {
            repo,
            slice: RwLock::new(slice),
        })
    }

    pub async fn playback_rate(&self) -> f64 {
        self.slice.read().await.playback_rate
    }

    pub async fn set_playback_rate(&self, rate: f64) -> anyhow::Result<()> {
        let mut slice = self.slice.write().await;
        slice.playback_rate = rate;
        save_slice(self.repo.as_ref(), PLAYER_SLICE, &*slice).await
    }

    pub async fn session(&self, book_id: &str) -> Option<PlaybackSession> {
        self.slice.read().await.sessions.get(book_id).cloned()
    }

    pub async fn sessions(&self) -> BTreeMap<String, PlaybackSession> {
        self.slice.read().await.sessions.clone()
    }

    /// Insert or replace the session for `book_id` and persist the slice.
    /// `updated_at` strictly increases per book even if the clock does not.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn upsert_session(
        &self,
        book_id: &str,
        current_time: f64,
        duration: f64,
    ) -> anyhow::Result<PlaybackSession> {
        let mut session = PlaybackSession::new(book_id, current_time, duration);
        let mut slice = self.slice.write().await;
        if let Some(previous) = slice.sessions.get(book_id) {
            if session.updated_at <= previous.updated_at {
                session.updated_at = previous.updated_at + chrono::Duration::microseconds(1);
            }
        }
        slice.sessions.insert(book_id.to_string(), session.clone());
        save_slice(self.repo.as_ref(), PLAYER_SLICE, &*slice).await?;
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn repo() -> Arc<dyn StateRepo> {
        Arc::new(MemoryStateRepo::default())
    }

    #[tokio::test]
    async fn upsert_session_computes_progress_and_timestamp() {
        let store = PlayerStore::restore(repo()).await.unwrap();
        let before = Utc::now();
        store.upsert_session("b1", 120.0, 1200.0).await.unwrap();

        let session = store.session("b1").await.unwrap();
        assert_eq!(session.id, "b1");
        assert_eq!(session.book_id, "b1");
        assert_eq!(session.progress, 0.1);
        assert!(session.updated_at >= before);
    }

    #[tokio::test]
    async fn repeated_upsert_is_strictly_newer() {
        let store = PlayerStore::restore(repo()).await.unwrap();
        let first = store.upsert_session("b1", 10.0, 100.0).await.unwrap();
        let second = store.upsert_session("b1", 10.0, 100.0).await.unwrap();
        assert!(second.updated_at > first.updated_at);
        assert_eq!(store.session("b1").await.unwrap().updated_at, second.updated_at);
    }

    /// Loads nothing and refuses every write.
    struct ReadOnlyRepo;

    #[async_trait::async_trait]
    impl StateRepo for ReadOnlyRepo {
        async fn load(&self, _: &str) -> anyhow::Result<Option<String>> {
            Ok(None)
        }
        async fn save(&self, _: &str, _: String) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
        async fn remove(&self, _: &str) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
    }

    #[tokio::test]
    async fn failed_saves_report_errors_and_keep_memory() {
        let players = PlayerStore::restore(Arc::new(ReadOnlyRepo)).await.unwrap();
        assert!(players.upsert_session("b1", 30.0, 60.0).await.is_err());
        assert!(players.set_playback_rate(1.25).await.is_err());
        assert_eq!(players.session("b1").await.unwrap().progress, 0.5);
        assert_eq!(players.playback_rate().await, 1.25);

        let servers = ServerStore::restore(Arc::new(ReadOnlyRepo)).await.unwrap();
        let user = User {
            id: "u1".into(),
            username: "root".into(),
            token: "tok".into(),
        };
        let server = ServerConfig::from_form("abs.local", "root", "pw").unwrap();
        assert!(servers.sign_in(server, user.clone()).await.is_err());
        assert_eq!(servers.snapshot().await.user, Some(user));
        assert!(servers.clear().await.is_err());
        assert_eq!(servers.snapshot().await, ServerSlice::default());
    }

    #[tokio::test]
    async fn zero_duration_session_has_zero_progress() {
        let store = PlayerStore::restore(repo()).await.unwrap();
        let session = store.upsert_session("b1", 50.0, 0.0).await.unwrap();
        assert_eq!(session.progress, 0.0);
    }

    #[tokio::test]
    async fn player_slice_survives_restore() {
        let repo = repo();
        let store = PlayerStore::restore(repo.clone()).await.unwrap();
        store.set_playback_rate(1.5).await.unwrap();
        store.upsert_session("b1", 10.0, 100.0).await.unwrap();
        store.upsert_session("b1", 20.0, 100.0).await.unwrap();

        let restored = PlayerStore::restore(repo).await.unwrap();
        assert_eq!(restored.playback_rate().await, 1.5);
        assert_eq!(restored.sessions().await.len(), 1);
        assert_eq!(restored.session("b1").await.unwrap().current_time, 20.0);
    }

    #[tokio::test]
    async fn persisted_player_slice_uses_camel_case_keys() {
        let repo = repo();
        let store = PlayerStore::restore(repo.clone()).await.unwrap();
        store.set_playback_rate(2.0).await.unwrap();
        let raw = repo.load(PLAYER_SLICE).await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["playbackRate"], 2.0);
        assert!(value["sessions"].is_object());
    }

    #[tokio::test]
    async fn server_slice_round_trips_and_clears() {
        let repo = repo();
        let store = ServerStore::restore(repo.clone()).await.unwrap();
        let server = ServerConfig::from_form("abs.local:13378/", "root", "pw")
            .unwrap()
            .with_token("tok");
        let user = User {
            id: "u1".into(),
            username: "root".into(),
            token: "tok".into(),
        };
        store.sign_in(server.clone(), user.clone()).await.unwrap();

        let restored = ServerStore::restore(repo.clone()).await.unwrap().snapshot().await;
        assert_eq!(restored.server.unwrap().url, "http://abs.local:13378");
        assert_eq!(restored.user, Some(user));

        store.clear().await.unwrap();
        assert_eq!(repo.load(SERVER_SLICE).await.unwrap(), None);
        assert_eq!(store.snapshot().await, ServerSlice::default());
    }

    #[tokio::test]
    async fn unreadable_slice_falls_back_to_default() {
        let repo = repo();
        repo.save(PLAYER_SLICE, "{not json".into()).await.unwrap();
        let store = PlayerStore::restore(repo).await.unwrap();
        assert_eq!(store.playback_rate().await, 1.0);
    }
}
