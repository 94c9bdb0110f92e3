//! Application context: the persisted stores, the connected backend, the book
//! cache and the open player, passed to every caller instead of living in
//! globals.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};

use crate::abs_client::HttpSettings;
use crate::backend::{self, LibraryBackend};
use crate::domain::home::{HomeShelves, home_shelves};
use crate::domain::models::{
    AudioTrack, Book, Chapter, Library, ServerConfig, User, effective_progress,
};
use crate::error::{ClientError, ClientResult};
use crate::library::{BookCache, DEFAULT_BOOK_TTL};
use crate::player::audio::AudioOutput;
use crate::player::{PlaybackContext, Player, PlayerSettings, PlayerSnapshot};
use crate::storage::{PlayerStore, ServerStore, StateRepo};

#[derive(Debug, Clone, Copy)]
pub struct AppSettings {
    pub http: HttpSettings,
    pub player: PlayerSettings,
    pub book_ttl: Duration,
}

impl Default for AppSettings {
    fn default() -> Self {
        AppSettings {
            http: HttpSettings::default(),
            player: PlayerSettings::default(),
            book_ttl: DEFAULT_BOOK_TTL,
        }
    }
}

/// The signed-in server, without the password.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionInfo {
    pub server_url: String,
    pub user: User,
    pub demo: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookUrls {
    pub stream: String,
    pub cover: String,
}

pub struct AppContext {
    settings: AppSettings,
    servers: ServerStore,
    players: Arc<PlayerStore>,
    backend: RwLock<Option<Arc<dyn LibraryBackend>>>,
    cache: Arc<BookCache>,
    audio: Arc<dyn AudioOutput>,
    player: Mutex<Option<Arc<Player>>>,
}

impl AppContext {
    /// Restore both store slices and reconnect to the persisted server, if any.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn restore(
        repo: Arc<dyn StateRepo>,
        audio: Arc<dyn AudioOutput>,
        settings: AppSettings,
    ) -> anyhow::Result<Self> {
        let servers = ServerStore::restore(repo.clone()).await?;
        let players = Arc::new(PlayerStore::restore(repo).await?);

        let slice = servers.snapshot().await;
        let backend = match (&slice.server, &slice.user) {
            (Some(server), Some(_)) => match backend::connect(server, &settings.http) {
                Ok(b) => Some(b),
                Err(e) => {
                    tracing::warn!(error = %e, server_url = %server.url, "could not reconnect to saved server");
                    None
                }
            },
            _ => None,
        };
        tracing::info!(signed_in = backend.is_some(), "restored application state");

        Ok(AppContext {
            settings,
            servers,
            players,
            backend: RwLock::new(backend),
            cache: Arc::new(BookCache::new(settings.book_ttl)),
            audio,
            player: Mutex::new(None),
        })
    }

    pub fn player_store(&self) -> &PlayerStore {
        &self.players
    }

    /// Sign in with login form input and persist the server and user.
    #[tracing::instrument(level = "debug", skip(self, password))]
    pub async fn login(&self, url: &str, username: &str, password: &str) -> ClientResult<User> {
        let server = ServerConfig::from_form(url, username, password)
            .ok_or_else(|| ClientError::Auth("Please enter a server URL".into()))?;
        let backend = backend::connect(&server, &self.settings.http)?;
        let user = backend.authenticate(username, password).await?;

        self.close_player().await;
        self.cache.clear().await;
        if let Err(e) = self
            .servers
            .sign_in(server.with_token(user.token.clone()), user.clone())
            .await
        {
            tracing::error!(error = %e, "failed to persist sign-in");
        }
        *self.backend.write().await = Some(backend);
        tracing::info!(user = %user.username, "signed in");
        Ok(user)
    }

    /// Forget the server and user. Listening sessions and the rate are kept.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn logout(&self) {
        self.close_player().await;
        *self.backend.write().await = None;
        self.cache.clear().await;
        if let Err(e) = self.servers.clear().await {
            tracing::error!(error = %e, "failed to clear server storage");
        }
        tracing::info!("signed out");
    }

    pub async fn session(&self) -> ClientResult<SessionInfo> {
        let backend = self.backend.read().await.clone().ok_or(ClientError::NotSignedIn)?;
        let slice = self.servers.snapshot().await;
        match (slice.server, slice.user) {
            (Some(server), Some(user)) => Ok(SessionInfo {
                server_url: server.url,
                user,
                demo: backend.is_demo(),
            }),
            _ => Err(ClientError::NotSignedIn),
        }
    }

    async fn signed_in(&self) -> ClientResult<(Arc<dyn LibraryBackend>, String)> {
        let backend = self.backend.read().await.clone().ok_or(ClientError::NotSignedIn)?;
        let token = self
            .servers
            .snapshot()
            .await
            .user
            .map(|u| u.token)
            .ok_or(ClientError::NotSignedIn)?;
        Ok((backend, token))
    }

    pub async fn libraries(&self) -> ClientResult<Vec<Library>> {
        let (backend, token) = self.signed_in().await?;
        backend.list_libraries(&token).await
    }

    /// Books of a library with local listening progress applied. The listing
    /// warms the book cache with the server's copies.
    pub async fn books(&self, library_id: &str) -> ClientResult<Vec<Book>> {
        let (backend, token) = self.signed_in().await?;
        let mut books = backend.list_books(&token, library_id).await?;
        self.cache.put_many(&books).await;
        let sessions = self.players.sessions().await;
        for book in &mut books {
            book.progress = effective_progress(book, sessions.get(&book.id));
        }
        Ok(books)
    }

    pub async fn home(&self, library_id: &str) -> ClientResult<HomeShelves> {
        let books = self.books(library_id).await?;
        let sessions = self.players.sessions().await;
        Ok(home_shelves(&books, &sessions))
    }

    pub async fn book(&self, book_id: &str) -> ClientResult<Book> {
        let (backend, token) = self.signed_in().await?;
        let mut book = self.cache.get_or_fetch(backend.as_ref(), &token, book_id).await?;
        let session = self.players.session(&book.id).await;
        book.progress = effective_progress(&book, session.as_ref());
        Ok(book)
    }

    pub async fn chapters(&self, book_id: &str) -> ClientResult<Vec<Chapter>> {
        let (backend, token) = self.signed_in().await?;
        backend.list_chapters(&token, book_id).await
    }

    pub async fn tracks(&self, book_id: &str) -> ClientResult<Vec<AudioTrack>> {
        let (backend, token) = self.signed_in().await?;
        backend.list_audio_tracks(&token, book_id).await
    }

    pub async fn urls(&self, book_id: &str) -> ClientResult<BookUrls> {
        let (backend, token) = self.signed_in().await?;
        Ok(BookUrls {
            stream: backend.stream_url(&token, book_id),
            cover: backend.cover_url(&token, book_id),
        })
    }

    /// Close any open player, then open `book_id`. The slot is only locked
    /// to swap players, never while one loads or flushes.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn open_player(&self, book_id: &str) -> ClientResult<PlayerSnapshot> {
        let (backend, token) = self.signed_in().await?;
        self.close_player().await;
        let ctx = Arc::new(PlaybackContext {
            backend,
            token,
            store: self.players.clone(),
            cache: self.cache.clone(),
            audio: self.audio.clone(),
            settings: self.settings.player,
        });
        let player = Arc::new(Player::open(ctx, book_id).await);
        let snapshot = player.snapshot().await;
        let stale = self.player.lock().await.replace(player);
        if let Some(stale) = stale {
            stale.close().await;
        }
        Ok(snapshot)
    }

    pub async fn close_player(&self) {
        let previous = self.player.lock().await.take();
        if let Some(player) = previous {
            player.close().await;
        }
    }

    async fn active_player(&self) -> ClientResult<Arc<Player>> {
        self.player
            .lock()
            .await
            .clone()
            .ok_or_else(|| ClientError::NotFound("No book is open".into()))
    }

    pub async fn player_snapshot(&self) -> ClientResult<PlayerSnapshot> {
        Ok(self.active_player().await?.snapshot().await)
    }

    pub async fn toggle_play(&self) -> ClientResult<PlayerSnapshot> {
        self.active_player().await?.toggle_play().await
    }

    pub async fn seek(&self, position: f64) -> ClientResult<PlayerSnapshot> {
        self.active_player().await?.seek(position).await
    }

    pub async fn skip_back(&self) -> ClientResult<PlayerSnapshot> {
        self.active_player().await?.skip_back().await
    }

    pub async fn skip_forward(&self) -> ClientResult<PlayerSnapshot> {
        self.active_player().await?.skip_forward().await
    }

    pub async fn next_rate(&self) -> ClientResult<PlayerSnapshot> {
        self.active_player().await?.next_rate().await
    }

    pub async fn select_chapter(&self, chapter_id: &str) -> ClientResult<PlayerSnapshot> {
        self.active_player().await?.select_chapter(chapter_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::PlayerPhase;
    use crate::player::audio::SimulatedOutput;
    use crate::storage::{MemoryStateRepo, SERVER_SLICE};

    async fn app_on(repo: Arc<dyn StateRepo>) -> AppContext {
        AppContext::restore(repo, Arc::new(SimulatedOutput), AppSettings::default())
            .await
            .unwrap()
    }

    async fn demo_app() -> (AppContext, Arc<dyn StateRepo>) {
        let repo: Arc<dyn StateRepo> = Arc::new(MemoryStateRepo::default());
        let app = app_on(repo.clone()).await;
        app.login("demo", "alice", "secret").await.unwrap();
        (app, repo)
    }

    #[tokio::test]
    async fn requests_before_login_are_rejected() {
        let app = app_on(Arc::new(MemoryStateRepo::default())).await;
        assert!(matches!(app.libraries().await, Err(ClientError::NotSignedIn)));
        assert!(matches!(app.session().await, Err(ClientError::NotSignedIn)));
        assert!(matches!(app.open_player("book-1").await, Err(ClientError::NotSignedIn)));
    }

    #[tokio::test]
    async fn blank_server_url_is_an_auth_error() {
        let app = app_on(Arc::new(MemoryStateRepo::default())).await;
        let err = app.login("  ", "u", "p").await.unwrap_err();
        assert!(matches!(err, ClientError::Auth(_)));
    }

    #[tokio::test]
    async fn demo_login_persists_and_survives_restart() {
        let (app, repo) = demo_app().await;
        let session = app.session().await.unwrap();
        assert!(session.demo);
        assert_eq!(session.server_url, "http://demo");
        assert_eq!(session.user.token, "demo-token");

        let restarted = app_on(repo).await;
        assert_eq!(restarted.libraries().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn home_uses_local_sessions_over_server_progress() {
        let (app, _) = demo_app().await;
        app.player_store()
            .upsert_session("book-2", 5500.0, 11000.0)
            .await
            .unwrap();
        let home = app.home("lib-1").await.unwrap();
        let ids: Vec<_> = home.continue_listening.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["book-1", "book-2", "book-3", "book-4"]);
        assert_eq!(home.recent.len(), 1);
    }

    #[tokio::test]
    async fn book_queries_report_local_progress() {
        let (app, _) = demo_app().await;
        assert_eq!(app.book("book-1").await.unwrap().progress, 0.3);

        app.player_store()
            .upsert_session("book-2", 5500.0, 11000.0)
            .await
            .unwrap();
        assert_eq!(app.book("book-2").await.unwrap().progress, 0.5);

        let books = app.books("lib-1").await.unwrap();
        let progress: Vec<_> = books.iter().map(|b| (b.id.as_str(), b.progress)).collect();
        assert_eq!(progress[0], ("book-1", 0.3));
        assert_eq!(progress[1], ("book-2", 0.5));
    }

    #[tokio::test]
    async fn slow_progress_push_does_not_block_player_commands() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "user": { "id": "usr_1", "username": "root", "token": "abc" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/items/b1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "b1",
                "media": { "metadata": { "title": "Slow" }, "duration": 3600 }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/items/b1/chapters"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "chapters": []
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/me/progress/b1"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let app = Arc::new(app_on(Arc::new(MemoryStateRepo::default())).await);
        app.login(&server.uri(), "root", "pw").await.unwrap();
        app.open_player("b1").await.unwrap();
        app.toggle_play().await.unwrap();

        let pausing = tokio::spawn({
            let app = app.clone();
            async move { app.toggle_play().await }
        });
        tokio::time::sleep(Duration::from_millis(300)).await;

        let started = std::time::Instant::now();
        let snap = tokio::time::timeout(Duration::from_secs(1), app.player_snapshot())
            .await
            .expect("snapshot blocked behind progress push")
            .unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(snap.phase, PlayerPhase::Paused);
        pausing.abort();
    }

    #[tokio::test]
    async fn urls_come_from_the_connected_backend() {
        let (app, _) = demo_app().await;
        let urls = app.urls("book-1").await.unwrap();
        assert!(urls.stream.contains("librivox"));
        assert!(app.book("missing").await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn player_lifecycle_through_context() {
        let (app, _) = demo_app().await;
        assert!(matches!(app.player_snapshot().await, Err(ClientError::NotFound(_))));

        let snap = app.open_player("book-1").await.unwrap();
        assert_eq!(snap.phase, PlayerPhase::Ready);
        assert_eq!(app.toggle_play().await.unwrap().phase, PlayerPhase::Playing);
        assert_eq!(app.select_chapter("chapter-2").await.unwrap().current_time, 1200.0);

        let snap = app.open_player("book-3").await.unwrap();
        assert_eq!(snap.book_id.as_deref(), Some("book-3"));
        assert_eq!(app.player_store().session("book-1").await.unwrap().current_time, 1200.0);

        app.close_player().await;
        assert!(app.player_snapshot().await.is_err());
    }

    #[tokio::test]
    async fn logout_clears_server_but_keeps_listening_state() {
        let (app, repo) = demo_app().await;
        app.player_store().set_playback_rate(1.75).await.unwrap();
        app.player_store().upsert_session("book-1", 10.0, 100.0).await.unwrap();

        app.logout().await;
        assert!(matches!(app.libraries().await, Err(ClientError::NotSignedIn)));
        assert_eq!(repo.load(SERVER_SLICE).await.unwrap(), None);
        assert_eq!(app.player_store().playback_rate().await, 1.75);
        assert!(app.player_store().session("book-1").await.is_some());
    }
}
