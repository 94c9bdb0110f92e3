use std::sync::Arc;

use poem_openapi::{OpenApi, param::Path, payload::Json};

use super::models::{
    BookListResponse, BookResponse, BookUrlsResponse, ChapterListResponse, HomeResponse,
    LibraryListResponse, LoginRequestDto, NoContentResponse, PlayerResponse, SeekRequestDto,
    SessionResponse, TrackListResponse,
};
use super::services::{library::LibraryService, player::PlayerService, session::SessionService};
use crate::app::AppContext;

pub struct AbsPlayerApi {
    pub app: Arc<AppContext>,
}

#[OpenApi]
impl AbsPlayerApi {
    // ===== Session =====

    /// Sign in to an Audiobookshelf server, or `demo` for fixture data
    #[oai(path = "/v1/session", method = "post")]
    #[tracing::instrument(level = "debug", skip(self, body))]
    async fn login(&self, body: Json<LoginRequestDto>) -> SessionResponse {
        SessionService::new(&self.app).login(body.0).await
    }

    #[oai(path = "/v1/session", method = "get")]
    async fn session(&self) -> SessionResponse {
        SessionService::new(&self.app).current().await
    }

    /// Forget the server and user; listening progress is kept
    #[oai(path = "/v1/session", method = "delete")]
    #[tracing::instrument(level = "debug", skip(self))]
    async fn logout(&self) -> NoContentResponse {
        SessionService::new(&self.app).logout().await
    }

    // ===== Libraries and books =====

    #[oai(path = "/v1/libraries", method = "get")]
    #[tracing::instrument(level = "debug", skip(self))]
    async fn list_libraries(&self) -> LibraryListResponse {
        LibraryService::new(&self.app).list_libraries().await
    }

    #[oai(path = "/v1/libraries/:library_id/books", method = "get")]
    #[tracing::instrument(level = "debug", skip(self, library_id))]
    async fn list_books(&self, library_id: Path<String>) -> BookListResponse {
        LibraryService::new(&self.app).list_books(&library_id.0).await
    }

    /// Continue-listening and recent shelves for a library
    #[oai(path = "/v1/libraries/:library_id/home", method = "get")]
    #[tracing::instrument(level = "debug", skip(self, library_id))]
    async fn home(&self, library_id: Path<String>) -> HomeResponse {
        LibraryService::new(&self.app).home(&library_id.0).await
    }

    #[oai(path = "/v1/books/:book_id", method = "get")]
    #[tracing::instrument(level = "debug", skip(self, book_id))]
    async fn book(&self, book_id: Path<String>) -> BookResponse {
        LibraryService::new(&self.app).book(&book_id.0).await
    }

    #[oai(path = "/v1/books/:book_id/chapters", method = "get")]
    #[tracing::instrument(level = "debug", skip(self, book_id))]
    async fn chapters(&self, book_id: Path<String>) -> ChapterListResponse {
        LibraryService::new(&self.app).chapters(&book_id.0).await
    }

    #[oai(path = "/v1/books/:book_id/tracks", method = "get")]
    #[tracing::instrument(level = "debug", skip(self, book_id))]
    async fn tracks(&self, book_id: Path<String>) -> TrackListResponse {
        LibraryService::new(&self.app).tracks(&book_id.0).await
    }

    /// Token-bearing stream and cover URLs
    #[oai(path = "/v1/books/:book_id/urls", method = "get")]
    #[tracing::instrument(level = "debug", skip(self, book_id))]
    async fn urls(&self, book_id: Path<String>) -> BookUrlsResponse {
        LibraryService::new(&self.app).urls(&book_id.0).await
    }

    // ===== Player =====

    /// Open a book in the player, closing any open one
    #[oai(path = "/v1/player/:book_id", method = "post")]
    #[tracing::instrument(level = "debug", skip(self, book_id))]
    async fn open_player(&self, book_id: Path<String>) -> PlayerResponse {
        PlayerService::new(&self.app).open(&book_id.0).await
    }

    #[oai(path = "/v1/player", method = "get")]
    async fn player_state(&self) -> PlayerResponse {
        PlayerService::new(&self.app).state().await
    }

    #[oai(path = "/v1/player/toggle", method = "post")]
    async fn toggle(&self) -> PlayerResponse {
        PlayerService::new(&self.app).toggle().await
    }

    #[oai(path = "/v1/player/seek", method = "post")]
    async fn seek(&self, body: Json<SeekRequestDto>) -> PlayerResponse {
        PlayerService::new(&self.app).seek(body.0.position).await
    }

    #[oai(path = "/v1/player/skip-back", method = "post")]
    async fn skip_back(&self) -> PlayerResponse {
        PlayerService::new(&self.app).skip_back().await
    }

    #[oai(path = "/v1/player/skip-forward", method = "post")]
    async fn skip_forward(&self) -> PlayerResponse {
        PlayerService::new(&self.app).skip_forward().await
    }

    /// Advance to the next playback rate
    #[oai(path = "/v1/player/rate", method = "post")]
    async fn next_rate(&self) -> PlayerResponse {
        PlayerService::new(&self.app).next_rate().await
    }

    #[oai(path = "/v1/player/chapters/:chapter_id", method = "post")]
    async fn select_chapter(&self, chapter_id: Path<String>) -> PlayerResponse {
        PlayerService::new(&self.app).select_chapter(&chapter_id.0).await
    }

    #[oai(path = "/v1/player", method = "delete")]
    #[tracing::instrument(level = "debug", skip(self))]
    async fn close_player(&self) -> NoContentResponse {
        PlayerService::new(&self.app).close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use poem::test::TestClient;
    use poem_openapi::OpenApiService;
    use serde_json::json;

    use crate::app::AppSettings;
    use crate::player::audio::SimulatedOutput;
    use crate::storage::MemoryStateRepo;

    async fn client() -> TestClient<poem::Route> {
        let app = AppContext::restore(
            Arc::new(MemoryStateRepo::default()),
            Arc::new(SimulatedOutput),
            AppSettings::default(),
        )
        .await
        .unwrap();
        let api = OpenApiService::new(AbsPlayerApi { app: Arc::new(app) }, "test", "0");
        TestClient::new(poem::Route::new().nest("/", api))
    }

    async fn demo_login(cli: &TestClient<poem::Route>) {
        cli.post("/v1/session")
            .body_json(&json!({"server_url": "demo", "username": "alice", "password": "x"}))
            .send()
            .await
            .assert_status_is_ok();
    }

    #[tokio::test]
    async fn signed_out_requests_are_unauthorized() {
        let cli = client().await;
        let resp = cli.get("/v1/libraries").send().await;
        resp.assert_status(poem::http::StatusCode::UNAUTHORIZED);
        resp.assert_json(json!({"message": "Not signed in"})).await;
    }

    #[tokio::test]
    async fn demo_session_lists_fixture_data() {
        let cli = client().await;
        demo_login(&cli).await;

        let resp = cli.get("/v1/session").send().await;
        resp.assert_status_is_ok();
        let body = resp.json().await;
        body.value().object().get("demo").assert_bool(true);

        let resp = cli.get("/v1/libraries/lib-1/books").send().await;
        resp.assert_status_is_ok();
        resp.json().await.value().array().assert_len(5);
    }

    #[tokio::test]
    async fn unknown_book_is_not_found() {
        let cli = client().await;
        demo_login(&cli).await;
        let resp = cli.get("/v1/books/nope").send().await;
        resp.assert_status(poem::http::StatusCode::NOT_FOUND);
        resp.assert_json(json!({"message": "Book not found"})).await;
    }

    #[tokio::test]
    async fn player_commands_round_trip() {
        let cli = client().await;
        demo_login(&cli).await;

        cli.get("/v1/player")
            .send()
            .await
            .assert_status(poem::http::StatusCode::NOT_FOUND);

        let resp = cli.post("/v1/player/book-1").send().await;
        resp.assert_status_is_ok();
        resp.json().await.value().object().get("phase").assert_string("ready");

        let resp = cli
            .post("/v1/player/seek")
            .body_json(&json!({"position": 1300.0}))
            .send()
            .await;
        resp.assert_status_is_ok();
        let body = resp.json().await;
        let chapter = body.value().object().get("current_chapter");
        chapter.object().get("id").assert_string("chapter-2");

        let resp = cli.post("/v1/player/rate").send().await;
        resp.json().await.value().object().get("playback_rate").assert_f64(1.25);

        cli.delete("/v1/player")
            .send()
            .await
            .assert_status(poem::http::StatusCode::NO_CONTENT);
        cli.delete("/v1/session")
            .send()
            .await
            .assert_status(poem::http::StatusCode::NO_CONTENT);
        cli.get("/v1/session")
            .send()
            .await
            .assert_status(poem::http::StatusCode::UNAUTHORIZED);
    }
}
