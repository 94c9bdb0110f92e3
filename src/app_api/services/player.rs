use poem_openapi::payload::Json;

use crate::{
    app::AppContext,
    app_api::models::{NoContentResponse, PlayerResponse},
    error::ClientResult,
    player::PlayerSnapshot,
};

pub struct PlayerService<'a> {
    pub app: &'a AppContext,
}

impl<'a> PlayerService<'a> {
    pub fn new(app: &'a AppContext) -> Self {
        Self { app }
    }

    fn respond(result: ClientResult<PlayerSnapshot>, action: &str) -> PlayerResponse {
        match result {
            Ok(snapshot) => PlayerResponse::Ok(Json(snapshot.into())),
            Err(e) => {
                tracing::warn!(error = %e, %action, "player command failed");
                e.into()
            }
        }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn open(&self, book_id: &str) -> PlayerResponse {
        Self::respond(self.app.open_player(book_id).await, "open")
    }

    pub async fn state(&self) -> PlayerResponse {
        Self::respond(self.app.player_snapshot().await, "state")
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn toggle(&self) -> PlayerResponse {
        Self::respond(self.app.toggle_play().await, "toggle")
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn seek(&self, position: f64) -> PlayerResponse {
        Self::respond(self.app.seek(position).await, "seek")
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn skip_back(&self) -> PlayerResponse {
        Self::respond(self.app.skip_back().await, "skip-back")
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn skip_forward(&self) -> PlayerResponse {
        Self::respond(self.app.skip_forward().await, "skip-forward")
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn next_rate(&self) -> PlayerResponse {
        Self::respond(self.app.next_rate().await, "rate")
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn select_chapter(&self, chapter_id: &str) -> PlayerResponse {
        Self::respond(self.app.select_chapter(chapter_id).await, "chapter")
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn close(&self) -> NoContentResponse {
        self.app.close_player().await;
        NoContentResponse::NoContent
    }
}
