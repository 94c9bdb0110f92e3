use poem_openapi::payload::Json;

use crate::{
    app::AppContext,
    app_api::models::{
        BookListResponse, BookResponse, BookUrlsResponse, ChapterListResponse, HomeResponse,
        LibraryListResponse, TrackListResponse,
    },
};

pub struct LibraryService<'a> {
    pub app: &'a AppContext,
}

impl<'a> LibraryService<'a> {
    pub fn new(app: &'a AppContext) -> Self {
        Self { app }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn list_libraries(&self) -> LibraryListResponse {
        match self.app.libraries().await {
            Ok(libs) => LibraryListResponse::Ok(Json(libs.into_iter().map(Into::into).collect())),
            Err(e) => {
                tracing::error!(error = %e, "failed to list libraries");
                e.into()
            }
        }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn list_books(&self, library_id: &str) -> BookListResponse {
        match self.app.books(library_id).await {
            Ok(books) => BookListResponse::Ok(Json(books.into_iter().map(Into::into).collect())),
            Err(e) => {
                tracing::error!(error = %e, %library_id, "failed to list books");
                e.into()
            }
        }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn home(&self, library_id: &str) -> HomeResponse {
        match self.app.home(library_id).await {
            Ok(shelves) => HomeResponse::Ok(Json(shelves.into())),
            Err(e) => {
                tracing::error!(error = %e, %library_id, "failed to build home shelves");
                e.into()
            }
        }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn book(&self, book_id: &str) -> BookResponse {
        match self.app.book(book_id).await {
            Ok(book) => BookResponse::Ok(Json(book.into())),
            Err(e) => {
                tracing::error!(error = %e, %book_id, "failed to load book");
                e.into()
            }
        }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn chapters(&self, book_id: &str) -> ChapterListResponse {
        match self.app.chapters(book_id).await {
            Ok(chapters) => ChapterListResponse::Ok(Json(chapters.into_iter().map(Into::into).collect())),
            Err(e) => {
                tracing::error!(error = %e, %book_id, "failed to load chapters");
                e.into()
            }
        }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn tracks(&self, book_id: &str) -> TrackListResponse {
        match self.app.tracks(book_id).await {
            Ok(tracks) => TrackListResponse::Ok(Json(tracks.into_iter().map(Into::into).collect())),
            Err(e) => {
                tracing::error!(error = %e, %book_id, "failed to load audio tracks");
                e.into()
            }
        }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn urls(&self, book_id: &str) -> BookUrlsResponse {
        match self.app.urls(book_id).await {
            Ok(urls) => BookUrlsResponse::Ok(Json(urls.into())),
            Err(e) => e.into(),
        }
    }
}
