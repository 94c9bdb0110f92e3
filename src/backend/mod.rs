//! Backend strategy: the real Audiobookshelf HTTP client or the fixture-backed
//! demo backend, chosen once when a server configuration is connected.

pub mod demo;

use std::sync::Arc;

use crate::abs_client::{AbsClient, HttpSettings};
use crate::domain::models::{AudioTrack, Book, Chapter, Library, ServerConfig, User};
use crate::error::ClientResult;

pub use demo::DemoBackend;

/// Server identifiers that select the demo backend.
pub const DEMO_SERVER_URLS: [&str; 3] = ["demo", "http://demo", "https://demo"];

pub fn is_demo_url(url: &str) -> bool {
    DEMO_SERVER_URLS.contains(&url.trim())
}

#[async_trait::async_trait]
pub trait LibraryBackend: Send + Sync {
    async fn authenticate(&self, username: &str, password: &str) -> ClientResult<User>;
    async fn list_libraries(&self, token: &str) -> ClientResult<Vec<Library>>;
    async fn list_books(&self, token: &str, library_id: &str) -> ClientResult<Vec<Book>>;
    async fn book_details(&self, token: &str, book_id: &str) -> ClientResult<Book>;
    async fn list_chapters(&self, token: &str, book_id: &str) -> ClientResult<Vec<Chapter>>;
    async fn list_audio_tracks(&self, token: &str, book_id: &str) -> ClientResult<Vec<AudioTrack>>;
    /// Fire-and-forget from the caller's perspective; transport failures are returned.
    async fn report_progress(
        &self,
        token: &str,
        book_id: &str,
        current_time: f64,
        duration: f64,
    ) -> ClientResult<()>;
    fn stream_url(&self, token: &str, book_id: &str) -> String;
    fn cover_url(&self, token: &str, book_id: &str) -> String;
    fn is_demo(&self) -> bool {
        false
    }
}

/// Pick the backend for a server configuration.
pub fn connect(server: &ServerConfig, http: &HttpSettings) -> ClientResult<Arc<dyn LibraryBackend>> {
    if is_demo_url(&server.url) {
        tracing::info!(server_url = %server.url, "using demo backend");
        return Ok(Arc::new(DemoBackend));
    }
    tracing::info!(server_url = %server.url, "using Audiobookshelf backend");
    Ok(Arc::new(AbsClient::new(&server.url, http)?))
}

#[async_trait::async_trait]
impl LibraryBackend for AbsClient {
    async fn authenticate(&self, username: &str, password: &str) -> ClientResult<User> {
        self.login(username, password).await
    }

    async fn list_libraries(&self, token: &str) -> ClientResult<Vec<Library>> {
        self.get_libraries(token).await
    }

    async fn list_books(&self, token: &str, library_id: &str) -> ClientResult<Vec<Book>> {
        self.get_library_items(token, library_id).await
    }

    async fn book_details(&self, token: &str, book_id: &str) -> ClientResult<Book> {
        self.get_item(token, book_id).await
    }

    async fn list_chapters(&self, token: &str, book_id: &str) -> ClientResult<Vec<Chapter>> {
        self.get_chapters(token, book_id).await
    }

    async fn list_audio_tracks(&self, token: &str, book_id: &str) -> ClientResult<Vec<AudioTrack>> {
        self.get_audio_tracks(token, book_id).await
    }

    async fn report_progress(
        &self,
        token: &str,
        book_id: &str,
        current_time: f64,
        duration: f64,
    ) -> ClientResult<()> {
        self.update_progress(token, book_id, current_time, duration)
            .await
    }

    fn stream_url(&self, token: &str, book_id: &str) -> String {
        AbsClient::stream_url(self, token, book_id)
    }

    fn cover_url(&self, token: &str, book_id: &str) -> String {
        AbsClient::cover_url(self, token, book_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(url: &str) -> ServerConfig {
        ServerConfig {
            url: url.into(),
            username: "u".into(),
            password: "p".into(),
            token: None,
        }
    }

    #[test]
    fn sentinel_urls_select_demo_backend() {
        for url in DEMO_SERVER_URLS {
            let backend = connect(&server(url), &HttpSettings::default()).unwrap();
            assert!(backend.is_demo(), "{url} should be demo");
        }
        let backend = connect(&server("http://demo.example.com"), &HttpSettings::default()).unwrap();
        assert!(!backend.is_demo());
    }

    #[test]
    fn normalized_form_input_still_detects_demo() {
        let cfg = ServerConfig::from_form("demo", "", "").unwrap();
        assert_eq!(cfg.url, "http://demo");
        assert!(is_demo_url(&cfg.url));
    }

    #[test]
    fn real_backend_builds_urls_from_server() {
        let backend = connect(&server("https://abs.example.com"), &HttpSettings::default()).unwrap();
        assert_eq!(
            backend.stream_url("t", "li_9"),
            "https://abs.example.com/api/v1/items/li_9/play?token=t"
        );
    }
}
