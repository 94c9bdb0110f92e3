// In-memory book cache with a fixed time-to-live

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::backend::LibraryBackend;
use crate::domain::models::Book;
use crate::error::ClientResult;

pub const DEFAULT_BOOK_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct Entry {
    book: Book,
    fetched_at: Instant,
}

/// Book details keyed by id. Entries older than the TTL are refetched.
#[derive(Debug)]
pub struct BookCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, Entry>>,
}

impl Default for BookCache {
    fn default() -> Self {
        BookCache::new(DEFAULT_BOOK_TTL)
    }
}

impl BookCache {
    pub fn new(ttl: Duration) -> Self {
        BookCache {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Fresh cached book, if any.
    pub async fn get(&self, book_id: &str) -> Option<Book> {
        let entries = self.entries.read().await;
        entries
            .get(book_id)
            .filter(|e| e.fetched_at.elapsed() < self.ttl)
            .map(|e| e.book.clone())
    }

    /// Cached book when fresh, otherwise fetch it from the backend and cache it.
    #[tracing::instrument(level = "debug", skip(self, backend, token))]
    pub async fn get_or_fetch(
        &self,
        backend: &dyn LibraryBackend,
        token: &str,
        book_id: &str,
    ) -> ClientResult<Book> {
        if let Some(book) = self.get(book_id).await {
            tracing::debug!("book cache hit");
            return Ok(book);
        }
        let book = backend.book_details(token, book_id).await?;
        self.put(book.clone()).await;
        Ok(book)
    }

    pub async fn put(&self, book: Book) {
        let mut entries = self.entries.write().await;
        entries.insert(
            book.id.clone(),
            Entry {
                book,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Warm the cache from a library listing.
    pub async fn put_many(&self, books: &[Book]) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        for book in books {
            entries.insert(
                book.id.clone(),
                Entry {
                    book: book.clone(),
                    fetched_at: now,
                },
            );
        }
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::backend::DemoBackend;
    use crate::domain::models::{AudioTrack, Chapter, Library, User};

    /// Demo data with a call counter on book lookups.
    #[derive(Default)]
    struct CountingBackend {
        lookups: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl LibraryBackend for CountingBackend {
        async fn authenticate(&self, u: &str, p: &str) -> ClientResult<User> {
            DemoBackend.authenticate(u, p).await
        }
        async fn list_libraries(&self, t: &str) -> ClientResult<Vec<Library>> {
            DemoBackend.list_libraries(t).await
        }
        async fn list_books(&self, t: &str, l: &str) -> ClientResult<Vec<Book>> {
            DemoBackend.list_books(t, l).await
        }
        async fn book_details(&self, t: &str, b: &str) -> ClientResult<Book> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            DemoBackend.book_details(t, b).await
        }
        async fn list_chapters(&self, t: &str, b: &str) -> ClientResult<Vec<Chapter>> {
            DemoBackend.list_chapters(t, b).await
        }
        async fn list_audio_tracks(&self, t: &str, b: &str) -> ClientResult<Vec<AudioTrack>> {
            DemoBackend.list_audio_tracks(t, b).await
        }
        async fn report_progress(&self, _: &str, _: &str, _: f64, _: f64) -> ClientResult<()> {
            Ok(())
        }
        fn stream_url(&self, t: &str, b: &str) -> String {
            DemoBackend.stream_url(t, b)
        }
        fn cover_url(&self, t: &str, b: &str) -> String {
            DemoBackend.cover_url(t, b)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_entries_are_served_without_fetching() {
        let backend = CountingBackend::default();
        let cache = BookCache::new(Duration::from_secs(60));

        let first = cache.get_or_fetch(&backend, "t", "book-1").await.unwrap();
        let second = cache.get_or_fetch(&backend, "t", "book-1").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(backend.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_entries_are_refetched() {
        let backend = CountingBackend::default();
        let cache = BookCache::new(Duration::from_secs(60));

        cache.get_or_fetch(&backend, "t", "book-1").await.unwrap();
        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(cache.get("book-1").await.is_none());
        cache.get_or_fetch(&backend, "t", "book-1").await.unwrap();
        assert_eq!(backend.lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn listing_warms_cache_and_clear_empties_it() {
        let backend = CountingBackend::default();
        let cache = BookCache::default();
        let books = backend.list_books("t", "lib-1").await.unwrap();
        cache.put_many(&books).await;

        cache.get_or_fetch(&backend, "t", &books[0].id).await.unwrap();
        assert_eq!(backend.lookups.load(Ordering::SeqCst), 0);

        cache.clear().await;
        assert!(cache.get(&books[0].id).await.is_none());
    }

    #[tokio::test]
    async fn fetch_errors_are_not_cached() {
        let backend = CountingBackend::default();
        let cache = BookCache::default();
        assert!(cache.get_or_fetch(&backend, "t", "missing").await.is_err());
        assert!(cache.get_or_fetch(&backend, "t", "missing").await.is_err());
        assert_eq!(backend.lookups.load(Ordering::SeqCst), 2);
    }
}
