// Fixture backend used when the server address is one of the demo sentinels.
// Never touches the network.

use crate::domain::models::{AudioTrack, Author, Book, Chapter, Library, Series, User};
use crate::error::{ClientError, ClientResult};

use super::LibraryBackend;

pub const DEMO_STREAM_URL: &str =
    "https://ia800501.us.archive.org/11/items/hamlet_0911_librivox/hamlet_act1_shakespeare.mp3";
pub const DEMO_DEFAULT_COVER: &str =
    "https://images.unsplash.com/photo-1544947950-fa07a98d237f?q=80&w=2787&auto=format&fit=crop";

#[derive(Debug, Clone, Copy, Default)]
pub struct DemoBackend;

#[async_trait::async_trait]
impl LibraryBackend for DemoBackend {
    async fn authenticate(&self, username: &str, _password: &str) -> ClientResult<User> {
        let username = if username.is_empty() { "demo" } else { username };
        Ok(User {
            id: "demo-user".into(),
            username: username.into(),
            token: "demo-token".into(),
        })
    }

    async fn list_libraries(&self, _token: &str) -> ClientResult<Vec<Library>> {
        Ok(vec![
            Library {
                id: "lib-1".into(),
                name: "Audiobooks".into(),
                cover: None,
                item_count: 12,
            },
            Library {
                id: "lib-2".into(),
                name: "Podcasts".into(),
                cover: None,
                item_count: 5,
            },
        ])
    }

    async fn list_books(&self, _token: &str, library_id: &str) -> ClientResult<Vec<Book>> {
        Ok(fixture_books(library_id))
    }

    async fn book_details(&self, _token: &str, book_id: &str) -> ClientResult<Book> {
        find_fixture_book(book_id).ok_or_else(|| ClientError::NotFound("Book not found".into()))
    }

    async fn list_chapters(&self, _token: &str, _book_id: &str) -> ClientResult<Vec<Chapter>> {
        Ok(fixture_chapters())
    }

    async fn list_audio_tracks(&self, _token: &str, _book_id: &str) -> ClientResult<Vec<AudioTrack>> {
        Ok(vec![AudioTrack {
            id: "track-1".into(),
            index: 0,
            path: "https://example.com/audio.mp3".into(),
            duration: 3600.0,
            start_offset: 0.0,
        }])
    }

    async fn report_progress(
        &self,
        _token: &str,
        book_id: &str,
        current_time: f64,
        _duration: f64,
    ) -> ClientResult<()> {
        tracing::debug!(%book_id, current_time, "demo backend ignores progress update");
        Ok(())
    }

    fn stream_url(&self, _token: &str, _book_id: &str) -> String {
        DEMO_STREAM_URL.to_string()
    }

    fn cover_url(&self, _token: &str, book_id: &str) -> String {
        find_fixture_book(book_id)
            .and_then(|b| b.cover)
            .unwrap_or_else(|| DEMO_DEFAULT_COVER.to_string())
    }

    fn is_demo(&self) -> bool {
        true
    }
}

fn find_fixture_book(book_id: &str) -> Option<Book> {
    fixture_books("lib-1")
        .into_iter()
        .chain(fixture_books("lib-2"))
        .find(|b| b.id == book_id)
}

struct Fixture {
    id: &'static str,
    title: &'static str,
    author: (&'static str, &'static str),
    series: Option<(&'static str, &'static str, f64)>,
    cover: &'static str,
    description: &'static str,
    duration: f64,
    progress: f64,
    narrators: &'static [&'static str],
    published_year: i64,
    genres: &'static [&'static str],
}

impl Fixture {
    fn into_book(self) -> Book {
        Book {
            id: self.id.into(),
            title: self.title.into(),
            authors: vec![Author {
                id: self.author.0.into(),
                name: self.author.1.into(),
            }],
            series: self.series.map(|(id, name, sequence)| Series {
                id: id.into(),
                name: name.into(),
                sequence: Some(sequence),
            }),
            cover: Some(self.cover.into()),
            description: Some(self.description.into()),
            duration: self.duration,
            progress: self.progress,
            narrators: Some(self.narrators.iter().map(|s| s.to_string()).collect()),
            published_year: Some(self.published_year),
            genres: Some(self.genres.iter().map(|s| s.to_string()).collect()),
            path: None,
        }
    }
}

/// `lib-1` holds the audiobooks; every other library id gets the podcasts.
pub fn fixture_books(library_id: &str) -> Vec<Book> {
    let fixtures = if library_id == "lib-1" {
        vec![
            Fixture {
                id: "book-1",
                title: "The Great Gatsby",
                author: ("author-1", "F. Scott Fitzgerald"),
                series: None,
                cover: "https://images.unsplash.com/photo-1544947950-fa07a98d237f?q=80&w=2787&auto=format&fit=crop",
                description: "A novel about the mysterious millionaire Jay Gatsby and his obsession with the beautiful Daisy Buchanan.",
                duration: 9000.0,
                progress: 0.3,
                narrators: &["Jake Gyllenhaal"],
                published_year: 1925,
                genres: &["Classic", "Fiction"],
            },
            Fixture {
                id: "book-2",
                title: "To Kill a Mockingbird",
                author: ("author-2", "Harper Lee"),
                series: None,
                cover: "https://images.unsplash.com/photo-1541963463532-d68292c34b19?q=80&w=2788&auto=format&fit=crop",
                description: "The story of Scout Finch and her father, a lawyer who defends a Black man accused of raping a white woman in the Deep South.",
                duration: 11000.0,
                progress: 0.0,
                narrators: &["Sissy Spacek"],
                published_year: 1960,
                genres: &["Classic", "Fiction", "Coming of Age"],
            },
            Fixture {
                id: "book-3",
                title: "1984",
                author: ("author-3", "George Orwell"),
                series: None,
                cover: "https://images.unsplash.com/photo-1543002588-bfa74002ed7e?q=80&w=2730&auto=format&fit=crop",
                description: "A dystopian novel set in a totalitarian society where critical thought is suppressed.",
                duration: 12000.0,
                progress: 0.7,
                narrators: &["Simon Prebble"],
                published_year: 1949,
                genres: &["Dystopian", "Science Fiction", "Classic"],
            },
            Fixture {
                id: "book-4",
                title: "Pride and Prejudice",
                author: ("author-4", "Jane Austen"),
                series: Some(("series-1", "Austen Classics", 1.0)),
                cover: "https://images.unsplash.com/photo-1544947950-fa07a98d237f?q=80&w=2787&auto=format&fit=crop",
                description: "The story follows the main character, Elizabeth Bennet, as she deals with issues of manners, upbringing, morality, education, and marriage.",
                duration: 13000.0,
                progress: 0.1,
                narrators: &["Rosamund Pike"],
                published_year: 1813,
                genres: &["Classic", "Romance"],
            },
            Fixture {
                id: "book-5",
                title: "The Hobbit",
                author: ("author-5", "J.R.R. Tolkien"),
                series: Some(("series-2", "Middle-Earth", 1.0)),
                cover: "https://images.unsplash.com/photo-1621351183012-e2f9972dd9bf?q=80&w=2835&auto=format&fit=crop",
                description: "The adventure of Bilbo Baggins, a hobbit who is swept into an epic quest to reclaim the lost Dwarf Kingdom of Erebor.",
                duration: 11500.0,
                progress: 0.0,
                narrators: &["Andy Serkis"],
                published_year: 1937,
                genres: &["Fantasy", "Adventure"],
            },
        ]
    } else {
        vec![
            Fixture {
                id: "podcast-1",
                title: "Science Weekly",
                author: ("author-6", "The Guardian"),
                series: None,
                cover: "https://images.unsplash.com/photo-1614113489855-66422ad300a4?q=80&w=2787&auto=format&fit=crop",
                description: "The award-winning Science Weekly podcast is the best place to learn about the big discoveries and debates in biology, chemistry, physics and sometimes even maths.",
                duration: 3600.0,
                progress: 0.5,
                narrators: &["Ian Sample", "Hannah Devlin"],
                published_year: 2022,
                genres: &["Science", "Education"],
            },
            Fixture {
                id: "podcast-2",
                title: "History Extra",
                author: ("author-7", "BBC History Magazine"),
                series: None,
                cover: "https://images.unsplash.com/photo-1461360370896-922624d12aa1?q=80&w=2874&auto=format&fit=crop",
                description: "The latest news from the team behind BBC History Magazine - a popular History magazine.",
                duration: 4500.0,
                progress: 0.2,
                narrators: &["David Musgrove", "Charlotte Hodgman"],
                published_year: 2022,
                genres: &["History", "Education"],
            },
        ]
    };
    fixtures.into_iter().map(Fixture::into_book).collect()
}

pub fn fixture_chapters() -> Vec<Chapter> {
    [
        "The Beginning",
        "The Journey",
        "The Challenge",
        "The Discovery",
        "The Resolution",
    ]
    .iter()
    .enumerate()
    .map(|(i, name)| Chapter {
        id: format!("chapter-{}", i + 1),
        title: format!("Chapter {}: {}", i + 1, name),
        start: i as f64 * 1200.0,
        end: (i + 1) as f64 * 1200.0,
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn login_accepts_any_credentials() {
        let user = DemoBackend.authenticate("alice", "whatever").await.unwrap();
        assert_eq!(user.id, "demo-user");
        assert_eq!(user.username, "alice");
        assert_eq!(user.token, "demo-token");

        let user = DemoBackend.authenticate("", "").await.unwrap();
        assert_eq!(user.username, "demo");
    }

    #[tokio::test]
    async fn libraries_and_books_are_fixed() {
        let libs = DemoBackend.list_libraries("t").await.unwrap();
        assert_eq!(libs.len(), 2);
        assert_eq!(libs[0].item_count, 12);
        assert_eq!(DemoBackend.list_books("t", "lib-1").await.unwrap().len(), 5);
        assert_eq!(DemoBackend.list_books("t", "anything").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn details_resolve_across_libraries_or_not_found() {
        let book = DemoBackend.book_details("t", "podcast-2").await.unwrap();
        assert_eq!(book.title, "History Extra");

        let err = DemoBackend.book_details("t", "nope").await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound(_)));
        assert_eq!(err.to_string(), "Book not found");
    }

    #[test]
    fn chapters_cover_contiguous_ranges() {
        let chapters = fixture_chapters();
        assert_eq!(chapters.len(), 5);
        assert_eq!(chapters[0].title, "Chapter 1: The Beginning");
        assert!(chapters.windows(2).all(|w| w[0].end == w[1].start));
        assert_eq!(chapters[4].end, 6000.0);
    }

    #[test]
    fn urls_are_fixed_samples() {
        assert_eq!(DemoBackend.stream_url("t", "book-1"), DEMO_STREAM_URL);
        assert!(DemoBackend.cover_url("t", "book-5").contains("photo-1621351183012"));
        assert_eq!(DemoBackend.cover_url("t", "missing"), DEMO_DEFAULT_COVER);
    }
}
