// Home screen shelves derived from a library listing

use std::collections::BTreeMap;

use super::models::{Book, PlaybackSession, effective_progress};

pub const SHELF_LEN: usize = 5;
/// At or above this a book counts as finished.
pub const FINISHED_THRESHOLD: f64 = 0.99;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HomeShelves {
    pub continue_listening: Vec<Book>,
    pub recent: Vec<Book>,
}

pub fn home_shelves(books: &[Book], sessions: &BTreeMap<String, PlaybackSession>) -> HomeShelves {
    let (in_progress, rest): (Vec<&Book>, Vec<&Book>) = books.iter().partition(|b| {
        let p = effective_progress(b, sessions.get(&b.id));
        p > 0.0 && p < FINISHED_THRESHOLD
    });
    HomeShelves {
        continue_listening: in_progress.into_iter().take(SHELF_LEN).cloned().collect(),
        recent: rest.into_iter().take(SHELF_LEN).cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(id: &str, progress: f64) -> Book {
        Book {
            id: id.into(),
            title: id.into(),
            authors: vec![],
            series: None,
            cover: None,
            description: None,
            duration: 1000.0,
            progress,
            narrators: None,
            published_year: None,
            genres: None,
            path: None,
        }
    }

    #[test]
    fn partitions_by_effective_progress() {
        let books = vec![book("a", 0.0), book("b", 0.5), book("c", 0.995), book("d", 0.0)];
        let mut sessions = BTreeMap::new();
        sessions.insert("d".to_string(), PlaybackSession::new("d", 100.0, 1000.0));

        let shelves = home_shelves(&books, &sessions);
        let ids = |v: &[Book]| v.iter().map(|b| b.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&shelves.continue_listening), vec!["b", "d"]);
        assert_eq!(ids(&shelves.recent), vec!["a", "c"]);
    }

    #[test]
    fn shelves_are_capped() {
        let books: Vec<Book> = (0..8).map(|i| book(&format!("b{i}"), 0.3)).collect();
        let shelves = home_shelves(&books, &BTreeMap::new());
        assert_eq!(shelves.continue_listening.len(), SHELF_LEN);
        assert!(shelves.recent.is_empty());
    }
}
