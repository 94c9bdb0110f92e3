// Domain models shared by the backends, the tracker and the persisted stores

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Connection details for one Audiobookshelf server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    pub token: Option<String>,
}

impl ServerConfig {
    /// Build a config from login form input, normalizing the URL the way the
    /// login form does: prepend `http://` when no scheme is given and drop a
    /// trailing slash.
    pub fn from_form(
        url: &str,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Option<Self> {
        let url = normalize_server_url(url)?;
        Some(ServerConfig {
            url,
            username: username.into(),
            password: password.into(),
            token: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

pub fn normalize_server_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut url = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };
    if url.ends_with('/') {
        url.pop();
    }
    Some(url)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Library {
    pub id: String,
    pub name: String,
    pub cover: Option<String>,
    pub item_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub id: String,
    pub name: String,
    pub sequence: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub authors: Vec<Author>,
    pub series: Option<Series>,
    pub cover: Option<String>,
    pub description: Option<String>,
    /// Seconds
    pub duration: f64,
    /// 0.0 - 1.0 fraction as reported by the server
    pub progress: f64,
    pub narrators: Option<Vec<String>>,
    pub published_year: Option<i64>,
    pub genres: Option<Vec<String>>,
    pub path: Option<String>,
}

impl Book {
    pub fn author_names(&self) -> Vec<String> {
        self.authors.iter().map(|a| a.name.clone()).collect()
    }
}

/// Half-open interval `[start, end)` in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: String,
    pub title: String,
    pub start: f64,
    pub end: f64,
}

impl Chapter {
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time < self.end
    }

    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioTrack {
    pub id: String,
    pub index: u32,
    /// Stream URL
    pub path: String,
    pub duration: f64,
    pub start_offset: f64,
}

/// Locally persisted listening position for one book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSession {
    pub id: String,
    pub book_id: String,
    pub current_time: f64,
    pub duration: f64,
    pub progress: f64,
    pub updated_at: DateTime<Utc>,
}

impl PlaybackSession {
    pub fn new(book_id: &str, current_time: f64, duration: f64) -> Self {
        PlaybackSession {
            id: book_id.to_string(),
            book_id: book_id.to_string(),
            current_time,
            duration,
            progress: progress_ratio(current_time, duration),
            updated_at: Utc::now(),
        }
    }
}

/// `current_time / duration` clamped to `[0, 1]`; 0 when the duration is unknown.
pub fn progress_ratio(current_time: f64, duration: f64) -> f64 {
    if duration > 0.0 {
        (current_time / duration).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// A local session wins over the progress the server reported.
pub fn effective_progress(book: &Book, session: Option<&PlaybackSession>) -> f64 {
    session.map(|s| s.progress).unwrap_or(book.progress)
}
