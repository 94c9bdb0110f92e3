use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::domain::mapping::{map_chapters, map_item_to_book, map_library, map_tracks};
use crate::domain::models::{AudioTrack, Book, Chapter, Library, User, progress_ratio};
use crate::error::{ClientError, ClientResult};

const API_PREFIX: &str = "/api/v1";

#[derive(Clone, Copy, Debug)]
pub struct HttpSettings {
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        HttpSettings {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AbsClient {
    server_url: String,
    client: reqwest::Client,
}

impl AbsClient {
    /// Create a new client for the given server URL (e.g. "http://192.168.1.100:13378").
    pub fn new(server_url: impl Into<String>, settings: &HttpSettings) -> ClientResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .connect_timeout(settings.connect_timeout)
            .user_agent(format!("abs_player/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        let server_url_str = server_url.into();
        tracing::debug!(server_url = %server_url_str, "creating AbsClient");
        Ok(AbsClient {
            server_url: server_url_str.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}{}", self.server_url, API_PREFIX, path)
        } else {
            format!("{}{}/{}", self.server_url, API_PREFIX, path)
        }
    }

    /// Authenticated GET returning the parsed body.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &str,
        fallback: &str,
    ) -> ClientResult<T> {
        let url = self.url(path);
        tracing::debug!(%url, "GET");
        let resp = self.client.get(&url).bearer_auth(token).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            let message = error_message(status, &body, fallback);
            tracing::error!(%url, status = status.as_u16(), %message, "request rejected");
            return Err(ClientError::Fetch {
                status: status.as_u16(),
                message,
            });
        }
        if body.trim().is_empty() {
            return Err(ClientError::MalformedResponse("empty response".into()));
        }
        serde_json::from_str::<T>(&body).map_err(|e| {
            let snippet_len = body.len().min(2000);
            let snippet = body.get(..snippet_len).unwrap_or_default();
            tracing::error!(error = %e, body_snippet = %snippet, %url, "failed to parse response");
            ClientError::MalformedResponse(e.to_string())
        })
    }

    /// POST /api/v1/login (no auth required)
    #[tracing::instrument(level = "debug", skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<User> {
        let url = self.url("/login");
        tracing::debug!(%url, "POST login");
        let resp = self
            .client
            .post(&url)
            .json(&LoginRequest { username, password })
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(ClientError::Auth(error_message(status, &body, "Login failed")));
        }
        if body.is_empty() {
            return Err(ClientError::Auth(
                "Server returned an empty response".into(),
            ));
        }
        let parsed: LoginResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, "failed to parse login response");
            ClientError::Auth(format!("Invalid server response: {}", e))
        })?;
        let user = parsed
            .user
            .and_then(|u| match u.token {
                Some(token) if !token.is_empty() => Some(User {
                    id: u.id.unwrap_or_default(),
                    username: u.username.unwrap_or_default(),
                    token,
                }),
                _ => None,
            })
            .ok_or_else(|| {
                ClientError::Auth("Invalid server response: missing user data".into())
            })?;
        tracing::info!(user_id = %user.id, username = %user.username, "logged in");
        Ok(user)
    }

    /// GET /api/v1/libraries
    #[tracing::instrument(level = "debug", skip(self, token))]
    pub async fn get_libraries(&self, token: &str) -> ClientResult<Vec<Library>> {
        let parsed: LibrariesResponse = self
            .get_json("/libraries", token, "Failed to fetch libraries")
            .await?;
        let libraries = parsed
            .libraries
            .ok_or_else(|| ClientError::MalformedResponse("missing libraries".into()))?;
        Ok(libraries.iter().map(map_library).collect())
    }

    /// GET /api/v1/libraries/{library_id}/items
    #[tracing::instrument(level = "debug", skip(self, token))]
    pub async fn get_library_items(&self, token: &str, library_id: &str) -> ClientResult<Vec<Book>> {
        let parsed: LibraryItemsResponse = self
            .get_json(
                &format!("/libraries/{}/items", library_id),
                token,
                "Failed to fetch books",
            )
            .await?;
        let items = parsed
            .items
            .ok_or_else(|| ClientError::MalformedResponse("missing items".into()))?;
        Ok(items
            .iter()
            .map(|it| map_item_to_book(&self.server_url, it))
            .collect())
    }

    /// GET /api/v1/items/{item_id}
    #[tracing::instrument(level = "debug", skip(self, token))]
    pub async fn get_item(&self, token: &str, item_id: &str) -> ClientResult<Book> {
        let item: LibraryItem = self
            .get_json(
                &format!("/items/{}", item_id),
                token,
                "Failed to fetch book details",
            )
            .await?;
        Ok(map_item_to_book(&self.server_url, &item))
    }

    /// GET /api/v1/items/{item_id}/chapters
    #[tracing::instrument(level = "debug", skip(self, token))]
    pub async fn get_chapters(&self, token: &str, item_id: &str) -> ClientResult<Vec<Chapter>> {
        let parsed: ChaptersResponse = self
            .get_json(
                &format!("/items/{}/chapters", item_id),
                token,
                "Failed to fetch chapters",
            )
            .await?;
        let chapters = parsed
            .chapters
            .ok_or_else(|| ClientError::MalformedResponse("missing chapters".into()))?;
        Ok(map_chapters(&chapters))
    }

    /// GET /api/v1/items/{item_id}/audio-tracks
    #[tracing::instrument(level = "debug", skip(self, token))]
    pub async fn get_audio_tracks(&self, token: &str, item_id: &str) -> ClientResult<Vec<AudioTrack>> {
        let parsed: AudioTracksResponse = self
            .get_json(
                &format!("/items/{}/audio-tracks", item_id),
                token,
                "Failed to fetch audio tracks",
            )
            .await?;
        let tracks = parsed
            .tracks
            .ok_or_else(|| ClientError::MalformedResponse("missing tracks".into()))?;
        Ok(map_tracks(&self.server_url, item_id, &tracks))
    }

    /// POST /api/v1/me/progress/{item_id}
    ///
    /// The response is ignored; only transport failures are reported.
    #[tracing::instrument(level = "debug", skip(self, token))]
    pub async fn update_progress(
        &self,
        token: &str,
        item_id: &str,
        current_time: f64,
        duration: f64,
    ) -> ClientResult<()> {
        let url = self.url(&format!("/me/progress/{}", item_id));
        let body = ProgressUpdateRequest {
            progress: progress_ratio(current_time, duration),
            current_time,
            duration,
        };
        let resp = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            tracing::warn!(status = resp.status().as_u16(), %item_id, "progress update not accepted");
        }
        Ok(())
    }

    /// Build the stream URL for an item. This does not perform a request.
    pub fn stream_url(&self, token: &str, item_id: &str) -> String {
        format!("{}?token={}", self.url(&format!("/items/{}/play", item_id)), token)
    }

    /// Build the cover URL for an item. This does not perform a request.
    pub fn cover_url(&self, token: &str, item_id: &str) -> String {
        format!("{}?token={}", self.url(&format!("/items/{}/cover", item_id)), token)
    }

    /// Cover URL as embedded in mapped books (no token; the shell adds auth).
    pub fn item_cover_path(server_url: &str, item_id: &str) -> String {
        format!("{}{}/items/{}/cover", server_url, API_PREFIX, item_id)
    }

    pub fn audio_track_path(server_url: &str, item_id: &str, index: usize) -> String {
        format!(
            "{}{}/items/{}/audio-tracks/{}",
            server_url, API_PREFIX, item_id, index
        )
    }
}

/// Message for a rejected request. A JSON body yields its `message` field or
/// `fallback`; any other body is returned as is, an empty one as a status line.
pub fn error_message(status: StatusCode, body: &str, fallback: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => value
            .get("message")
            .and_then(|m| m.as_str())
            .filter(|m| !m.is_empty())
            .unwrap_or(fallback)
            .to_string(),
        Err(_) if !body.is_empty() => body.to_string(),
        _ => format!(
            "Server returned {}: {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or_default()
        ),
    }
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProgressUpdateRequest {
    progress: f64,
    current_time: f64,
    duration: f64,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct LoginResponse {
    pub user: Option<LoginUser>,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct LoginUser {
    #[serde(deserialize_with = "de::opt_string_from_str_or_num", default)]
    pub id: Option<String>,
    pub username: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct LibrariesResponse {
    pub libraries: Option<Vec<LibraryEntry>>,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LibraryEntry {
    pub id: String,
    pub name: String,
    pub cover: Option<String>,
    pub media_count: Option<u64>,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct LibraryItemsResponse {
    pub items: Option<Vec<LibraryItem>>,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct LibraryItem {
    pub id: String,
    #[serde(default)]
    pub media: Media,
    pub progress: Option<ItemProgress>,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    #[serde(default)]
    pub metadata: BookMetadata,
    pub cover_path: Option<String>,
    pub duration: Option<f64>,
    pub path: Option<String>,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookMetadata {
    pub title: Option<String>,
    pub authors: Option<Vec<AuthorEntry>>,
    pub series: Option<de::OneOrMany<SeriesEntry>>,
    pub description: Option<String>,
    pub narrators: Option<Vec<String>>,
    #[serde(
        deserialize_with = "crate::abs_client::de::opt_i64_from_str_or_num",
        default
    )]
    pub published_year: Option<i64>,
    pub genres: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct AuthorEntry {
    #[serde(deserialize_with = "de::opt_string_from_str_or_num", default)]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct SeriesEntry {
    #[serde(deserialize_with = "de::opt_string_from_str_or_num", default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(deserialize_with = "de::opt_f64_from_str_or_num", default)]
    pub sequence: Option<f64>,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct ItemProgress {
    pub progress: Option<f64>,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct ChaptersResponse {
    pub chapters: Option<Vec<ChapterEntry>>,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct ChapterEntry {
    #[serde(deserialize_with = "de::opt_string_from_str_or_num", default)]
    pub id: Option<String>,
    pub title: Option<String>,
    #[serde(default)]
    pub start: f64,
    #[serde(default)]
    pub end: f64,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct AudioTracksResponse {
    pub tracks: Option<Vec<AudioTrackEntry>>,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AudioTrackEntry {
    #[serde(deserialize_with = "de::opt_string_from_str_or_num", default)]
    pub id: Option<String>,
    pub index: Option<u32>,
    pub duration: Option<f64>,
    pub start_offset: Option<f64>,
}

/// Internal serde helpers
pub mod de {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrStr {
        Int(i64),
        Float(f64),
        Str(String),
    }

    /// Accept Option<i64> from either a number or a string like "2011"; null/"" -> None.
    pub fn opt_i64_from_str_or_num<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let val: Option<NumOrStr> = Option::deserialize(deserializer)?;
        Ok(match val {
            None => None,
            Some(NumOrStr::Int(n)) => Some(n),
            Some(NumOrStr::Float(f)) => Some(f as i64),
            Some(NumOrStr::Str(s)) => s.trim().parse::<i64>().ok(),
        })
    }

    /// Accept Option<f64> from either a number or a string like "1.5"; null/"" -> None.
    pub fn opt_f64_from_str_or_num<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let val: Option<NumOrStr> = Option::deserialize(deserializer)?;
        Ok(match val {
            None => None,
            Some(NumOrStr::Int(n)) => Some(n as f64),
            Some(NumOrStr::Float(f)) => Some(f),
            Some(NumOrStr::Str(s)) => s.trim().parse::<f64>().ok(),
        })
    }

    /// Ids show up as strings or numbers depending on the server version.
    pub fn opt_string_from_str_or_num<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let val: Option<NumOrStr> = Option::deserialize(deserializer)?;
        Ok(match val {
            None => None,
            Some(NumOrStr::Int(n)) => Some(n.to_string()),
            Some(NumOrStr::Float(f)) => Some(f.to_string()),
            Some(NumOrStr::Str(s)) if s.is_empty() => None,
            Some(NumOrStr::Str(s)) => Some(s),
        })
    }

    /// Series is a single object on older servers and an array on newer ones.
    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(untagged)]
    pub enum OneOrMany<T> {
        One(T),
        Many(Vec<T>),
    }

    impl<T> OneOrMany<T> {
        pub fn first(&self) -> Option<&T> {
            match self {
                OneOrMany::One(t) => Some(t),
                OneOrMany::Many(v) => v.first(),
            }
        }
    }
}
