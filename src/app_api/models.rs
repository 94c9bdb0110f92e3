use poem_openapi::{ApiResponse, Object, payload::Json};

use crate::app::{BookUrls, SessionInfo};
use crate::domain::home::HomeShelves;
use crate::domain::models::{AudioTrack, Book, Chapter, Library};
use crate::error::ClientError;
use crate::player::PlayerSnapshot;

#[derive(Debug, Clone, Object)]
pub struct ErrorDto {
    /// Human-readable error message
    pub message: String,
}

#[derive(Debug, Clone, Object)]
pub struct LoginRequestDto {
    /// Server address as typed, e.g. `abs.local:13378` or `demo`
    pub server_url: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Object)]
pub struct SessionDto {
    pub server_url: String,
    pub user_id: String,
    pub username: String,
    /// True when the fixture backend is serving requests
    pub demo: bool,
}

impl From<SessionInfo> for SessionDto {
    fn from(s: SessionInfo) -> Self {
        SessionDto {
            server_url: s.server_url,
            user_id: s.user.id,
            username: s.user.username,
            demo: s.demo,
        }
    }
}

#[derive(Debug, Clone, Object)]
pub struct LibraryDto {
    pub id: String,
    pub name: String,
    pub cover: Option<String>,
    pub item_count: u64,
}

impl From<Library> for LibraryDto {
    fn from(l: Library) -> Self {
        LibraryDto {
            id: l.id,
            name: l.name,
            cover: l.cover,
            item_count: l.item_count,
        }
    }
}

#[derive(Debug, Clone, Object)]
pub struct BookDto {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub series: Option<String>,
    pub series_sequence: Option<f64>,
    pub cover: Option<String>,
    pub description: Option<String>,
    /// Seconds
    pub duration: f64,
    pub progress: f64,
    pub narrators: Vec<String>,
    pub published_year: Option<i64>,
    pub genres: Vec<String>,
    pub path: Option<String>,
}

impl From<Book> for BookDto {
    fn from(b: Book) -> Self {
        let authors = b.author_names();
        let (series, series_sequence) = match b.series {
            Some(s) => (Some(s.name), s.sequence),
            None => (None, None),
        };
        BookDto {
            id: b.id,
            title: b.title,
            authors,
            series,
            series_sequence,
            cover: b.cover,
            description: b.description,
            duration: b.duration,
            progress: b.progress,
            narrators: b.narrators.unwrap_or_default(),
            published_year: b.published_year,
            genres: b.genres.unwrap_or_default(),
            path: b.path,
        }
    }
}

#[derive(Debug, Clone, Object)]
pub struct ChapterDto {
    pub id: String,
    pub title: String,
    pub start: f64,
    pub end: f64,
}

impl From<Chapter> for ChapterDto {
    fn from(c: Chapter) -> Self {
        ChapterDto {
            id: c.id,
            title: c.title,
            start: c.start,
            end: c.end,
        }
    }
}

#[derive(Debug, Clone, Object)]
pub struct AudioTrackDto {
    pub id: String,
    pub index: u32,
    pub path: String,
    pub duration: f64,
    pub start_offset: f64,
}

impl From<AudioTrack> for AudioTrackDto {
    fn from(t: AudioTrack) -> Self {
        AudioTrackDto {
            id: t.id,
            index: t.index,
            path: t.path,
            duration: t.duration,
            start_offset: t.start_offset,
        }
    }
}

#[derive(Debug, Clone, Object)]
pub struct BookUrlsDto {
    pub stream_url: String,
    pub cover_url: String,
}

impl From<BookUrls> for BookUrlsDto {
    fn from(u: BookUrls) -> Self {
        BookUrlsDto {
            stream_url: u.stream,
            cover_url: u.cover,
        }
    }
}

#[derive(Debug, Clone, Object)]
pub struct HomeDto {
    pub continue_listening: Vec<BookDto>,
    pub recent: Vec<BookDto>,
}

impl From<HomeShelves> for HomeDto {
    fn from(h: HomeShelves) -> Self {
        HomeDto {
            continue_listening: h.continue_listening.into_iter().map(Into::into).collect(),
            recent: h.recent.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Object)]
pub struct PlayerDto {
    pub book_id: Option<String>,
    pub title: Option<String>,
    /// idle, loading, ready, playing, paused or error
    pub phase: String,
    pub current_time: f64,
    pub duration: f64,
    pub progress: f64,
    pub playback_rate: f64,
    pub current_chapter: Option<ChapterDto>,
    pub chapters: Vec<ChapterDto>,
    pub error: Option<String>,
    pub audio_loaded: bool,
}

impl From<PlayerSnapshot> for PlayerDto {
    fn from(s: PlayerSnapshot) -> Self {
        PlayerDto {
            book_id: s.book_id,
            title: s.title,
            phase: s.phase.as_str().to_string(),
            current_time: s.current_time,
            duration: s.duration,
            progress: s.progress,
            playback_rate: s.playback_rate,
            current_chapter: s.current_chapter.map(Into::into),
            chapters: s.chapters.into_iter().map(Into::into).collect(),
            error: s.error,
            audio_loaded: s.audio_loaded,
        }
    }
}

#[derive(Debug, Clone, Object)]
pub struct SeekRequestDto {
    /// Absolute position in seconds
    pub position: f64,
}

#[derive(ApiResponse)]
pub enum SessionResponse {
    /// Signed in
    #[oai(status = 200)]
    Ok(Json<SessionDto>),

    #[oai(status = 401)]
    Unauthorized(Json<ErrorDto>),

    #[oai(status = 404)]
    NotFound(Json<ErrorDto>),

    /// Upstream server error
    #[oai(status = 502)]
    BadGateway(Json<ErrorDto>),

    #[oai(status = 500)]
    InternalError(Json<ErrorDto>),
}

#[derive(ApiResponse)]
pub enum NoContentResponse {
    /// Done
    #[oai(status = 204)]
    NoContent,
}

#[derive(ApiResponse)]
pub enum LibraryListResponse {
    /// Libraries successfully retrieved
    #[oai(status = 200)]
    Ok(Json<Vec<LibraryDto>>),

    #[oai(status = 401)]
    Unauthorized(Json<ErrorDto>),

    #[oai(status = 404)]
    NotFound(Json<ErrorDto>),

    /// Upstream server error
    #[oai(status = 502)]
    BadGateway(Json<ErrorDto>),

    #[oai(status = 500)]
    InternalError(Json<ErrorDto>),
}

#[derive(ApiResponse)]
pub enum BookListResponse {
    /// Books of the library
    #[oai(status = 200)]
    Ok(Json<Vec<BookDto>>),

    #[oai(status = 401)]
    Unauthorized(Json<ErrorDto>),

    #[oai(status = 404)]
    NotFound(Json<ErrorDto>),

    /// Upstream server error
    #[oai(status = 502)]
    BadGateway(Json<ErrorDto>),

    #[oai(status = 500)]
    InternalError(Json<ErrorDto>),
}

#[derive(ApiResponse)]
pub enum HomeResponse {
    /// Continue-listening and recent shelves
    #[oai(status = 200)]
    Ok(Json<HomeDto>),

    #[oai(status = 401)]
    Unauthorized(Json<ErrorDto>),

    #[oai(status = 404)]
    NotFound(Json<ErrorDto>),

    /// Upstream server error
    #[oai(status = 502)]
    BadGateway(Json<ErrorDto>),

    #[oai(status = 500)]
    InternalError(Json<ErrorDto>),
}

#[derive(ApiResponse)]
pub enum BookResponse {
    /// Book details
    #[oai(status = 200)]
    Ok(Json<BookDto>),

    #[oai(status = 401)]
    Unauthorized(Json<ErrorDto>),

    #[oai(status = 404)]
    NotFound(Json<ErrorDto>),

    /// Upstream server error
    #[oai(status = 502)]
    BadGateway(Json<ErrorDto>),

    #[oai(status = 500)]
    InternalError(Json<ErrorDto>),
}

#[derive(ApiResponse)]
pub enum ChapterListResponse {
    /// Chapters in playback order
    #[oai(status = 200)]
    Ok(Json<Vec<ChapterDto>>),

    #[oai(status = 401)]
    Unauthorized(Json<ErrorDto>),

    #[oai(status = 404)]
    NotFound(Json<ErrorDto>),

    /// Upstream server error
    #[oai(status = 502)]
    BadGateway(Json<ErrorDto>),

    #[oai(status = 500)]
    InternalError(Json<ErrorDto>),
}

#[derive(ApiResponse)]
pub enum TrackListResponse {
    /// Audio tracks
    #[oai(status = 200)]
    Ok(Json<Vec<AudioTrackDto>>),

    #[oai(status = 401)]
    Unauthorized(Json<ErrorDto>),

    #[oai(status = 404)]
    NotFound(Json<ErrorDto>),

    /// Upstream server error
    #[oai(status = 502)]
    BadGateway(Json<ErrorDto>),

    #[oai(status = 500)]
    InternalError(Json<ErrorDto>),
}

#[derive(ApiResponse)]
pub enum BookUrlsResponse {
    /// Stream and cover URLs
    #[oai(status = 200)]
    Ok(Json<BookUrlsDto>),

    #[oai(status = 401)]
    Unauthorized(Json<ErrorDto>),

    #[oai(status = 404)]
    NotFound(Json<ErrorDto>),

    /// Upstream server error
    #[oai(status = 502)]
    BadGateway(Json<ErrorDto>),

    #[oai(status = 500)]
    InternalError(Json<ErrorDto>),
}

#[derive(ApiResponse)]
pub enum PlayerResponse {
    /// Current player state
    #[oai(status = 200)]
    Ok(Json<PlayerDto>),

    #[oai(status = 401)]
    Unauthorized(Json<ErrorDto>),

    /// No open player, or unknown chapter
    #[oai(status = 404)]
    NotFound(Json<ErrorDto>),

    /// Upstream server error
    #[oai(status = 502)]
    BadGateway(Json<ErrorDto>),

    /// Audio is not available
    #[oai(status = 500)]
    InternalError(Json<ErrorDto>),
}

macro_rules! from_client_error {
    ($($response:ident),+ $(,)?) => {
        $(
            impl From<ClientError> for $response {
                fn from(e: ClientError) -> Self {
                    let body = Json(ErrorDto { message: e.to_string() });
                    match e {
                        ClientError::Auth(_) | ClientError::NotSignedIn => $response::Unauthorized(body),
                        ClientError::NotFound(_) => $response::NotFound(body),
                        ClientError::PlaybackSetup(_) => $response::InternalError(body),
                        ClientError::Fetch { .. }
                        | ClientError::MalformedResponse(_)
                        | ClientError::Transport(_) => $response::BadGateway(body),
                    }
                }
            }
        )+
    };
}

from_client_error!(
    SessionResponse,
    LibraryListResponse,
    BookListResponse,
    HomeResponse,
    BookResponse,
    ChapterListResponse,
    TrackListResponse,
    BookUrlsResponse,
    PlayerResponse,
);
