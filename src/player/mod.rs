//! Playback session tracker.
//!
//! A [`Player`] drives one book through `Idle → Loading → Ready ⇄
//! Playing/Paused`, with `Error` terminal for that load. It owns the audio
//! handle and the progress sync task and releases both on close and on drop.

pub mod audio;
pub mod chapters;
pub mod rate;
mod sync;

use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::backend::LibraryBackend;
use crate::domain::models::{Book, Chapter, progress_ratio};
use crate::error::{ClientError, ClientResult};
use crate::library::BookCache;
use crate::storage::PlayerStore;

use audio::{AudioHandle, AudioOutput, AudioSource};
use chapters::ChapterCursor;

pub const LOAD_FAILED_MESSAGE: &str = "Failed to load book data. Please try again.";
pub const AUDIO_FAILED_MESSAGE: &str = "Failed to load audio. Please try again.";

#[derive(Debug, Clone, Copy)]
pub struct PlayerSettings {
    pub sync_interval: Duration,
    /// Seconds moved by skip back / skip forward
    pub skip_seconds: f64,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        PlayerSettings {
            sync_interval: Duration::from_secs(30),
            skip_seconds: 30.0,
        }
    }
}

/// Everything a player needs from the signed-in session.
pub struct PlaybackContext {
    pub backend: Arc<dyn LibraryBackend>,
    pub token: String,
    pub store: Arc<PlayerStore>,
    pub cache: Arc<BookCache>,
    pub audio: Arc<dyn AudioOutput>,
    pub settings: PlayerSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerPhase {
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
    Error,
}

impl PlayerPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            PlayerPhase::Idle => "idle",
            PlayerPhase::Loading => "loading",
            PlayerPhase::Ready => "ready",
            PlayerPhase::Playing => "playing",
            PlayerPhase::Paused => "paused",
            PlayerPhase::Error => "error",
        }
    }
}

pub(crate) struct PlayerState {
    phase: PlayerPhase,
    book: Option<Book>,
    chapters: Vec<Chapter>,
    cursor: ChapterCursor,
    current_time: f64,
    duration: f64,
    rate: f64,
    error: Option<String>,
    audio_loaded: bool,
    handle: Option<Box<dyn AudioHandle>>,
}

impl PlayerState {
    fn idle() -> Self {
        PlayerState {
            phase: PlayerPhase::Idle,
            book: None,
            chapters: Vec::new(),
            cursor: ChapterCursor::default(),
            current_time: 0.0,
            duration: 0.0,
            rate: 1.0,
            error: None,
            audio_loaded: false,
            handle: None,
        }
    }

    /// Pull the position from the audio handle and re-resolve the chapter.
    fn refresh(&mut self) {
        let Some(handle) = self.handle.as_ref() else {
            return;
        };
        let status = handle.status();
        self.current_time = if self.duration > 0.0 {
            status.position.clamp(0.0, self.duration)
        } else {
            status.position.max(0.0)
        };
        if self.phase == PlayerPhase::Playing && !status.is_playing {
            self.phase = PlayerPhase::Paused;
        }
        self.cursor.update(&self.chapters, self.current_time);
    }

    fn handle_mut(&mut self) -> ClientResult<&mut Box<dyn AudioHandle>> {
        self.handle
            .as_mut()
            .ok_or_else(|| ClientError::PlaybackSetup("Audio is not loaded".into()))
    }

    fn seek_to(&mut self, position: f64) -> ClientResult<()> {
        let target = position.clamp(0.0, self.duration.max(0.0));
        self.handle_mut()?.seek(target)?;
        self.current_time = target;
        self.cursor.update(&self.chapters, target);
        Ok(())
    }

    fn release_audio(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            if let Err(e) = handle.unload() {
                tracing::warn!(error = %e, "failed to unload audio");
            }
        }
    }

    fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            book_id: self.book.as_ref().map(|b| b.id.clone()),
            title: self.book.as_ref().map(|b| b.title.clone()),
            phase: self.phase,
            current_time: self.current_time,
            duration: self.duration,
            progress: progress_ratio(self.current_time, self.duration),
            playback_rate: self.rate,
            current_chapter: self.cursor.current(&self.chapters).cloned(),
            chapters: self.chapters.clone(),
            error: self.error.clone(),
            audio_loaded: self.audio_loaded,
        }
    }
}

/// Point-in-time view of the player for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSnapshot {
    pub book_id: Option<String>,
    pub title: Option<String>,
    pub phase: PlayerPhase,
    pub current_time: f64,
    pub duration: f64,
    pub progress: f64,
    pub playback_rate: f64,
    pub current_chapter: Option<Chapter>,
    pub chapters: Vec<Chapter>,
    pub error: Option<String>,
    pub audio_loaded: bool,
}

pub struct Player {
    ctx: Arc<PlaybackContext>,
    state: Arc<Mutex<PlayerState>>,
    sync: StdMutex<Option<JoinHandle<()>>>,
}

impl Player {
    pub fn new(ctx: Arc<PlaybackContext>) -> Self {
        Player {
            ctx,
            state: Arc::new(Mutex::new(PlayerState::idle())),
            sync: StdMutex::new(None),
        }
    }

    /// New player with `book_id` loaded. Load failures leave it in `Error`.
    pub async fn open(ctx: Arc<PlaybackContext>, book_id: &str) -> Self {
        let mut player = Player::new(ctx);
        player.load(book_id).await;
        player
    }

    /// Load a book, replacing whatever was loaded before.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn load(&mut self, book_id: &str) {
        self.stop_sync();
        {
            let mut st = self.state.lock().await;
            st.release_audio();
            *st = PlayerState::idle();
            st.phase = PlayerPhase::Loading;
        }

        let ctx = self.ctx.clone();
        let loaded = async {
            let book = ctx.cache.get_or_fetch(ctx.backend.as_ref(), &ctx.token, book_id).await?;
            let chapters = ctx.backend.list_chapters(&ctx.token, book_id).await?;
            Ok::<_, ClientError>((book, chapters))
        }
        .await;
        let (book, chapters) = match loaded {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(error = %e, %book_id, "failed to load book");
                let mut st = self.state.lock().await;
                st.phase = PlayerPhase::Error;
                st.error = Some(LOAD_FAILED_MESSAGE.to_string());
                return;
            }
        };

        let start_at = ctx.store.session(book_id).await.map_or(0.0, |s| s.current_time);
        let rate = ctx.store.playback_rate().await;
        let duration = if book.duration > 0.0 {
            book.duration
        } else {
            chapters.last().map_or(0.0, |c| c.end)
        };
        let source = AudioSource {
            uri: ctx.backend.stream_url(&ctx.token, book_id),
            start_at,
            rate,
            duration: Some(duration).filter(|d| *d > 0.0),
        };
        let handle = ctx.audio.load(&source).await;

        let mut guard = self.state.lock().await;
        let st = &mut *guard;
        st.book = Some(book);
        st.chapters = chapters;
        st.duration = duration;
        st.current_time = start_at;
        st.rate = rate;
        st.cursor.reset();
        st.cursor.update(&st.chapters, start_at);
        st.audio_loaded = true;
        let ready = match handle {
            Ok(handle) => {
                st.handle = Some(handle);
                st.phase = PlayerPhase::Ready;
                true
            }
            Err(e) => {
                tracing::error!(error = %e, %book_id, "failed to set up audio");
                st.phase = PlayerPhase::Error;
                st.error = Some(AUDIO_FAILED_MESSAGE.to_string());
                false
            }
        };
        drop(guard);

        if ready {
            *self.sync_slot() = Some(sync::spawn_sync(self.ctx.clone(), self.state.clone()));
            tracing::info!(%book_id, start_at, rate, "player ready");
        }
    }

    pub async fn snapshot(&self) -> PlayerSnapshot {
        let mut st = self.state.lock().await;
        st.refresh();
        st.snapshot()
    }

    /// Play when ready or paused, pause when playing. Pausing flushes progress.
    pub async fn toggle_play(&self) -> ClientResult<PlayerSnapshot> {
        let paused = {
            let mut st = self.state.lock().await;
            st.refresh();
            match st.phase {
                PlayerPhase::Ready | PlayerPhase::Paused => {
                    st.handle_mut()?.play()?;
                    st.phase = PlayerPhase::Playing;
                    false
                }
                PlayerPhase::Playing => {
                    st.handle_mut()?.pause()?;
                    st.refresh();
                    st.phase = PlayerPhase::Paused;
                    true
                }
                _ => return Err(ClientError::PlaybackSetup("Audio is not loaded".into())),
            }
        };
        if paused {
            sync::push_progress(&self.ctx, &self.state, false).await;
        }
        Ok(self.snapshot().await)
    }

    pub async fn seek(&self, position: f64) -> ClientResult<PlayerSnapshot> {
        let mut st = self.state.lock().await;
        st.seek_to(position)?;
        st.refresh();
        Ok(st.snapshot())
    }

    pub async fn skip_back(&self) -> ClientResult<PlayerSnapshot> {
        self.skip(-self.ctx.settings.skip_seconds).await
    }

    pub async fn skip_forward(&self) -> ClientResult<PlayerSnapshot> {
        self.skip(self.ctx.settings.skip_seconds).await
    }

    async fn skip(&self, offset: f64) -> ClientResult<PlayerSnapshot> {
        let mut st = self.state.lock().await;
        st.refresh();
        let target = rate::skip_target(st.current_time, offset, st.duration);
        st.seek_to(target)?;
        Ok(st.snapshot())
    }

    /// Advance the rate cycle and persist the new rate.
    pub async fn next_rate(&self) -> ClientResult<PlayerSnapshot> {
        let next = {
            let mut st = self.state.lock().await;
            let next = rate::next_playback_rate(st.rate);
            if let Some(handle) = st.handle.as_mut() {
                handle.set_rate(next)?;
            }
            st.rate = next;
            next
        };
        if let Err(e) = self.ctx.store.set_playback_rate(next).await {
            tracing::error!(error = %e, rate = next, "failed to persist playback rate");
        }
        Ok(self.snapshot().await)
    }

    /// Seek to the start of a chapter.
    pub async fn select_chapter(&self, chapter_id: &str) -> ClientResult<PlayerSnapshot> {
        let mut st = self.state.lock().await;
        let start = st
            .chapters
            .iter()
            .find(|c| c.id == chapter_id)
            .map(|c| c.start)
            .ok_or_else(|| ClientError::NotFound("Chapter not found".into()))?;
        st.seek_to(start)?;
        Ok(st.snapshot())
    }

    /// Stop syncing, push the final position and release the audio.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn close(&self) {
        self.stop_sync();
        let had_audio = self.state.lock().await.handle.is_some();
        if had_audio {
            sync::push_progress(&self.ctx, &self.state, false).await;
        }
        let mut st = self.state.lock().await;
        st.release_audio();
        *st = PlayerState::idle();
    }

    fn sync_slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.sync.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stop_sync(&self) {
        if let Some(task) = self.sync_slot().take() {
            task.abort();
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.stop_sync();
        if let Ok(mut st) = self.state.try_lock() {
            st.release_audio();
            return;
        }
        // a command or the aborting sync tick still holds the state
        let state = self.state.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    state.lock().await.release_audio();
                });
            }
            Err(_) => state.blocking_lock().release_audio(),
        }
    }
}
