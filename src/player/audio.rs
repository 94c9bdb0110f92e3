//! Audio output seam.
//!
//! An [`AudioOutput`] prepares a stream and hands back a singly-owned
//! [`AudioHandle`]. The player unloads the handle before creating another one
//! and on every exit path. Rendering sound is up to the platform shell; the
//! crate ships [`SimulatedOutput`], a clock-driven handle that advances its
//! position in real time while playing.

use tokio::time::Instant;

use crate::error::{ClientError, ClientResult};

#[derive(Debug, Clone, PartialEq)]
pub struct AudioSource {
    pub uri: String,
    /// Seconds
    pub start_at: f64,
    pub rate: f64,
    /// Known media length in seconds, if any
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioStatus {
    pub position: f64,
    pub is_playing: bool,
}

#[async_trait::async_trait]
pub trait AudioOutput: Send + Sync {
    async fn load(&self, source: &AudioSource) -> ClientResult<Box<dyn AudioHandle>>;
}

pub trait AudioHandle: Send {
    fn play(&mut self) -> ClientResult<()>;
    fn pause(&mut self) -> ClientResult<()>;
    fn seek(&mut self, position: f64) -> ClientResult<()>;
    fn set_rate(&mut self, rate: f64) -> ClientResult<()>;
    fn status(&self) -> AudioStatus;
    fn unload(&mut self) -> ClientResult<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedOutput;

#[async_trait::async_trait]
impl AudioOutput for SimulatedOutput {
    async fn load(&self, source: &AudioSource) -> ClientResult<Box<dyn AudioHandle>> {
        if source.uri.trim().is_empty() {
            return Err(ClientError::PlaybackSetup("stream URL is empty".into()));
        }
        tracing::debug!(uri = %source.uri, start_at = source.start_at, rate = source.rate, "loading simulated audio");
        Ok(Box::new(ClockHandle {
            anchor: Instant::now(),
            anchor_position: source.start_at.max(0.0),
            rate: source.rate,
            playing: false,
            duration: source.duration.filter(|d| *d > 0.0),
            loaded: true,
        }))
    }
}

/// Position is `anchor_position + elapsed * rate` while playing.
#[derive(Debug)]
struct ClockHandle {
    anchor: Instant,
    anchor_position: f64,
    rate: f64,
    playing: bool,
    duration: Option<f64>,
    loaded: bool,
}

impl ClockHandle {
    fn position(&self) -> f64 {
        let raw = if self.playing {
            self.anchor_position + self.anchor.elapsed().as_secs_f64() * self.rate
        } else {
            self.anchor_position
        };
        match self.duration {
            Some(d) => raw.min(d),
            None => raw,
        }
    }

    fn finished(&self) -> bool {
        self.duration.is_some_and(|d| self.position() >= d)
    }

    /// Fold elapsed time into the anchor before changing playback parameters.
    fn rebase(&mut self) {
        self.anchor_position = self.position();
        self.anchor = Instant::now();
    }

    fn ensure_loaded(&self) -> ClientResult<()> {
        if self.loaded {
            Ok(())
        } else {
            Err(ClientError::PlaybackSetup("audio has been unloaded".into()))
        }
    }
}

impl AudioHandle for ClockHandle {
    fn play(&mut self) -> ClientResult<()> {
        self.ensure_loaded()?;
        self.rebase();
        self.playing = !self.finished();
        Ok(())
    }

    fn pause(&mut self) -> ClientResult<()> {
        self.ensure_loaded()?;
        self.rebase();
        self.playing = false;
        Ok(())
    }

    fn seek(&mut self, position: f64) -> ClientResult<()> {
        self.ensure_loaded()?;
        self.anchor = Instant::now();
        self.anchor_position = position.max(0.0);
        Ok(())
    }

    fn set_rate(&mut self, rate: f64) -> ClientResult<()> {
        self.ensure_loaded()?;
        self.rebase();
        self.rate = rate;
        Ok(())
    }

    fn status(&self) -> AudioStatus {
        AudioStatus {
            position: self.position(),
            is_playing: self.loaded && self.playing && !self.finished(),
        }
    }

    fn unload(&mut self) -> ClientResult<()> {
        self.rebase();
        self.playing = false;
        self.loaded = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn source(start_at: f64, rate: f64) -> AudioSource {
        AudioSource {
            uri: "https://example.com/a.mp3".into(),
            start_at,
            rate,
            duration: Some(100.0),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn clock_advances_only_while_playing() {
        let mut handle = SimulatedOutput.load(&source(10.0, 1.0)).await.unwrap();
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(handle.status().position, 10.0);

        handle.play().unwrap();
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(handle.status().position, 15.0);

        handle.pause().unwrap();
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(handle.status(), AudioStatus { position: 15.0, is_playing: false });
    }

    #[tokio::test(start_paused = true)]
    async fn rate_scales_progress_and_stops_at_end() {
        let mut handle = SimulatedOutput.load(&source(90.0, 2.0)).await.unwrap();
        handle.play().unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(handle.status().position, 94.0);
        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(handle.status(), AudioStatus { position: 100.0, is_playing: false });
    }

    #[tokio::test]
    async fn unloaded_handle_rejects_commands() {
        let mut handle = SimulatedOutput.load(&source(0.0, 1.0)).await.unwrap();
        handle.unload().unwrap();
        assert!(matches!(handle.play(), Err(ClientError::PlaybackSetup(_))));
    }

    #[tokio::test]
    async fn empty_uri_fails_setup() {
        let mut src = source(0.0, 1.0);
        src.uri = String::new();
        assert!(matches!(
            SimulatedOutput.load(&src).await,
            Err(ClientError::PlaybackSetup(_))
        ));
    }
}
