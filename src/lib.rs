//! Audiobookshelf listening client core: server API access with a demo mode,
//! a playback session tracker with periodic progress sync, and persisted
//! server/player state.

pub mod abs_client;
pub mod app;
pub mod app_api;
pub mod backend;
pub mod config;
pub mod domain;
pub mod error;
pub mod library;
pub mod player;
pub mod storage;

pub use app::AppContext;
pub use error::{ClientError, ClientResult};
