//! Error types surfaced by the backends and the player.

use thiserror::Error;

/// Every variant displays as the message a listener should see.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Login rejected or malformed login response
    #[error("{0}")]
    Auth(String),

    /// Non-2xx response from an authenticated endpoint
    #[error("{message}")]
    Fetch { status: u16, message: String },

    /// Expected top-level JSON fields are absent
    #[error("Invalid server response: {0}")]
    MalformedResponse(String),

    /// Requested id is unknown to the backend
    #[error("{0}")]
    NotFound(String),

    /// The audio resource failed to initialize
    #[error("{0}")]
    PlaybackSetup(String),

    /// No server connection or user is configured
    #[error("Not signed in")]
    NotSignedIn,

    /// Network-level failure (connect, timeout, body read)
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
