//! Error types for session setup and configuration
//!
//! Nothing inside a tick returns an error; these cover the edges where the
//! host hands us surfaces and settings.

use std::io;

#[derive(thiserror::Error, Debug)]
pub enum GameError {
    #[error("invalid grid {width}x{height}: need at least 2 columns and 1 row")]
    InvalidGrid { width: i32, height: i32 },
    #[error("a round is already in progress")]
    RoundInProgress,
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
    #[error("settings parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, GameError>;
