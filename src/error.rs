// Error types for the playback core
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the playback core.
///
/// An out-of-range track index is deliberately not represented here: selecting
/// a bad index is a no-op reported through a status event, never a failure.
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    /// The requested track was not cached and the on-demand decode failed too.
    #[error("no cached sound for {path} and on-demand decode failed: {reason}")]
    CacheMissFallback { path: PathBuf, reason: String },

    /// A preload batch is already running; retry after it finishes.
    #[error("a preload batch is already in flight")]
    PreloadBusy,

    #[error("failed to start preload thread: {0}")]
    PreloadSpawn(String),

    #[error("no audio output device available")]
    NoOutputDevice,

    #[error("audio stream error: {0}")]
    Stream(String),

    #[error("unsupported output sample format: {0}")]
    UnsupportedFormat(String),
}
