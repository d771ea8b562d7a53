//! Error Module
//!
//! Defines error types and result types used throughout the WAL reaper.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the WAL reaper
#[derive(Error, Debug)]
pub enum ReaperError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("WAL root unreadable: {}: {reason}", .path.display())]
    WalRootUnreadable { path: PathBuf, reason: String },

    #[error("no segments found in {}", .0.display())]
    NoSegments(PathBuf),

    #[error("registry error: {0}")]
    Registry(String),

    #[error("cleanup error: {0}")]
    Cleanup(String),
}

impl From<std::io::Error> for ReaperError {
    fn from(err: std::io::Error) -> Self {
        ReaperError::Io(err.to_string())
    }
}

impl From<serde_yaml::Error> for ReaperError {
    fn from(err: serde_yaml::Error) -> Self {
        ReaperError::Config(err.to_string())
    }
}

/// Result type alias for the WAL reaper
pub type Result<T> = std::result::Result<T, ReaperError>;
