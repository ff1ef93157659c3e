//! Caption Resolver - fetch a YouTube transcript through a chain of fallback sources
//!
//! This library resolves a video URL or identifier to plain transcript text by trying
//! the structured caption API, then `yt-dlp`, then the raw `timedtext` endpoint, and
//! normalizing whatever format each one returns.

pub mod cli;
pub mod config;
pub mod formats;
pub mod output;
pub mod resolver;
pub mod sources;
pub mod utils;
pub mod video;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use resolver::{AudioStream, ResolutionResult, TranscriptResolver};
pub use sources::{CaptionSource, Transcript, TranscriptSource};
pub use video::{LanguagePreference, VideoId};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Failure of a single caption source or one of its attempts
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptionError {
    #[error("Subtitles are disabled for video {0}")]
    TranscriptsDisabled(String),

    #[error("No transcript found for video {video_id} in languages {languages:?}")]
    NoTranscriptFound {
        video_id: String,
        languages: Vec<String>,
    },

    #[error("Video {video_id} is unavailable: {reason}")]
    VideoUnavailable { video_id: String, reason: String },

    #[error("{0} is not available")]
    ToolUnavailable(String),

    #[error("Empty response from {0}")]
    EmptyResponse(String),

    #[error("Track in {0} cannot be translated")]
    NotTranslatable(String),

    #[error("No usable captions from {0}")]
    Exhausted(&'static str),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Failed to parse caption data: {0}")]
    Parse(String),

    #[error("{0}")]
    Unexpected(String),
}

impl CaptionError {
    /// Whether the resolver may move on to the next source after this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            CaptionError::Http(_) | CaptionError::Parse(_) | CaptionError::Unexpected(_)
        )
    }

    /// Specific detail worth reporting to the caller when every source fails.
    pub fn detail(&self) -> Option<String> {
        match self {
            CaptionError::TranscriptsDisabled(_)
            | CaptionError::NoTranscriptFound { .. }
            | CaptionError::VideoUnavailable { .. } => Some(self.to_string()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for CaptionError {
    fn from(err: reqwest::Error) -> Self {
        CaptionError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for CaptionError {
    fn from(err: serde_json::Error) -> Self {
        CaptionError::Parse(err.to_string())
    }
}

/// Terminal outcome of a resolution that produced no result
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Invalid YouTube URL/ID: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    ToolMissing(String),

    #[error("{0}")]
    Unexpected(String),
}

impl ResolveError {
    /// HTTP status class an HTTP front end should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            ResolveError::InvalidInput(_) => 400,
            ResolveError::NotFound(_) => 404,
            ResolveError::Unexpected(_) => 500,
            ResolveError::ToolMissing(_) => 501,
        }
    }

    /// Process exit code used by the `captions` binary
    pub fn exit_code(&self) -> i32 {
        match self {
            ResolveError::InvalidInput(_) => 2,
            ResolveError::NotFound(_) => 4,
            ResolveError::ToolMissing(_) => 5,
            ResolveError::Unexpected(_) => 1,
        }
    }
}
