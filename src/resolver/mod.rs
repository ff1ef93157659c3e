use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::Config;
use crate::sources::ytdlp::{MetadataExtractor, YtDlp};
use crate::sources::{default_sources, CaptionSource, TranscriptSource};
use crate::video::{LanguagePreference, VideoId};
use crate::{CaptionError, ResolveError};

const NO_CAPTIONS: &str = "No captions available";

/// Transcript text for one video and the strategy that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResult {
    pub video_id: VideoId,
    /// Normalized transcript, never empty
    pub text: String,
    pub source: TranscriptSource,
}

/// Direct audio stream location for a video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioStream {
    pub video_id: VideoId,
    pub audio_url: String,
}

/// Tries each caption source in order until one yields text
pub struct TranscriptResolver {
    sources: Vec<Box<dyn CaptionSource>>,
    extractor: Arc<dyn MetadataExtractor>,
    languages: LanguagePreference,
}

impl TranscriptResolver {
    /// Create a resolver bound to the real network and yt-dlp
    pub fn new(config: &Config) -> crate::Result<Self> {
        let extractor: Arc<dyn MetadataExtractor> = Arc::new(YtDlp::new(&config.tools.yt_dlp_path));
        let sources = default_sources(config, extractor.clone())?;
        Ok(Self::with_sources(sources, extractor, config.languages()))
    }

    /// Create a resolver over an explicit strategy chain
    pub fn with_sources(
        sources: Vec<Box<dyn CaptionSource>>,
        extractor: Arc<dyn MetadataExtractor>,
        languages: LanguagePreference,
    ) -> Self {
        Self {
            sources,
            extractor,
            languages,
        }
    }

    /// Replace the language preference for subsequent resolutions
    pub fn set_languages(&mut self, languages: LanguagePreference) {
        self.languages = languages;
    }

    /// Resolve a URL or raw identifier to transcript text
    pub async fn resolve(&self, input: &str) -> Result<ResolutionResult, ResolveError> {
        let video_id = VideoId::extract(input)
            .ok_or_else(|| ResolveError::InvalidInput(input.to_string()))?;

        tracing::info!("Resolving transcript for video: {}", video_id);

        let mut last_detail: Option<String> = None;

        for source in &self.sources {
            tracing::info!("Trying caption source: {}", source.name());

            match source.fetch_transcript(&video_id, &self.languages).await {
                Ok(transcript) if !transcript.text.is_empty() => {
                    tracing::info!(
                        "Transcript found via {} ({} chars)",
                        transcript.source,
                        transcript.text.len()
                    );
                    return Ok(ResolutionResult {
                        video_id,
                        text: transcript.text,
                        source: transcript.source,
                    });
                }
                Ok(_) => {
                    tracing::warn!("{} returned empty text, moving on", source.name());
                }
                Err(e) if e.is_recoverable() => {
                    tracing::info!("{} found nothing: {}", source.name(), e);
                    if let Some(detail) = e.detail() {
                        last_detail = Some(detail);
                    }
                }
                Err(e) => {
                    tracing::warn!("{} failed unexpectedly: {}", source.name(), e);
                    return Err(ResolveError::Unexpected(e.to_string()));
                }
            }
        }

        Err(ResolveError::NotFound(
            last_detail.unwrap_or_else(|| NO_CAPTIONS.to_string()),
        ))
    }

    /// Look up the best audio-only stream URL through the extraction tool
    pub async fn resolve_audio_url(&self, input: &str) -> Result<AudioStream, ResolveError> {
        let video_id = VideoId::extract(input)
            .ok_or_else(|| ResolveError::InvalidInput(input.to_string()))?;

        if !self.extractor.is_available().await {
            return Err(ResolveError::ToolMissing(
                "yt-dlp not installed on this system".to_string(),
            ));
        }

        tracing::info!("Resolving audio stream for video: {}", video_id);

        match self.extractor.audio_url(&video_id).await {
            Ok(Some(audio_url)) => Ok(AudioStream {
                video_id,
                audio_url,
            }),
            Ok(None) => Err(ResolveError::NotFound("No audio stream found".to_string())),
            Err(CaptionError::ToolUnavailable(tool)) => Err(ResolveError::ToolMissing(format!(
                "{} is not available",
                tool
            ))),
            Err(e) => Err(ResolveError::Unexpected(e.to_string())),
        }
    }
}
