use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub mod caption_api;
pub mod http;
pub mod timedtext;
pub mod ytdlp;

use crate::config::Config;
use crate::video::{LanguagePreference, VideoId};
use crate::CaptionError;

/// Which strategy produced a transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptSource {
    Manual,
    Auto,
    Translated,
    Api,
    Ytdlp,
    Timedtext,
}

impl TranscriptSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptSource::Manual => "manual",
            TranscriptSource::Auto => "auto",
            TranscriptSource::Translated => "translated",
            TranscriptSource::Api => "api",
            TranscriptSource::Ytdlp => "ytdlp",
            TranscriptSource::Timedtext => "timedtext",
        }
    }
}

impl fmt::Display for TranscriptSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clean transcript text together with the strategy that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub text: String,
    pub source: TranscriptSource,
}

impl Transcript {
    pub fn new(text: impl Into<String>, source: TranscriptSource) -> Self {
        Self {
            text: text.into(),
            source,
        }
    }
}

/// One fallback strategy for obtaining captions
#[async_trait]
pub trait CaptionSource: Send + Sync {
    /// Name of the source (for logging)
    fn name(&self) -> &'static str;

    /// Produce non-empty transcript text or explain why this source has none
    async fn fetch_transcript(
        &self,
        video_id: &VideoId,
        languages: &LanguagePreference,
    ) -> Result<Transcript, CaptionError>;
}

/// Build the production strategy chain in priority order
pub fn default_sources(
    config: &Config,
    extractor: Arc<dyn ytdlp::MetadataExtractor>,
) -> crate::Result<Vec<Box<dyn CaptionSource>>> {
    let fetcher: Arc<dyn http::CaptionFetcher> = Arc::new(http::HttpFetcher::new(&config.network)?);

    let api = caption_api::InnertubeApi::new(
        fetcher.clone(),
        &config.network.base_url,
        config.tools.track_listing,
    );

    let sources: Vec<Box<dyn CaptionSource>> = vec![
        Box::new(caption_api::CaptionApiSource::new(
            Box::new(api),
            config.captions.translation_language.clone(),
        )),
        Box::new(ytdlp::YtDlpSource::new(extractor, fetcher.clone())),
        Box::new(timedtext::TimedTextSource::new(
            fetcher,
            &config.network.base_url,
        )),
    ];
    Ok(sources)
}
