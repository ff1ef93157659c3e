use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Deserialize;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;

use super::http::CaptionFetcher;
use super::{CaptionSource, Transcript, TranscriptSource};
use crate::formats::CaptionFormat;
use crate::utils;
use crate::video::{LanguagePreference, VideoId};
use crate::CaptionError;

/// One downloadable rendition of a subtitle track as reported by yt-dlp
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SubtitleFormat {
    pub ext: Option<String>,
    pub url: Option<String>,
}

/// Language code → renditions, in the tool's own order
pub type SubtitleMap = IndexMap<String, Vec<SubtitleFormat>>;

/// Caption section of yt-dlp's `--dump-json` output
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CaptionCatalog {
    #[serde(default)]
    pub subtitles: Option<SubtitleMap>,
    #[serde(default)]
    pub automatic_captions: Option<SubtitleMap>,
}

impl CaptionCatalog {
    /// Manual subtitles first, then automatic captions
    pub fn categories(&self) -> Vec<(&'static str, &SubtitleMap)> {
        let mut categories = Vec::new();
        if let Some(manual) = &self.subtitles {
            categories.push(("subtitles", manual));
        }
        if let Some(auto) = &self.automatic_captions {
            categories.push(("automatic_captions", auto));
        }
        categories
    }
}

/// Metadata extraction tool run in no-download mode
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    /// Check whether the tool can be run in this environment
    async fn is_available(&self) -> bool;

    /// Subtitle and automatic caption listings for the video
    async fn caption_catalog(&self, video_id: &VideoId) -> Result<CaptionCatalog, CaptionError>;

    /// Direct URL of the best audio-only stream, if the video has one
    async fn audio_url(&self, video_id: &VideoId) -> Result<Option<String>, CaptionError>;
}

/// yt-dlp's complaint when a format selector matches nothing
const FORMAT_UNAVAILABLE: &str = "Requested format is not available";

/// yt-dlp command-line binding
pub struct YtDlp {
    yt_dlp_path: String,
}

impl YtDlp {
    pub fn new(yt_dlp_path: impl Into<String>) -> Self {
        Self {
            yt_dlp_path: yt_dlp_path.into(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<Vec<u8>, CaptionError> {
        let output = Command::new(&self.yt_dlp_path)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| CaptionError::ToolUnavailable(format!("{} ({})", self.yt_dlp_path, e)))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(CaptionError::Unexpected(format!("yt-dlp failed: {}", error.trim())));
        }

        Ok(output.stdout)
    }
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

#[async_trait]
impl MetadataExtractor for YtDlp {
    async fn is_available(&self) -> bool {
        utils::check_command_available(&self.yt_dlp_path).await
    }

    async fn caption_catalog(&self, video_id: &VideoId) -> Result<CaptionCatalog, CaptionError> {
        tracing::debug!("Extracting caption catalog for: {}", video_id);

        let watch_url = video_id.watch_url();
        let stdout = self
            .run(&[
                "--dump-json",
                "--skip-download",
                "--no-playlist",
                "--no-check-certificates",
                "--quiet",
                "--no-warnings",
                &watch_url,
            ])
            .await?;

        let catalog: CaptionCatalog = serde_json::from_slice(&stdout)?;
        Ok(catalog)
    }

    async fn audio_url(&self, video_id: &VideoId) -> Result<Option<String>, CaptionError> {
        tracing::debug!("Getting audio URL for: {}", video_id);

        let watch_url = video_id.watch_url();
        let result = self
            .run(&[
                "--get-url",
                "--format",
                "bestaudio",
                "--no-playlist",
                "--quiet",
                "--no-warnings",
                &watch_url,
            ])
            .await;
        let stdout = match result {
            Err(e) if is_format_unavailable(&e) => {
                tracing::debug!("No audio-only stream for {}: {}", video_id, e);
                return Ok(None);
            }
            other => other?,
        };

        let url = String::from_utf8_lossy(&stdout)
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string);
        Ok(url)
    }
}

fn is_format_unavailable(error: &CaptionError) -> bool {
    matches!(error, CaptionError::Unexpected(message) if message.contains(FORMAT_UNAVAILABLE))
}

/// Preferred languages present in `available`, then the rest in their listed order
pub fn ordered_languages<'a>(
    preferred: &LanguagePreference,
    available: &'a SubtitleMap,
) -> Vec<&'a str> {
    let mut languages: Vec<&'a str> = preferred
        .iter()
        .filter_map(|code| available.get_key_value(code).map(|(key, _)| key.as_str()))
        .collect();
    for code in available.keys() {
        if !languages.contains(&code.as_str()) {
            languages.push(code.as_str());
        }
    }
    languages
}

fn format_rank(format: &SubtitleFormat) -> u8 {
    match format.ext.as_deref().and_then(CaptionFormat::from_extension) {
        Some(CaptionFormat::Vtt) => 0,
        Some(CaptionFormat::Json3) => 1,
        None => 2,
    }
}

/// Renditions sorted vtt first, then json3, then everything else (stable)
pub fn sorted_formats(formats: &[SubtitleFormat]) -> Vec<&SubtitleFormat> {
    let mut sorted: Vec<&SubtitleFormat> = formats.iter().collect();
    sorted.sort_by_key(|f| format_rank(f));
    sorted
}

/// Strategy (b): ask yt-dlp where the captions live, then download and decode them
pub struct YtDlpSource {
    extractor: Arc<dyn MetadataExtractor>,
    fetcher: Arc<dyn CaptionFetcher>,
}

impl YtDlpSource {
    pub fn new(extractor: Arc<dyn MetadataExtractor>, fetcher: Arc<dyn CaptionFetcher>) -> Self {
        Self { extractor, fetcher }
    }

    async fn fetch_format(&self, format: &SubtitleFormat) -> Result<String, CaptionError> {
        let ext = format.ext.as_deref().unwrap_or_default();
        let decoder = CaptionFormat::from_extension(ext)
            .ok_or_else(|| CaptionError::Parse(format!("unsupported subtitle format '{}'", ext)))?;
        let url = format
            .url
            .as_deref()
            .ok_or_else(|| CaptionError::Parse(format!("{} rendition without URL", ext)))?;

        let raw = self.fetcher.get_text(url).await?;
        if raw.trim().is_empty() {
            return Err(CaptionError::EmptyResponse(url.to_string()));
        }

        let text = decoder.decode(&raw);
        if text.is_empty() {
            return Err(CaptionError::EmptyResponse(url.to_string()));
        }
        Ok(text)
    }
}

#[async_trait]
impl CaptionSource for YtDlpSource {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn fetch_transcript(
        &self,
        video_id: &VideoId,
        languages: &LanguagePreference,
    ) -> Result<Transcript, CaptionError> {
        if !self.extractor.is_available().await {
            return Err(CaptionError::ToolUnavailable("yt-dlp".to_string()));
        }

        let catalog = match self.extractor.caption_catalog(video_id).await {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::debug!("yt-dlp could not list captions: {}", e);
                return Err(CaptionError::Exhausted(self.name()));
            }
        };

        for (category, tracks) in catalog.categories() {
            for language in ordered_languages(languages, tracks) {
                let formats = tracks.get(language).map(Vec::as_slice).unwrap_or_default();
                for format in sorted_formats(formats) {
                    match self.fetch_format(format).await {
                        Ok(text) => {
                            tracing::debug!(
                                "yt-dlp {} {} ({}) produced text",
                                category,
                                language,
                                format.ext.as_deref().unwrap_or("?")
                            );
                            return Ok(Transcript::new(text, TranscriptSource::Ytdlp));
                        }
                        Err(e) => tracing::debug!(
                            "Skipping {} {} rendition: {}",
                            category,
                            language,
                            e
                        ),
                    }
                }
            }
        }

        Err(CaptionError::Exhausted(self.name()))
    }
}
