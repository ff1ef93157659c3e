use async_trait::async_trait;
use std::sync::Arc;

use super::http::CaptionFetcher;
use super::{CaptionSource, Transcript, TranscriptSource};
use crate::formats::CaptionFormat;
use crate::video::{LanguagePreference, VideoId};
use crate::CaptionError;

/// Track kinds in request order: manual (no `kind` parameter), then speech recognition
const TRACK_KINDS: &[&str] = &["", "asr"];

const FORMATS: &[CaptionFormat] = &[CaptionFormat::Json3, CaptionFormat::Vtt];

/// Strategy (c): query the raw `api/timedtext` endpoint directly
pub struct TimedTextSource {
    fetcher: Arc<dyn CaptionFetcher>,
    base_url: String,
}

impl TimedTextSource {
    pub fn new(fetcher: Arc<dyn CaptionFetcher>, base_url: &str) -> Self {
        Self {
            fetcher,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `<base>/api/timedtext?v=<id>&lang=<code>[&kind=asr]&fmt=<json3|vtt>`
    pub fn endpoint_url(&self, video_id: &VideoId, lang: &str, kind: &str, format: CaptionFormat) -> String {
        let mut url = format!(
            "{}/api/timedtext?v={}&lang={}",
            self.base_url,
            urlencoding::encode(video_id.as_str()),
            urlencoding::encode(lang)
        );
        if !kind.is_empty() {
            url.push_str("&kind=");
            url.push_str(kind);
        }
        url.push_str("&fmt=");
        url.push_str(format.as_str());
        url
    }

    async fn try_endpoint(&self, url: &str, format: CaptionFormat) -> Result<String, CaptionError> {
        let raw = self.fetcher.get_text(url).await?;
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(CaptionError::EmptyResponse(url.to_string()));
        }
        let text = format.decode(raw);
        if text.is_empty() {
            return Err(CaptionError::EmptyResponse(url.to_string()));
        }
        Ok(text)
    }
}

#[async_trait]
impl CaptionSource for TimedTextSource {
    fn name(&self) -> &'static str {
        "timedtext"
    }

    async fn fetch_transcript(
        &self,
        video_id: &VideoId,
        languages: &LanguagePreference,
    ) -> Result<Transcript, CaptionError> {
        for lang in languages.iter() {
            for kind in TRACK_KINDS {
                for format in FORMATS {
                    let url = self.endpoint_url(video_id, lang, kind, *format);
                    match self.try_endpoint(&url, *format).await {
                        Ok(text) => return Ok(Transcript::new(text, TranscriptSource::Timedtext)),
                        Err(e) => tracing::debug!("timedtext miss: {}", e),
                    }
                }
            }
        }

        Err(CaptionError::Exhausted(self.name()))
    }
}
