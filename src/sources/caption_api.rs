use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use super::http::CaptionFetcher;
use super::{CaptionSource, Transcript, TranscriptSource};
use crate::formats::{join_segments, json3, TranscriptSegment};
use crate::video::{LanguagePreference, VideoId};
use crate::CaptionError;

/// How a caption track was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Manual,
    Generated,
}

/// A single selectable transcript for one video
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionTrack {
    pub language_code: String,
    pub kind: TrackKind,
    /// Location of the caption document, without format parameters
    pub base_url: String,
    pub is_translatable: bool,
    /// Target language when this is a machine translation of `language_code`
    pub translated_to: Option<String>,
}

impl CaptionTrack {
    /// Derive a track that serves this one machine-translated into `language`
    pub fn translate(&self, language: &str) -> Result<CaptionTrack, CaptionError> {
        if !self.is_translatable {
            return Err(CaptionError::NotTranslatable(self.language_code.clone()));
        }
        Ok(CaptionTrack {
            translated_to: Some(language.to_string()),
            ..self.clone()
        })
    }

    /// URL of the json3 rendition, translated when requested
    pub fn fetch_url(&self) -> String {
        let separator = if self.base_url.contains('?') { '&' } else { '?' };
        let mut url = format!("{}{}fmt=json3", self.base_url, separator);
        if let Some(target) = &self.translated_to {
            url.push_str("&tlang=");
            url.push_str(&urlencoding::encode(target));
        }
        url
    }
}

/// Every caption track listed for a video, manual tracks first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackList {
    video_id: String,
    tracks: Vec<CaptionTrack>,
}

impl TrackList {
    pub fn new(video_id: &VideoId, tracks: Vec<CaptionTrack>) -> Self {
        let (mut manual, generated): (Vec<_>, Vec<_>) = tracks
            .into_iter()
            .partition(|t| t.kind == TrackKind::Manual);
        manual.extend(generated);
        Self {
            video_id: video_id.to_string(),
            tracks: manual,
        }
    }

    pub fn tracks(&self) -> &[CaptionTrack] {
        &self.tracks
    }

    pub fn language_codes(&self) -> Vec<String> {
        self.tracks.iter().map(|t| t.language_code.clone()).collect()
    }

    pub fn find_manual(&self, codes: &[String]) -> Result<&CaptionTrack, CaptionError> {
        self.find(codes, Some(TrackKind::Manual))
    }

    pub fn find_generated(&self, codes: &[String]) -> Result<&CaptionTrack, CaptionError> {
        self.find(codes, Some(TrackKind::Generated))
    }

    /// First code with any track, preferring a manual one for that code
    pub fn find_any(&self, codes: &[String]) -> Result<&CaptionTrack, CaptionError> {
        self.find(codes, None)
    }

    fn find(&self, codes: &[String], kind: Option<TrackKind>) -> Result<&CaptionTrack, CaptionError> {
        codes
            .iter()
            .find_map(|code| {
                self.tracks.iter().find(|t| {
                    &t.language_code == code && kind.map_or(true, |k| t.kind == k)
                })
            })
            .ok_or_else(|| CaptionError::NoTranscriptFound {
                video_id: self.video_id.clone(),
                languages: codes.to_vec(),
            })
    }
}

/// Structured caption listing interface of the platform
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CaptionApi: Send + Sync {
    /// Whether tracks can be listed; legacy interfaces only fetch by language
    fn supports_listing(&self) -> bool;

    async fn list_tracks(&self, video_id: &VideoId) -> Result<TrackList, CaptionError>;

    async fn fetch_track(&self, track: &CaptionTrack) -> Result<Vec<TranscriptSegment>, CaptionError>;

    /// Fetch the first track matching one of `languages`, or any track when empty
    async fn fetch_by_languages(
        &self,
        video_id: &VideoId,
        languages: &[String],
    ) -> Result<Vec<TranscriptSegment>, CaptionError>;
}

const INNERTUBE_CLIENT_NAME: &str = "WEB";
const INNERTUBE_CLIENT_VERSION: &str = "2.20250626.01.00";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    playability_status: Option<PlayabilityStatus>,
    captions: Option<Captions>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: Option<String>,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Captions {
    player_captions_tracklist_renderer: Option<TracklistRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TracklistRenderer {
    #[serde(default)]
    caption_tracks: Vec<RawTrack>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTrack {
    base_url: String,
    language_code: String,
    kind: Option<String>,
    #[serde(default)]
    is_translatable: bool,
}

/// Turn an innertube player response into the video's track list
pub fn parse_player_response(video_id: &VideoId, raw: &str) -> Result<TrackList, CaptionError> {
    let response: PlayerResponse = serde_json::from_str(raw)?;

    if let Some(playability) = &response.playability_status {
        let status = playability.status.as_deref().unwrap_or("OK");
        if status != "OK" {
            return Err(CaptionError::VideoUnavailable {
                video_id: video_id.to_string(),
                reason: playability
                    .reason
                    .clone()
                    .unwrap_or_else(|| status.to_lowercase()),
            });
        }
    }

    let raw_tracks = response
        .captions
        .and_then(|c| c.player_captions_tracklist_renderer)
        .map(|r| r.caption_tracks)
        .unwrap_or_default();

    if raw_tracks.is_empty() {
        return Err(CaptionError::TranscriptsDisabled(video_id.to_string()));
    }

    let tracks = raw_tracks
        .into_iter()
        .map(|t| CaptionTrack {
            language_code: t.language_code,
            kind: if t.kind.as_deref() == Some("asr") {
                TrackKind::Generated
            } else {
                TrackKind::Manual
            },
            base_url: t.base_url.replace("\\u0026", "&").replace("&fmt=srv3", ""),
            is_translatable: t.is_translatable,
            translated_to: None,
        })
        .collect();

    Ok(TrackList::new(video_id, tracks))
}

/// Production binding of [`CaptionApi`] backed by the innertube player endpoint
pub struct InnertubeApi {
    fetcher: Arc<dyn CaptionFetcher>,
    base_url: String,
    listing_enabled: bool,
}

impl InnertubeApi {
    pub fn new(fetcher: Arc<dyn CaptionFetcher>, base_url: &str, listing_enabled: bool) -> Self {
        Self {
            fetcher,
            base_url: base_url.trim_end_matches('/').to_string(),
            listing_enabled,
        }
    }

    fn player_request(video_id: &VideoId) -> serde_json::Value {
        serde_json::json!({
            "context": {
                "client": {
                    "clientName": INNERTUBE_CLIENT_NAME,
                    "clientVersion": INNERTUBE_CLIENT_VERSION,
                    "hl": "en"
                }
            },
            "videoId": video_id.as_str()
        })
    }
}

#[async_trait]
impl CaptionApi for InnertubeApi {
    fn supports_listing(&self) -> bool {
        self.listing_enabled
    }

    async fn list_tracks(&self, video_id: &VideoId) -> Result<TrackList, CaptionError> {
        let url = format!("{}/youtubei/v1/player", self.base_url);
        let body = self
            .fetcher
            .post_json(&url, &Self::player_request(video_id))
            .await?;
        parse_player_response(video_id, &body)
    }

    async fn fetch_track(&self, track: &CaptionTrack) -> Result<Vec<TranscriptSegment>, CaptionError> {
        let raw = self.fetcher.get_text(&track.fetch_url()).await?;
        if raw.trim().is_empty() {
            return Err(CaptionError::EmptyResponse(track.fetch_url()));
        }
        let segments = json3::parse_segments(&raw)?
            .into_iter()
            .filter(|s| !s.text.trim().is_empty())
            .collect();
        Ok(segments)
    }

    async fn fetch_by_languages(
        &self,
        video_id: &VideoId,
        languages: &[String],
    ) -> Result<Vec<TranscriptSegment>, CaptionError> {
        let list = self.list_tracks(video_id).await?;
        let track = if languages.is_empty() {
            list.find_any(&list.language_codes())?
        } else {
            list.find_any(languages)?
        };
        self.fetch_track(track).await
    }
}

/// Strategy (a): structured caption listing, tiered manual → generated → translated
pub struct CaptionApiSource {
    api: Box<dyn CaptionApi>,
    translation_language: String,
}

impl CaptionApiSource {
    pub fn new(api: Box<dyn CaptionApi>, translation_language: impl Into<String>) -> Self {
        Self {
            api,
            translation_language: translation_language.into(),
        }
    }

    async fn fetch_joined(&self, track: &CaptionTrack) -> Result<String, CaptionError> {
        let segments = self.api.fetch_track(track).await?;
        non_empty(join_segments(&segments), &track.language_code)
    }

    async fn from_listing(
        &self,
        video_id: &VideoId,
        languages: &LanguagePreference,
    ) -> Result<Transcript, CaptionError> {
        let list = self.api.list_tracks(video_id).await?;

        for code in languages.codes() {
            let attempt = match list.find_manual(std::slice::from_ref(code)) {
                Ok(track) => self.fetch_joined(track).await,
                Err(e) => Err(e),
            };
            match attempt {
                Ok(text) => return Ok(Transcript::new(text, TranscriptSource::Manual)),
                Err(e) => tracing::debug!("No manual transcript in {}: {}", code, e),
            }
        }

        for code in languages.codes() {
            let attempt = match list.find_generated(std::slice::from_ref(code)) {
                Ok(track) => self.fetch_joined(track).await,
                Err(e) => Err(e),
            };
            match attempt {
                Ok(text) => return Ok(Transcript::new(text, TranscriptSource::Auto)),
                Err(e) => tracing::debug!("No generated transcript in {}: {}", code, e),
            }
        }

        let translated = match list
            .find_any(&list.language_codes())
            .and_then(|track| track.translate(&self.translation_language))
        {
            Ok(track) => self.fetch_joined(&track).await,
            Err(e) => Err(e),
        };
        match translated {
            Ok(text) => return Ok(Transcript::new(text, TranscriptSource::Translated)),
            Err(e) => tracing::debug!(
                "Translation to {} unavailable: {}",
                self.translation_language,
                e
            ),
        }

        Err(CaptionError::Exhausted(self.name()))
    }

    async fn from_legacy(
        &self,
        video_id: &VideoId,
        languages: &LanguagePreference,
    ) -> Result<Transcript, CaptionError> {
        let mut attempts: Vec<Vec<String>> =
            languages.codes().iter().map(|code| vec![code.clone()]).collect();
        attempts.push(Vec::new());

        for attempt in attempts {
            let result = self
                .api
                .fetch_by_languages(video_id, &attempt)
                .await
                .and_then(|segments| non_empty(join_segments(&segments), &attempt.join(",")));
            match result {
                Ok(text) => return Ok(Transcript::new(text, TranscriptSource::Api)),
                Err(e) => tracing::debug!("Legacy fetch for {:?} failed: {}", attempt, e),
            }
        }

        Err(CaptionError::Exhausted(self.name()))
    }
}

fn non_empty(text: String, origin: &str) -> Result<String, CaptionError> {
    if text.is_empty() {
        Err(CaptionError::EmptyResponse(origin.to_string()))
    } else {
        Ok(text)
    }
}

#[async_trait]
impl CaptionSource for CaptionApiSource {
    fn name(&self) -> &'static str {
        "caption api"
    }

    async fn fetch_transcript(
        &self,
        video_id: &VideoId,
        languages: &LanguagePreference,
    ) -> Result<Transcript, CaptionError> {
        if self.api.supports_listing() {
            self.from_listing(video_id, languages).await
        } else {
            self.from_legacy(video_id, languages).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::http::MockCaptionFetcher;

    fn vid() -> VideoId {
        VideoId::parse("dQw4w9WgXcQ").unwrap()
    }

    fn track(code: &str, kind: TrackKind, translatable: bool) -> CaptionTrack {
        CaptionTrack {
            language_code: code.to_string(),
            kind,
            base_url: format!("https://www.youtube.com/api/timedtext?v=dQw4w9WgXcQ&lang={}", code),
            is_translatable: translatable,
            translated_to: None,
        }
    }

    fn segments(texts: &[&str]) -> Vec<TranscriptSegment> {
        texts.iter().map(|t| TranscriptSegment::new(*t)).collect()
    }

    fn langs(codes: &[&str]) -> LanguagePreference {
        LanguagePreference::new(codes.iter().copied())
    }

    #[test]
    fn test_track_list_orders_manual_first() {
        let list = TrackList::new(
            &vid(),
            vec![
                track("de", TrackKind::Generated, true),
                track("fr", TrackKind::Manual, true),
            ],
        );
        assert_eq!(list.language_codes(), vec!["fr".to_string(), "de".to_string()]);
    }

    #[test]
    fn test_find_any_prefers_manual_for_same_code() {
        let list = TrackList::new(
            &vid(),
            vec![
                track("en", TrackKind::Generated, true),
                track("en", TrackKind::Manual, true),
            ],
        );
        let found = list.find_any(&["en".to_string()]).unwrap();
        assert_eq!(found.kind, TrackKind::Manual);
        assert!(matches!(
            list.find_manual(&["hi".to_string()]),
            Err(CaptionError::NoTranscriptFound { .. })
        ));
    }

    #[test]
    fn test_translate_requires_translatable_track() {
        let source = track("de", TrackKind::Manual, false);
        assert_eq!(
            source.translate("en"),
            Err(CaptionError::NotTranslatable("de".to_string()))
        );

        let translated = track("de", TrackKind::Manual, true).translate("en").unwrap();
        assert!(translated.fetch_url().ends_with("&fmt=json3&tlang=en"));
    }

    #[test]
    fn test_parse_player_response_tracks() {
        let raw = r#"{
            "playabilityStatus": {"status": "OK"},
            "captions": {"playerCaptionsTracklistRenderer": {"captionTracks": [
                {"baseUrl": "https://www.youtube.com/api/timedtext?v=dQw4w9WgXcQ&lang=en&kind=asr", "languageCode": "en", "kind": "asr", "isTranslatable": true},
                {"baseUrl": "https://www.youtube.com/api/timedtext?v=dQw4w9WgXcQ&lang=de", "languageCode": "de"}
            ]}}
        }"#;
        let list = parse_player_response(&vid(), raw).unwrap();
        let tracks = list.tracks();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].language_code, "de");
        assert_eq!(tracks[0].kind, TrackKind::Manual);
        assert!(!tracks[0].is_translatable);
        assert_eq!(tracks[1].kind, TrackKind::Generated);
        assert!(tracks[1].base_url.contains("&lang=en&kind=asr"));
    }

    #[test]
    fn test_parse_player_response_errors() {
        let unplayable = r#"{"playabilityStatus": {"status": "ERROR", "reason": "Video unavailable"}}"#;
        assert!(matches!(
            parse_player_response(&vid(), unplayable),
            Err(CaptionError::VideoUnavailable { .. })
        ));

        let no_captions = r#"{"playabilityStatus": {"status": "OK"}}"#;
        assert_eq!(
            parse_player_response(&vid(), no_captions),
            Err(CaptionError::TranscriptsDisabled("dQw4w9WgXcQ".to_string()))
        );

        assert!(matches!(
            parse_player_response(&vid(), "<html>"),
            Err(CaptionError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_innertube_fetch_track_drops_blank_segments() {
        let mut fetcher = MockCaptionFetcher::new();
        fetcher
            .expect_get_text()
            .withf(|url| url.ends_with("&lang=en&fmt=json3"))
            .returning(|_| {
                Ok(r#"{"events":[{"segs":[{"utf8":"one"}]},{"segs":[{"utf8":"\n"}]},{"segs":[{"utf8":"two"}]}]}"#.to_string())
            });

        let api = InnertubeApi::new(Arc::new(fetcher), "https://www.youtube.com/", true);
        let segs = api
            .fetch_track(&track("en", TrackKind::Manual, true))
            .await
            .unwrap();
        assert_eq!(join_segments(&segs), "one two");
    }

    #[tokio::test]
    async fn test_innertube_lists_through_player_endpoint() {
        let mut fetcher = MockCaptionFetcher::new();
        fetcher
            .expect_post_json()
            .withf(|url, body| {
                url == "https://www.youtube.com/youtubei/v1/player" && body["videoId"] == "dQw4w9WgXcQ"
            })
            .returning(|_, _| Ok(r#"{"playabilityStatus":{"status":"LOGIN_REQUIRED"}}"#.to_string()));

        let api = InnertubeApi::new(Arc::new(fetcher), "https://www.youtube.com", true);
        let err = api.list_tracks(&vid()).await.unwrap_err();
        assert_eq!(
            err,
            CaptionError::VideoUnavailable {
                video_id: "dQw4w9WgXcQ".to_string(),
                reason: "login_required".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_manual_track_in_first_language_wins() {
        let mut api = MockCaptionApi::new();
        api.expect_supports_listing().return_const(true);
        api.expect_list_tracks().returning(|id| {
            Ok(TrackList::new(
                id,
                vec![
                    track("en", TrackKind::Generated, true),
                    track("en", TrackKind::Manual, true),
                ],
            ))
        });
        api.expect_fetch_track()
            .withf(|t| t.kind == TrackKind::Manual && t.language_code == "en")
            .times(1)
            .returning(|_| Ok(segments(&["Never gonna", "give you up"])));

        let source = CaptionApiSource::new(Box::new(api), "en");
        let transcript = source
            .fetch_transcript(&vid(), &langs(&["en", "hi"]))
            .await
            .unwrap();
        assert_eq!(transcript.text, "Never gonna give you up");
        assert_eq!(transcript.source, TranscriptSource::Manual);
    }

    #[tokio::test]
    async fn test_failed_manual_fetch_falls_to_generated() {
        let mut api = MockCaptionApi::new();
        api.expect_supports_listing().return_const(true);
        api.expect_list_tracks().returning(|id| {
            Ok(TrackList::new(
                id,
                vec![
                    track("hi", TrackKind::Manual, true),
                    track("en", TrackKind::Generated, true),
                ],
            ))
        });
        api.expect_fetch_track()
            .withf(|t| t.kind == TrackKind::Manual)
            .returning(|_| Err(CaptionError::Http("HTTP 500".into())));
        api.expect_fetch_track()
            .withf(|t| t.kind == TrackKind::Generated)
            .returning(|_| Ok(segments(&["auto text"])));

        let source = CaptionApiSource::new(Box::new(api), "en");
        let transcript = source
            .fetch_transcript(&vid(), &langs(&["en", "hi"]))
            .await
            .unwrap();
        assert_eq!(transcript.source, TranscriptSource::Auto);
        assert_eq!(transcript.text, "auto text");
    }

    #[tokio::test]
    async fn test_translates_when_no_preferred_language_exists() {
        let mut api = MockCaptionApi::new();
        api.expect_supports_listing().return_const(true);
        api.expect_list_tracks().returning(|id| {
            Ok(TrackList::new(id, vec![track("de", TrackKind::Generated, true)]))
        });
        api.expect_fetch_track()
            .withf(|t| t.translated_to.as_deref() == Some("en"))
            .returning(|_| Ok(segments(&["translated"])));

        let source = CaptionApiSource::new(Box::new(api), "en");
        let transcript = source
            .fetch_transcript(&vid(), &langs(&["en"]))
            .await
            .unwrap();
        assert_eq!(transcript.source, TranscriptSource::Translated);
    }

    #[tokio::test]
    async fn test_exhausted_when_nothing_is_usable() {
        let mut api = MockCaptionApi::new();
        api.expect_supports_listing().return_const(true);
        api.expect_list_tracks().returning(|id| {
            Ok(TrackList::new(id, vec![track("de", TrackKind::Manual, false)]))
        });

        let source = CaptionApiSource::new(Box::new(api), "en");
        let err = source
            .fetch_transcript(&vid(), &langs(&["en"]))
            .await
            .unwrap_err();
        assert_eq!(err, CaptionError::Exhausted("caption api"));
    }

    #[tokio::test]
    async fn test_listing_error_propagates() {
        let mut api = MockCaptionApi::new();
        api.expect_supports_listing().return_const(true);
        api.expect_list_tracks()
            .returning(|id| Err(CaptionError::TranscriptsDisabled(id.to_string())));

        let source = CaptionApiSource::new(Box::new(api), "en");
        let err = source
            .fetch_transcript(&vid(), &langs(&["en"]))
            .await
            .unwrap_err();
        assert!(matches!(err, CaptionError::TranscriptsDisabled(_)));
    }

    #[tokio::test]
    async fn test_legacy_interface_tries_each_language_then_any() {
        let mut api = MockCaptionApi::new();
        api.expect_supports_listing().return_const(false);
        api.expect_fetch_by_languages()
            .withf(|id, languages| id.as_str() == "dQw4w9WgXcQ" && languages == ["en".to_string()])
            .times(1)
            .returning(|_, _| Err(CaptionError::NoTranscriptFound {
                video_id: "dQw4w9WgXcQ".into(),
                languages: vec!["en".into()],
            }));
        api.expect_fetch_by_languages()
            .withf(|_, languages| languages.is_empty())
            .times(1)
            .returning(|_, _| Ok(segments(&["whatever", "exists"])));

        let source = CaptionApiSource::new(Box::new(api), "en");
        let transcript = source
            .fetch_transcript(&vid(), &langs(&["en"]))
            .await
            .unwrap();
        assert_eq!(transcript.source, TranscriptSource::Api);
        assert_eq!(transcript.text, "whatever exists");
    }
}
