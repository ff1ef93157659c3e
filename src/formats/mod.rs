use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod json3;
pub mod vtt;

static VTT_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\x{FEFF}?WEBVTT[^\n]*\n").unwrap());

static INLINE_TIMESTAMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<\d{2}:\d{2}:\d{2}\.\d{3}>").unwrap());

static MARKUP_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?\w+[^>]*>").unwrap());

static KIND_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bKind:\s*\w+").unwrap());

static LANGUAGE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bLanguage:\s*[A-Za-z-]+").unwrap());

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// One unit of caption data. Only the order of segments matters downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub text: String,
    pub start_ms: u64,
    pub duration_ms: u64,
}

impl TranscriptSegment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            start_ms: 0,
            duration_ms: 0,
        }
    }
}

/// Join segments with single spaces, flattening embedded newlines
pub fn join_segments(segments: &[TranscriptSegment]) -> String {
    segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .replace('\n', " ")
        .trim()
        .to_string()
}

/// Raw caption encodings this crate can decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionFormat {
    /// Structured event JSON (`fmt=json3`)
    Json3,
    /// WebVTT cue text (`fmt=vtt`)
    Vtt,
}

impl CaptionFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptionFormat::Json3 => "json3",
            CaptionFormat::Vtt => "vtt",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json3" => Some(CaptionFormat::Json3),
            "vtt" => Some(CaptionFormat::Vtt),
            _ => None,
        }
    }

    /// Decode a raw document into normalized text. Empty means nothing usable.
    pub fn decode(&self, raw: &str) -> String {
        match self {
            CaptionFormat::Json3 => json3::decode(raw),
            CaptionFormat::Vtt => vtt::decode(raw),
        }
    }
}

impl fmt::Display for CaptionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strip subtitle headers and markup from raw caption text.
///
/// The cleanup runs until the text stops changing, so tag fragments that only
/// meet after an inner tag is removed (`<<b>i>`) are stripped as well and the
/// result is a fixed point.
pub fn normalize(raw: &str) -> String {
    let mut current = clean_once(raw);
    loop {
        let next = clean_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn clean_once(raw: &str) -> String {
    let text = VTT_HEADER.replace(raw, "");
    let text = INLINE_TIMESTAMP.replace_all(&text, "");
    let text = text.replace("<c>", "").replace("</c>", "");
    let text = MARKUP_TAG.replace_all(&text, "");
    let text = KIND_TOKEN.replace_all(&text, "");
    let text = LANGUAGE_TOKEN.replace_all(&text, "");
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_only_input_is_empty() {
        assert_eq!(normalize("WEBVTT\nKind: captions\nLanguage: en\n"), "");
        assert_eq!(normalize("\u{FEFF}webvtt\nKind: captions\nLanguage: en-US\n"), "");
    }

    #[test]
    fn test_strips_inline_markup() {
        assert_eq!(
            normalize("Hello<00:00:07.040><c> world</c> <i>again</i>"),
            "Hello world again"
        );
        assert_eq!(normalize("<c.colorE5E5E5>tinted</c>"), "tinted");
    }

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(normalize("  one \n\n two\t three  "), "one two three");
    }

    #[test]
    fn test_is_idempotent() {
        let samples = [
            "WEBVTT\nKind: captions\nLanguage: en\n\nHello <c>world</c>",
            "<<b>i>nested</i> tags",
            "WEBVTT x\nWEBVTT y\nbody",
            "Ki<b>nd: captions left",
            "plain text",
            "",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn test_join_segments() {
        let segments = vec![
            TranscriptSegment::new("first\nline"),
            TranscriptSegment::new("second"),
        ];
        assert_eq!(join_segments(&segments), "first line second");
        assert_eq!(join_segments(&[]), "");
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(CaptionFormat::from_extension("VTT"), Some(CaptionFormat::Vtt));
        assert_eq!(CaptionFormat::from_extension("json3"), Some(CaptionFormat::Json3));
        assert_eq!(CaptionFormat::from_extension("srv3"), None);
    }
}
