//! Decoder for YouTube's structured event caption format (`fmt=json3`).

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::{normalize, TranscriptSegment};
use crate::CaptionError;

#[derive(Debug, Deserialize)]
struct EventDocument {
    events: Option<Vec<CaptionEvent>>,
}

#[derive(Debug, Deserialize)]
struct CaptionEvent {
    #[serde(rename = "tStartMs", default, deserialize_with = "lenient_millis")]
    start_ms: Option<u64>,
    #[serde(rename = "dDurationMs", default, deserialize_with = "lenient_millis")]
    duration_ms: Option<u64>,
    segs: Option<Vec<EventSegment>>,
}

#[derive(Debug, Deserialize)]
struct EventSegment {
    // Kept loose: non-string payloads are skipped, not rejected
    utf8: Option<Value>,
}

/// Timing is informational only; floats are truncated and anything else
/// (negative, non-numeric) is treated as absent rather than failing the document.
fn lenient_millis<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| {
        v.as_u64()
            .or_else(|| v.as_f64().filter(|ms| *ms >= 0.0).map(|ms| ms as u64))
    }))
}

/// Parse a json3 document into one segment per event that carries text.
///
/// Segment text is kept verbatim (including bare newline events) so that
/// concatenating every segment reproduces the document's text stream.
pub fn parse_segments(raw: &str) -> Result<Vec<TranscriptSegment>, CaptionError> {
    let document: EventDocument = serde_json::from_str(raw)?;

    let segments = document
        .events
        .unwrap_or_default()
        .into_iter()
        .filter_map(|event| {
            let segs = event.segs?;
            let text: String = segs
                .iter()
                .filter_map(|seg| seg.utf8.as_ref().and_then(Value::as_str))
                .collect();
            if text.is_empty() {
                return None;
            }
            Some(TranscriptSegment {
                text,
                start_ms: event.start_ms.unwrap_or(0),
                duration_ms: event.duration_ms.unwrap_or(0),
            })
        })
        .collect();

    Ok(segments)
}

/// Every `utf8` fragment in document order. Malformed input yields none.
pub fn fragments(raw: &str) -> Vec<String> {
    match parse_segments(raw) {
        Ok(segments) => segments.into_iter().map(|s| s.text).collect(),
        Err(e) => {
            tracing::debug!("Discarding malformed json3 document: {}", e);
            Vec::new()
        }
    }
}

/// Concatenate all fragments without separators, flatten newlines and normalize
pub fn decode(raw: &str) -> String {
    let text = fragments(raw).concat().replace('\n', " ");
    normalize(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_concatenates_without_separator() {
        let raw = r#"{"events":[{"segs":[{"utf8":"Hello"}]},{"segs":[{"utf8":" world"}]}]}"#;
        assert_eq!(decode(raw), "Hello world");
    }

    #[test]
    fn test_decode_flattens_newline_events() {
        let raw = r#"{"events":[
            {"tStartMs":0,"dDurationMs":1200,"segs":[{"utf8":"first"},{"utf8":" part"}]},
            {"tStartMs":1200,"segs":[{"utf8":"\n"}]},
            {"tStartMs":1300,"segs":[{"utf8":"second"}]}
        ]}"#;
        assert_eq!(decode(raw), "first part second");
    }

    #[test]
    fn test_irregular_timing_does_not_reject_document() {
        let raw = r#"{"events":[
            {"tStartMs":0,"dDurationMs":1500.0,"segs":[{"utf8":"Hello"}]},
            {"tStartMs":-20,"segs":[{"utf8":" world"}]},
            {"tStartMs":"soon","segs":[{"utf8":"!"}]}
        ]}"#;
        assert_eq!(decode(raw), "Hello world!");

        let segments = parse_segments(raw).unwrap();
        assert_eq!(segments[0].duration_ms, 1500);
        assert_eq!(segments[1].start_ms, 0);
    }

    #[test]
    fn test_skips_events_without_segments() {
        let raw = r#"{"wireMagic":"pb3","events":[{"tStartMs":0,"id":1},{"segs":[{"utf8":"only"},{"acAsrConf":0}]}]}"#;
        let segments = parse_segments(raw).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "only");
    }

    #[test]
    fn test_non_string_payload_is_ignored() {
        let raw = r#"{"events":[{"segs":[{"utf8":42},{"utf8":"kept"}]}]}"#;
        assert_eq!(decode(raw), "kept");
    }

    #[test]
    fn test_malformed_input_yields_nothing() {
        assert!(fragments("not json").is_empty());
        assert!(fragments(r#"{"events":"nope"}"#).is_empty());
        assert_eq!(decode(r#"{"events":null}"#), "");
        assert_eq!(decode(""), "");
    }

    #[test]
    fn test_markup_inside_segments_is_stripped() {
        let raw = r#"{"events":[{"segs":[{"utf8":"<i>styled</i> text"}]}]}"#;
        assert_eq!(decode(raw), "styled text");
    }
}
