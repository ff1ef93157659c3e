//! Decoder for WebVTT cue text (`fmt=vtt`).

use super::normalize;

/// Header and metadata lines that never carry cue text
const HEADER_PREFIXES: &[&str] = &["webvtt", "kind:", "language:"];

fn is_noise_line(line: &str) -> bool {
    if line.is_empty() || line.contains("-->") {
        return true;
    }
    if line.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    let lower = line.to_lowercase();
    HEADER_PREFIXES.iter().any(|prefix| lower.starts_with(prefix))
}

/// Normalized cue text lines in order
pub fn fragments(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !is_noise_line(line))
        .map(normalize)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Join all cue lines with single spaces
pub fn decode(raw: &str) -> String {
    fragments(raw).join(" ").trim().to_string()
}
