use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

static VIDEO_ID_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z0-9_-]{11}").unwrap());

static VIDEO_ID_EXACT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").unwrap());

/// Primary domain and its restricted-mode variant
const WATCH_HOSTS: &[&str] = &["youtube.com", "youtube-nocookie.com"];

const SHORT_LINK_HOST: &str = "youtu.be";

/// Canonical 11-character YouTube video identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    /// Accept a candidate only if it is exactly one identifier token
    pub fn parse(candidate: &str) -> Option<Self> {
        let candidate = candidate.trim();
        VIDEO_ID_EXACT
            .is_match(candidate)
            .then(|| Self(candidate.to_string()))
    }

    /// Derive an identifier from a URL or any string that embeds one
    pub fn extract(input: &str) -> Option<Self> {
        match Url::parse(input.trim()) {
            Ok(url) if platform_host(&url).is_some() => Self::from_url(&url),
            _ => Self::scan(input),
        }
    }

    /// Platform URLs are only searched below the host, which is itself
    /// long enough to pass for an identifier (`youtube-nocookie`).
    fn from_url(url: &Url) -> Option<Self> {
        let host = platform_host(url)?;

        let direct = if host == SHORT_LINK_HOST {
            url.path_segments()
                .and_then(|mut segments| segments.next())
                .and_then(Self::parse)
        } else {
            url.query_pairs()
                .find(|(key, _)| key == "v")
                .and_then(|(_, value)| Self::parse(&value))
        };

        direct.or_else(|| {
            let below_host = format!("{}?{}", url.path(), url.query().unwrap_or_default());
            Self::scan(&below_host)
        })
    }

    fn scan(text: &str) -> Option<Self> {
        VIDEO_ID_RUN
            .find(text)
            .map(|m| Self(m.as_str().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Watch page URL handed to external tools
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn platform_host(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    let known = host == SHORT_LINK_HOST || WATCH_HOSTS.iter().any(|domain| host.contains(domain));
    known.then_some(host)
}

/// Ordered language codes, most preferred first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguagePreference(Vec<String>);

impl LanguagePreference {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            codes
                .into_iter()
                .map(Into::into)
                .map(|code: String| code.trim().to_string())
                .filter(|code| !code.is_empty())
                .collect(),
        )
    }

    pub fn codes(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for LanguagePreference {
    fn default() -> Self {
        Self::new(["en", "en-US", "en-GB", "hi", "hi-IN"])
    }
}
