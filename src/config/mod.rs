use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

use crate::video::LanguagePreference;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Caption selection settings
    #[serde(default)]
    pub captions: CaptionConfig,

    /// HTTP settings shared by every source
    #[serde(default)]
    pub network: NetworkConfig,

    /// External tool settings
    #[serde(default)]
    pub tools: ToolConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionConfig {
    /// Language codes, most preferred first
    pub preferred_languages: Vec<String>,

    /// Target language when falling back to a machine translation
    pub translation_language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Platform origin used for the player and timedtext endpoints
    pub base_url: String,

    /// Timeout for each HTTP request, in seconds
    pub timeout_secs: u64,

    pub user_agent: String,

    pub accept_language: String,

    pub referer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// yt-dlp executable name or path
    pub yt_dlp_path: String,

    /// List caption tracks before fetching; when off, fetch by language only
    pub track_listing: bool,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            preferred_languages: LanguagePreference::default().codes().to_vec(),
            translation_language: "en".to_string(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.youtube.com".to_string(),
            timeout_secs: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            referer: "https://www.youtube.com/".to_string(),
        }
    }
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
            track_listing: true,
        }
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;

            let config = Self::from_yaml(&content)?;
            tracing::debug!("Loaded configuration from {}", config_path.display());
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate a YAML document
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)
            .context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<PathBuf> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(&config_path, content)
            .context("Failed to write config file")?;

        Ok(config_path)
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("captions.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("caption-resolver").join("config.yaml"))
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.languages().is_empty() {
            anyhow::bail!("At least one preferred language must be configured");
        }

        if self.captions.translation_language.trim().is_empty() {
            anyhow::bail!("Translation language must not be empty");
        }

        if self.network.timeout_secs == 0 {
            anyhow::bail!("Network timeout must be at least one second");
        }

        Url::parse(&self.network.base_url)
            .with_context(|| format!("Invalid base URL: {}", self.network.base_url))?;

        Ok(())
    }

    /// Preferred languages as an ordered preference
    pub fn languages(&self) -> LanguagePreference {
        LanguagePreference::new(self.captions.preferred_languages.iter().cloned())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Preferred Languages: {}", self.captions.preferred_languages.join(", "));
        println!("  Translation Language: {}", self.captions.translation_language);
        println!("  Base URL: {}", self.network.base_url);
        println!("  Timeout: {}s", self.network.timeout_secs);
        println!("  yt-dlp: {}", self.tools.yt_dlp_path);
        println!("  Track Listing: {}", self.tools.track_listing);
    }
}
