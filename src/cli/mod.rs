use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "captions",
    about = "Caption Resolver - Fetch YouTube transcripts through a chain of fallback sources",
    version,
    long_about = "Fetches the transcript of a YouTube video by trying the structured caption API, then yt-dlp, then the raw timedtext endpoint, and prints it as clean plain text."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch the transcript of a video
    Transcript {
        /// YouTube URL (watch, youtube-nocookie or youtu.be) or bare video ID
        #[arg(value_name = "URL_OR_ID")]
        url: String,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Preferred caption languages, most preferred first (overrides config)
        #[arg(short, long, value_name = "LANGS", value_delimiter = ',', env = "CAPTIONS_LANGUAGES")]
        languages: Option<Vec<String>>,
    },

    /// Resolve a direct audio stream URL for a video (requires yt-dlp)
    AudioUrl {
        /// YouTube URL or bare video ID
        #[arg(value_name = "URL_OR_ID")]
        url: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show or initialize the configuration file
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,

        /// Write the default configuration file
        #[arg(long)]
        init: bool,
    },
}

#[derive(ValueEnum, Clone, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain text
    Text,
    /// JSON with video ID and source
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
