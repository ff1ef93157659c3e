use anyhow::Result;
use serde::Serialize;
use std::path::Path;

use crate::cli::OutputFormat;
use crate::resolver::{AudioStream, ResolutionResult};

/// Anything the CLI prints: plain text form plus a JSON payload
pub trait Render: Serialize {
    fn plain_text(&self) -> &str;
}

impl Render for ResolutionResult {
    fn plain_text(&self) -> &str {
        &self.text
    }
}

impl Render for AudioStream {
    fn plain_text(&self) -> &str {
        &self.audio_url
    }
}

/// Render a result in the requested format
pub fn render<T: Render>(result: &T, format: &OutputFormat) -> Result<String> {
    let content = match format {
        OutputFormat::Text => result.plain_text().to_string(),
        OutputFormat::Json => serde_json::to_string_pretty(result)?,
    };
    Ok(content)
}

/// Save a result to file
pub async fn save_to_file<T: Render>(result: &T, path: &Path, format: &OutputFormat) -> Result<()> {
    let content = render(result, format)?;
    fs_err::write(path, content)?;
    Ok(())
}

/// Print a result to console
pub fn print_to_console<T: Render>(result: &T, format: &OutputFormat) -> Result<()> {
    let content = render(result, format)?;
    println!("{}", content);
    Ok(())
}
