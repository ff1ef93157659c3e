use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use caption_resolver::cli::{Cli, Commands};
use caption_resolver::config::Config;
use caption_resolver::video::LanguagePreference;
use caption_resolver::{output, utils, ResolveError, TranscriptResolver};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "caption_resolver=debug"
    } else {
        "caption_resolver=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load().await?;

    match cli.command {
        Commands::Transcript {
            url,
            output,
            format,
            languages,
        } => {
            let mut resolver = TranscriptResolver::new(&config)?;
            if let Some(codes) = languages {
                let preference = LanguagePreference::new(codes);
                if !preference.is_empty() {
                    resolver.set_languages(preference);
                }
            }

            let spinner = spinner(cli.quiet, "Looking for captions...");
            let result = resolver.resolve(&url).await;
            spinner.finish_and_clear();

            let result = result.unwrap_or_else(|e| exit_with(e));
            tracing::info!("Resolved {} from source '{}'", result.video_id, result.source);

            match output {
                Some(path) => {
                    output::save_to_file(&result, &path, &format).await?;
                    println!("Transcript saved to: {}", path.display());
                }
                None => {
                    output::print_to_console(&result, &format)?;
                }
            }
        }
        Commands::AudioUrl { url, format } => {
            let missing = utils::check_dependencies(&config.tools.yt_dlp_path).await;
            for dep in &missing {
                tracing::warn!("Missing dependency: {}", dep);
            }

            let resolver = TranscriptResolver::new(&config)?;

            let spinner = spinner(cli.quiet, "Resolving audio stream...");
            let stream = resolver.resolve_audio_url(&url).await;
            spinner.finish_and_clear();

            let stream = stream.unwrap_or_else(|e| exit_with(e));
            output::print_to_console(&stream, &format)?;
        }
        Commands::Config { show, init } => {
            if init {
                let path = Config::default().save().await?;
                println!("Default configuration written to: {}", path.display());
            } else if show {
                config.display();
            } else {
                println!("Configuration file: {}", Config::config_path()?.display());
                println!("Use --show to print it or --init to write the defaults.");
            }
        }
    }

    Ok(())
}

fn spinner(quiet: bool, message: &'static str) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    progress.set_message(message);
    progress.enable_steady_tick(std::time::Duration::from_millis(120));
    progress
}

fn exit_with(error: ResolveError) -> ! {
    eprintln!("Error: {}", error);
    std::process::exit(error.exit_code());
}
