use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use youtube_transcriber::api::{self, AppState};
use youtube_transcriber::cli::LogFormat;
use youtube_transcriber::output;
use youtube_transcriber::utils;
use youtube_transcriber::{BatchEvent, Cli, Commands, Config, OutputFormat, TranscriptRecord};

fn init_tracing(verbose: bool, format: LogFormat) {
    let default_filter = if verbose {
        "youtube_transcriber=debug,tower_http=debug"
    } else {
        "youtube_transcriber=info,tower_http=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    let mut config = Config::load(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            config.validate()?;

            let missing = utils::check_dependencies(&config).await;
            for dep in &missing {
                tracing::warn!("Missing dependency: {}", dep);
            }

            api::serve(&config).await?;
        }
        Commands::Detect { url } => {
            let url = utils::validate_and_normalize_url(&url)?;
            let state = AppState::from_config(&config);

            let result = state.classifier.classify(&url).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Transcribe {
            url,
            output,
            format,
            timestamps,
        } => {
            let url = utils::validate_and_normalize_url(&url)?;
            let state = AppState::from_config(&config);

            tracing::info!("Starting transcription for URL: {}", url);
            let spinner = spinner("Fetching transcript...")?;
            let record = state.pipeline.get_transcript(&url).await;
            spinner.finish_and_clear();
            let record = record?;

            match output {
                Some(path) => {
                    let path = resolve_output_path(&path, &record.title, &format);
                    output::save_to_file(&record, &path, &format, timestamps).await?;
                    println!("Transcript saved to: {}", path.display());
                }
                None => output::print_to_console(&record, &format, timestamps)?,
            }
        }
        Commands::Batch { url, output, format } => {
            let url = utils::validate_and_normalize_url(&url)?;
            let state = AppState::from_config(&config);
            run_batch(&state, &url, output.as_deref(), &format).await?;
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                match cli.config {
                    Some(path) => println!("Using config file: {}", path.display()),
                    None => println!("Config file: {}", Config::config_path()?.display()),
                }
                println!("Edit this file to change settings, or run `transcriber config --show`.");
            }
        }
        Commands::Doctor => {
            let missing = utils::check_dependencies(&config).await;
            if missing.is_empty() {
                println!("{} All dependencies found", style("✓").green());
            } else {
                println!("{}", style("Missing dependencies:").yellow().bold());
                for dep in missing {
                    println!("  • {}", dep);
                }
            }
        }
    }

    Ok(())
}

fn spinner(message: &'static str) -> Result<ProgressBar> {
    let progress = ProgressBar::new_spinner();
    progress.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    progress.set_message(message);
    progress.enable_steady_tick(std::time::Duration::from_millis(120));
    Ok(progress)
}

/// An existing directory gets a file named after the video
fn resolve_output_path(path: &Path, title: &str, format: &OutputFormat) -> PathBuf {
    if !path.is_dir() {
        return path.to_path_buf();
    }

    let ext = match format {
        OutputFormat::Text => "txt",
        OutputFormat::Json => "json",
        OutputFormat::Markdown => "md",
    };
    path.join(format!("{}.{}", utils::sanitize_filename(title), ext))
}

async fn run_batch(state: &AppState, url: &str, output: Option<&Path>, format: &OutputFormat) -> Result<()> {
    let plan = state.batch.prepare(url).await?;
    let title = plan.title.clone();

    let progress = ProgressBar::new(plan.children.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?,
    );

    let mut events = state.batch.spawn(plan);
    let mut records: Vec<TranscriptRecord> = Vec::new();
    let mut failures: Vec<(usize, String, String)> = Vec::new();

    while let Some(event) = events.recv().await {
        match event {
            BatchEvent::Metadata { title, video_count } => {
                progress.set_message(format!("{} ({} videos)", title, video_count));
            }
            BatchEvent::Transcript { record, .. } => {
                progress.inc(1);
                if output.is_none() {
                    progress.suspend(|| output::print_to_console(&record, format, false))?;
                }
                records.push(record);
            }
            BatchEvent::Error { index, title, error, .. } => {
                progress.inc(1);
                failures.push((index, title, error));
            }
            BatchEvent::Done => progress.finish_with_message("Done"),
        }
    }

    if let Some(path) = output {
        let content = match format {
            OutputFormat::Json => serde_json::to_string_pretty(&records)?,
            OutputFormat::Text => records
                .iter()
                .map(|r| output::format_as_text(r, false))
                .collect::<Vec<_>>()
                .join("\n\n"),
            OutputFormat::Markdown => output::format_batch_as_markdown(&title, &records),
        };
        fs_err::write(path, content).context("Failed to write batch output")?;
        println!("Batch saved to: {}", path.display());
    }

    println!(
        "{} {} transcribed, {} failed",
        style("Summary:").bold(),
        style(records.len()).green(),
        style(failures.len()).red()
    );
    for (index, title, error) in failures {
        println!("  {} #{} {}: {}", style("✗").red(), index + 1, title, error);
    }

    Ok(())
}
