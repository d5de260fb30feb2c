//! vidscaler - video rescaling with burned-in subtitles
//!
//! Command line entry point: rescales videos, burns single or dual subtitle
//! tracks into padded bands, transcribes with whisper.cpp and splits long
//! videos into overlapping parts using ffmpeg.

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use tracing::{info, warn, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vidscaler::cli::{Args, Commands};
use vidscaler::config::Config;
use vidscaler::media::MediaProcessorFactory;
use vidscaler::subtitle::srt;
use vidscaler::transcribe::{RecognitionRequest, RecognitionTask, RecognizerFactory};
use vidscaler::workflow::{derived_path, Workflow};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;

    // Load configuration
    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            // Try to load config.toml from current directory first
            if Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };

    match args.command {
        Commands::Info { input } => {
            let workflow = Workflow::new(config)?;
            let (resolution, duration) = workflow.media_info(&input).await?;

            println!("File:       {}", input.display());
            println!("Resolution: {}", resolution);
            println!("Duration:   {:.1}s", duration);
            println!("Encoder:    {}", workflow.version_info().await?);
        }
        Commands::Options { input } => {
            let workflow = Workflow::new(config)?;
            let (source, options) = workflow.scale_options(&input).await?;

            println!("\nScale options for {} ({}):", input.display(), source);
            println!("{:<8} {:<8} {:<10} {:<10}", "Width", "Height", "Quality", "Est. size");
            println!("{}", "-".repeat(40));
            for option in &options {
                println!(
                    "{:<8} {:<8} {:<10} {:<10}",
                    option.target_width,
                    option.target_height,
                    format!("{}%", option.quality_rank),
                    format!("{:.0}%", option.estimated_size_ratio(source) * 100.0)
                );
            }
        }
        Commands::Scale { input, output, width } => {
            let output = match output {
                Some(output) => output,
                None => derived_path(&input, "scaled")?,
            };
            let outcome = Workflow::new(config)?.scale_video(&input, &output, width).await?;
            println!("{} -> {} ({})", input.display(), outcome.output_path.display(), outcome.output);
        }
        Commands::Burn { input, subtitles, output, width } => {
            let output = match output {
                Some(output) => output,
                None => derived_path(&input, "subtitled")?,
            };
            let outcome = Workflow::new(config)?
                .burn_subtitles(&input, &subtitles, &output, width)
                .await?;
            println!("{} -> {} ({})", input.display(), outcome.output_path.display(), outcome.output);
        }
        Commands::Dual { input, original, translation, output, width } => {
            let output = match output {
                Some(output) => output,
                None => derived_path(&input, "dual")?,
            };
            let outcome = Workflow::new(config)?
                .burn_dual(&input, &original, &translation, &output, width)
                .await?;
            println!("{} -> {} ({})", input.display(), outcome.output_path.display(), outcome.output);
        }
        Commands::Transcribe { input, output, model, language, translate, reference } => {
            info!("Transcribing: {}", input.display());
            let output = output.unwrap_or_else(|| input.with_extension("srt"));
            let reference = match reference {
                Some(path) => Some(srt::read_file(path).await?),
                None => None,
            };
            let model = model.unwrap_or_else(|| config.recognizer.model.clone());
            let request = RecognitionRequest {
                language: language.or_else(|| config.recognizer.language.clone()),
                task: if translate {
                    RecognitionTask::Translate { target: "en".to_string() }
                } else {
                    RecognitionTask::Transcribe
                },
            };

            let recognizer = RecognizerFactory::create_default(config.recognizer.clone());
            let workflow = Workflow::new(config)?;
            let handle = recognizer.acquire(&model).await?;

            let result = workflow
                .transcribe_video(&input, &output, recognizer.as_ref(), &handle, &request, reference.as_ref())
                .await;
            recognizer.release(handle).await?;

            let track = result?;
            println!("Wrote {} cues to {}", track.len(), output.display());
        }
        Commands::Reconcile { reference, segments, output } => {
            let media = MediaProcessorFactory::create_processor(config.media.clone());
            let track = Workflow::with_processor(config, media)
                .reconcile_files(&reference, &segments, &output)
                .await?;
            println!("Wrote {} cues to {}", track.len(), output.display());
        }
        Commands::Split { input, output_dir, part_length, overlap } => {
            if let Some(part_length) = part_length {
                config.split.part_length_secs = part_length;
            }
            if let Some(overlap) = overlap {
                config.split.overlap_secs = overlap;
            }
            config.validate()?;

            let parts = Workflow::new(config)?
                .split_video(&input, output_dir.as_deref())
                .await?;
            if parts.is_empty() {
                println!("{} is shorter than one part, nothing to split", input.display());
            }
            for part in parts {
                println!("{}", part.display());
            }
        }
        Commands::Validate { original, translated, threshold } => {
            if let Some(threshold) = threshold {
                config.validation.empty_threshold_pct = threshold;
            }
            config.validate()?;

            let media = MediaProcessorFactory::create_processor(config.media.clone());
            let report = Workflow::with_processor(config, media)
                .validate_translation(&original, &translated)
                .await?;

            println!("{}", report.details);
            if !report.is_valid {
                warn!("Translation failed validation");
                std::process::exit(2);
            }
        }
        Commands::Batch { input_dir, output_dir, quality } => {
            let summary = Workflow::new(config)?
                .process_directory(&input_dir, output_dir.as_deref(), quality)
                .await?;
            println!("Processed {} files, {} failed", summary.processed, summary.failed);
        }
        Commands::InitConfig { output } => {
            config.save_to_file(&output)?;
            println!("Wrote configuration to {}", output.display());
        }
    }

    info!("vidscaler completed successfully");
    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = std::env::current_dir()?.join(".vidscaler").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "vidscaler.log");
    let (non_blocking_file, _guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(_guard);

    // Determine log level
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Create console layer
    let console_layer = fmt::layer()
        .with_target(false)
        .with_file(verbose)
        .with_line_number(verbose);

    // Create file layer
    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    // Setup layered subscriber
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer);

    // Initialize the subscriber
    subscriber
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("vidscaler.log").display()
    );

    Ok(())
}
