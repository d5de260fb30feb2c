use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show resolution, duration and encoder version
    Info {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// List the output sizes available for a video
    Options {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Rescale a video
    Scale {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Output video file (default: <input>_scaled.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Target width (default: keep source width)
        #[arg(short, long)]
        width: Option<u32>,
    },

    /// Rescale and burn subtitles into a band below the picture
    Burn {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Subtitle file (SRT)
        #[arg(short, long)]
        subtitles: PathBuf,

        /// Output video file (default: <input>_subtitled.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Target width (default: keep source width)
        #[arg(short, long)]
        width: Option<u32>,
    },

    /// Burn original subtitles above and a translation below the picture
    Dual {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Original-language subtitle file (SRT)
        #[arg(long)]
        original: PathBuf,

        /// Translated subtitle file (SRT)
        #[arg(long)]
        translation: PathBuf,

        /// Output video file (default: <input>_dual.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Target width (default: keep source width)
        #[arg(short, long)]
        width: Option<u32>,
    },

    /// Recognize speech and write subtitles
    Transcribe {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Output subtitle file (default: <input>.srt)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Model name (default from config)
        #[arg(short, long)]
        model: Option<String>,

        /// Spoken language hint
        #[arg(short, long)]
        language: Option<String>,

        /// Let the recognizer translate into English
        #[arg(long)]
        translate: bool,

        /// Keep the cue timing of this subtitle file
        #[arg(short, long)]
        reference: Option<PathBuf>,
    },

    /// Map whisper.cpp JSON output onto the timing of a reference SRT
    Reconcile {
        /// Reference subtitle file whose timing is kept
        #[arg(short, long)]
        reference: PathBuf,

        /// whisper.cpp JSON output
        #[arg(short, long)]
        segments: PathBuf,

        /// Output subtitle file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Split a video into overlapping parts
    Split {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory (default: next to the input)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Part length in seconds (default from config)
        #[arg(long)]
        part_length: Option<f64>,

        /// Overlap in seconds (default from config)
        #[arg(long)]
        overlap: Option<f64>,
    },

    /// Check a translated SRT against its original before burning it in
    Validate {
        /// Original subtitle file
        #[arg(long)]
        original: PathBuf,

        /// Translated subtitle file
        #[arg(long)]
        translated: PathBuf,

        /// Highest acceptable share of empty cues in percent (default from config)
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Rescale all videos in a directory
    Batch {
        /// Input directory containing video files
        #[arg(short, long)]
        input_dir: PathBuf,

        /// Output directory for processed files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Target quality in percent of the source width
        #[arg(short, long, default_value = "66")]
        quality: u32,
    },

    /// Write the effective configuration to a file
    InitConfig {
        /// Destination file
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,
    },
}
