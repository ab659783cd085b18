use clap::{Args, Parser, Subcommand};
use reelforge_common::{AssemblyRequestOptions, CaptionPosition, Platform, TransitionType};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "reelforge")]
#[command(author, version, about = "Assemble recorded video segments into finished clips")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Assemble a project's segments into one clip and wait for the result
    Assemble {
        /// Project the segments belong to
        project: String,

        /// Segments in playback order (discovered in the upload dir if omitted)
        segments: Vec<PathBuf>,

        /// Caption for the segment at the same position (repeatable, "" for none)
        #[arg(long = "caption")]
        captions: Vec<String>,

        #[command(flatten)]
        options: AssembleOptions,

        /// Print the final job as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the uploaded segments of a project
    Segments {
        project: String,
    },

    /// Show a stored assembly job
    Status {
        /// Job ID
        job_id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Probe a video file and display its metadata
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete finished jobs older than the retention period
    Prune {
        /// Retention in days (defaults to storage.retention_days)
        #[arg(long)]
        days: Option<u32>,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

/// Per-job option overrides; anything unset falls back to `[defaults]`.
#[derive(Args, Debug, Default)]
pub struct AssembleOptions {
    /// Hard-cut between segments
    #[arg(long)]
    pub no_transitions: bool,

    /// Transition type (fade, wipe, dissolve, slidedown, slideup)
    #[arg(long)]
    pub transition: Option<TransitionType>,

    /// Transition length in seconds
    #[arg(long)]
    pub transition_duration: Option<f64>,

    /// Do not burn captions in
    #[arg(long)]
    pub no_captions: bool,

    /// Caption position (top, center, bottom)
    #[arg(long)]
    pub caption_position: Option<CaptionPosition>,

    /// Caption font size
    #[arg(long)]
    pub font_size: Option<u32>,

    /// Target platform (tiktok, instagram, youtube, none)
    #[arg(long)]
    pub platform: Option<Platform>,
}

impl AssembleOptions {
    pub fn to_request(&self) -> AssemblyRequestOptions {
        AssemblyRequestOptions {
            add_transitions: self.no_transitions.then_some(false),
            transition_type: self.transition,
            transition_duration: self.transition_duration,
            add_captions: self.no_captions.then_some(false),
            caption_position: self.caption_position,
            caption_font_size: self.font_size,
            optimize_platform: self.platform,
        }
    }
}
