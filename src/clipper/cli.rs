use clap::{Args, Subcommand, ValueHint};
use std::path::PathBuf;

use crate::clipper::pipeline::FailurePolicy;
use crate::clipper::render::RenderLayout;

#[derive(Subcommand, Debug, Clone)]
pub enum ClipperCommands {
    /// Cut a video into vertical clips with burned-in, color-cycling subtitles
    Run(RunArgs),
    /// Write each clip's .ass subtitle file without rendering video
    Subtitles(SubtitlesArgs),
    /// Show the clip schedule for a duration or a media file
    Plan(PlanArgs),
    /// Inspect the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Print the config file location
    Path,
    /// Print the effective configuration as TOML
    Show,
}

/// Options shared by every command that lays out a schedule.
#[derive(Args, Debug, Clone, Default)]
pub struct ScheduleArgs {
    /// Clip length in seconds
    #[arg(short = 'l', long, value_name = "SECONDS")]
    pub chunk_length: Option<f64>,

    /// Drop the final clip when it is shorter than the clip length
    #[arg(long)]
    pub stop_if_last_short: bool,

    /// Spread this many clips evenly over the video instead of tiling it
    #[arg(long, value_name = "CLIPS")]
    pub sample: Option<usize>,

    /// Seconds to skip before the first sampled clip
    #[arg(long, value_name = "SECONDS", default_value_t = 0.0, requires = "sample")]
    pub offset: f64,
}

/// Options shared by commands that need the transcript.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Video file, or a directory to pick the first video from
    #[arg(value_hint = ValueHint::AnyPath)]
    pub input: Option<PathBuf>,

    /// Output directory (defaults to <input dir>/clips)
    #[arg(short = 'o', long = "out-dir", value_hint = ValueHint::DirPath)]
    pub out_dir: Option<PathBuf>,

    /// Use an existing WhisperX JSON transcript instead of transcribing
    #[arg(short = 't', long, value_hint = ValueHint::FilePath)]
    pub transcript: Option<PathBuf>,

    /// Re-generate the transcript even if cached
    #[arg(long)]
    pub force_transcribe: bool,

    /// Optional Whisper model override
    #[arg(long)]
    pub model: Option<String>,

    /// Spoken language code override
    #[arg(long)]
    pub language: Option<String>,

    #[command(flatten)]
    pub schedule: ScheduleArgs,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Vertical layout
    #[arg(long, value_enum)]
    pub layout: Option<RenderLayout>,

    /// Keep each clip's .ass file next to the video
    #[arg(long)]
    pub keep_subtitles: bool,

    /// What to do when a clip fails to render
    #[arg(long, value_enum)]
    pub on_failure: Option<FailurePolicy>,

    /// Show raw ffmpeg output instead of progress bars
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SubtitlesArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    /// Total media duration in seconds
    #[arg(long, value_name = "SECONDS", conflicts_with = "input")]
    pub duration: Option<f64>,

    /// Probe this media file for its duration
    #[arg(short = 'i', long, value_hint = ValueHint::FilePath)]
    pub input: Option<PathBuf>,

    #[command(flatten)]
    pub schedule: ScheduleArgs,
}
