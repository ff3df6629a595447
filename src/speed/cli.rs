use clap::{Args, Subcommand, ValueHint};
use std::path::PathBuf;

use super::executor::Strategy;
use super::mode::SpeedMode;

#[derive(Subcommand, Debug, Clone)]
pub enum SpeedCommands {
    /// Render a video with per-segment playback speeds
    Apply(ApplyArgs),
    /// Validate a speed config and show the segments it would render
    Check(CheckArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ApplyArgs {
    /// Source video file
    #[arg(value_hint = ValueHint::FilePath)]
    pub input: PathBuf,

    /// Speed config: a JSON file path or an inline JSON object
    pub config: String,

    /// Optional output path; defaults to <videoname>_speed.<ext> (or _cut in cut mode)
    #[arg(value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Keep the whole video (full) or only the configured segments (cut)
    #[arg(long, value_enum)]
    pub mode: Option<SpeedMode>,

    /// How ffmpeg is driven; auto picks by segment count
    #[arg(long, value_enum)]
    pub strategy: Option<Strategy>,

    /// Show the ffmpeg commands that would be executed without running them
    #[arg(long)]
    pub dry_run: bool,

    /// Show raw ffmpeg output instead of progress bars
    #[arg(long)]
    pub verbose: bool,

    #[command(flatten)]
    pub tools: ToolArgs,
}

/// Binary overrides shared by commands that call ffmpeg/ffprobe
#[derive(Args, Debug, Clone)]
pub struct ToolArgs {
    /// ffmpeg binary to use instead of the configured one
    #[arg(long, value_name = "BIN", value_hint = ValueHint::ExecutablePath)]
    pub ffmpeg: Option<PathBuf>,

    /// ffprobe binary to use instead of the configured one
    #[arg(long, value_name = "BIN", value_hint = ValueHint::ExecutablePath)]
    pub ffprobe: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Speed config: a JSON file path or an inline JSON object
    pub config: String,

    /// Source duration in seconds to plan against
    #[arg(long, value_name = "SECONDS", conflicts_with = "input")]
    pub duration: Option<f64>,

    /// Probe this video for the source duration
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub input: Option<PathBuf>,

    /// Keep the whole video (full) or only the configured segments (cut)
    #[arg(long, value_enum)]
    pub mode: Option<SpeedMode>,

    /// ffprobe binary to use instead of the configured one
    #[arg(long, value_name = "BIN", value_hint = ValueHint::ExecutablePath)]
    pub ffprobe: Option<PathBuf>,
}
