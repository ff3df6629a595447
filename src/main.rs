mod speed;
mod ui;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, ValueHint};
use colored::control as color_control;

use crate::speed::cli::SpeedCommands;
use crate::speed::error::SpeedError;
use crate::speed::settings::EngineSettings;
use crate::ui::prelude::*;

/// Apply per-segment playback speeds to a video with ffmpeg
#[derive(Parser, Debug)]
#[command(name = "vspeed", author, version, about, long_about = None)]
struct Cli {
    /// Activate debug mode
    #[arg(short, long, global = true)]
    debug: bool,

    /// Output format for messages
    #[arg(
        long = "output",
        id = "output_format",
        value_enum,
        default_value = "text",
        global = true
    )]
    output_format: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Settings file to use instead of the default location
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: SpeedCommands,
}

fn run(cli: Cli) -> Result<()> {
    let settings = EngineSettings::load(cli.settings.as_deref())?;
    emit(
        Level::Debug,
        "speed.settings.loaded",
        &format!(
            "Using ffmpeg={} ffprobe={} strategy={}",
            settings.ffmpeg.display(),
            settings.ffprobe.display(),
            settings.strategy.as_str()
        ),
        None,
    );
    speed::handle_command(cli.command, settings)?;
    Ok(())
}

fn exit_code_for(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<SpeedError>() {
        Some(speed_err) => speed_err.exit_code() as u8,
        None => 1,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    ui::set_debug_mode(cli.debug);
    let color = !cli.no_color && std::env::var_os("NO_COLOR").is_none();
    color_control::set_override(color);
    ui::init(cli.output_format, color);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = err
                .downcast_ref::<SpeedError>()
                .map(|e| e.code())
                .unwrap_or("speed.error");
            emit_banner(
                Level::Error,
                code,
                &format!("Error: {err:#}"),
                Some(serde_json::json!({ "exit_code": exit_code_for(&err) })),
            );
            ExitCode::from(exit_code_for(&err))
        }
    }
}
