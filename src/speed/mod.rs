pub mod check;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod ffmpeg;
mod logging;
pub mod mode;
pub mod orchestrator;
pub mod output;
pub mod plan;
pub mod segment;
pub mod settings;
pub mod tempo;
pub mod timeline;
pub mod timespec;

use self::check::{CheckRequest, run_check};
use self::cli::{ApplyArgs, CheckArgs, SpeedCommands};
use self::error::SpeedResult;
use self::ffmpeg::locate_tool;
use self::ffmpeg::probe::FfprobeProbe;
use self::ffmpeg::services::SystemFfmpegRunner;
use self::logging::log_event;
use self::orchestrator::{ApplyRequest, Services, run_apply};
use self::settings::EngineSettings;
use crate::ui::prelude::Level;

pub fn handle_command(command: SpeedCommands, settings: EngineSettings) -> SpeedResult<()> {
    match command {
        SpeedCommands::Apply(args) => handle_apply(args, settings),
        SpeedCommands::Check(args) => handle_check(args, settings),
    }
}

/// Merge CLI overrides into the loaded settings.
fn apply_tool_overrides(mut settings: EngineSettings, args: &ApplyArgs) -> EngineSettings {
    if let Some(ffmpeg) = &args.tools.ffmpeg {
        settings.ffmpeg = ffmpeg.clone();
    }
    if let Some(ffprobe) = &args.tools.ffprobe {
        settings.ffprobe = ffprobe.clone();
    }
    settings
}

fn handle_apply(args: ApplyArgs, settings: EngineSettings) -> SpeedResult<()> {
    let settings = apply_tool_overrides(settings, &args);
    let request = ApplyRequest {
        input: args.input,
        config: args.config,
        output: args.output,
        mode: args.mode.unwrap_or(settings.default_mode),
        strategy: args.strategy.unwrap_or(settings.strategy),
        dry_run: args.dry_run,
        verbose: args.verbose,
    };

    let probe = FfprobeProbe::new(locate_tool(&settings.ffprobe)?);
    let runner = if request.dry_run {
        SystemFfmpegRunner::new(&settings.ffmpeg)
    } else {
        SystemFfmpegRunner::new(locate_tool(&settings.ffmpeg)?)
    };
    let services = Services {
        probe: &probe,
        runner: &runner,
    };
    let report = run_apply(&request, &settings, &services)?;
    log_event(
        Level::Debug,
        "speed.apply.report",
        format!(
            "{} {}: {} segment(s), {} warning(s), {} command(s) printed",
            report.strategy.as_str(),
            report.output.display(),
            report.segments,
            report.warnings,
            report.commands.len()
        ),
    );
    Ok(())
}

fn handle_check(args: CheckArgs, settings: EngineSettings) -> SpeedResult<()> {
    let probe = FfprobeProbe::new(args.ffprobe.as_ref().unwrap_or(&settings.ffprobe));
    if args.input.is_some() {
        locate_tool(probe.binary())?;
    }
    let request = CheckRequest {
        config: args.config,
        duration: args.duration,
        input: args.input,
        mode: args.mode.unwrap_or(settings.default_mode),
    };
    let report = run_check(&request, &settings, &probe)?;
    log_event(
        Level::Debug,
        "speed.check.report",
        format!(
            "Checked {} segment(s) against a {} duration, {} warning(s)",
            report.plan.len(),
            report.duration_source.as_str(),
            report.warnings
        ),
    );
    Ok(())
}
