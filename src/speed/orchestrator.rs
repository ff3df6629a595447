use std::path::{Path, PathBuf};

use serde_json::json;

use super::config::SpeedConfig;
use super::error::{SpeedError, SpeedResult};
use super::executor::{ExecutionContext, Strategy};
use super::ffmpeg::compiler::{FfmpegCompiler, StreamLayout};
use super::ffmpeg::probe::MediaProbe;
use super::ffmpeg::services::FfmpegRunner;
use super::logging::log_event;
use super::mode::SpeedMode;
use super::output::{
    StagedOutput, check_output_destination, prepare_output_destination, resolve_output_path,
};
use super::plan::{FilterPlan, PlanOptions, build_filter_plan};
use super::segment::SpeedSegment;
use super::settings::EngineSettings;
use super::timeline::build_timeline;
use super::timespec::format_timespec;
use crate::ui::prelude::{Level, emit, emit_banner};

/// One `apply` invocation, after CLI flags and settings have been merged.
#[derive(Debug, Clone)]
pub struct ApplyRequest {
    pub input: PathBuf,
    /// Config file path or inline JSON
    pub config: String,
    pub output: Option<PathBuf>,
    pub mode: SpeedMode,
    pub strategy: Strategy,
    pub dry_run: bool,
    pub verbose: bool,
}

/// External collaborators of a run.
pub struct Services<'a> {
    pub probe: &'a dyn MediaProbe,
    pub runner: &'a dyn FfmpegRunner,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub output: PathBuf,
    pub strategy: Strategy,
    pub segments: usize,
    pub warnings: usize,
    pub output_duration: f64,
    /// Shell-quoted commands printed instead of run (dry run only)
    pub commands: Vec<String>,
}

/// Parse and validate the config source into declared segments.
pub fn load_segments(config: &str) -> SpeedResult<Vec<SpeedSegment>> {
    let trimmed = config.trim_start();
    let looks_inline = trimmed.starts_with('{') || trimmed.starts_with('\u{feff}');
    if !looks_inline && !Path::new(config).is_file() {
        return Err(SpeedError::InvalidInput(format!(
            "Config file {config} does not exist"
        )));
    }
    SpeedConfig::load(config)?.segments()
}

/// Planned render plus the number of warnings raised while planning.
pub(crate) struct PlannedRun {
    pub plan: FilterPlan,
    pub warnings: usize,
}

/// Resolve the timeline and build the filter plan, reporting every
/// adjustment as a warning event.
pub(crate) fn plan_run(
    segments: Vec<SpeedSegment>,
    source_duration: f64,
    mode: SpeedMode,
    min_segment_seconds: f64,
) -> SpeedResult<PlannedRun> {
    let build = build_timeline(segments, source_duration, mode);
    for warning in &build.warnings {
        log_event(Level::Warn, warning.code(), warning.to_string());
    }
    let timeline = &build.timeline;
    log_event(
        Level::Debug,
        "speed.timeline.built",
        format!(
            "Timeline ({} mode): {} configured, {} gap segment(s); keeps {:.3}s of source, plays {:.3}s",
            timeline.mode.as_str(),
            timeline.configured_count(),
            timeline.gap_count(),
            timeline.covered_source_duration(),
            timeline.output_duration()
        ),
    );

    let plan = build_filter_plan(&build.timeline, PlanOptions { min_segment_seconds })?;
    for gap in &plan.merged_gaps {
        log_event(
            Level::Warn,
            "speed.plan.gap_merged",
            format!(
                "Merging {:.3}s gap {} - {} into segment {}: shorter than one frame",
                gap.end - gap.start,
                format_timespec(gap.start),
                format_timespec(gap.end),
                gap.into_index
            ),
        );
    }

    Ok(PlannedRun {
        warnings: build.warnings.len() + plan.merged_gaps.len(),
        plan,
    })
}

pub fn run_apply(
    request: &ApplyRequest,
    settings: &EngineSettings,
    services: &Services<'_>,
) -> SpeedResult<RunReport> {
    log_event(
        Level::Info,
        "speed.apply.start",
        format!(
            "Adjusting playback speed of {} ({} mode)",
            request.input.display(),
            request.mode.as_str()
        ),
    );

    if !request.input.is_file() {
        return Err(SpeedError::InvalidInput(format!(
            "Input video {} does not exist",
            request.input.display()
        )));
    }

    let segments = load_segments(&request.config)?;
    log_event(
        Level::Debug,
        "speed.config.loaded",
        format!("Loaded {} segment(s) from config", segments.len()),
    );

    let output = resolve_output_path(request.output.as_deref(), &request.input, request.mode)?;
    if request.dry_run {
        check_output_destination(&output, &request.input)?;
    } else {
        prepare_output_destination(&output, &request.input)?;
    }

    log_event(Level::Info, "speed.apply.probe", "Probing source video");
    let media = services.probe.probe(&request.input)?;
    log_event(
        Level::Debug,
        "speed.apply.probe.result",
        format!(
            "Source duration {:.3}s, audio stream: {}",
            media.duration,
            if media.has_audio { "yes" } else { "no" }
        ),
    );
    if !media.has_audio {
        log_event(
            Level::Info,
            "speed.apply.no_audio",
            "Source has no audio stream; rendering video only",
        );
    }

    let planned = plan_run(
        segments,
        media.duration,
        request.mode,
        settings.min_segment_seconds,
    )?;
    let plan = planned.plan;

    let strategy = request
        .strategy
        .resolve(plan.len(), settings.max_single_pass_segments);
    log_event(
        Level::Info,
        "speed.apply.plan",
        format!(
            "Planned {} segment(s), {} -> {} ({})",
            plan.len(),
            format_timespec(media.duration),
            format_timespec(plan.total_output_duration()),
            strategy.as_str()
        ),
    );

    let compiler = FfmpegCompiler::new(
        settings.encode.clone(),
        StreamLayout {
            has_audio: media.has_audio,
        },
    )
    .with_stream_copy_extract(settings.stream_copy_extract);
    let executor = ExecutionContext {
        runner: services.runner,
        compiler: &compiler,
        temp_root: settings.temp_dir.clone(),
        verbose: request.verbose,
    }
    .executor(strategy);

    let mut report = RunReport {
        output: output.clone(),
        strategy,
        segments: plan.len(),
        warnings: planned.warnings,
        output_duration: plan.total_output_duration(),
        commands: Vec::new(),
    };

    if request.dry_run {
        report.commands = executor
            .describe(&plan, &request.input, &output)
            .iter()
            .map(|args| services.runner.command_line(args))
            .collect();
        for command in &report.commands {
            emit(
                Level::Info,
                "speed.apply.dry_run.command",
                command,
                Some(json!({ "command": command })),
            );
        }
        log_event(
            Level::Info,
            "speed.apply.dry_run",
            "Dry run completed - ffmpeg command(s) printed above",
        );
        return Ok(report);
    }

    let staged = StagedOutput::create(&output)?;
    executor.execute(&plan, &request.input, staged.path())?;
    staged.commit(&output)?;

    emit_banner(
        Level::Success,
        "speed.apply.success",
        &format!(
            "Wrote {} ({} segment(s), {})",
            output.display(),
            report.segments,
            format_timespec(report.output_duration)
        ),
        Some(json!({
            "output": output.display().to_string(),
            "segments": report.segments,
            "strategy": strategy.as_str(),
            "output_duration": report.output_duration,
            "warnings": report.warnings,
        })),
    );

    Ok(report)
}
