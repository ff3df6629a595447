use std::path::PathBuf;

use serde_json::json;

use super::error::{SpeedError, SpeedResult};
use super::ffmpeg::probe::MediaProbe;
use super::mode::SpeedMode;
use super::orchestrator::{load_segments, plan_run};
use super::plan::{FilterPlan, SegmentPlan};
use super::segment::{SegmentKind, SpeedSegment};
use super::settings::EngineSettings;
use super::timespec::format_timespec;
use crate::ui::prelude::{Level, emit};

#[derive(Debug, Clone)]
pub struct CheckRequest {
    pub config: String,
    pub duration: Option<f64>,
    pub input: Option<PathBuf>,
    pub mode: SpeedMode,
}

/// Where the source duration used for planning came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DurationSource {
    Given,
    Probed,
    /// End of the last configured segment
    Inferred,
}

impl DurationSource {
    pub fn as_str(self) -> &'static str {
        match self {
            DurationSource::Given => "given",
            DurationSource::Probed => "probed",
            DurationSource::Inferred => "inferred from config",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckReport {
    pub plan: FilterPlan,
    pub duration_source: DurationSource,
    pub warnings: usize,
}

fn source_duration(
    request: &CheckRequest,
    segments: &[SpeedSegment],
    probe: &dyn MediaProbe,
) -> SpeedResult<(f64, DurationSource)> {
    if let Some(duration) = request.duration {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(SpeedError::InvalidInput(format!(
                "Duration must be a positive number of seconds, got {duration}"
            )));
        }
        return Ok((duration, DurationSource::Given));
    }

    if let Some(input) = &request.input {
        return Ok((probe.probe(input)?.duration, DurationSource::Probed));
    }

    let end = segments
        .iter()
        .map(|segment| segment.end)
        .fold(0.0_f64, f64::max);
    Ok((end, DurationSource::Inferred))
}

fn segment_label(segment: &SegmentPlan) -> String {
    match segment.kind {
        SegmentKind::Configured { declared_index } => format!("part #{declared_index}"),
        SegmentKind::Gap => "gap".to_string(),
    }
}

fn emit_segment(segment: &SegmentPlan) {
    let mut line = format!(
        "{:>3}  {:<8} {} - {}  {:>6}  -> {} (+{})",
        segment.index,
        segment_label(segment),
        format_timespec(segment.source_start),
        format_timespec(segment.source_end),
        segment.tempo.to_string(),
        format_timespec(segment.output_offset),
        format_timespec(segment.output_duration),
    );
    if let Some(filter) = segment.audio_filter() {
        line.push_str(&format!("  [{filter}]"));
    }
    if let Some(comment) = &segment.comment {
        line.push_str(&format!("  # {comment}"));
    }

    emit(
        Level::Info,
        "speed.check.segment",
        &line,
        Some(json!({
            "index": segment.index,
            "kind": if segment.is_gap() { "gap" } else { "configured" },
            "source_start": segment.source_start,
            "source_end": segment.source_end,
            "speed": segment.speed,
            "tempo": segment.tempo.factors(),
            "output_offset": segment.output_offset,
            "output_duration": segment.output_duration,
            "comment": segment.comment,
        })),
    );
}

/// Validate a config and print the plan it would render, without ffmpeg.
pub fn run_check(
    request: &CheckRequest,
    settings: &EngineSettings,
    probe: &dyn MediaProbe,
) -> SpeedResult<CheckReport> {
    let segments = load_segments(&request.config)?;
    let (duration, duration_source) = source_duration(request, &segments, probe)?;
    let planned = plan_run(
        segments,
        duration,
        request.mode,
        settings.min_segment_seconds,
    )?;
    let plan = planned.plan;

    emit(
        Level::Success,
        "speed.check.valid",
        &format!(
            "Config is valid: {} segment(s) in {} mode",
            plan.len(),
            request.mode.as_str()
        ),
        None,
    );
    for segment in &plan.segments {
        emit_segment(segment);
    }
    emit(
        Level::Info,
        "speed.check.duration",
        &format!(
            "Source {} ({}) -> output {}",
            format_timespec(duration),
            duration_source.as_str(),
            format_timespec(plan.total_output_duration())
        ),
        Some(json!({
            "source_duration": duration,
            "duration_source": duration_source.as_str(),
            "output_duration": plan.total_output_duration(),
            "warnings": planned.warnings,
        })),
    );

    Ok(CheckReport {
        plan,
        duration_source,
        warnings: planned.warnings,
    })
}
