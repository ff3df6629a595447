use super::error::{SpeedError, SpeedResult};
use super::segment::{SegmentKind, SpeedSegment};
use super::tempo::{TempoChain, format_factor};
use super::timeline::Timeline;

/// One frame at 60 fps.
pub const DEFAULT_MIN_SEGMENT_SECONDS: f64 = 1.0 / 60.0;

/// Segment boundaries are rounded to this resolution before planning.
const BOUNDARY_RESOLUTION: f64 = 1e6;

/// Per-segment transform description, in concatenation order.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentPlan {
    /// Position in the plan (and in the final concatenation)
    pub index: usize,
    pub kind: SegmentKind,
    /// Start in the source video (seconds)
    pub source_start: f64,
    /// End in the source video (seconds)
    pub source_end: f64,
    pub speed: f64,
    pub tempo: TempoChain,
    /// Expected length of this segment in the output (seconds)
    pub output_duration: f64,
    /// Where this segment starts in the output (seconds)
    pub output_offset: f64,
    pub comment: Option<String>,
}

impl SegmentPlan {
    pub fn source_duration(&self) -> f64 {
        self.source_end - self.source_start
    }

    pub fn is_identity(&self) -> bool {
        self.speed == 1.0
    }

    pub fn is_gap(&self) -> bool {
        matches!(self.kind, SegmentKind::Gap)
    }

    /// `setpts` expression rescaling timestamps by `1/speed`.
    pub fn video_filter(&self) -> Option<String> {
        if self.is_identity() {
            return None;
        }
        Some(format!("setpts={}*PTS", format_factor(1.0 / self.speed)))
    }

    pub fn audio_filter(&self) -> Option<String> {
        self.tempo.to_filter()
    }
}

/// A synthesized gap too short to render on its own, folded into the
/// plan segment at `into_index` so no source time is lost.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedGap {
    pub start: f64,
    pub end: f64,
    pub into_index: usize,
}

#[derive(Debug, Clone)]
pub struct FilterPlan {
    pub segments: Vec<SegmentPlan>,
    pub merged_gaps: Vec<MergedGap>,
}

impl FilterPlan {
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn total_output_duration(&self) -> f64 {
        self.segments
            .last()
            .map(|segment| segment.output_offset + segment.output_duration)
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PlanOptions {
    pub min_segment_seconds: f64,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            min_segment_seconds: DEFAULT_MIN_SEGMENT_SECONDS,
        }
    }
}

fn round_boundary(value: f64) -> f64 {
    (value * BOUNDARY_RESOLUTION).round() / BOUNDARY_RESOLUTION
}

fn extend_end(segment: &mut SegmentPlan, source_end: f64) {
    segment.source_end = source_end;
    segment.output_duration = segment.source_duration() / segment.speed;
}

/// Turn a resolved timeline into per-segment transforms. Gaps shorter than
/// `min_segment_seconds` are merged into the previous segment (or the next
/// one, for a leading gap) so the plan still covers the whole timeline.
pub fn build_filter_plan(timeline: &Timeline, options: PlanOptions) -> SpeedResult<FilterPlan> {
    let mut segments: Vec<SegmentPlan> = Vec::with_capacity(timeline.len());
    let mut merged_gaps = Vec::new();
    // leading sliver waiting for a segment to attach to
    let mut pending_start: Option<f64> = None;

    for (timeline_index, segment) in timeline.segments.iter().enumerate() {
        let source_start = round_boundary(segment.start);
        let source_end = round_boundary(segment.end);
        let source_duration = source_end - source_start;
        let output_duration = source_duration / segment.speed;

        if source_duration < options.min_segment_seconds
            || output_duration < options.min_segment_seconds
        {
            if segment.is_gap() {
                match segments.last_mut() {
                    Some(previous) => {
                        extend_end(previous, source_end);
                        merged_gaps.push(MergedGap {
                            start: source_start,
                            end: source_end,
                            into_index: previous.index,
                        });
                    }
                    None => {
                        pending_start.get_or_insert(source_start);
                        merged_gaps.push(MergedGap {
                            start: source_start,
                            end: source_end,
                            into_index: 0,
                        });
                    }
                }
                continue;
            }
            return Err(degenerate(
                timeline_index,
                segment,
                source_start,
                source_end,
                output_duration,
                options.min_segment_seconds,
            ));
        }

        let tempo = TempoChain::decompose(segment.speed)?;
        let mut plan = SegmentPlan {
            index: segments.len(),
            kind: segment.kind,
            source_start,
            source_end,
            speed: segment.speed,
            tempo,
            output_duration,
            output_offset: 0.0,
            comment: segment.comment.clone(),
        };
        if let Some(start) = pending_start.take() {
            plan.source_start = start;
            extend_end(&mut plan, source_end);
        }
        segments.push(plan);
    }

    if segments.is_empty() {
        return Err(SpeedError::DegenerateSegmentError {
            index: 0,
            start: 0.0,
            end: timeline.source_duration,
            reason: "no renderable segments remain after resolving the timeline".to_string(),
        });
    }

    let mut output_offset = 0.0;
    for segment in &mut segments {
        segment.output_offset = output_offset;
        output_offset += segment.output_duration;
    }

    Ok(FilterPlan {
        segments,
        merged_gaps,
    })
}

fn degenerate(
    timeline_index: usize,
    segment: &SpeedSegment,
    start: f64,
    end: f64,
    output_duration: f64,
    min_segment_seconds: f64,
) -> SpeedError {
    let index = segment.declared_index().unwrap_or(timeline_index);
    SpeedError::DegenerateSegmentError {
        index,
        start,
        end,
        reason: format!(
            "plays for {output_duration:.6}s at {}x, shorter than the {min_segment_seconds:.6}s minimum",
            segment.speed
        ),
    }
}
