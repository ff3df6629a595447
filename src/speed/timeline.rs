//! Speed Timeline Module
//!
//! Turns validated config segments into the final ordered partition that
//! drives output assembly:
//! 1. Segments are clipped to the source duration
//! 2. Overlaps are resolved in declaration order (earlier declarations keep
//!    their claim, later ones are truncated, split or dropped)
//! 3. Segments are sorted by source start
//! 4. Full mode fills every uncovered range with a 1.0x gap segment;
//!    cut mode leaves uncovered ranges out

use std::fmt;

use super::config::RECOMMENDED_SPEED_RANGE;
use super::mode::SpeedMode;
use super::segment::SpeedSegment;
use super::timespec::format_timespec;

/// Ranges shorter than this are treated as empty.
pub const TIME_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct Timeline {
    pub segments: Vec<SpeedSegment>,
    pub source_duration: f64,
    pub mode: SpeedMode,
}

/// Non-fatal adjustments made while resolving the timeline
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineWarning {
    /// Part of a segment was already claimed by an earlier declaration
    Truncated {
        declared_index: usize,
        claimed_by: usize,
        original: (f64, f64),
        kept: Vec<(f64, f64)>,
    },
    /// A segment was fully covered by earlier declarations
    Dropped {
        declared_index: usize,
        claimed_by: usize,
        original: (f64, f64),
    },
    /// A segment extended past the end of the source
    ClippedToSource {
        declared_index: usize,
        original_end: f64,
        source_duration: f64,
    },
    /// A segment started at or after the end of the source
    BeyondSource {
        declared_index: usize,
        start: f64,
        source_duration: f64,
    },
    /// Speed works but degrades audio quality
    SpeedOutsideRecommended { declared_index: usize, speed: f64 },
}

impl TimelineWarning {
    pub fn code(&self) -> &'static str {
        match self {
            TimelineWarning::Truncated { .. } => "speed.timeline.overlap.truncated",
            TimelineWarning::Dropped { .. } => "speed.timeline.overlap.dropped",
            TimelineWarning::ClippedToSource { .. } => "speed.timeline.clipped",
            TimelineWarning::BeyondSource { .. } => "speed.timeline.beyond_source",
            TimelineWarning::SpeedOutsideRecommended { .. } => "speed.timeline.speed_range",
        }
    }
}

fn format_range((start, end): (f64, f64)) -> String {
    format!("{} - {}", format_timespec(start), format_timespec(end))
}

impl fmt::Display for TimelineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimelineWarning::Truncated {
                declared_index,
                claimed_by,
                original,
                kept,
            } => {
                let kept = kept
                    .iter()
                    .map(|range| format_range(*range))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(
                    f,
                    "Segment #{declared_index} ({}) overlaps segment #{claimed_by}; keeping {kept}",
                    format_range(*original)
                )
            }
            TimelineWarning::Dropped {
                declared_index,
                claimed_by,
                original,
            } => write!(
                f,
                "Segment #{declared_index} ({}) is fully covered by segment #{claimed_by} and was dropped",
                format_range(*original)
            ),
            TimelineWarning::ClippedToSource {
                declared_index,
                original_end,
                source_duration,
            } => write!(
                f,
                "Segment #{declared_index} ends at {} but the source is only {} long; clipped",
                format_timespec(*original_end),
                format_timespec(*source_duration)
            ),
            TimelineWarning::BeyondSource {
                declared_index,
                start,
                source_duration,
            } => write!(
                f,
                "Segment #{declared_index} starts at {} which is past the end of the source ({}); dropped",
                format_timespec(*start),
                format_timespec(*source_duration)
            ),
            TimelineWarning::SpeedOutsideRecommended {
                declared_index,
                speed,
            } => write!(
                f,
                "Segment #{declared_index} uses speed {speed}x, outside the recommended {}x-{}x range; audio quality may suffer",
                RECOMMENDED_SPEED_RANGE.start(),
                RECOMMENDED_SPEED_RANGE.end()
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TimelineBuild {
    pub timeline: Timeline,
    pub warnings: Vec<TimelineWarning>,
}

struct Claim {
    start: f64,
    end: f64,
    declared_index: usize,
}

/// Build the timeline from segments given in declaration order.
pub fn build_timeline(
    declared: Vec<SpeedSegment>,
    source_duration: f64,
    mode: SpeedMode,
) -> TimelineBuild {
    let mut warnings = Vec::new();
    let mut claims: Vec<Claim> = Vec::new();
    let mut resolved: Vec<SpeedSegment> = Vec::new();

    for segment in declared {
        let declared_index = segment.declared_index().unwrap_or_default();

        if !RECOMMENDED_SPEED_RANGE.contains(&segment.speed) {
            warnings.push(TimelineWarning::SpeedOutsideRecommended {
                declared_index,
                speed: segment.speed,
            });
        }

        let Some(segment) =
            clip_to_source(segment, declared_index, source_duration, &mut warnings)
        else {
            continue;
        };

        let (kept, claimed_by) = subtract_claims(&segment, &claims);
        let original = (segment.start, segment.end);

        match claimed_by {
            Some(claimed_by) if kept.is_empty() => {
                warnings.push(TimelineWarning::Dropped {
                    declared_index,
                    claimed_by,
                    original,
                });
            }
            Some(claimed_by) => {
                warnings.push(TimelineWarning::Truncated {
                    declared_index,
                    claimed_by,
                    original,
                    kept: kept.clone(),
                });
            }
            None => {}
        }

        for (start, end) in kept {
            claims.push(Claim {
                start,
                end,
                declared_index,
            });
            resolved.push(segment.with_bounds(start, end));
        }
        claims.sort_by(|a, b| a.start.total_cmp(&b.start));
    }

    resolved.sort_by(|a, b| a.start.total_cmp(&b.start));

    let segments = if mode.keeps_gaps() {
        fill_gaps(resolved, source_duration)
    } else {
        resolved
    };

    TimelineBuild {
        timeline: Timeline {
            segments,
            source_duration,
            mode,
        },
        warnings,
    }
}

fn clip_to_source(
    segment: SpeedSegment,
    declared_index: usize,
    source_duration: f64,
    warnings: &mut Vec<TimelineWarning>,
) -> Option<SpeedSegment> {
    if segment.start >= source_duration - TIME_EPSILON {
        warnings.push(TimelineWarning::BeyondSource {
            declared_index,
            start: segment.start,
            source_duration,
        });
        return None;
    }

    if segment.end > source_duration {
        warnings.push(TimelineWarning::ClippedToSource {
            declared_index,
            original_end: segment.end,
            source_duration,
        });
        return Some(segment.with_bounds(segment.start, source_duration));
    }

    Some(segment)
}

/// Remove already-claimed ranges from a segment. Returns the unclaimed pieces
/// and the first earlier declaration it collided with.
fn subtract_claims(segment: &SpeedSegment, claims: &[Claim]) -> (Vec<(f64, f64)>, Option<usize>) {
    let mut pieces = Vec::new();
    let mut claimed_by = None;
    let mut cursor = segment.start;

    for claim in claims {
        if !segment.overlaps(claim.start, claim.end) {
            continue;
        }
        if claimed_by.is_none() {
            claimed_by = Some(claim.declared_index);
        }
        if claim.start > cursor {
            pieces.push((cursor, claim.start.min(segment.end)));
        }
        cursor = cursor.max(claim.end);
    }
    if cursor < segment.end {
        pieces.push((cursor, segment.end));
    }

    pieces.retain(|(start, end)| end - start > TIME_EPSILON);
    (pieces, claimed_by)
}

fn fill_gaps(segments: Vec<SpeedSegment>, source_duration: f64) -> Vec<SpeedSegment> {
    let mut filled = Vec::with_capacity(segments.len() * 2 + 1);
    let mut cursor = 0.0;

    for segment in segments {
        if segment.start - cursor > TIME_EPSILON {
            filled.push(SpeedSegment::gap(cursor, segment.start));
        }
        cursor = segment.end;
        filled.push(segment);
    }
    if source_duration - cursor > TIME_EPSILON {
        filled.push(SpeedSegment::gap(cursor, source_duration));
    }

    filled
}

impl Timeline {
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Total source time that ends up in the output.
    pub fn covered_source_duration(&self) -> f64 {
        self.segments.iter().map(SpeedSegment::duration).sum()
    }

    pub fn output_duration(&self) -> f64 {
        self.segments.iter().map(SpeedSegment::output_duration).sum()
    }

    pub fn configured_count(&self) -> usize {
        self.segments.iter().filter(|s| !s.is_gap()).count()
    }

    pub fn gap_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_gap()).count()
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::speed::config::SpeedConfig;

    fn seg(index: usize, start: f64, end: f64, speed: f64) -> SpeedSegment {
        SpeedSegment::configured(index, start, end, speed, None)
    }

    fn bounds(timeline: &Timeline) -> Vec<(f64, f64, f64)> {
        timeline
            .segments
            .iter()
            .map(|s| (s.start, s.end, s.speed))
            .collect()
    }

    #[test]
    fn full_mode_fills_leading_and_trailing_gaps() {
        let build = build_timeline(vec![seg(0, 5.0, 15.0, 1.5)], 20.0, SpeedMode::Full);
        assert!(build.warnings.is_empty());
        assert_eq!(
            bounds(&build.timeline),
            vec![(0.0, 5.0, 1.0), (5.0, 15.0, 1.5), (15.0, 20.0, 1.0)]
        );
        assert!(build.timeline.segments[0].is_gap());
        assert!(!build.timeline.segments[1].is_gap());
        assert_eq!(build.timeline.gap_count(), 2);

        let expected = 20.0 - 10.0 + 10.0 / 1.5;
        assert!((build.timeline.output_duration() - expected).abs() < 1e-9);
    }

    #[test]
    fn cut_mode_drops_gaps() {
        let build = build_timeline(vec![seg(0, 5.0, 15.0, 1.5)], 20.0, SpeedMode::Cut);
        assert_eq!(bounds(&build.timeline), vec![(5.0, 15.0, 1.5)]);
        assert!((build.timeline.output_duration() - 10.0 / 1.5).abs() < 1e-9);
    }

    #[test]
    fn later_overlapping_segment_is_truncated() {
        let build = build_timeline(
            vec![seg(0, 0.0, 10.0, 2.0), seg(1, 5.0, 20.0, 1.0)],
            20.0,
            SpeedMode::Full,
        );
        assert_eq!(
            bounds(&build.timeline),
            vec![(0.0, 10.0, 2.0), (10.0, 20.0, 1.0)]
        );
        assert_eq!(
            build.warnings,
            vec![TimelineWarning::Truncated {
                declared_index: 1,
                claimed_by: 0,
                original: (5.0, 20.0),
                kept: vec![(10.0, 20.0)],
            }]
        );
    }

    #[test]
    fn earlier_declaration_wins_even_when_it_starts_later() {
        let build = build_timeline(
            vec![seg(0, 10.0, 20.0, 2.0), seg(1, 5.0, 15.0, 0.5)],
            30.0,
            SpeedMode::Cut,
        );
        assert_eq!(
            bounds(&build.timeline),
            vec![(5.0, 10.0, 0.5), (10.0, 20.0, 2.0)]
        );
    }

    #[test]
    fn enclosing_later_segment_is_split_around_earlier_claim() {
        let build = build_timeline(
            vec![seg(0, 10.0, 12.0, 3.0), seg(1, 5.0, 20.0, 1.5)],
            20.0,
            SpeedMode::Full,
        );
        assert_eq!(
            bounds(&build.timeline),
            vec![
                (0.0, 5.0, 1.0),
                (5.0, 10.0, 1.5),
                (10.0, 12.0, 3.0),
                (12.0, 20.0, 1.5)
            ]
        );
        assert_eq!(build.timeline.gap_count(), 1);
    }

    #[test]
    fn fully_covered_segment_is_dropped_with_warning() {
        let build = build_timeline(
            vec![seg(0, 0.0, 10.0, 2.0), seg(1, 2.0, 8.0, 1.5)],
            10.0,
            SpeedMode::Cut,
        );
        assert_eq!(bounds(&build.timeline), vec![(0.0, 10.0, 2.0)]);
        assert!(matches!(
            build.warnings.as_slice(),
            [TimelineWarning::Dropped {
                declared_index: 1,
                claimed_by: 0,
                ..
            }]
        ));
    }

    #[test]
    fn segments_are_sorted_by_start() {
        let build = build_timeline(
            vec![seg(0, 10.0, 12.0, 2.0), seg(1, 1.0, 3.0, 1.5)],
            12.0,
            SpeedMode::Cut,
        );
        assert_eq!(
            bounds(&build.timeline),
            vec![(1.0, 3.0, 1.5), (10.0, 12.0, 2.0)]
        );
    }

    #[test]
    fn segments_are_clipped_to_source_duration() {
        let build = build_timeline(
            vec![seg(0, 15.0, 25.0, 2.0), seg(1, 30.0, 40.0, 2.0)],
            20.0,
            SpeedMode::Full,
        );
        assert_eq!(
            bounds(&build.timeline),
            vec![(0.0, 15.0, 1.0), (15.0, 20.0, 2.0)]
        );
        assert!(matches!(
            build.warnings[0],
            TimelineWarning::ClippedToSource {
                declared_index: 0,
                ..
            }
        ));
        assert!(matches!(
            build.warnings[1],
            TimelineWarning::BeyondSource {
                declared_index: 1,
                ..
            }
        ));
    }

    #[test]
    fn extreme_speed_is_accepted_with_warning() {
        let build = build_timeline(vec![seg(0, 0.0, 10.0, 8.0)], 10.0, SpeedMode::Cut);
        assert_eq!(build.timeline.len(), 1);
        assert_eq!(
            build.warnings,
            vec![TimelineWarning::SpeedOutsideRecommended {
                declared_index: 0,
                speed: 8.0
            }]
        );
    }

    #[test]
    fn built_from_config_text() {
        let config = SpeedConfig::parse(
            r#"{"part":[
                {"timestamp":"00:00:00 - 00:00:10","speed":2.0},
                {"timestamp":"00:00:05 - 00:00:20","speed":1.0}
            ]}"#,
        )
        .unwrap();
        let build = build_timeline(config.segments().unwrap(), 20.0, SpeedMode::Full);
        let [first, second] = build.timeline.segments.as_slice() else {
            panic!("expected two segments");
        };
        assert_eq!((first.start, first.end), (0.0, 10.0));
        assert_eq!((second.start, second.end), (10.0, 20.0));
        assert_eq!(build.timeline.gap_count(), 0);
    }

    fn random_segments(rng: &mut StdRng, duration: f64) -> Vec<SpeedSegment> {
        let count = rng.gen_range(1..8);
        (0..count)
            .map(|index| {
                let start = rng.gen_range(0.0..duration * 1.1);
                let length = rng.gen_range(0.1..duration / 2.0);
                let speed = rng.gen_range(0.3..3.5);
                seg(index, start, start + length, speed)
            })
            .collect()
    }

    #[test]
    fn full_mode_partitions_source_exactly() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let duration = rng.gen_range(5.0..600.0);
            let build = build_timeline(
                random_segments(&mut rng, duration),
                duration,
                SpeedMode::Full,
            );
            let segments = &build.timeline.segments;

            assert_eq!(segments[0].start, 0.0);
            assert_eq!(segments[segments.len() - 1].end, duration);
            for pair in segments.windows(2) {
                assert_eq!(pair[0].end, pair[1].start, "{segments:?}");
            }
            for segment in segments {
                assert!(segment.end > segment.start);
            }
        }
    }

    #[test]
    fn cut_mode_covers_exactly_the_resolved_segments() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..500 {
            let duration = rng.gen_range(5.0..600.0);
            let declared = random_segments(&mut rng, duration);
            let full = build_timeline(declared.clone(), duration, SpeedMode::Full);
            let cut = build_timeline(declared, duration, SpeedMode::Cut);

            let configured: Vec<_> = full
                .timeline
                .segments
                .iter()
                .filter(|s| !s.is_gap())
                .cloned()
                .collect();
            assert_eq!(configured, cut.timeline.segments);

            let configured_total: f64 = configured.iter().map(SpeedSegment::duration).sum();
            assert_eq!(cut.timeline.covered_source_duration(), configured_total);
            assert!(cut.timeline.segments.iter().all(|s| !s.is_gap()));
            for pair in cut.timeline.segments.windows(2) {
                assert!(pair[0].end <= pair[1].start);
            }
        }
    }
}
