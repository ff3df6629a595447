/// Whether a segment came from the config or was synthesized to fill a gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Configured { declared_index: usize },
    Gap,
}

/// A contiguous source range played back at a constant speed.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedSegment {
    /// Start in the source video (seconds)
    pub start: f64,
    /// End in the source video (seconds, exclusive)
    pub end: f64,
    pub speed: f64,
    pub comment: Option<String>,
    pub kind: SegmentKind,
}

impl SpeedSegment {
    pub fn configured(
        declared_index: usize,
        start: f64,
        end: f64,
        speed: f64,
        comment: Option<String>,
    ) -> Self {
        Self {
            start,
            end,
            speed,
            comment,
            kind: SegmentKind::Configured { declared_index },
        }
    }

    pub fn gap(start: f64, end: f64) -> Self {
        Self {
            start,
            end,
            speed: 1.0,
            comment: None,
            kind: SegmentKind::Gap,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Length of this segment once played back at its speed.
    pub fn output_duration(&self) -> f64 {
        self.duration() / self.speed
    }

    pub fn is_gap(&self) -> bool {
        matches!(self.kind, SegmentKind::Gap)
    }

    pub fn declared_index(&self) -> Option<usize> {
        match self.kind {
            SegmentKind::Configured { declared_index } => Some(declared_index),
            SegmentKind::Gap => None,
        }
    }

    pub fn with_bounds(&self, start: f64, end: f64) -> Self {
        Self {
            start,
            end,
            ..self.clone()
        }
    }

    pub fn overlaps(&self, start: f64, end: f64) -> bool {
        self.start < end && self.end > start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_duration_scales_by_speed() {
        let segment = SpeedSegment::configured(0, 5.0, 15.0, 1.5, None);
        assert!((segment.output_duration() - 10.0 / 1.5).abs() < 1e-9);
        assert_eq!(segment.declared_index(), Some(0));

        let gap = SpeedSegment::gap(0.0, 5.0);
        assert!(gap.is_gap());
        assert_eq!(gap.speed, 1.0);
        assert_eq!(gap.output_duration(), 5.0);
    }

    #[test]
    fn overlap_is_half_open() {
        let segment = SpeedSegment::configured(0, 5.0, 10.0, 1.0, None);
        assert!(segment.overlaps(9.0, 12.0));
        assert!(!segment.overlaps(10.0, 12.0));
        assert!(!segment.overlaps(0.0, 5.0));
    }
}
