use std::path::PathBuf;

use thiserror::Error;

pub type SpeedResult<T> = Result<T, SpeedError>;

#[derive(Error, Debug)]
pub enum SpeedError {
    #[error("Invalid time format '{input}': {reason}")]
    InvalidTimeFormat { input: String, reason: String },

    #[error("Invalid timestamp range '{input}': expected '<start> - <end>'")]
    InvalidRangeFormat { input: String },

    #[error("Invalid segment #{index} ({timestamp}): {reason}")]
    InvalidSegment {
        index: usize,
        timestamp: String,
        reason: String,
    },

    #[error("Failed to parse speed config: {0}")]
    ConfigParseError(String),

    #[error("Degenerate segment #{index} ({start:.3}s - {end:.3}s): {reason}")]
    DegenerateSegmentError {
        index: usize,
        start: f64,
        end: f64,
        reason: String,
    },

    #[error("Failed to probe {}: {reason}", .path.display())]
    ProbeError { path: PathBuf, reason: String },

    #[error("{}", describe_transcode_failure(.stage, .segment, .exit_code, .message))]
    TranscodeError {
        stage: TranscodeStage,
        segment: Option<SegmentRef>,
        exit_code: Option<i32>,
        message: String,
    },

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    InvalidInput(String),
}

/// Which ffmpeg invocation of a run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscodeStage {
    SinglePass,
    Extract,
    Transform,
    Concat,
}

impl TranscodeStage {
    pub fn as_str(self) -> &'static str {
        match self {
            TranscodeStage::SinglePass => "single-pass render",
            TranscodeStage::Extract => "segment extraction",
            TranscodeStage::Transform => "segment speed transform",
            TranscodeStage::Concat => "concatenation",
        }
    }
}

/// Segment index and source range attached to a transcode failure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentRef {
    pub index: usize,
    pub start: f64,
    pub end: f64,
}

fn describe_transcode_failure(
    stage: &TranscodeStage,
    segment: &Option<SegmentRef>,
    exit_code: &Option<i32>,
    message: &str,
) -> String {
    let mut text = format!("ffmpeg {} failed", stage.as_str());
    if let Some(segment) = segment {
        text.push_str(&format!(
            " for segment #{} ({:.3}s - {:.3}s)",
            segment.index, segment.start, segment.end
        ));
    }
    match exit_code {
        Some(code) => text.push_str(&format!(" with exit code {code}")),
        None => text.push_str(" without an exit code"),
    }
    let message = message.trim();
    if !message.is_empty() {
        text.push_str(": ");
        text.push_str(message);
    }
    text
}

impl SpeedError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        SpeedError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn time_format(input: &str, reason: impl Into<String>) -> Self {
        SpeedError::InvalidTimeFormat {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    /// Validation failures happen before any transcoder call.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SpeedError::InvalidTimeFormat { .. }
                | SpeedError::InvalidRangeFormat { .. }
                | SpeedError::InvalidSegment { .. }
                | SpeedError::ConfigParseError(_)
                | SpeedError::DegenerateSegmentError { .. }
        )
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            _ if self.is_validation() => 2,
            SpeedError::ProbeError { .. } => 3,
            SpeedError::TranscodeError { .. } => 4,
            _ => 1,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            SpeedError::InvalidTimeFormat { .. } => "speed.error.time_format",
            SpeedError::InvalidRangeFormat { .. } => "speed.error.range_format",
            SpeedError::InvalidSegment { .. } => "speed.error.segment",
            SpeedError::ConfigParseError(_) => "speed.error.config",
            SpeedError::DegenerateSegmentError { .. } => "speed.error.degenerate",
            SpeedError::ProbeError { .. } => "speed.error.probe",
            SpeedError::TranscodeError { .. } => "speed.error.transcode",
            SpeedError::Io { .. } => "speed.error.io",
            SpeedError::InvalidInput(_) => "speed.error.input",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcode_error_mentions_segment_range_and_exit_code() {
        let err = SpeedError::TranscodeError {
            stage: TranscodeStage::Transform,
            segment: Some(SegmentRef {
                index: 2,
                start: 5.0,
                end: 15.0,
            }),
            exit_code: Some(1),
            message: "Invalid argument\n".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("segment #2"));
        assert!(text.contains("5.000s - 15.000s"));
        assert!(text.contains("exit code 1"));
        assert!(text.ends_with("Invalid argument"));
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn validation_errors_share_exit_code() {
        let err = SpeedError::InvalidRangeFormat {
            input: "00:10".to_string(),
        };
        assert!(err.is_validation());
        assert_eq!(err.exit_code(), 2);

        let probe = SpeedError::ProbeError {
            path: PathBuf::from("in.mp4"),
            reason: "no such file".to_string(),
        };
        assert!(!probe.is_validation());
        assert_eq!(probe.exit_code(), 3);
    }
}
