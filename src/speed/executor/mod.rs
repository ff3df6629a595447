//! Executors turn a filter plan into a rendered file.
//!
//! Single-pass renders everything with one `filter_complex` invocation.
//! Multi-pass extracts each segment, retimes it, and joins the clips with
//! the concat demuxer. Both write only to the path they are handed; the
//! orchestrator decides where that is.

mod multi_pass;
mod single_pass;

use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::error::{SegmentRef, SpeedError, SpeedResult, TranscodeStage};
use super::ffmpeg::compiler::FfmpegCompiler;
use super::ffmpeg::services::{FfmpegFailure, FfmpegRunOptions, FfmpegRunner};
use super::plan::{FilterPlan, SegmentPlan};

pub use self::multi_pass::MultiPassExecutor;
pub use self::single_pass::SinglePassExecutor;

/// How the plan is handed to ffmpeg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Single-pass for small plans, multi-pass for large ones
    #[default]
    Auto,
    /// One ffmpeg invocation with a combined filter graph
    SinglePass,
    /// Extract, retime and concatenate each segment separately
    MultiPass,
}

impl Strategy {
    /// Pick a concrete strategy for a plan of `segment_count` segments.
    pub fn resolve(self, segment_count: usize, max_single_pass_segments: usize) -> Strategy {
        match self {
            Strategy::Auto if segment_count <= max_single_pass_segments => Strategy::SinglePass,
            Strategy::Auto => Strategy::MultiPass,
            other => other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Auto => "auto",
            Strategy::SinglePass => "single-pass",
            Strategy::MultiPass => "multi-pass",
        }
    }
}

pub trait Executor {
    /// Render `plan` from `input` into `output` and return the written path.
    fn execute(&self, plan: &FilterPlan, input: &Path, output: &Path) -> SpeedResult<PathBuf>;

    /// The ffmpeg argument vectors `execute` would run, in order.
    fn describe(&self, plan: &FilterPlan, input: &Path, output: &Path) -> Vec<Vec<String>>;
}

/// Everything an executor needs besides the plan itself.
pub struct ExecutionContext<'a> {
    pub runner: &'a dyn FfmpegRunner,
    pub compiler: &'a FfmpegCompiler,
    /// Parent for multi-pass working directories
    pub temp_root: Option<PathBuf>,
    pub verbose: bool,
}

impl<'a> ExecutionContext<'a> {
    pub fn executor(self, strategy: Strategy) -> Box<dyn Executor + 'a> {
        match strategy {
            Strategy::MultiPass => Box::new(MultiPassExecutor::new(self)),
            Strategy::SinglePass | Strategy::Auto => Box::new(SinglePassExecutor::new(self)),
        }
    }

    fn run(
        &self,
        args: &[String],
        options: FfmpegRunOptions,
        stage: TranscodeStage,
        segment: Option<&SegmentPlan>,
    ) -> SpeedResult<()> {
        self.runner
            .run(args, options)
            .map_err(|failure| transcode_error(stage, segment, failure))
    }
}

pub(crate) fn segment_ref(segment: &SegmentPlan) -> SegmentRef {
    SegmentRef {
        index: segment.index,
        start: segment.source_start,
        end: segment.source_end,
    }
}

fn transcode_error(
    stage: TranscodeStage,
    segment: Option<&SegmentPlan>,
    failure: FfmpegFailure,
) -> SpeedError {
    SpeedError::TranscodeError {
        stage,
        segment: segment.map(segment_ref),
        exit_code: failure.exit_code,
        message: failure.message,
    }
}

/// ffmpeg can exit zero without writing anything useful (e.g. an empty
/// selection); treat a missing or empty file as a failed stage.
fn verify_output(
    path: &Path,
    stage: TranscodeStage,
    segment: Option<&SegmentPlan>,
) -> SpeedResult<()> {
    let produced = fs::metadata(path)
        .map(|meta| meta.is_file() && meta.len() > 0)
        .unwrap_or(false);
    if produced {
        return Ok(());
    }
    Err(SpeedError::TranscodeError {
        stage,
        segment: segment.map(segment_ref),
        exit_code: Some(0),
        message: format!("ffmpeg produced no output at {}", path.display()),
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::fs;
    use std::path::Path;

    use crate::speed::ffmpeg::services::{FfmpegFailure, FfmpegRunOptions, FfmpegRunner};

    /// Records invocations and writes a small file to each output path.
    #[derive(Default)]
    pub struct RecordingRunner {
        pub calls: RefCell<Vec<Vec<String>>>,
        /// Fail the n-th call (0-based) with this exit code
        pub fail_at: Option<(usize, i32)>,
        /// Succeed without writing the output file
        pub skip_output: bool,
    }

    impl RecordingRunner {
        pub fn failing_at(call: usize, exit_code: i32) -> Self {
            Self {
                fail_at: Some((call, exit_code)),
                ..Self::default()
            }
        }

        pub fn calls(&self) -> Vec<Vec<String>> {
            self.calls.borrow().clone()
        }
    }

    impl FfmpegRunner for RecordingRunner {
        fn run(&self, args: &[String], _options: FfmpegRunOptions) -> Result<(), FfmpegFailure> {
            let call = self.calls.borrow().len();
            self.calls.borrow_mut().push(args.to_vec());

            if let Some((at, code)) = self.fail_at {
                if at == call {
                    return Err(FfmpegFailure {
                        exit_code: Some(code),
                        message: "Conversion failed!".to_string(),
                    });
                }
            }

            if !self.skip_output {
                if let Some(output) = args.last() {
                    fs::write(Path::new(output), b"media").map_err(|e| FfmpegFailure {
                        exit_code: None,
                        message: e.to_string(),
                    })?;
                }
            }
            Ok(())
        }

        fn command_line(&self, args: &[String]) -> String {
            format!("ffmpeg {}", args.join(" "))
        }
    }
}
