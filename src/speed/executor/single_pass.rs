use std::path::{Path, PathBuf};

use super::{ExecutionContext, Executor, verify_output};
use crate::speed::error::{SpeedResult, TranscodeStage};
use crate::speed::ffmpeg::services::FfmpegRunOptions;
use crate::speed::logging::log_event;
use crate::speed::plan::FilterPlan;
use crate::ui::prelude::Level;

pub struct SinglePassExecutor<'a> {
    ctx: ExecutionContext<'a>,
}

impl<'a> SinglePassExecutor<'a> {
    pub fn new(ctx: ExecutionContext<'a>) -> Self {
        Self { ctx }
    }
}

impl Executor for SinglePassExecutor<'_> {
    fn execute(&self, plan: &FilterPlan, input: &Path, output: &Path) -> SpeedResult<PathBuf> {
        let compiled = self.ctx.compiler.compile_single_pass(input, plan, output);
        log_event(
            Level::Debug,
            "speed.render.ffmpeg",
            self.ctx.runner.command_line(&compiled.args),
        );

        let options = FfmpegRunOptions::new(
            Some(plan.total_output_duration()),
            self.ctx.verbose,
            format!("Rendering {} segments", plan.len()),
        );
        self.ctx
            .run(&compiled.args, options, TranscodeStage::SinglePass, None)?;
        verify_output(output, TranscodeStage::SinglePass, None)?;
        Ok(output.to_path_buf())
    }

    fn describe(&self, plan: &FilterPlan, input: &Path, output: &Path) -> Vec<Vec<String>> {
        vec![self.ctx.compiler.compile_single_pass(input, plan, output).args]
    }
}
