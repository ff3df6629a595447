use std::fs;
use std::path::{Path, PathBuf};

use tempfile::{Builder, TempDir};

use super::{ExecutionContext, Executor, verify_output};
use crate::speed::error::{SpeedError, SpeedResult, TranscodeStage};
use crate::speed::ffmpeg::compiler::FfmpegCompiler;
use crate::speed::ffmpeg::services::FfmpegRunOptions;
use crate::speed::logging::log_event;
use crate::speed::plan::{FilterPlan, SegmentPlan};
use crate::ui::prelude::Level;

const CONCAT_LIST: &str = "concat.txt";

pub struct MultiPassExecutor<'a> {
    ctx: ExecutionContext<'a>,
}

/// Intermediate file names for one segment inside the working directory.
struct SegmentFiles {
    extracted: PathBuf,
    retimed: PathBuf,
}

impl SegmentFiles {
    fn new(work_dir: &Path, segment: &SegmentPlan, extension: &str) -> Self {
        Self {
            extracted: work_dir.join(format!("extract_{:03}.{extension}", segment.index)),
            retimed: work_dir.join(format!("speed_{:03}.{extension}", segment.index)),
        }
    }

    /// The clip that ends up in the concat list.
    fn final_clip(&self, segment: &SegmentPlan) -> &Path {
        if segment.is_identity() {
            &self.extracted
        } else {
            &self.retimed
        }
    }
}

impl<'a> MultiPassExecutor<'a> {
    pub fn new(ctx: ExecutionContext<'a>) -> Self {
        Self { ctx }
    }

    fn work_dir(&self) -> SpeedResult<TempDir> {
        let mut builder = Builder::new();
        builder.prefix("vspeed-");
        let result = match &self.ctx.temp_root {
            Some(root) => {
                fs::create_dir_all(root).map_err(|e| {
                    SpeedError::io(format!("creating temp root {}", root.display()), e)
                })?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        };
        result.map_err(|e| SpeedError::io("creating working directory", e))
    }

    fn run_segment(
        &self,
        compiler: &FfmpegCompiler,
        input: &Path,
        segment: &SegmentPlan,
        files: &SegmentFiles,
        total: usize,
    ) -> SpeedResult<()> {
        let extract = compiler.compile_extract(input, segment, &files.extracted);
        log_event(
            Level::Debug,
            "speed.render.extract",
            self.ctx.runner.command_line(&extract.args),
        );
        self.ctx.run(
            &extract.args,
            FfmpegRunOptions::new(
                Some(segment.source_duration()),
                self.ctx.verbose,
                format!("Extracting {}/{}", segment.index + 1, total),
            ),
            TranscodeStage::Extract,
            Some(segment),
        )?;
        verify_output(&files.extracted, TranscodeStage::Extract, Some(segment))?;

        let Some(transform) = compiler.compile_transform(&files.extracted, segment, &files.retimed)
        else {
            return Ok(());
        };
        log_event(
            Level::Debug,
            "speed.render.transform",
            self.ctx.runner.command_line(&transform.args),
        );
        self.ctx.run(
            &transform.args,
            FfmpegRunOptions::new(
                Some(segment.output_duration),
                self.ctx.verbose,
                format!("Retiming {}/{} ({}x)", segment.index + 1, total, segment.speed),
            ),
            TranscodeStage::Transform,
            Some(segment),
        )?;
        verify_output(&files.retimed, TranscodeStage::Transform, Some(segment))
    }
}

fn clip_extension(output: &Path) -> String {
    output
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .unwrap_or("mp4")
        .to_string()
}

impl Executor for MultiPassExecutor<'_> {
    fn execute(&self, plan: &FilterPlan, input: &Path, output: &Path) -> SpeedResult<PathBuf> {
        let work_dir = self.work_dir()?;
        let extension = clip_extension(output);
        let compiler = self.ctx.compiler;

        let mut clips = Vec::with_capacity(plan.len());
        for segment in &plan.segments {
            let files = SegmentFiles::new(work_dir.path(), segment, &extension);
            self.run_segment(compiler, input, segment, &files, plan.len())?;
            clips.push(files.final_clip(segment).to_path_buf());
        }

        let list_path = work_dir.path().join(CONCAT_LIST);
        fs::write(&list_path, FfmpegCompiler::concat_list(&clips))
            .map_err(|e| SpeedError::io(format!("writing {}", list_path.display()), e))?;

        let concat = compiler.compile_concat(&list_path, output);
        log_event(
            Level::Debug,
            "speed.render.concat",
            self.ctx.runner.command_line(&concat.args),
        );
        self.ctx.run(
            &concat.args,
            FfmpegRunOptions::new(
                Some(plan.total_output_duration()),
                self.ctx.verbose,
                format!("Joining {} clips", clips.len()),
            ),
            TranscodeStage::Concat,
            None,
        )?;
        verify_output(output, TranscodeStage::Concat, None)?;
        Ok(output.to_path_buf())
    }

    fn describe(&self, plan: &FilterPlan, input: &Path, output: &Path) -> Vec<Vec<String>> {
        let work_dir = self
            .ctx
            .temp_root
            .clone()
            .unwrap_or_else(std::env::temp_dir)
            .join("vspeed-XXXXXX");
        let extension = clip_extension(output);
        let compiler = self.ctx.compiler;

        let mut commands = Vec::new();
        for segment in &plan.segments {
            let files = SegmentFiles::new(&work_dir, segment, &extension);
            commands.push(
                compiler
                    .compile_extract(input, segment, &files.extracted)
                    .args,
            );
            if let Some(transform) =
                compiler.compile_transform(&files.extracted, segment, &files.retimed)
            {
                commands.push(transform.args);
            }
        }
        commands.push(
            compiler
                .compile_concat(&work_dir.join(CONCAT_LIST), output)
                .args,
        );
        commands
    }
}
