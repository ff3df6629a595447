use std::path::{Path, PathBuf};

use super::util::{escape_concat_path, format_time};
use super::{FfmpegCompileOutput, FfmpegCompiler};
use crate::speed::plan::SegmentPlan;

impl FfmpegCompiler {
    /// Cut a segment's source window into its own clip, unchanged in speed.
    pub fn compile_extract(
        &self,
        input: &Path,
        segment: &SegmentPlan,
        output: &Path,
    ) -> FfmpegCompileOutput {
        let mut args = Self::base_args();
        args.push("-ss".to_string());
        args.push(format_time(segment.source_start));
        Self::push_input(&mut args, input);
        args.push("-t".to_string());
        args.push(format_time(segment.source_duration()));

        args.push("-map".to_string());
        args.push("0:v:0".to_string());
        if self.has_audio() {
            args.push("-map".to_string());
            args.push("0:a:0".to_string());
        }

        if self.stream_copy_extract {
            args.push("-c".to_string());
            args.push("copy".to_string());
        } else {
            self.profile.push_to(&mut args, self.has_audio());
        }
        Self::push_output(&mut args, output);

        FfmpegCompileOutput { args }
    }

    /// Retime an extracted clip. Returns `None` when the segment plays at
    /// normal speed and the clip can be used as-is.
    pub fn compile_transform(
        &self,
        clip: &Path,
        segment: &SegmentPlan,
        output: &Path,
    ) -> Option<FfmpegCompileOutput> {
        let video = segment.video_filter()?;

        let mut args = Self::base_args();
        Self::push_input(&mut args, clip);

        let mut graph = format!("[0:v]{video}[v]");
        if self.has_audio() {
            let audio = segment
                .audio_filter()
                .unwrap_or_else(|| "anull".to_string());
            graph.push_str(&format!(";[0:a]{audio}[a]"));
        }
        args.push("-filter_complex".to_string());
        args.push(graph);

        args.push("-map".to_string());
        args.push("[v]".to_string());
        if self.has_audio() {
            args.push("-map".to_string());
            args.push("[a]".to_string());
        }

        self.profile.push_to(&mut args, self.has_audio());
        Self::push_output(&mut args, output);

        Some(FfmpegCompileOutput { args })
    }

    /// Join clips listed in a concat demuxer file without re-encoding.
    pub fn compile_concat(&self, list_file: &Path, output: &Path) -> FfmpegCompileOutput {
        let mut args = Self::base_args();
        args.extend(
            ["-f", "concat", "-safe", "0"]
                .iter()
                .map(|arg| arg.to_string()),
        );
        Self::push_input(&mut args, list_file);
        args.push("-c".to_string());
        args.push("copy".to_string());
        Self::push_output(&mut args, output);

        FfmpegCompileOutput { args }
    }

    /// Contents of the concat demuxer list, one clip per line in order.
    pub fn concat_list(clips: &[PathBuf]) -> String {
        clips
            .iter()
            .map(|clip| format!("file '{}'\n", escape_concat_path(clip)))
            .collect()
    }
}
