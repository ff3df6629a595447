use std::path::Path;

use super::util::format_time;
use super::{FfmpegCompileOutput, FfmpegCompiler, FilterChain};
use crate::speed::plan::{FilterPlan, SegmentPlan};

impl FfmpegCompiler {
    /// One invocation that trims, retimes and concatenates every segment.
    pub fn compile_single_pass(
        &self,
        input: &Path,
        plan: &FilterPlan,
        output: &Path,
    ) -> FfmpegCompileOutput {
        let mut args = Self::base_args();
        Self::push_input(&mut args, input);

        args.push("-filter_complex".to_string());
        args.push(self.build_filter_complex(plan));

        args.push("-map".to_string());
        args.push("[outv]".to_string());
        if self.has_audio() {
            args.push("-map".to_string());
            args.push("[outa]".to_string());
        }

        self.profile.push_to(&mut args, self.has_audio());
        Self::push_output(&mut args, output);

        FfmpegCompileOutput { args }
    }

    pub(super) fn build_filter_complex(&self, plan: &FilterPlan) -> String {
        let mut filters = FilterChain::new();
        let mut concat_inputs = String::new();

        for segment in &plan.segments {
            let idx = segment.index;
            filters.push(self.build_segment_video_filter(segment));
            concat_inputs.push_str(&format!("[v{idx}]"));

            if self.has_audio() {
                filters.push(self.build_segment_audio_filter(segment));
                concat_inputs.push_str(&format!("[a{idx}]"));
            }
        }

        let outputs = if self.has_audio() {
            "[outv][outa]"
        } else {
            "[outv]"
        };
        filters.push(format!(
            "{inputs}concat=n={count}:v=1:a={audio}{outputs}",
            inputs = concat_inputs,
            count = plan.len(),
            audio = u8::from(self.has_audio()),
            outputs = outputs,
        ));

        filters.join()
    }

    fn build_segment_video_filter(&self, segment: &SegmentPlan) -> String {
        let mut chain = format!(
            "[0:v]trim=start={start}:end={end},setpts=PTS-STARTPTS",
            start = format_time(segment.source_start),
            end = format_time(segment.source_end),
        );
        if let Some(retime) = segment.video_filter() {
            chain.push(',');
            chain.push_str(&retime);
        }
        chain.push_str(&format!("[v{}]", segment.index));
        chain
    }

    fn build_segment_audio_filter(&self, segment: &SegmentPlan) -> String {
        let mut chain = format!(
            "[0:a]atrim=start={start}:end={end},asetpts=PTS-STARTPTS",
            start = format_time(segment.source_start),
            end = format_time(segment.source_end),
        );
        if let Some(tempo) = segment.audio_filter() {
            chain.push(',');
            chain.push_str(&tempo);
        }
        chain.push_str(&format!("[a{}]", segment.index));
        chain
    }
}
