mod graph;
mod passes;
mod util;


use std::path::Path;

use crate::speed::settings::EncodeProfile;

#[derive(Debug, Clone)]
pub struct FfmpegCompileOutput {
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FilterChain {
    filters: Vec<String>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, filter: String) {
        self.filters.push(filter);
    }

    pub fn join(&self) -> String {
        self.filters.join("; ")
    }
}

/// Stream layout of the source that the generated commands must respect.
#[derive(Debug, Clone, Copy)]
pub struct StreamLayout {
    pub has_audio: bool,
}

impl Default for StreamLayout {
    fn default() -> Self {
        Self { has_audio: true }
    }
}

/// Turns filter plans into ffmpeg argument vectors.
pub struct FfmpegCompiler {
    profile: EncodeProfile,
    layout: StreamLayout,
    stream_copy_extract: bool,
}

impl FfmpegCompiler {
    pub fn new(profile: EncodeProfile, layout: StreamLayout) -> Self {
        Self {
            profile,
            layout,
            stream_copy_extract: false,
        }
    }

    /// Cut segments with `-c copy` instead of re-encoding them. Faster, but
    /// cuts snap to keyframes.
    pub fn with_stream_copy_extract(mut self, enabled: bool) -> Self {
        self.stream_copy_extract = enabled;
        self
    }

    pub fn has_audio(&self) -> bool {
        self.layout.has_audio
    }

    fn base_args() -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-y".to_string(),
        ]
    }

    fn push_input(args: &mut Vec<String>, input: &Path) {
        args.push("-i".to_string());
        args.push(input.to_string_lossy().into_owned());
    }

    fn push_output(args: &mut Vec<String>, output: &Path) {
        if is_mp4_family(output) {
            args.push("-movflags".to_string());
            args.push("+faststart".to_string());
        }
        args.push(output.to_string_lossy().into_owned());
    }
}

fn is_mp4_family(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "mp4" | "m4v" | "mov"))
        .unwrap_or(false)
}
