use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::executor::Strategy;
use super::mode::SpeedMode;
use super::plan::DEFAULT_MIN_SEGMENT_SECONDS;

/// Engine settings, read once at startup and passed down explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// ffmpeg binary (name on PATH or absolute path)
    pub ffmpeg: PathBuf,
    /// ffprobe binary (name on PATH or absolute path)
    pub ffprobe: PathBuf,
    /// Mode used when `--mode` is not given
    pub default_mode: SpeedMode,
    /// Strategy used when `--strategy` is not given
    pub strategy: Strategy,
    /// Auto strategy switches to multi-pass above this many segments
    pub max_single_pass_segments: usize,
    /// Shortest segment (source or output seconds) that may be rendered
    pub min_segment_seconds: f64,
    /// Parent directory for multi-pass temporaries (system temp dir if unset)
    pub temp_dir: Option<PathBuf>,
    /// Cut multi-pass segments with stream copy instead of re-encoding
    pub stream_copy_extract: bool,
    #[serde(flatten)]
    pub encode: EncodeProfile,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            default_mode: SpeedMode::default(),
            strategy: Strategy::default(),
            max_single_pass_segments: Self::DEFAULT_MAX_SINGLE_PASS_SEGMENTS,
            min_segment_seconds: DEFAULT_MIN_SEGMENT_SECONDS,
            temp_dir: None,
            stream_copy_extract: false,
            encode: EncodeProfile::default(),
        }
    }
}

impl EngineSettings {
    pub const DEFAULT_MAX_SINGLE_PASS_SEGMENTS: usize = 48;

    /// Load from an explicit path, or from the default location when present.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_from_path(path),
            None => match default_settings_path() {
                Some(path) if path.exists() => Self::load_from_path(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        let settings: Self = toml::from_str(&contents)
            .with_context(|| format!("parsing settings {}", path.display()))?;
        Ok(settings.sanitized())
    }

    fn sanitized(mut self) -> Self {
        if !self.min_segment_seconds.is_finite() || self.min_segment_seconds <= 0.0 {
            self.min_segment_seconds = DEFAULT_MIN_SEGMENT_SECONDS;
        }
        if self.max_single_pass_segments == 0 {
            self.max_single_pass_segments = Self::DEFAULT_MAX_SINGLE_PASS_SEGMENTS;
        }
        self.encode = self.encode.sanitized();
        self
    }
}

pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("vspeed").join("settings.toml"))
}

/// Codec settings applied to every re-encoding ffmpeg invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeProfile {
    pub video_codec: String,
    pub preset: String,
    pub crf: u8,
    pub audio_codec: String,
    pub audio_bitrate: String,
}

impl Default for EncodeProfile {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            preset: "medium".to_string(),
            crf: Self::DEFAULT_CRF,
            audio_codec: "aac".to_string(),
            audio_bitrate: "192k".to_string(),
        }
    }
}

impl EncodeProfile {
    pub const DEFAULT_CRF: u8 = 18;
    const MAX_CRF: u8 = 51;

    fn sanitized(mut self) -> Self {
        if self.crf > Self::MAX_CRF {
            self.crf = Self::DEFAULT_CRF;
        }
        self
    }

    pub fn push_to(&self, args: &mut Vec<String>, with_audio: bool) {
        args.push("-c:v".to_string());
        args.push(self.video_codec.clone());
        if !self.preset.is_empty() {
            args.push("-preset".to_string());
            args.push(self.preset.clone());
        }
        args.push("-crf".to_string());
        args.push(self.crf.to_string());
        args.push("-pix_fmt".to_string());
        args.push("yuv420p".to_string());
        if with_audio {
            args.push("-c:a".to_string());
            args.push(self.audio_codec.clone());
            args.push("-b:a".to_string());
            args.push(self.audio_bitrate.clone());
        }
    }
}
