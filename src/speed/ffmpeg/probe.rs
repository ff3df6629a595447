use std::path::{Path, PathBuf};
use std::process::Command;

use crate::speed::error::{SpeedError, SpeedResult};

/// What the pipeline needs to know about a source before planning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaInfo {
    pub duration: f64,
    pub has_audio: bool,
}

pub trait MediaProbe {
    fn probe(&self, path: &Path) -> SpeedResult<MediaInfo>;
}

#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    binary: PathBuf,
}

impl FfprobeProbe {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn run(&self, path: &Path, args: &[&str]) -> SpeedResult<String> {
        let output = Command::new(&self.binary)
            .args(args)
            .arg(path)
            .output()
            .map_err(|e| {
                probe_error(
                    path,
                    format!("failed to run {}: {e}", self.binary.display()),
                )
            })?;

        if !output.status.success() {
            return Err(probe_error(
                path,
                format!(
                    "ffprobe exited with status {:?}: {}",
                    output.status.code(),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        String::from_utf8(output.stdout)
            .map_err(|_| probe_error(path, "ffprobe returned non-UTF8 output"))
    }

    pub fn probe_duration_seconds(&self, path: &Path) -> SpeedResult<f64> {
        let stdout = self.run(
            path,
            &[
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ],
        )?;
        parse_duration(path, &stdout)
    }

    pub fn probe_has_audio(&self, path: &Path) -> SpeedResult<bool> {
        let stdout = self.run(
            path,
            &[
                "-v",
                "error",
                "-select_streams",
                "a",
                "-show_entries",
                "stream=index",
                "-of",
                "csv=p=0",
            ],
        )?;
        Ok(!stdout.trim().is_empty())
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl MediaProbe for FfprobeProbe {
    fn probe(&self, path: &Path) -> SpeedResult<MediaInfo> {
        Ok(MediaInfo {
            duration: self.probe_duration_seconds(path)?,
            has_audio: self.probe_has_audio(path)?,
        })
    }
}

fn probe_error(path: &Path, reason: impl Into<String>) -> SpeedError {
    SpeedError::ProbeError {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

fn parse_duration(path: &Path, stdout: &str) -> SpeedResult<f64> {
    let value = stdout.trim();
    let duration: f64 = value
        .parse()
        .map_err(|_| probe_error(path, format!("unexpected duration '{value}'")))?;
    if !duration.is_finite() || duration <= 0.0 {
        return Err(probe_error(
            path,
            format!("source reports a non-positive duration ({value})"),
        ));
    }
    Ok(duration)
}
