use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use indicatif::{ProgressBar, ProgressStyle};
use shell_words::join;

/// Why a single ffmpeg invocation failed.
#[derive(Debug, Clone, PartialEq)]
pub struct FfmpegFailure {
    pub exit_code: Option<i32>,
    pub message: String,
}

pub trait FfmpegRunner {
    fn run(&self, args: &[String], options: FfmpegRunOptions) -> Result<(), FfmpegFailure>;

    /// Shell-quoted command line for `args`, used by dry runs and debug output.
    fn command_line(&self, args: &[String]) -> String;
}

#[derive(Debug, Clone, Default)]
pub struct FfmpegRunOptions {
    pub total_duration: Option<f64>,
    pub verbose: bool,
    pub label: String,
}

impl FfmpegRunOptions {
    pub fn new(total_duration: Option<f64>, verbose: bool, label: impl Into<String>) -> Self {
        Self {
            total_duration,
            verbose,
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SystemFfmpegRunner {
    binary: PathBuf,
}

impl SystemFfmpegRunner {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for SystemFfmpegRunner {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegRunner for SystemFfmpegRunner {
    fn run(&self, args: &[String], options: FfmpegRunOptions) -> Result<(), FfmpegFailure> {
        let mut child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| FfmpegFailure {
                exit_code: None,
                message: format!("Failed to spawn {}: {e}", self.binary.display()),
            })?;

        let Some(stderr) = child.stderr.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(FfmpegFailure {
                exit_code: None,
                message: "ffmpeg stderr was not captured".to_string(),
            });
        };

        let pb = if options.verbose {
            None
        } else {
            options
                .total_duration
                .map(|duration| progress_bar(duration, &options.label))
        };

        let mut last_line = String::new();
        let mut error_lines: Vec<String> = Vec::new();
        let read_result = read_ffmpeg_stderr(
            stderr,
            options.verbose,
            &pb,
            &mut last_line,
            &mut error_lines,
        );

        let status = child.wait().map_err(|e| FfmpegFailure {
            exit_code: None,
            message: format!("Failed to wait for ffmpeg: {e}"),
        })?;

        if let Some(pb) = pb {
            if status.success() {
                pb.finish_and_clear();
            } else {
                pb.abandon();
            }
        }

        if !status.success() {
            let error_msg = if !error_lines.is_empty() {
                error_lines.join("\n")
            } else {
                last_line
            };
            return Err(FfmpegFailure {
                exit_code: status.code(),
                message: error_msg.trim().to_string(),
            });
        }

        read_result.map_err(|e| FfmpegFailure {
            exit_code: status.code(),
            message: format!("Failed to read ffmpeg stderr: {e}"),
        })
    }

    fn command_line(&self, args: &[String]) -> String {
        let mut words = Vec::with_capacity(args.len() + 1);
        words.push(self.binary.to_string_lossy().into_owned());
        words.extend(args.iter().cloned());
        join(words)
    }
}

fn progress_bar(duration: f64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new((duration * 1000.0).max(1.0) as u64);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent:>3}% ({eta}) {msg}",
    ) {
        pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏ "));
    }
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb.set_message(label.to_string());
    pb
}

fn read_ffmpeg_stderr<R: Read>(
    mut stderr: R,
    verbose: bool,
    pb: &Option<ProgressBar>,
    last_line: &mut String,
    error_lines: &mut Vec<String>,
) -> std::io::Result<()> {
    let mut buffer = [0u8; 4096];
    let mut accumulated = String::new();

    loop {
        let bytes_read = stderr.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }

        let chunk = String::from_utf8_lossy(&buffer[..bytes_read]);
        accumulated.push_str(&chunk);

        while let Some(pos) = accumulated.find(['\r', '\n']) {
            let line = accumulated[..pos].to_string();
            accumulated = accumulated[pos + 1..].to_string();

            if line.is_empty() {
                continue;
            }

            if verbose {
                eprintln!("{line}");
            }

            if line.contains("error") || line.contains("Error") || line.contains("ERROR") {
                error_lines.push(line.clone());
            }

            if let Some(pb) = pb {
                if let Some(progress) = parse_ffmpeg_progress(&line) {
                    pb.set_position((progress * 1000.0) as u64);
                    if let Some(speed) = parse_ffmpeg_speed(&line) {
                        pb.set_message(speed);
                    }
                }
            }

            *last_line = line;
        }
    }

    if !accumulated.trim().is_empty() {
        *last_line = accumulated;
    }

    Ok(())
}

fn parse_ffmpeg_progress(line: &str) -> Option<f64> {
    let time_start = line.find("time=")?;
    let time_str = &line[time_start + 5..];
    let time_end = time_str.find(' ').unwrap_or(time_str.len());
    parse_time_to_seconds(&time_str[..time_end])
}

fn parse_time_to_seconds(time_str: &str) -> Option<f64> {
    let parts: Vec<&str> = time_str.split(':').collect();
    if parts.len() != 3 {
        return None;
    }

    let hours: f64 = parts[0].parse().ok()?;
    let minutes: f64 = parts[1].parse().ok()?;
    let seconds: f64 = parts[2].parse().ok()?;

    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

fn parse_ffmpeg_speed(line: &str) -> Option<String> {
    let speed_start = line.find("speed=")?;
    let speed_str = line[speed_start + 6..].trim_start();
    let speed_end = speed_str.find('x')?;
    Some(speed_str[..speed_end + 1].to_string())
}
