use anyhow::Result;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Scratch directory with fake ffmpeg/ffprobe scripts and a settings file
/// pointing at them.
pub struct TestEnvironment {
    temp_dir: TempDir,
}

const FAKE_FFMPEG: &str = r#"#!/bin/sh
printf '%s\n' "$*" >> "@LOG@"
if [ -n "$FAKE_FFMPEG_FAIL" ]; then
    echo "[AVFilterGraph] Error initializing complex filters" >&2
    exit 1
fi
for last; do :; done
printf 'fake media' > "$last"
"#;

const FAKE_FFPROBE: &str = r#"#!/bin/sh
case "$*" in
    *format=duration*) echo "${FAKE_DURATION:-20.000000}" ;;
    *stream=index*) echo "1" ;;
esac
"#;

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let env = Self {
            temp_dir: tempfile::tempdir()?,
        };

        let log = env.ffmpeg_log();
        env.write_script("ffmpeg", &FAKE_FFMPEG.replace("@LOG@", &log.to_string_lossy()))?;
        env.write_script("ffprobe", FAKE_FFPROBE)?;
        fs::write(
            env.settings_path(),
            format!(
                "ffmpeg = \"{}\"\nffprobe = \"{}\"\ntemp_dir = \"{}\"\n",
                env.path().join("bin/ffmpeg").display(),
                env.path().join("bin/ffprobe").display(),
                env.path().join("work").display(),
            ),
        )?;
        fs::write(env.input_path(), b"source video")?;
        Ok(env)
    }

    fn write_script(&self, name: &str, contents: &str) -> Result<()> {
        let bin = self.path().join("bin");
        fs::create_dir_all(&bin)?;
        let path = bin.join(name);
        fs::write(&path, contents)?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn settings_path(&self) -> PathBuf {
        self.path().join("settings.toml")
    }

    pub fn input_path(&self) -> PathBuf {
        self.path().join("lecture.mp4")
    }

    pub fn ffmpeg_log(&self) -> PathBuf {
        self.path().join("ffmpeg.log")
    }

    /// Argument lines of every fake ffmpeg call so far.
    pub fn ffmpeg_calls(&self) -> Vec<String> {
        fs::read_to_string(self.ffmpeg_log())
            .map(|log| log.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn write_config(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let path = self.path().join(name);
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Files in the scratch directory whose name starts with `prefix`.
    pub fn files_with_prefix(&self, prefix: &str) -> Vec<String> {
        fs::read_dir(self.path())
            .map(|entries| {
                entries
                    .filter_map(|entry| entry.ok())
                    .map(|entry| entry.file_name().to_string_lossy().into_owned())
                    .filter(|name| name.starts_with(prefix))
                    .collect()
            })
            .unwrap_or_default()
    }
}
