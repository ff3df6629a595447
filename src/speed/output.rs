use std::fs;
use std::path::{Path, PathBuf};

use tempfile::{Builder, TempPath};

use super::error::{SpeedError, SpeedResult};
use super::mode::SpeedMode;

/// Output path for a run: the explicit path when given, otherwise
/// `<stem><mode suffix>.<ext>` next to the input.
pub fn resolve_output_path(
    explicit: Option<&Path>,
    input: &Path,
    mode: SpeedMode,
) -> SpeedResult<PathBuf> {
    if let Some(provided) = explicit {
        return Ok(provided.to_path_buf());
    }

    let stem = input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| {
            SpeedError::InvalidInput(format!(
                "Input path {} has no valid file name",
                input.display()
            ))
        })?;
    let extension = input
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("mp4");

    let mut output = input.to_path_buf();
    output.set_file_name(format!("{stem}{}.{extension}", mode.output_suffix()));
    Ok(output)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Refuse to render over the source video. Any other existing file is
/// replaced once the new render succeeds.
pub fn check_output_destination(output: &Path, input: &Path) -> SpeedResult<()> {
    if same_file(output, input) {
        return Err(SpeedError::InvalidInput(format!(
            "Output path {} would overwrite the source video",
            output.display()
        )));
    }
    Ok(())
}

/// Check the destination and create its directory. An existing output is
/// left in place until the new one has been rendered.
pub fn prepare_output_destination(output: &Path, input: &Path) -> SpeedResult<()> {
    check_output_destination(output, input)?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            SpeedError::io(
                format!("Failed to create output directory {}", parent.display()),
                e,
            )
        })?;
    }

    Ok(())
}

/// A hidden file next to the final output that receives the render.
/// Dropping it without [`StagedOutput::commit`] deletes it.
pub struct StagedOutput {
    path: TempPath,
}

impl StagedOutput {
    pub fn create(output: &Path) -> SpeedResult<Self> {
        let dir = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let suffix = output
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();

        let file = Builder::new()
            .prefix(".vspeed-")
            .suffix(&suffix)
            .tempfile_in(dir)
            .map_err(|e| {
                SpeedError::io(format!("Failed to stage output in {}", dir.display()), e)
            })?;
        Ok(Self {
            path: file.into_temp_path(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Move the rendered file to its final location.
    pub fn commit(self, output: &Path) -> SpeedResult<()> {
        self.path.persist(output).map_err(|e| {
            SpeedError::io(
                format!("Failed to move rendered file to {}", output.display()),
                e.error,
            )
        })
    }
}
