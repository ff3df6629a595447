pub mod compiler;
pub mod probe;
pub mod services;

use std::path::{Path, PathBuf};

use crate::speed::error::{SpeedError, SpeedResult};

/// Resolve a configured tool (bare name or path) to an executable.
pub fn locate_tool(binary: &Path) -> SpeedResult<PathBuf> {
    which::which(binary).map_err(|e| {
        SpeedError::InvalidInput(format!(
            "{} not found ({e}). Install ffmpeg or set its path in the settings file.",
            binary.display()
        ))
    })
}
