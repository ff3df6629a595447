use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// How unconfigured source ranges end up in the output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpeedMode {
    /// Keep the whole source; gaps play at normal speed
    #[default]
    Full,
    /// Keep only the configured segments
    Cut,
}

impl SpeedMode {
    /// Get output file suffix for this mode
    pub fn output_suffix(&self) -> &str {
        match self {
            SpeedMode::Full => "_speed",
            SpeedMode::Cut => "_cut",
        }
    }

    pub fn keeps_gaps(&self) -> bool {
        matches!(self, SpeedMode::Full)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SpeedMode::Full => "full",
            SpeedMode::Cut => "cut",
        }
    }
}
