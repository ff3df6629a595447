use std::borrow::Cow;
use std::fs;
use std::path::Path;

use encoding_rs::{GBK, WINDOWS_1252};
use serde::Deserialize;

use super::error::{SpeedError, SpeedResult};
use super::segment::SpeedSegment;
use super::timespec::parse_timestamp_range;

/// Speeds outside this range are accepted but audibly degrade tempo scaling.
pub const RECOMMENDED_SPEED_RANGE: std::ops::RangeInclusive<f64> = 0.25..=4.0;

/// Raw `{"part": [...]}` document as written by users.
#[derive(Debug, Clone, Deserialize)]
pub struct SpeedConfig {
    #[serde(default)]
    pub part: Vec<RawSegment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSegment {
    pub timestamp: String,
    #[serde(default = "default_speed")]
    pub speed: f64,
    #[serde(default)]
    pub comment: Option<String>,
}

fn default_speed() -> f64 {
    1.0
}

fn decode_config(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    if let Ok(contents) = std::str::from_utf8(bytes) {
        return Cow::Borrowed(contents);
    }
    for encoding in [GBK, WINDOWS_1252] {
        if let Some(contents) = encoding.decode_without_bom_handling_and_without_replacement(bytes)
        {
            return contents;
        }
    }
    String::from_utf8_lossy(bytes)
}

impl SpeedConfig {
    /// Load a config given either a file path or inline JSON.
    pub fn load(source: &str) -> SpeedResult<Self> {
        let path = Path::new(source);
        if path.is_file() {
            Self::load_from_path(path)
        } else {
            Self::parse(source)
        }
    }

    /// Read a config file. UTF-8 (with or without BOM) is tried first, then
    /// GBK, then Windows-1252, which accepts any byte sequence.
    pub fn load_from_path(path: &Path) -> SpeedResult<Self> {
        let bytes = fs::read(path)
            .map_err(|e| SpeedError::io(format!("Failed to read config {}", path.display()), e))?;
        let contents = decode_config(&bytes);
        Self::parse(&contents).map_err(|err| match err {
            SpeedError::ConfigParseError(reason) => {
                SpeedError::ConfigParseError(format!("{}: {reason}", path.display()))
            }
            other => other,
        })
    }

    pub fn parse(contents: &str) -> SpeedResult<Self> {
        let config: SpeedConfig = serde_json::from_str(contents.trim_start_matches('\u{feff}'))
            .map_err(|e| SpeedError::ConfigParseError(e.to_string()))?;
        if config.part.is_empty() {
            return Err(SpeedError::ConfigParseError(
                "config has no segments in its 'part' array".to_string(),
            ));
        }
        Ok(config)
    }

    /// Validate every record, in declaration order.
    pub fn segments(&self) -> SpeedResult<Vec<SpeedSegment>> {
        self.part
            .iter()
            .enumerate()
            .map(|(index, raw)| raw.to_segment(index))
            .collect()
    }
}

impl RawSegment {
    pub fn to_segment(&self, index: usize) -> SpeedResult<SpeedSegment> {
        let (start, end) = parse_timestamp_range(&self.timestamp)?;
        let invalid = |reason: String| SpeedError::InvalidSegment {
            index,
            timestamp: self.timestamp.clone(),
            reason,
        };

        if start >= end {
            return Err(invalid(format!(
                "start ({start:.3}s) must be before end ({end:.3}s)"
            )));
        }
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(invalid(format!(
                "speed must be a positive number, got {}",
                self.speed
            )));
        }

        Ok(SpeedSegment::configured(
            index,
            start,
            end,
            self.speed,
            self.comment.clone(),
        ))
    }
}
