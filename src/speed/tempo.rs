//! Splits a playback speed into `atempo` stages.
//!
//! ffmpeg's `atempo` only keeps pitch natural for ratios in `[0.5, 2.0]`, so
//! larger changes are expressed as a chain of factors whose product is the
//! requested speed.

use std::fmt;

use super::error::{SpeedError, SpeedResult};

pub const MIN_TEMPO: f64 = 0.5;
pub const MAX_TEMPO: f64 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct TempoChain {
    factors: Vec<f64>,
}

impl TempoChain {
    pub fn decompose(speed: f64) -> SpeedResult<Self> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(SpeedError::InvalidInput(format!(
                "tempo must be a positive finite number, got {speed}"
            )));
        }

        let mut factors = Vec::new();
        let mut remaining = speed;
        while remaining > MAX_TEMPO {
            factors.push(MAX_TEMPO);
            remaining /= MAX_TEMPO;
        }
        while remaining < MIN_TEMPO {
            factors.push(MIN_TEMPO);
            remaining /= MIN_TEMPO;
        }
        factors.push(remaining);

        Ok(Self { factors })
    }

    pub fn factors(&self) -> &[f64] {
        &self.factors
    }

    #[cfg(test)]
    pub fn product(&self) -> f64 {
        self.factors.iter().product()
    }

    pub fn is_identity(&self) -> bool {
        self.factors.iter().all(|factor| *factor == 1.0)
    }

    /// Comma-joined `atempo` filters, or `None` for an identity chain.
    pub fn to_filter(&self) -> Option<String> {
        if self.is_identity() {
            return None;
        }
        Some(
            self.factors
                .iter()
                .map(|factor| format!("atempo={}", format_factor(*factor)))
                .collect::<Vec<_>>()
                .join(","),
        )
    }
}

impl fmt::Display for TempoChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .factors
            .iter()
            .map(|factor| format!("{}x", format_factor(*factor)))
            .collect();
        write!(f, "{}", parts.join(" * "))
    }
}

/// Shortest representation that still carries enough precision for ffmpeg.
pub fn format_factor(value: f64) -> String {
    let text = format!("{value:.9}");
    let text = text.trim_end_matches('0');
    match text.strip_suffix('.') {
        Some(whole) => format!("{whole}.0"),
        None => text.to_string(),
    }
}
