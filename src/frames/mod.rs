//! Per-frame probe results and the helpers that turn them into dense arrays.

pub mod repair;

use serde::{Deserialize, Serialize};

pub use repair::{is_dense, repair};

/// Mean color of a frame as produced by the probe (r, g, b).
pub type MeanColor = [f64; 3];

/// One frame's difference/mean-color probe result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameSample {
    pub frame_number: u32,
    pub difference_value: Option<f64>,
    pub mean_color: Option<MeanColor>,
}

impl FrameSample {
    pub fn new(frame_number: u32, difference_value: f64, mean_color: MeanColor) -> Self {
        Self {
            frame_number,
            difference_value: Some(difference_value),
            mean_color: Some(mean_color),
        }
    }

    /// Stand-in used when the very first frame of a scan is missing.
    pub fn zero(frame_number: u32) -> Self {
        Self::new(frame_number, 0.0, [0.0, 0.0, 0.0])
    }
}

/// Difference values of a dense sample array; unset values read as 0.
pub fn difference_values(samples: &[FrameSample]) -> Vec<f64> {
    samples
        .iter()
        .map(|s| s.difference_value.unwrap_or(0.0))
        .collect()
}

/// Mean colors of a dense sample array; unset colors read as black.
pub fn mean_colors(samples: &[FrameSample]) -> Vec<MeanColor> {
    samples
        .iter()
        .map(|s| s.mean_color.unwrap_or([0.0, 0.0, 0.0]))
        .collect()
}
