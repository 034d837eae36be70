// SPDX-License-Identifier: GPL-3.0-or-later
//
// Pipeline configuration.

use serde::{Deserialize, Serialize};

use crate::types::FilterKind;

/// Tunable parameters for the detection and rectification pipeline.
///
/// The defaults are the values the pipeline has always shipped with; they
/// are exposed so callers can persist and restore user-adjusted settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Width the image is downscaled to before edge detection. Detection
    /// coordinates are rescaled back into display space afterwards.
    pub detection_max_width: u32,
    /// Canny hysteresis thresholds.
    pub canny_low: f32,
    pub canny_high: f32,
    /// Gaussian pre-blur sigma (the value a 5×5 kernel implies).
    pub blur_sigma: f32,
    /// Polygon approximation tolerance as a fraction of contour perimeter.
    pub polygon_tolerance: f64,
    /// A candidate contour must enclose more than `width * height / divisor`
    /// pixels of the detection-scale frame to count as a document.
    pub min_area_divisor: f64,
    /// Inset fraction for the default crop box substituted when detection
    /// reports nothing.
    pub fallback_inset: f64,
    /// Preset applied when the caller does not choose one.
    pub default_filter: FilterKind,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            detection_max_width: 500,
            canny_low: 75.0,
            canny_high: 200.0,
            blur_sigma: 1.1,
            polygon_tolerance: 0.02,
            min_area_divisor: 8.0,
            fallback_inset: 0.1,
            default_filter: FilterKind::Original,
        }
    }
}
