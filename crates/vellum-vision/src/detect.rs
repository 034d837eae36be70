// SPDX-License-Identifier: GPL-3.0-or-later
//
// Document boundary detection — finds the most likely four-corner page
// outline in a camera frame.
//
// ## Pipeline
//
// 1. Convert to grayscale
// 2. Gaussian blur to suppress sensor noise
// 3. Canny edge detection (fixed hysteresis thresholds)
// 4. Border following over the edge map (flat contour list, no nesting)
// 5. Rank contours by enclosed area, descending
// 6. Gate on `width * height / divisor`: a frame whose largest contour is
//    smaller than that has no document in it
// 7. Approximate candidates to polygons at 2% of perimeter tolerance and
//    accept the first exact quadrilateral above the area gate
//
// Detection runs on a downscaled copy for latency; accepted corners are
// scaled back into the caller's display space.

use image::DynamicImage;
use imageproc::contours::{Contour, find_contours};
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use tracing::{debug, instrument};
use vellum_core::{Point, Quadrilateral, ScanConfig};

use crate::buffer;

/// Quadrilateral detector configured from a [`ScanConfig`].
///
/// Stateless; a single detector can serve concurrent frames.
pub struct QuadDetector {
    config: ScanConfig,
}

impl QuadDetector {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Detect the document boundary in a full-resolution frame.
    ///
    /// The frame is downscaled to the configured detection width first;
    /// returned corners are mapped into display space via
    /// `display_width / downscaled_width`.
    pub fn find_corners(
        &self,
        image: &DynamicImage,
        display_width: u32,
    ) -> Option<Quadrilateral> {
        let downscaled = buffer::downscale_to_width(image, self.config.detection_max_width);
        let scale_ratio = display_width as f64 / downscaled.width() as f64;
        self.detect(&downscaled, scale_ratio)
    }

    /// Detect the document boundary in an image already at detection scale.
    ///
    /// Returns `None` when no sufficiently large quadrilateral candidate
    /// exists — an expected, frequent outcome (blank scene, low contrast),
    /// not an error. Callers substitute a default crop box.
    #[instrument(
        skip(self, image),
        fields(width = image.width(), height = image.height(), scale_ratio)
    )]
    pub fn detect(&self, image: &DynamicImage, scale_ratio: f64) -> Option<Quadrilateral> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return None;
        }

        let gray = image.to_luma8();
        let blurred = gaussian_blur_f32(&gray, self.config.blur_sigma);
        let edges = canny(&blurred, self.config.canny_low, self.config.canny_high);

        let contours: Vec<Contour<u32>> = find_contours(&edges);
        debug!(contour_count = contours.len(), "contours extracted");

        // Rank every contour by enclosed area, largest first.
        let mut ranked: Vec<(usize, f64)> = contours
            .iter()
            .enumerate()
            .map(|(idx, contour)| (idx, contour_area(&contour.points)))
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let max_area = width as f64 * (height as f64 / self.config.min_area_divisor);
        if ranked.first().is_none_or(|&(_, area)| area < max_area) {
            debug!(max_area, "no candidate region large enough");
            return None;
        }

        for (idx, area) in ranked {
            let points = &contours[idx].points;
            let perimeter = arc_length(points, true);
            let polygon =
                approximate_polygon_dp(points, self.config.polygon_tolerance * perimeter, true);

            if polygon.len() == 4 && area > max_area {
                let raw = [
                    Point::new(polygon[0].x as f64, polygon[0].y as f64),
                    Point::new(polygon[1].x as f64, polygon[1].y as f64),
                    Point::new(polygon[2].x as f64, polygon[2].y as f64),
                    Point::new(polygon[3].x as f64, polygon[3].y as f64),
                ];
                let quad = Quadrilateral::from_detected(raw, scale_ratio, scale_ratio);
                debug!(area, %quad, "document boundary accepted");
                return Some(quad);
            }
        }

        debug!("no contour reduced to a quadrilateral above the area gate");
        None
    }
}

impl Default for QuadDetector {
    fn default() -> Self {
        Self::new(ScanConfig::default())
    }
}

/// Enclosed area of a closed contour via the shoelace formula.
fn contour_area(points: &[imageproc::point::Point<u32>]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut area = 0.0f64;
    for i in 0..n {
        let j = (i + 1) % n;
        area += points[i].x as f64 * points[j].y as f64;
        area -= points[j].x as f64 * points[i].y as f64;
    }
    area.abs() / 2.0
}
