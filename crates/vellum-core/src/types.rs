// SPDX-License-Identifier: GPL-3.0-or-later
//
// Core domain types for the Vellum scanning pipeline.

use serde::{Deserialize, Serialize};

/// A 2D point in image pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

/// A detected document boundary: four corner points labeled by position.
///
/// Labels are assigned by position, not detection order — raw detector
/// vertices are mapped onto the four roles by [`Quadrilateral::from_detected`].
/// The four edge midpoints (`top`, `bottom`, `left`, `right`) are derived,
/// never stored; moving a midpoint displaces both adjacent corners
/// symmetrically about the new position, preserving the edge length.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Quadrilateral {
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_left: Point,
    pub bottom_right: Point,
}

impl Quadrilateral {
    pub fn new(top_left: Point, top_right: Point, bottom_left: Point, bottom_right: Point) -> Self {
        Self {
            top_left,
            top_right,
            bottom_left,
            bottom_right,
        }
    }

    /// Build a quadrilateral from the four unordered vertices of an
    /// approximated contour polygon, scaled into display space.
    ///
    /// The role assignment is the fixed index mapping the detector has
    /// always used: vertex 0 → top-right, 1 → top-left, 2 → bottom-left,
    /// 3 → bottom-right.
    pub fn from_detected(points: [Point; 4], h_ratio: f64, v_ratio: f64) -> Self {
        let scale = |p: Point| Point::new(p.x * h_ratio, p.y * v_ratio);
        Self {
            top_right: scale(points[0]),
            top_left: scale(points[1]),
            bottom_left: scale(points[2]),
            bottom_right: scale(points[3]),
        }
    }

    /// The default crop box used when detection reports nothing: a centered
    /// rectangle inset by `fraction` of the image width on every side,
    /// scaled into display space by `scale_ratio`.
    pub fn inset(width: u32, height: u32, scale_ratio: f64, fraction: f64) -> Self {
        let padding = width as f64 * fraction;
        let (w, h) = (width as f64, height as f64);
        Self {
            top_left: Point::new(padding * scale_ratio, padding * scale_ratio),
            top_right: Point::new((w - padding) * scale_ratio, padding * scale_ratio),
            bottom_left: Point::new(padding * scale_ratio, (h - padding) * scale_ratio),
            bottom_right: Point::new((w - padding) * scale_ratio, (h - padding) * scale_ratio),
        }
    }

    /// All four corners divided by a display scale ratio, mapping the quad
    /// back into the source image's own pixel space.
    pub fn descaled(&self, ratio: f64) -> Self {
        let d = |p: Point| Point::new(p.x / ratio, p.y / ratio);
        Self {
            top_left: d(self.top_left),
            top_right: d(self.top_right),
            bottom_left: d(self.bottom_left),
            bottom_right: d(self.bottom_right),
        }
    }

    // -- Edge midpoints -------------------------------------------------------

    pub fn top(&self) -> Point {
        midpoint(self.top_left, self.top_right)
    }

    pub fn bottom(&self) -> Point {
        midpoint(self.bottom_left, self.bottom_right)
    }

    pub fn left(&self) -> Point {
        midpoint(self.top_left, self.bottom_left)
    }

    pub fn right(&self) -> Point {
        midpoint(self.top_right, self.bottom_right)
    }

    /// Move the top edge midpoint to `point`, translating both top corners.
    pub fn set_top(&mut self, point: Point) {
        let top = self.top();
        let half_x = self.top_left.x - top.x;
        let half_y = self.top_left.y - top.y;
        self.top_left = Point::new(half_x + point.x, half_y + point.y);
        self.top_right = Point::new(point.x - half_x, point.y - half_y);
    }

    /// Move the bottom edge midpoint to `point`, translating both bottom corners.
    pub fn set_bottom(&mut self, point: Point) {
        let bottom = self.bottom();
        let half_x = self.bottom_left.x - bottom.x;
        let half_y = self.bottom_left.y - bottom.y;
        self.bottom_left = Point::new(half_x + point.x, half_y + point.y);
        self.bottom_right = Point::new(point.x - half_x, point.y - half_y);
    }

    /// Move the left edge midpoint to `point`, translating both left corners.
    pub fn set_left(&mut self, point: Point) {
        let left = self.left();
        let half_x = self.top_left.x - left.x;
        let half_y = self.top_left.y - left.y;
        self.top_left = Point::new(half_x + point.x, half_y + point.y);
        self.bottom_left = Point::new(point.x - half_x, point.y - half_y);
    }

    /// Move the right edge midpoint to `point`, translating both right corners.
    pub fn set_right(&mut self, point: Point) {
        let right = self.right();
        let half_x = self.top_right.x - right.x;
        let half_y = self.top_right.y - right.y;
        self.top_right = Point::new(half_x + point.x, half_y + point.y);
        self.bottom_right = Point::new(point.x - half_x, point.y - half_y);
    }
}

impl std::fmt::Display for Quadrilateral {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "(topLeft={}, topRight={}, bottomLeft={}, bottomRight={})",
            self.top_left, self.top_right, self.bottom_left, self.bottom_right
        )
    }
}

fn midpoint(a: Point, b: Point) -> Point {
    Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
}

/// Enhancement filter presets selectable by the caller.
///
/// Each variant maps to one pure image → image function in
/// `vellum-vision::filter`; the set is closed at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FilterKind {
    /// Pass the rectified image through untouched.
    #[default]
    Original,
    /// Single-channel luma conversion.
    Grayscale,
    /// Grayscale followed by a global Otsu threshold.
    BlackAndWhite,
    /// Local mean adaptive threshold (11×11 neighborhood, offset 2).
    AdaptiveMean,
    /// Gaussian-weighted adaptive threshold (11×11 neighborhood, offset 2).
    AdaptiveGaussian,
    /// Shadow removal by background subtraction, then unsharp sharpening.
    AutoEnhance,
    /// Shading correction by morphological-closing division, then sharpening.
    AdaptiveShading,
    /// Unsharp sharpening followed by a fixed contrast boost.
    Vivid,
}
