// SPDX-License-Identifier: GPL-3.0-or-later
//
// Single-view aspect-ratio recovery for a photographed rectangle.
//
// Given the four perspective-projected corners of a planar rectangle and
// the assumption that the camera's principal point sits at the image
// center (square pixels), the true edge-length ratio of the rectangle is
// recoverable in closed form from the vanishing-point geometry: two
// cross-ratio scalars k2/k3 fix the plane orientation, a squared focal
// length falls out of the orthogonality constraint, and the ratio is a
// quotient of two quadratic forms in the corner coordinates.
//
// The formula is kept exactly as derived. Its own provenance notes that
// the output can come back as the reciprocal of the nominal height/width
// ratio; callers divide the target width by this value, which recovers
// the correct page height either way for the supported quad orientation
// (see DESIGN.md, Open Questions).

use tracing::{debug, instrument};
use vellum_core::Quadrilateral;

/// Recover the edge-length ratio of the rectangle projected onto `quad`.
///
/// `quad` is given in display space; its corners are divided by
/// `scale_ratio` to land in the pixel space of the `image_width` ×
/// `image_height` source frame before re-centering about the principal
/// point.
///
/// Returns a positive finite ratio, or `f64::INFINITY` when the viewing
/// geometry degenerates (the "ratio unavailable" signal — callers fall
/// back to raw edge lengths). The straight-on case `k2 == 1 && k3 == 1`
/// bypasses the general formula, whose denominators vanish there, and
/// reduces to the direct Euclidean edge-length ratio.
#[instrument(skip(quad), fields(image_width, image_height, scale_ratio))]
pub fn estimate_hw_ratio(
    quad: &Quadrilateral,
    image_width: u32,
    image_height: u32,
    scale_ratio: f64,
) -> f64 {
    let mut m1x = quad.top_left.x / scale_ratio;
    let mut m1y = quad.top_left.y / scale_ratio;
    let mut m2x = quad.top_right.x / scale_ratio;
    let mut m2y = quad.top_right.y / scale_ratio;
    let mut m3x = quad.bottom_left.x / scale_ratio;
    let mut m3y = quad.bottom_left.y / scale_ratio;
    let mut m4x = quad.bottom_right.x / scale_ratio;
    let mut m4y = quad.bottom_right.y / scale_ratio;

    // Principal point: image center.
    let u0 = image_width as f64 / 2.0;
    let v0 = image_height as f64 / 2.0;

    m1x -= u0;
    m1y -= v0;
    m2x -= u0;
    m2y -= v0;
    m3x -= u0;
    m3y -= v0;
    m4x -= u0;
    m4y -= v0;

    let k2 = ((m1y - m4y) * m3x - (m1x - m4x) * m3y + m1x * m4y - m1y * m4x)
        / ((m2y - m4y) * m3x - (m2x - m4x) * m3y + m2x * m4y - m2y * m4x);
    let k3 = ((m1y - m4y) * m2x - (m1x - m4x) * m2y + m1x * m4y - m1y * m4x)
        / ((m3y - m4y) * m2x - (m3x - m4x) * m2y + m3x * m4y - m3y * m4x);

    let f_squared = -((k3 * m3y - m1y) * (k2 * m2y - m1y)
        + (k3 * m3x - m1x) * (k2 * m2x - m1x))
        / ((k3 - 1.0) * (k2 - 1.0));

    let mut hw_ratio = ((sqr(k2 - 1.0)
        + sqr(k2 * m2y - m1y) / f_squared
        + sqr(k2 * m2x - m1x) / f_squared)
        / (sqr(k3 - 1.0)
            + sqr(k3 * m3y - m1y) / f_squared
            + sqr(k3 * m3x - m1x) / f_squared))
        .sqrt();

    // No perspective distortion at all: the general formula divides by
    // (k2 - 1) and (k3 - 1), so fall back to plain edge lengths.
    if k2 == 1.0 && k3 == 1.0 {
        hw_ratio =
            ((sqr(m2y - m1y) + sqr(m2x - m1x)) / (sqr(m3y - m1y) + sqr(m3x - m1x))).sqrt();
    }

    debug!(k2, k3, f_squared, hw_ratio, "aspect ratio estimated");

    // A degenerate viewing angle (k2 or k3 equal to 1 individually, or a
    // collapsed quad) leaks NaN through the general formula; signal
    // "ratio unavailable" instead of propagating it.
    if hw_ratio.is_finite() { hw_ratio } else { f64::INFINITY }
}

fn sqr(u: f64) -> f64 {
    u * u
}
