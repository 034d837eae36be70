// SPDX-License-Identifier: GPL-3.0-or-later
//
// Perspective rectification — warps the detected quadrilateral into an
// upright rectangle sized from the recovered aspect ratio.

use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use tracing::{debug, instrument, warn};
use vellum_core::{Quadrilateral, Result, VellumError};

use crate::ratio::estimate_hw_ratio;

/// A rectified page: the output buffer plus the canvas dimensions it was
/// resampled into. Ownership passes to the caller.
#[derive(Debug)]
pub struct RectifiedFrame {
    pub image: DynamicImage,
    pub width: u32,
    pub height: u32,
}

/// Rectify the quadrilateral region of `image` into a fronto-parallel view.
///
/// `quad` is given in display space; corners are divided by `scale_ratio`
/// to obtain source coordinates in the image's own pixel space. The target
/// canvas width is the longer of the two horizontal edges; the height
/// follows from the estimated aspect ratio, or from the raw axis-aligned
/// edge extents when the estimate is unavailable.
///
/// Zero-area and collinear quads produce a near-singular correspondence;
/// those return [`VellumError::Rectification`] instead of a corrupt buffer.
#[instrument(skip(image, quad), fields(width = image.width(), height = image.height(), scale_ratio))]
pub fn rectify(
    image: &DynamicImage,
    quad: &Quadrilateral,
    scale_ratio: f64,
) -> Result<RectifiedFrame> {
    let src = quad.descaled(scale_ratio);

    let hw_ratio = estimate_hw_ratio(quad, image.width(), image.height(), scale_ratio);

    let (target_width, target_height) = if hw_ratio.is_finite() {
        let width_a = quad.bottom_right.distance_to(&quad.bottom_left);
        let width_b = quad.top_right.distance_to(&quad.top_left);
        let width = width_a.max(width_b);
        (width, width / hw_ratio)
    } else {
        // Degenerate viewing geometry: fall back to raw edge extents.
        (
            quad.top_right.x - quad.top_left.x,
            quad.bottom_left.y - quad.top_left.y,
        )
    };

    if !target_width.is_finite()
        || !target_height.is_finite()
        || target_width < 1.0
        || target_height < 1.0
    {
        warn!(target_width, target_height, "degenerate target canvas");
        return Err(VellumError::Rectification(format!(
            "degenerate target canvas {target_width:.1}x{target_height:.1}"
        )));
    }

    // Source corners in fixed TL, BL, BR, TR order, mapped onto the
    // corresponding corners of the (0,0)-(w,h) rectangle.
    let src_points: [(f32, f32); 4] = [
        (src.top_left.x as f32, src.top_left.y as f32),
        (src.bottom_left.x as f32, src.bottom_left.y as f32),
        (src.bottom_right.x as f32, src.bottom_right.y as f32),
        (src.top_right.x as f32, src.top_right.y as f32),
    ];
    let dst_points: [(f32, f32); 4] = [
        (0.0, 0.0),
        (0.0, target_height as f32),
        (target_width as f32, target_height as f32),
        (target_width as f32, 0.0),
    ];

    let projection = Projection::from_control_points(src_points, dst_points).ok_or_else(|| {
        warn!("near-singular control point correspondence");
        VellumError::Rectification("near-singular perspective transform".into())
    })?;

    let rgba = image.to_rgba8();
    let mut output = RgbaImage::new(
        target_width.round() as u32,
        target_height.round() as u32,
    );
    warp_into(
        &rgba,
        &projection,
        Interpolation::Bilinear,
        Rgba([255u8, 255, 255, 255]),
        &mut output,
    );

    debug!(
        out_width = output.width(),
        out_height = output.height(),
        hw_ratio,
        "rectification complete"
    );

    Ok(RectifiedFrame {
        width: output.width(),
        height: output.height(),
        image: DynamicImage::ImageRgba8(output),
    })
}
