// SPDX-License-Identifier: GPL-3.0-or-later
//
// Image buffer helpers — file I/O and the geometric plumbing shared by the
// pipeline stages. Decode failures are propagated to the caller unchanged;
// nothing here retries or substitutes.

use image::DynamicImage;
use image::imageops::FilterType;
use tracing::{debug, instrument};
use vellum_core::{Result, VellumError};

/// Load an image from a file path.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn open(path: impl AsRef<std::path::Path>) -> Result<DynamicImage> {
    let img = image::open(path.as_ref()).map_err(|err| {
        VellumError::Image(format!("failed to open {}: {}", path.as_ref().display(), err))
    })?;
    debug!(width = img.width(), height = img.height(), "image loaded");
    Ok(img)
}

/// Save an image to a file path; the format is inferred from the extension.
#[instrument(skip(image), fields(path = %path.as_ref().display()))]
pub fn save(image: &DynamicImage, path: impl AsRef<std::path::Path>) -> Result<()> {
    image.save(path.as_ref()).map_err(|err| {
        VellumError::Image(format!("failed to save {}: {}", path.as_ref().display(), err))
    })
}

/// Resample the image to exactly `target_width`, preserving aspect ratio.
///
/// Detection always runs at this fixed width regardless of the source
/// resolution, so smaller frames are scaled up as well as down.
pub fn downscale_to_width(image: &DynamicImage, target_width: u32) -> DynamicImage {
    if image.width() == target_width {
        return image.clone();
    }
    let height = (image.height() as f64 * target_width as f64 / image.width() as f64)
        .round()
        .max(1.0) as u32;
    image.resize_exact(target_width, height, FilterType::Triangle)
}

/// Lossless quarter-turn rotation. Angles are snapped to 0/90/180/270;
/// negative angles wrap (−90 behaves as 270).
pub fn rotate_quarter(image: &DynamicImage, angle: i32) -> DynamicImage {
    match angle.rem_euclid(360) {
        90 => image.rotate90(),
        180 => image.rotate180(),
        270 => image.rotate270(),
        _ => image.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        let img = GrayImage::from_fn(width, height, |x, y| Luma([((x + y) % 256) as u8]));
        DynamicImage::ImageLuma8(img)
    }

    #[test]
    fn downscale_preserves_aspect_ratio() {
        let img = gradient(1000, 1400);
        let small = downscale_to_width(&img, 500);
        assert_eq!(small.width(), 500);
        assert_eq!(small.height(), 700);
    }

    #[test]
    fn downscale_upscales_narrow_frames() {
        let img = gradient(250, 300);
        let scaled = downscale_to_width(&img, 500);
        assert_eq!(scaled.width(), 500);
        assert_eq!(scaled.height(), 600);
    }

    #[test]
    fn rotate_quarter_swaps_dimensions() {
        let img = gradient(100, 200);
        assert_eq!(rotate_quarter(&img, 90).width(), 200);
        assert_eq!(rotate_quarter(&img, 180).width(), 100);
        assert_eq!(rotate_quarter(&img, -90).width(), 200);
        assert_eq!(rotate_quarter(&img, 0).width(), 100);
    }

    #[test]
    fn save_and_open_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("page.png");
        let img = gradient(64, 48);

        save(&img, &path).expect("save");
        let loaded = open(&path).expect("open");
        assert_eq!(loaded.width(), 64);
        assert_eq!(loaded.height(), 48);
    }

    #[test]
    fn open_missing_file_is_an_image_error() {
        let err = open("/nonexistent/definitely-missing.png").unwrap_err();
        assert!(matches!(err, VellumError::Image(_)));
    }
}
