// SPDX-License-Identifier: GPL-3.0-or-later
//
// Page scanning orchestration — detect, rectify, filter, in that order,
// with the fallbacks that keep a capture usable when a stage comes up
// empty: a missed detection substitutes the default crop box, a failed
// rectification passes the unrectified source through to the filter.

use image::DynamicImage;
use rayon::prelude::*;
use tracing::{info, instrument, warn};
use vellum_core::{FilterKind, Quadrilateral, Result, ScanConfig, VellumError};

use crate::detect::QuadDetector;
use crate::filter;
use crate::rectify;

/// A fully processed page.
///
/// `frame` is the rectified page before filtering (or a copy of the
/// source when rectification failed, with `rectified` false); `output`
/// is `frame` after the requested filter preset.
#[derive(Debug)]
pub struct ProcessedPage {
    pub quad: Quadrilateral,
    pub frame: DynamicImage,
    pub output: DynamicImage,
    pub rectified: bool,
}

/// Stateless scan orchestrator. One instance can serve any number of
/// pages, sequentially or in parallel.
pub struct PageScanner {
    config: ScanConfig,
    detector: QuadDetector,
}

impl PageScanner {
    pub fn new(config: ScanConfig) -> Self {
        let detector = QuadDetector::new(config.clone());
        Self { config, detector }
    }

    /// Detect the document boundary, or substitute the default inset crop
    /// box when nothing is found. Always yields a usable quadrilateral in
    /// display space, so the caller's corner-adjustment UI has handles to
    /// show either way.
    pub fn detect_or_default(&self, image: &DynamicImage, display_width: u32) -> Quadrilateral {
        if let Some(quad) = self.detector.find_corners(image, display_width) {
            return quad;
        }
        let scale_ratio = display_width as f64 / image.width() as f64;
        info!("no boundary detected, using default crop box");
        Quadrilateral::inset(
            image.width(),
            image.height(),
            scale_ratio,
            self.config.fallback_inset,
        )
    }

    /// Run the full chain on one page: detect (with fallback), rectify,
    /// filter.
    ///
    /// Rectification failure is not fatal — the filter runs on an
    /// unrectified copy of the source and the result is marked
    /// `rectified: false`, matching the capture-anyway behavior users
    /// expect from a scanner.
    #[instrument(
        skip(self, image),
        fields(width = image.width(), height = image.height(), display_width, ?preset)
    )]
    pub fn process_page(
        &self,
        image: &DynamicImage,
        display_width: u32,
        preset: FilterKind,
    ) -> Result<ProcessedPage> {
        if image.width() == 0 || image.height() == 0 {
            return Err(VellumError::Image("empty source frame".into()));
        }

        let quad = self.detect_or_default(image, display_width);
        let scale_ratio = display_width as f64 / image.width() as f64;

        let (frame, rectified) = match rectify::rectify(image, &quad, scale_ratio) {
            Ok(rectified_frame) => (rectified_frame.image, true),
            Err(err) => {
                warn!(%err, "rectification failed, keeping unrectified frame");
                (image.clone(), false)
            }
        };

        let output = filter::apply(&frame, preset);
        info!(
            out_width = output.width(),
            out_height = output.height(),
            rectified,
            "page processed"
        );

        Ok(ProcessedPage {
            quad,
            frame,
            output,
            rectified,
        })
    }

    /// Process a batch of pages in parallel, one rayon task per page.
    ///
    /// Results come back in input order; a failure on one page is
    /// reported in its own slot and never aborts the rest of the batch.
    pub fn process_batch(
        &self,
        images: &[DynamicImage],
        display_width: u32,
        preset: FilterKind,
    ) -> Vec<Result<ProcessedPage>> {
        images
            .par_iter()
            .map(|image| self.process_page(image, display_width, preset))
            .collect()
    }
}

impl Default for PageScanner {
    fn default() -> Self {
        Self::new(ScanConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn page_frame(width: u32, height: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> DynamicImage {
        let mut img = GrayImage::new(width, height);
        for y in y0..y1 {
            for x in x0..x1 {
                img.put_pixel(x, y, Luma([255u8]));
            }
        }
        DynamicImage::ImageLuma8(img)
    }

    /// A blank frame has no detectable boundary: the default crop box is
    /// a 10% inset of the display-space frame.
    #[test]
    fn blank_frame_gets_default_crop_box() {
        let scanner = PageScanner::default();
        let img = DynamicImage::ImageLuma8(GrayImage::new(1000, 1400));

        let quad = scanner.detect_or_default(&img, 1000);
        assert!((quad.top_left.x - 100.0).abs() < 1e-9);
        assert!((quad.top_left.y - 100.0).abs() < 1e-9);
        assert!((quad.bottom_right.x - 900.0).abs() < 1e-9);
        assert!((quad.bottom_right.y - 1300.0).abs() < 1e-9);
    }

    #[test]
    fn detected_page_is_rectified() {
        let scanner = PageScanner::default();
        let img = page_frame(1000, 1400, 100, 100, 900, 1300);

        let page = scanner
            .process_page(&img, 1000, FilterKind::Original)
            .expect("process");
        assert!(page.rectified);
        assert_eq!(page.output.width(), page.frame.width());
        assert_eq!(page.output.height(), page.frame.height());
    }

    #[test]
    fn empty_frame_is_rejected() {
        let scanner = PageScanner::default();
        let img = DynamicImage::ImageLuma8(GrayImage::new(0, 0));
        let err = scanner
            .process_page(&img, 1000, FilterKind::Original)
            .unwrap_err();
        assert!(matches!(err, VellumError::Image(_)));
    }

    /// End-to-end scenario: a 1000x1400 frame with a white page covering
    /// (100,100)-(900,1300) must come out as a rectified page close to
    /// 800x1200 with near-white content.
    #[test]
    fn full_scan_recovers_page_dimensions() {
        let scanner = PageScanner::default();
        let img = page_frame(1000, 1400, 100, 100, 900, 1300);

        let page = scanner
            .process_page(&img, 1000, FilterKind::Original)
            .expect("process");
        assert!(page.rectified);

        // The recovered dimensions should match the page's true 800x1200
        // extents within a few percent; accept either orientation since
        // the detected corner labeling follows the contour start vertex.
        let (w, h) = (page.output.width() as f64, page.output.height() as f64);
        let (long, short) = if w > h { (w, h) } else { (h, w) };
        assert!((long - 1200.0).abs() / 1200.0 < 0.05, "long side {long}");
        assert!((short - 800.0).abs() / 800.0 < 0.05, "short side {short}");

        // Interior samples land well inside the white page.
        let luma = page.output.to_luma8();
        let (cx, cy) = (luma.width() / 2, luma.height() / 2);
        let mut sum = 0u64;
        let mut count = 0u64;
        for y in (cy - 20)..(cy + 20) {
            for x in (cx - 20)..(cx + 20) {
                sum += luma.get_pixel(x, y).0[0] as u64;
                count += 1;
            }
        }
        assert!(sum / count > 200, "page interior should be near-white");
    }

    /// Batch results keep input order and per-page isolation: a blank
    /// page still processes (through the default crop box) alongside a
    /// real one.
    #[test]
    fn batch_preserves_order_and_isolation() {
        let scanner = PageScanner::default();
        let pages = vec![
            page_frame(1000, 1400, 100, 100, 900, 1300),
            DynamicImage::ImageLuma8(GrayImage::from_pixel(1000, 1400, Luma([0u8]))),
        ];

        let results = scanner.process_batch(&pages, 1000, FilterKind::Grayscale);
        assert_eq!(results.len(), 2);
        let first = results[0].as_ref().expect("first page");
        let second = results[1].as_ref().expect("second page");
        assert!(first.rectified);
        // The blank page falls back to the default crop box, which is a
        // plain axis-aligned rectangle and rectifies cleanly.
        assert!(second.rectified);
    }
}
