// SPDX-License-Identifier: GPL-3.0-or-later
//
// Criterion benchmarks for the vision pipeline: boundary detection at the
// fixed detection width, and the background-subtraction enhancement filter
// on a small synthetic page.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, GrayImage, Luma};

use vellum_core::FilterKind;
use vellum_vision::{QuadDetector, filter};

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Synthetic camera frame: dark background with a bright page rectangle.
fn page_frame(width: u32, height: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> DynamicImage {
    let mut img = GrayImage::from_pixel(width, height, Luma([20u8]));
    for y in y0..y1 {
        for x in x0..x1 {
            img.put_pixel(x, y, Luma([235u8]));
        }
    }
    DynamicImage::ImageLuma8(img)
}

/// Benchmark boundary detection on a 500x700 frame, the size every frame
/// is resampled to before detection, so this is the real per-frame cost.
fn bench_detection(c: &mut Criterion) {
    let detector = QuadDetector::default();
    let frame = page_frame(500, 700, 50, 50, 450, 650);

    c.bench_function("detect_quad (500x700)", |b| {
        b.iter(|| black_box(detector.detect(black_box(&frame), 1.0)));
    });
}

/// Benchmark the heaviest filter preset (dilate + median background
/// estimate) on a 200x280 page.
fn bench_auto_enhance(c: &mut Criterion) {
    let page = page_frame(200, 280, 20, 20, 180, 260);

    c.bench_function("auto_enhance (200x280)", |b| {
        b.iter(|| black_box(filter::apply(black_box(&page), FilterKind::AutoEnhance)));
    });
}

criterion_group!(benches, bench_detection, bench_auto_enhance);
criterion_main!(benches);
