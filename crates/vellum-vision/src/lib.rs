// SPDX-License-Identifier: GPL-3.0-or-later
//
// vellum-vision — Document detection and image processing for Vellum.
//
// Provides quadrilateral boundary detection on camera frames, single-view
// aspect-ratio recovery, perspective rectification, and the enhancement
// filter presets applied to rectified pages. All operations are stateless
// and synchronous; each call owns its buffers exclusively, so concurrent
// invocations for different pages need no coordination.

pub mod buffer;
pub mod detect;
pub mod filter;
pub mod pipeline;
pub mod ratio;
pub mod rectify;

// Re-export the primary entry points so callers can use `vellum_vision::QuadDetector` etc.
pub use detect::QuadDetector;
pub use filter::{apply, BrightnessContrast};
pub use pipeline::{PageScanner, ProcessedPage};
pub use ratio::estimate_hw_ratio;
pub use rectify::{rectify, RectifiedFrame};
