// SPDX-License-Identifier: GPL-3.0-or-later
//
// Unified error types for Vellum.
//
// Detection returning no quadrilateral is deliberately *not* represented
// here: an empty frame is an expected outcome, modeled as `Option::None`.
// Likewise, an unavailable aspect ratio is signaled by `f64::INFINITY`
// at the estimator boundary, never as an error.

use thiserror::Error;

/// Top-level error type for all Vellum operations.
#[derive(Debug, Error)]
pub enum VellumError {
    /// Image decoding or encoding failed (propagated from the caller-supplied
    /// buffer or file; never recovered internally).
    #[error("image processing failed: {0}")]
    Image(String),

    /// The detected quadrilateral produced a near-singular perspective
    /// transform. The caller should retry the page with a different or
    /// default quadrilateral.
    #[error("perspective rectification failed: {0}")]
    Rectification(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, VellumError>;
