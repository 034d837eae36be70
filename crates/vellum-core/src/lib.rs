// SPDX-License-Identifier: GPL-3.0-or-later
//
// vellum-core — Shared types, configuration, and error definitions for the
// Vellum document scanning pipeline.

pub mod config;
pub mod error;
pub mod types;

pub use config::ScanConfig;
pub use error::{Result, VellumError};
pub use types::*;
