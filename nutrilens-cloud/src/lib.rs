//! nutrilens-cloud: remote food analysis
//!
//! Sends a meal photo to the hosted vision service and returns the same
//! [`AnalysisResult`](nutrilens_core::AnalysisResult) shape as the
//! on-device pipeline. Failures are reported, never masked.

pub mod client;
pub mod config;
pub mod error;

pub use client::CloudAnalyzer;
pub use config::CloudConfig;
pub use error::{CloudError, Result};
