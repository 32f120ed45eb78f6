//! Core library modules for splitfetch
//!
//! This module contains the pipeline stages and the types they exchange.

pub mod assemble;
pub mod cleanup;
pub mod coordinator;
pub mod downloader;
pub mod error;
pub mod fetch;
pub mod plan;
pub mod probe;
pub mod source;
pub mod stream;

// Re-export main types for internal use
pub use downloader::{DownloadReport, Downloader};
pub use source::resolve_output_filename;
