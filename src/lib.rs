//! # Splitfetch Library
//!
//! Downloads a single large HTTP resource over several connections at once. The resource is
//! split into contiguous byte ranges, every range is fetched concurrently into its own part
//! file, and the parts are merged back in order into one output file.
//!
//! ## Pipeline
//!
//! - [`probe`]: HEAD request for the resource length
//! - [`plan`]: split the length into one range per connection
//! - [`run_all`]: fetch every range concurrently with `Range` requests
//! - [`assemble`]: concatenate the parts in range order, atomically
//! - [`cleanup`]: delete the part files
//!
//! Each stage is public so hosts can drive them one by one; [`Downloader`] runs them all.
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Download to a file named after the URL
//!     splitfetch::get("https://example.org/media/clip.mp4", None).await?;
//!
//!     // Download to a specific file
//!     splitfetch::get("https://example.org/media/clip.mp4", Some("./clip.mp4")).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Progress Tracking
//!
//! ```rust,no_run
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     splitfetch::get_with_progress(
//!         "https://example.org/media/clip.mp4",
//!         Some("clip.mp4"),
//!         |downloaded, total| {
//!             println!("Progress: {}/{} bytes", downloaded, total);
//!         }
//!     ).await?;
//!
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

pub use crate::core::assemble::{assemble, staging_path};
pub use crate::core::cleanup::cleanup;
pub use crate::core::coordinator::{run_all, FailurePolicy, RetryPolicy, RunOptions};
pub use crate::core::downloader::{build_client, DownloadReport, Downloader};
pub use crate::core::error::{AssemblyCause, Error, FetchCause, Result, Stage};
pub use crate::core::fetch::{fetch_range, FetchContext, RangeResult};
pub use crate::core::plan::{plan, RangeSpec};
pub use crate::core::probe::{probe, ResourceDescriptor};
pub use crate::core::source::{resolve_output_filename, SourceConfig};
pub use crate::core::stream::{DownloadOptions, OverwriteBehavior, ProgressCallback};

// Internal modules
mod core;

/// Download a resource to a destination file
///
/// # Arguments
/// * `url` - HTTP(S) address of the resource
/// * `dest` - Optional destination file path. If None, the last URL path segment is used
///
/// # Examples
/// ```rust,no_run
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// splitfetch::get("https://example.org/big.iso", Some("./big.iso")).await?;
/// # Ok(())
/// # }
/// ```
pub async fn get(url: &str, dest: Option<&str>) -> Result<DownloadReport> {
    get_with_options(url, dest, DownloadOptions::default()).await
}

/// Download with progress tracking
///
/// The callback receives (downloaded_bytes, total_bytes) as ranges stream in.
pub async fn get_with_progress<F>(
    url: &str,
    dest: Option<&str>,
    progress: F,
) -> Result<DownloadReport>
where
    F: Fn(u64, u64) + Send + Sync + 'static,
{
    let options = DownloadOptions {
        progress: Some(Arc::new(progress)),
        ..Default::default()
    };
    get_with_options(url, dest, options).await
}

/// Download with custom options
///
/// Provides full control over thread count, temporary directory, overwrite behavior,
/// failure policy, retries and progress tracking.
///
/// # Examples
/// ```rust,no_run
/// use splitfetch::{DownloadOptions, FailurePolicy, OverwriteBehavior};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let options = DownloadOptions {
///     threads: 8,
///     overwrite: OverwriteBehavior::Force,
///     failure_policy: FailurePolicy::CancelSiblings,
///     ..Default::default()
/// };
///
/// splitfetch::get_with_options("https://example.org/big.iso", None, options).await?;
/// # Ok(())
/// # }
/// ```
pub async fn get_with_options(
    url: &str,
    dest: Option<&str>,
    options: DownloadOptions,
) -> Result<DownloadReport> {
    let downloader = crate::core::Downloader::new()?;

    let file_path = match dest {
        Some(path) => path.to_string(),
        None => crate::core::resolve_output_filename(url),
    };

    downloader.download_to_file(url, &file_path, &options).await
}
