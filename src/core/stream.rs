//! Streaming and option types for splitfetch
//!
//! Provides the AsyncRead adapter over HTTP response bodies, shared progress tracking and
//! the options that steer a download.

use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::TryStreamExt;
use tokio::io::{AsyncRead, ReadBuf};

use crate::core::coordinator::{FailurePolicy, RetryPolicy};

/// A unified stream for HTTP sources
pub enum DownloadStream {
    /// HTTP stream using reqwest
    Http(Box<dyn AsyncRead + Send + Unpin>),
}

impl AsyncRead for DownloadStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match &mut *self {
            DownloadStream::Http(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

/// Creates a DownloadStream from an HTTP response
pub fn create_http_stream(response: reqwest::Response) -> DownloadStream {
    let stream = Box::new(tokio_util::io::StreamReader::new(
        response.bytes_stream().map_err(std::io::Error::other),
    ));
    DownloadStream::Http(stream)
}

/// Progress callback function type, receives (downloaded, total)
pub type ProgressCallback = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Byte counter shared by all fetchers of one run
pub struct ProgressTracker {
    downloaded: AtomicU64,
    total: u64,
    callback: ProgressCallback,
}

impl ProgressTracker {
    pub fn new(total: u64, callback: ProgressCallback) -> Self {
        Self {
            downloaded: AtomicU64::new(0),
            total,
            callback,
        }
    }

    pub fn advance(&self, bytes: u64) {
        let downloaded = self.downloaded.fetch_add(bytes, Ordering::Relaxed) + bytes;
        (self.callback)(downloaded, self.total);
    }

    /// Take back bytes of an attempt that failed and will be fetched again
    pub fn rewind(&self, bytes: u64) {
        let downloaded = self.downloaded.fetch_sub(bytes, Ordering::Relaxed) - bytes;
        (self.callback)(downloaded, self.total);
    }
}

/// Overwrite behavior for existing files
#[derive(Debug, Clone, Default, PartialEq)]
pub enum OverwriteBehavior {
    /// Prompt user for confirmation (default)
    #[default]
    Prompt,
    /// Force overwrite without prompting
    Force,
    /// Never overwrite, fail if file exists
    NeverOverwrite,
}

/// Options for download operations
pub struct DownloadOptions {
    /// Optional progress callback
    pub progress: Option<ProgressCallback>,

    /// Buffer size for streaming operations
    pub buffer_size: usize,

    /// Number of ranges, which is also the number of concurrent connections
    pub threads: usize,

    /// Directory holding the per-range part files
    pub temp_dir: PathBuf,

    /// Behavior when destination file already exists
    pub overwrite: OverwriteBehavior,

    /// Leave part files on disk when a run fails
    pub keep_parts: bool,

    /// What the coordinator does with siblings once a range fails
    pub failure_policy: FailurePolicy,

    /// Per-range retries, none by default
    pub retry: RetryPolicy,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            progress: None,
            buffer_size: 64 * 1024, // 64KB
            threads: 4,
            temp_dir: PathBuf::from("temp"),
            overwrite: OverwriteBehavior::default(),
            keep_parts: false,
            failure_policy: FailurePolicy::default(),
            retry: RetryPolicy::default(),
        }
    }
}
