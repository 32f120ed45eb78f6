//! Single range transfer
//!
//! A fetcher asks for exactly one byte window with a `Range` header and streams the
//! response body straight into its own part file. Part files are named from the range
//! index, so concurrent fetchers never touch the same file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;
use reqwest::header::RANGE;
use reqwest::{Client, StatusCode};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::core::error::{Error, FetchCause, Result};
use crate::core::plan::RangeSpec;
use crate::core::stream::{create_http_stream, ProgressTracker};

/// A range that has been fetched completely into its part file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeResult {
    pub spec: RangeSpec,
    pub path: PathBuf,
    pub byte_count: u64,
}

/// Everything a fetcher needs besides its range
///
/// Cheap to clone: the client and the shared pieces are reference counted.
#[derive(Clone)]
pub struct FetchContext {
    client: Client,
    url: Arc<str>,
    temp_dir: Arc<Path>,
    stem: Arc<str>,
    buffer_size: usize,
    progress: Option<Arc<ProgressTracker>>,
}

impl FetchContext {
    /// Part files land in `temp_dir` as `<stem>.part_<index>`
    pub fn new(client: Client, url: &str, temp_dir: impl AsRef<Path>, stem: &str) -> Self {
        Self {
            client,
            url: Arc::from(url),
            temp_dir: Arc::from(temp_dir.as_ref()),
            stem: Arc::from(stem),
            buffer_size: 64 * 1024,
            progress: None,
        }
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    pub fn with_progress(mut self, progress: Arc<ProgressTracker>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn part_path(&self, index: usize) -> PathBuf {
        self.temp_dir.join(format!("{}.part_{index}", self.stem))
    }
}

/// Fetch one range into its part file
///
/// Empty ranges produce an empty part file without touching the network. On failure the
/// partial part file is removed before the error is returned.
pub async fn fetch_range(ctx: &FetchContext, spec: RangeSpec) -> Result<RangeResult> {
    let path = ctx.part_path(spec.index);

    let Some(range) = spec.header_value() else {
        File::create(&path)
            .await
            .map_err(|e| Error::RangeFetchFailed {
                index: spec.index,
                cause: FetchCause::Io(e),
            })?;
        debug!("Range {spec} is empty, nothing to fetch");
        return Ok(RangeResult {
            spec,
            path,
            byte_count: 0,
        });
    };

    let mut written = 0u64;
    match download_into(ctx, &spec, &range, &path, &mut written).await {
        Ok(()) => {
            debug!("Range {spec} complete: {written} bytes -> {}", path.display());
            Ok(RangeResult {
                spec,
                path,
                byte_count: written,
            })
        }
        Err(cause) => {
            if let Some(progress) = &ctx.progress {
                progress.rewind(written);
            }
            let _ = tokio::fs::remove_file(&path).await;
            Err(Error::RangeFetchFailed {
                index: spec.index,
                cause,
            })
        }
    }
}

async fn download_into(
    ctx: &FetchContext,
    spec: &RangeSpec,
    range: &str,
    path: &Path,
    written: &mut u64,
) -> std::result::Result<(), FetchCause> {
    let expected = spec.len;

    let response = ctx
        .client
        .get(&*ctx.url)
        .header(RANGE, range)
        .send()
        .await?;

    let status = response.status();
    if status != StatusCode::PARTIAL_CONTENT {
        return Err(FetchCause::Status(status));
    }

    let mut stream = create_http_stream(response);
    let mut file = File::create(path).await?;
    let mut buffer = vec![0u8; ctx.buffer_size];

    loop {
        let bytes_read = stream.read(&mut buffer).await.map_err(FetchCause::Body)?;
        if bytes_read == 0 {
            break;
        }

        // Stop as soon as the server overruns the range
        let actual = *written + bytes_read as u64;
        if actual > expected {
            return Err(FetchCause::LengthMismatch { expected, actual });
        }

        file.write_all(&buffer[..bytes_read]).await?;
        *written = actual;

        if let Some(progress) = &ctx.progress {
            progress.advance(bytes_read as u64);
        }
    }

    file.flush().await?;

    if *written != expected {
        return Err(FetchCause::LengthMismatch {
            expected,
            actual: *written,
        });
    }

    Ok(())
}
