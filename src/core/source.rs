//! Source resolution logic for splitfetch
//!
//! Validates resource addresses and derives default output names from them.

use std::time::Duration;

use reqwest::Url;

use crate::core::error::{Error, Result};

/// Fallback output name when the URL path has no usable last segment
pub const DEFAULT_OUTPUT_NAME: &str = "download.bin";

/// Represents different download sources
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadSource {
    /// HTTP(S) source with a validated URL
    Http { url: String },
}

/// Configuration for reaching download sources
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// User agent sent with every request
    pub user_agent: String,

    /// Timeout for establishing a connection
    pub connect_timeout: Duration,

    /// TCP keepalive interval for long range transfers
    pub tcp_keepalive: Duration,

    /// How long idle pooled connections are kept
    pub pool_idle_timeout: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("splitfetch/{}", env!("SPLITFETCH_VERSION")),
            connect_timeout: Duration::from_secs(10),
            tcp_keepalive: Duration::from_secs(60),
            pool_idle_timeout: Duration::from_secs(90),
        }
    }
}

/// Resolves a source string to a download source
pub fn resolve_source(source: &str) -> Result<DownloadSource> {
    let url = Url::parse(source)
        .map_err(|e| Error::InvalidInput(format!("'{source}' is not a valid URL: {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(DownloadSource::Http {
            url: url.to_string(),
        }),
        scheme => Err(Error::InvalidInput(format!(
            "unsupported URL scheme '{scheme}' (expected http or https)"
        ))),
    }
}

/// Generates output filename from the last path segment of a URL
pub fn resolve_output_filename(source: &str) -> String {
    Url::parse(source)
        .ok()
        .and_then(|url| {
            url.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_OUTPUT_NAME.to_string())
}
