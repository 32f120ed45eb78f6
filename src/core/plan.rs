//! Byte range partitioning
//!
//! Splits a resource of known length into contiguous, non-overlapping ranges, one per
//! concurrent fetch.

use std::fmt;

use crate::core::error::{Error, Result};

/// One contiguous byte window of the resource
///
/// `len == 0` marks an empty range: the resource was too small to give this index any
/// bytes, and the fetcher skips the request entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSpec {
    pub index: usize,
    pub start: u64,
    pub len: u64,
}

impl RangeSpec {
    /// Inclusive end offset, `None` for an empty range
    pub fn end(&self) -> Option<u64> {
        if self.len == 0 {
            None
        } else {
            Some(self.start + self.len - 1)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Value for the `Range` request header
    pub fn header_value(&self) -> Option<String> {
        self.end().map(|end| format!("bytes={}-{}", self.start, end))
    }
}

impl fmt::Display for RangeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end() {
            Some(end) => write!(f, "#{} [{}, {}]", self.index, self.start, end),
            None => write!(f, "#{} [empty]", self.index),
        }
    }
}

/// Plan `thread_count` ranges covering `[0, total_size)`
///
/// Every range holds `ceil(total_size / thread_count)` bytes except the last non-empty one,
/// which takes the remainder. A zero-length resource yields a single empty range.
pub fn plan(total_size: u64, thread_count: usize) -> Result<Vec<RangeSpec>> {
    if thread_count == 0 {
        return Err(Error::InvalidInput(
            "thread count must be at least 1".to_string(),
        ));
    }

    if total_size == 0 {
        return Ok(vec![RangeSpec {
            index: 0,
            start: 0,
            len: 0,
        }]);
    }

    let chunk_size = total_size.div_ceil(thread_count as u64);

    let ranges = (0..thread_count)
        .map(|index| {
            let start = (index as u64).saturating_mul(chunk_size);
            let len = total_size.saturating_sub(start).min(chunk_size);
            RangeSpec { index, start, len }
        })
        .collect();

    Ok(ranges)
}
