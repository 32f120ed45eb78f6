//! Concurrent fetch of all planned ranges
//!
//! The coordinator drives one fetch per range, with the range count as the concurrency
//! bound, and hands back results ordered by range index whatever order they finished in.

use std::future::Future;
use std::time::Duration;

use futures::StreamExt;
use log::{debug, warn};

use crate::core::cleanup::remove_parts;
use crate::core::error::{Error, Result};
use crate::core::fetch::{fetch_range, FetchContext, RangeResult};
use crate::core::plan::RangeSpec;

/// What happens to the other fetches once one range fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Let every fetch settle, then report the first failure
    #[default]
    CollectAll,
    /// Drop the in-flight siblings as soon as one range fails
    CancelSiblings,
}

/// Per-range retry with exponential backoff
///
/// Only transient causes are retried: transport errors, interrupted bodies and 5xx answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::from_millis(1000),
        }
    }
}

/// Knobs for one coordinator run
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub failure_policy: FailurePolicy,
    pub retry: RetryPolicy,
    /// Leave part files on disk when the run fails
    pub keep_parts: bool,
}

/// Delay before retry number `attempt`, doubling from `base` and saturating
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
}

/// Execute a range fetch with retry logic for transient failures
async fn retry_on_transient_error<F, Fut, T>(policy: RetryPolicy, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(Error::RangeFetchFailed { index, cause })
                if attempt < policy.max_retries && cause.is_transient() =>
            {
                attempt += 1;
                let delay = backoff_delay(policy.base_delay, attempt);
                warn!(
                    "Range {index} failed (attempt {attempt}): {cause}. Retrying in {}ms...",
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Fetch every range concurrently
///
/// Returns the results sorted by range index, or the first failure observed. On failure
/// all part files of the run are removed unless `keep_parts` is set.
pub async fn run_all(
    ctx: &FetchContext,
    specs: Vec<RangeSpec>,
    options: RunOptions,
) -> Result<Vec<RangeResult>> {
    let concurrency = specs.len().max(1);
    let indices: Vec<usize> = specs.iter().map(|spec| spec.index).collect();

    debug!("Launching {} range fetches for {}", specs.len(), ctx.url());

    let mut results = Vec::with_capacity(specs.len());
    let mut first_error = None;

    {
        let fetches = futures::stream::iter(specs)
            .map(|spec| {
                let ctx = ctx.clone();
                async move {
                    retry_on_transient_error(options.retry, || fetch_range(&ctx, spec)).await
                }
            })
            .buffer_unordered(concurrency);

        tokio::pin!(fetches);

        while let Some(outcome) = fetches.next().await {
            match outcome {
                Ok(result) => {
                    debug!("Finished range {}", result.spec);
                    results.push(result);
                }
                Err(e) => {
                    warn!("{e}");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                    if options.failure_policy == FailurePolicy::CancelSiblings {
                        break;
                    }
                }
            }
        }
        // Leaving this scope drops any fetch still in flight
    }

    if let Some(err) = first_error {
        if !options.keep_parts {
            remove_parts(indices.iter().map(|&index| ctx.part_path(index))).await;
        }
        return Err(err);
    }

    results.sort_by_key(|result| result.spec.index);
    Ok(results)
}
