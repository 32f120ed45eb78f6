//! Removal of temporary part files

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::core::error::Result;
use crate::core::fetch::RangeResult;

/// Delete the part file of every result
///
/// Files that are already gone are skipped, so running this twice is harmless.
pub async fn cleanup(results: &[RangeResult]) -> Result<()> {
    for result in results {
        remove_if_exists(&result.path).await?;
    }
    debug!("Removed {} part files", results.len());
    Ok(())
}

/// Best-effort removal used after a failed run
pub(crate) async fn remove_parts(paths: impl IntoIterator<Item = PathBuf>) {
    for path in paths {
        if let Err(e) = remove_if_exists(&path).await {
            warn!("Could not remove part file {}: {e}", path.display());
        }
    }
}

async fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
