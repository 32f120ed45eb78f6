//! Ordered reassembly of part files
//!
//! Parts are appended to a staging file next to the output in range index order. The
//! staging file only takes the output name once every part has been copied in full, so a
//! failed merge never leaves a truncated file under the final name.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use log::{debug, info};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::core::error::{AssemblyCause, Error, Result};
use crate::core::fetch::RangeResult;

/// Staging path used while the output is being written
pub fn staging_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("output"));
    name.push(".partial");
    output.with_file_name(name)
}

/// Output writer plus the number of bytes written so far
struct AssemblyState {
    writer: BufWriter<File>,
    staging: PathBuf,
    cursor: u64,
}

impl AssemblyState {
    async fn open(output: &Path, buffer_size: usize) -> std::io::Result<Self> {
        let staging = staging_path(output);
        let file = File::create(&staging).await?;
        Ok(Self {
            writer: BufWriter::with_capacity(buffer_size.max(1), file),
            staging,
            cursor: 0,
        })
    }

    /// Copy one part in full, checking it holds exactly what its fetch reported
    async fn append(&mut self, result: &RangeResult) -> std::result::Result<(), AssemblyCause> {
        let mut part = File::open(&result.path).await?;
        let copied = tokio::io::copy(&mut part, &mut self.writer).await?;
        if copied != result.byte_count {
            return Err(AssemblyCause::Incomplete {
                expected: result.byte_count,
                actual: copied,
            });
        }
        self.cursor += copied;
        Ok(())
    }

    async fn finish(mut self, output: &Path) -> std::result::Result<u64, AssemblyCause> {
        self.writer.flush().await?;
        self.writer.get_ref().sync_all().await?;
        drop(self.writer);
        tokio::fs::rename(&self.staging, output).await?;
        Ok(self.cursor)
    }

    async fn abandon(self) {
        let Self {
            writer, staging, ..
        } = self;
        drop(writer);
        let _ = tokio::fs::remove_file(&staging).await;
    }
}

/// Concatenate the parts into `output` in ascending range index order
///
/// `results` may arrive in any order. On failure no file exists at `output` and the
/// staging file is removed.
pub async fn assemble(results: &[RangeResult], output: &Path, buffer_size: usize) -> Result<PathBuf> {
    let mut ordered: Vec<&RangeResult> = results.iter().collect();
    ordered.sort_by_key(|result| result.spec.index);

    let mut state = AssemblyState::open(output, buffer_size)
        .await
        .map_err(|e| Error::AssemblyFailed {
            index: None,
            cause: AssemblyCause::Io(e),
        })?;

    for result in ordered {
        if let Err(cause) = state.append(result).await {
            state.abandon().await;
            return Err(Error::AssemblyFailed {
                index: Some(result.spec.index),
                cause,
            });
        }
        debug!(
            "Written part {} ({} bytes, {} total)",
            result.spec.index, result.byte_count, state.cursor
        );
    }

    let staging = state.staging.clone();
    match state.finish(output).await {
        Ok(total) => {
            info!("Assembled {total} bytes into {}", output.display());
            Ok(output.to_path_buf())
        }
        Err(cause) => {
            let _ = tokio::fs::remove_file(&staging).await;
            Err(Error::AssemblyFailed { index: None, cause })
        }
    }
}
