//! Download pipeline for splitfetch
//!
//! Walks a single resource through probing, planning, fetching, assembling and cleaning.
//! A run is single-shot: no stage is entered twice.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};
use reqwest::{Client, ClientBuilder};

use crate::core::assemble::assemble;
use crate::core::cleanup::{cleanup, remove_parts};
use crate::core::coordinator::{run_all, RunOptions};
use crate::core::error::{Error, Result, Stage};
use crate::core::fetch::FetchContext;
use crate::core::plan::plan;
use crate::core::probe::probe;
use crate::core::source::{resolve_source, DownloadSource, SourceConfig};
use crate::core::stream::{DownloadOptions, OverwriteBehavior, ProgressTracker};

/// Summary of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadReport {
    pub url: String,
    pub total_size: u64,
    pub ranges: usize,
    pub output: PathBuf,
}

/// Check if destination file exists and handle overwrite behavior
async fn check_overwrite_permission(file_path: &Path, behavior: &OverwriteBehavior) -> Result<bool> {
    if !tokio::fs::try_exists(file_path).await? {
        return Ok(true);
    }

    let shown = file_path.display();
    match behavior {
        OverwriteBehavior::Force => {
            eprintln!("⚠️  Overwriting existing file: {shown}");
            Ok(true)
        }
        OverwriteBehavior::NeverOverwrite => Err(Error::IoError(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("File already exists: {shown} (use --force to overwrite)"),
        ))),
        OverwriteBehavior::Prompt => {
            eprintln!("⚠️  File already exists: {shown}");
            eprint!("Overwrite? [y/N]: ");

            use std::io::Write;
            std::io::stderr().flush().map_err(Error::IoError)?;

            let mut input = String::new();
            std::io::stdin()
                .read_line(&mut input)
                .map_err(Error::IoError)?;

            match input.trim().to_lowercase().as_str() {
                "y" | "yes" => {
                    eprintln!("✅ Overwriting file");
                    Ok(true)
                }
                _ => {
                    eprintln!("❌ Download cancelled");
                    Err(Error::IoError(std::io::Error::new(
                        std::io::ErrorKind::Interrupted,
                        "Download cancelled by user",
                    )))
                }
            }
        }
    }
}

fn validate_options(options: &DownloadOptions) -> Result<()> {
    if options.threads == 0 {
        return Err(Error::InvalidInput(
            "thread count must be at least 1".to_string(),
        ));
    }
    if options.buffer_size == 0 {
        return Err(Error::InvalidInput(
            "buffer size must be at least 1 byte".to_string(),
        ));
    }
    Ok(())
}

fn enter(stage: Stage) {
    debug!("stage -> {stage}");
}

/// Build the HTTP client used for probing and range requests
///
/// Transparent decompression stays off so received byte counts match the ranges asked for.
pub fn build_client(config: &SourceConfig) -> Result<Client> {
    ClientBuilder::new()
        .user_agent(config.user_agent.as_str())
        .connect_timeout(config.connect_timeout)
        .tcp_keepalive(config.tcp_keepalive)
        .pool_idle_timeout(config.pool_idle_timeout)
        .build()
        .map_err(|e| Error::InvalidInput(format!("could not build HTTP client: {e}")))
}

/// High-level downloader running the whole pipeline
pub struct Downloader {
    client: Client,
}

impl Downloader {
    /// Create a new downloader with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(&SourceConfig::default())
    }

    /// Create a new downloader with custom configuration
    pub fn with_config(config: &SourceConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
        })
    }

    /// Use an already configured client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Download `source` into `file_path` using parallel range requests
    pub async fn download_to_file(
        &self,
        source: &str,
        file_path: impl AsRef<Path>,
        options: &DownloadOptions,
    ) -> Result<DownloadReport> {
        let file_path = file_path.as_ref();
        enter(Stage::Idle);

        validate_options(options)?;
        let DownloadSource::Http { url } = resolve_source(source)?;
        check_overwrite_permission(file_path, &options.overwrite).await?;
        tokio::fs::create_dir_all(&options.temp_dir).await?;

        enter(Stage::Probing);
        let resource = probe(&self.client, &url).await?;

        enter(Stage::Planning);
        let specs = plan(resource.total_size, options.threads)?;
        let ranges = specs.len();

        enter(Stage::Fetching);
        let stem = part_stem(file_path);
        let mut ctx = FetchContext::new(self.client.clone(), &resource.url, &options.temp_dir, &stem)
            .with_buffer_size(options.buffer_size);
        if let Some(callback) = &options.progress {
            ctx = ctx.with_progress(Arc::new(ProgressTracker::new(
                resource.total_size,
                Arc::clone(callback),
            )));
        }
        let run_options = RunOptions {
            failure_policy: options.failure_policy,
            retry: options.retry,
            keep_parts: options.keep_parts,
        };
        let results = run_all(&ctx, specs, run_options).await?;

        enter(Stage::Assembling);
        if let Err(e) = assemble(&results, file_path, options.buffer_size).await {
            if !options.keep_parts {
                remove_parts(results.iter().map(|result| result.path.clone())).await;
            }
            return Err(e);
        }

        enter(Stage::Cleaning);
        if let Err(e) = cleanup(&results).await {
            warn!("Download complete but part files could not be removed: {e}");
        }

        enter(Stage::Done);
        info!("Download completed: {}", file_path.display());

        Ok(DownloadReport {
            url: resource.url,
            total_size: resource.total_size,
            ranges,
            output: file_path.to_path_buf(),
        })
    }
}

/// Part files are named after the output file
fn part_stem(file_path: &Path) -> String {
    file_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use tempfile::{tempdir, NamedTempFile};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_resource(server: &MockServer, route: &str, body: &[u8], threads: usize) {
        Mock::given(method("HEAD"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-length", body.len().to_string().as_str()),
            )
            .mount(server)
            .await;

        for spec in plan(body.len() as u64, threads).unwrap() {
            let (Some(range), Some(end)) = (spec.header_value(), spec.end()) else {
                continue;
            };
            Mock::given(method("GET"))
                .and(path(route))
                .and(header("range", range.as_str()))
                .respond_with(
                    ResponseTemplate::new(206)
                        .set_body_bytes(body[spec.start as usize..=end as usize].to_vec()),
                )
                .mount(server)
                .await;
        }
    }

    fn options_in(dir: &Path, threads: usize) -> DownloadOptions {
        DownloadOptions {
            threads,
            temp_dir: dir.join("temp"),
            overwrite: OverwriteBehavior::Force,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_download_reassembles_resource() {
        let mock_server = MockServer::start().await;
        let body: Vec<u8> = (0..10_000u32).map(|i| (i * 7 % 251) as u8).collect();
        mount_resource(&mock_server, "/movie.mp4", &body, 4).await;

        let dir = tempdir().unwrap();
        let output = dir.path().join("movie.mp4");
        let seen = Arc::new(AtomicU64::new(0));
        let sink = Arc::clone(&seen);
        let options = DownloadOptions {
            progress: Some(Arc::new(move |downloaded, _total| {
                sink.store(downloaded, Ordering::SeqCst);
            })),
            ..options_in(dir.path(), 4)
        };

        let url = format!("{}/movie.mp4", mock_server.uri());
        let report = Downloader::new()
            .unwrap()
            .download_to_file(&url, &output, &options)
            .await
            .unwrap();

        assert_eq!(report.total_size, body.len() as u64);
        assert_eq!(report.ranges, 4);
        assert_eq!(std::fs::read(&output).unwrap(), body);
        assert_eq!(seen.load(Ordering::SeqCst), body.len() as u64);
        // Only the emptied temp dir is left next to the output
        assert_eq!(std::fs::read_dir(dir.path().join("temp")).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_zero_length_resource() {
        let mock_server = MockServer::start().await;
        mount_resource(&mock_server, "/empty.bin", b"", 4).await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(206))
            .expect(0)
            .mount(&mock_server)
            .await;

        let dir = tempdir().unwrap();
        let output = dir.path().join("empty.bin");
        let url = format!("{}/empty.bin", mock_server.uri());

        let report = Downloader::new()
            .unwrap()
            .download_to_file(&url, &output, &options_in(dir.path(), 4))
            .await
            .unwrap();

        assert_eq!(report.ranges, 1);
        assert_eq!(std::fs::metadata(&output).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_probe_failure_sends_no_range_requests() {
        let mock_server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(206))
            .expect(0)
            .mount(&mock_server)
            .await;

        let dir = tempdir().unwrap();
        let output = dir.path().join("movie.mp4");
        let url = format!("{}/movie.mp4", mock_server.uri());

        let err = Downloader::new()
            .unwrap()
            .download_to_file(&url, &output, &options_in(dir.path(), 4))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::SizeUnavailable { .. }));
        assert_eq!(err.stage(), Stage::Probing);
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_range_failure_produces_no_output() {
        let mock_server = MockServer::start().await;
        let body = vec![9u8; 40];
        Mock::given(method("GET"))
            .and(header("range", "bytes=20-29"))
            .respond_with(ResponseTemplate::new(500))
            .with_priority(1)
            .mount(&mock_server)
            .await;
        mount_resource(&mock_server, "/movie.mp4", &body, 4).await;

        let dir = tempdir().unwrap();
        let output = dir.path().join("movie.mp4");
        let url = format!("{}/movie.mp4", mock_server.uri());

        let err = Downloader::new()
            .unwrap()
            .download_to_file(&url, &output, &options_in(dir.path(), 4))
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Stage::Fetching);
        assert_eq!(err.range_index(), Some(2));
        assert!(!output.exists());
        assert_eq!(std::fs::read_dir(dir.path().join("temp")).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_assembly_failure_removes_parts() {
        let mock_server = MockServer::start().await;
        let body = vec![3u8; 40];
        mount_resource(&mock_server, "/movie.mp4", &body, 4).await;

        let dir = tempdir().unwrap();
        // The staging file cannot be created in a directory that does not exist
        let output = dir.path().join("missing").join("movie.mp4");
        let url = format!("{}/movie.mp4", mock_server.uri());

        let err = Downloader::new()
            .unwrap()
            .download_to_file(&url, &output, &options_in(dir.path(), 4))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::AssemblyFailed { .. }));
        assert_eq!(err.stage(), Stage::Assembling);
        assert!(!output.exists());
        assert_eq!(std::fs::read_dir(dir.path().join("temp")).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_assembly_failure_keeps_parts_on_request() {
        let mock_server = MockServer::start().await;
        let body = vec![5u8; 40];
        mount_resource(&mock_server, "/movie.mp4", &body, 4).await;

        let dir = tempdir().unwrap();
        let output = dir.path().join("missing").join("movie.mp4");
        let url = format!("{}/movie.mp4", mock_server.uri());
        let options = DownloadOptions {
            keep_parts: true,
            ..options_in(dir.path(), 4)
        };

        let err = Downloader::with_client(Client::new())
            .download_to_file(&url, &output, &options)
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Stage::Assembling);
        assert!(!output.exists());
        for index in 0..4 {
            let part = dir.path().join("temp").join(format!("movie.mp4.part_{index}"));
            assert_eq!(std::fs::read(&part).unwrap(), vec![5u8; 10]);
        }
    }

    #[tokio::test]
    async fn test_zero_threads_is_configuration_error() {
        let dir = tempdir().unwrap();
        let err = Downloader::new()
            .unwrap()
            .download_to_file(
                "http://localhost/never-requested.bin",
                dir.path().join("x.bin"),
                &options_in(dir.path(), 0),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(err.stage(), Stage::Idle);
    }

    #[test]
    fn test_part_stem() {
        assert_eq!(part_stem(Path::new("/data/movie.mp4")), "movie.mp4");
        assert_eq!(part_stem(Path::new("/")), "download");
    }

    #[tokio::test]
    async fn test_overwrite_behavior_force() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), "existing content").unwrap();

        let result = check_overwrite_permission(temp_file.path(), &OverwriteBehavior::Force).await;
        assert!(result.is_ok(), "Force overwrite should succeed");
        assert!(result.unwrap(), "Force overwrite should return true");
    }

    #[tokio::test]
    async fn test_overwrite_behavior_never() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), "existing content").unwrap();

        let result =
            check_overwrite_permission(temp_file.path(), &OverwriteBehavior::NeverOverwrite).await;

        match result {
            Err(Error::IoError(io_err)) => {
                assert_eq!(io_err.kind(), std::io::ErrorKind::AlreadyExists);
                assert!(io_err.to_string().contains("use --force to overwrite"));
            }
            other => panic!("Expected IoError with AlreadyExists kind, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_overwrite_behavior_new_file() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("nonexistent.mp4");

        for behavior in [
            OverwriteBehavior::Force,
            OverwriteBehavior::NeverOverwrite,
            OverwriteBehavior::Prompt,
        ] {
            let result = check_overwrite_permission(&file_path, &behavior).await;
            assert!(result.unwrap(), "All behaviors should proceed for a new file");
        }
    }
}
