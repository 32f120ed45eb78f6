//! # Splitfetch CLI
//!
//! Command-line interface for the splitfetch library.
//! Downloads one large HTTP resource over several parallel range requests.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use log::error;
use splitfetch::{DownloadOptions, FailurePolicy, OverwriteBehavior, Result, RetryPolicy};

mod cli;

/// Command-line interface for splitfetch
#[derive(Parser)]
#[command(name = "splitfetch")]
#[command(about = "Parallel byte-range downloader for single large HTTP resources")]
#[command(long_about = "Downloads one resource over several connections at once:
  splitfetch https://example.org/clip.mp4              # 4 ranges, saved as clip.mp4
  splitfetch https://example.org/clip.mp4 out.mp4 -t 8 # 8 ranges, saved as out.mp4

The server must answer range requests with 206 Partial Content.

File Overwrite Behavior:
  By default, you'll be prompted if destination file exists
  --force                          # Overwrite without asking
  --no-clobber                     # Never overwrite, fail if file exists")]
#[command(version = env!("SPLITFETCH_VERSION"))]
struct Cli {
    /// HTTP(S) address of the resource
    url: String,

    /// Output file path (defaults to the last segment of the URL path)
    #[arg(default_value = "")]
    output: String,

    /// Number of byte ranges, and of concurrent connections
    #[arg(short, long, default_value_t = 4)]
    threads: usize,

    /// Directory for the per-range part files
    #[arg(long, default_value = "temp")]
    temp_dir: PathBuf,

    /// Enable dry-run mode (show what would be downloaded without downloading)
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Force overwrite existing files without prompting
    #[arg(short, long)]
    force: bool,

    /// Never overwrite existing files (fail if destination exists)
    #[arg(long, conflicts_with = "force")]
    no_clobber: bool,

    /// Keep part files when the download fails
    #[arg(long)]
    keep_parts: bool,

    /// Retry a failed range this many times on transient errors
    #[arg(long, default_value_t = 0)]
    retries: u32,

    /// Abort the remaining ranges as soon as one fails
    #[arg(long)]
    fail_fast: bool,
}

/// Resolve output path from CLI arguments
fn resolve_output(url: &str, output: &str) -> String {
    if output.is_empty() {
        splitfetch::resolve_output_filename(url)
    } else {
        output.to_string()
    }
}

fn overwrite_behavior(force: bool, no_clobber: bool) -> OverwriteBehavior {
    if force {
        OverwriteBehavior::Force
    } else if no_clobber {
        OverwriteBehavior::NeverOverwrite
    } else {
        OverwriteBehavior::Prompt
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("❌ Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging to stderr
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .target(env_logger::Target::Stderr)
        .init();

    if cli.verbose {
        eprintln!("✂️  Splitfetch v{} starting...", env!("SPLITFETCH_VERSION"));
    }

    let output = resolve_output(&cli.url, &cli.output);

    if cli.dry_run {
        let url = &cli.url;
        let threads = cli.threads;
        eprintln!("🔍 [DRY RUN] Would download: {url} to {output} using {threads} ranges");
        return Ok(());
    }

    eprintln!("📁 Saving to: {output}");

    let progress_manager = cli::ProgressManager::new(0, &format!("🌐 Downloading {}", cli.url));

    let options = DownloadOptions {
        progress: Some(progress_manager.callback()),
        threads: cli.threads,
        temp_dir: cli.temp_dir.clone(),
        overwrite: overwrite_behavior(cli.force, cli.no_clobber),
        keep_parts: cli.keep_parts,
        failure_policy: if cli.fail_fast {
            FailurePolicy::CancelSiblings
        } else {
            FailurePolicy::CollectAll
        },
        retry: RetryPolicy {
            max_retries: cli.retries,
            base_delay: Duration::from_millis(1000),
        },
        ..Default::default()
    };

    match splitfetch::get_with_options(&cli.url, Some(&output), options).await {
        Ok(report) => {
            progress_manager.finish("✅ Download completed!");
            eprintln!(
                "✅ {} bytes in {} ranges written to {}",
                report.total_size,
                report.ranges,
                report.output.display()
            );
            Ok(())
        }
        Err(e) => {
            progress_manager.abandon();
            eprintln!("❌ Failed while {}", e.stage());
            Err(e)
        }
    }
}
