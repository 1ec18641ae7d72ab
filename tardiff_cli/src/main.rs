use anyhow::Result;
use clap::Parser;
use tardiff_common::CompareConfig;
use tardiff_core::{ComparisonEngine, Reporter, TarArchive};
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tardiff")]
#[command(author = "TarDiff Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Report files added, deleted or modified between two tarballs", long_about = None)]
struct Cli {
    /// Original archive (tar, optionally gzip/bzip2/xz compressed)
    archive_a: PathBuf,

    /// New archive to compare against the original
    archive_b: PathBuf,
}

fn main() {
    // Logs go to stderr; stdout carries only the report
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn"))
        )
        .init();

    let cli = Cli::parse();

    // Fatal errors bypass the log filter so RUST_LOG cannot hide them
    if let Err(e) = run_diff(cli.archive_a, cli.archive_b) {
        eprintln!("tardiff: {:#}", e);
        std::process::exit(1);
    }
}

fn run_diff(archive_a: PathBuf, archive_b: PathBuf) -> Result<()> {
    info!("Comparing:");
    info!("  A: {}", archive_a.display());
    info!("  B: {}", archive_b.display());

    let config = CompareConfig::default();
    let left = TarArchive::open(&archive_a)?;
    let right = TarArchive::open(&archive_b)?;

    let engine = ComparisonEngine::new(&left, &right, &config)?;

    let stdout = std::io::stdout();
    let mut reporter = Reporter::new(stdout.lock(), &config);
    engine.run(&mut reporter)?;

    Ok(())
}
