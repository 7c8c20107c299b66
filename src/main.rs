//! Mirror lecture recordings into Google Drive.
//!
//! Reads its settings from the environment (a `.env` file in the working
//! directory is loaded first), runs one sync and exits with status 1 on any
//! error.

use anyhow::Context;
use core_runtime::{init_logging, MirrorConfig};
use core_service::MirrorService;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let config = match MirrorConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = format!("{:#}", e), "Mirror run failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: MirrorConfig) -> anyhow::Result<()> {
    tracing::info!("Starting lecture-mirror v{}", env!("CARGO_PKG_VERSION"));

    let service = MirrorService::new(config).context("Invalid configuration")?;
    let report = service.run().await.context("Mirror run aborted")?;

    tracing::info!(
        transferred = report.videos_transferred,
        skipped = report.videos_skipped,
        failed = report.videos_failed,
        "Done"
    );

    if !report.is_clean() {
        anyhow::bail!("{} recording(s) failed to transfer", report.failures.len());
    }

    Ok(())
}
