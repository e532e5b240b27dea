use clap::Parser;
use tfboost::config;
use tfboost::shared::logging::{self, LogLevel};
use tfboost::Booster;
use tracing::error;

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Pre-populate `.terraform/modules` with shallow git clones so `terraform init`
/// finds its modules already fetched.
///
/// Reads every `*.tf` file in the current directory (or `TERRAFORM_DIR`).
/// Environment: `LOGLEVEL` (default INFO), `GIT_PATH` (default /usr/bin/git),
/// `TFBOOST_CLONE_JOBS`, `TFBOOST_DEDUP_MANIFEST`, `TFBOOST_CONFIG`.
#[derive(Parser)]
#[command(name = "tfboost", version = APP_VERSION)]
pub struct Cli {}

#[tokio::main]
async fn main() {
    let _cli = Cli::parse();

    logging::init(LogLevel::from_env());

    if let Err(e) = run().await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = config::load()?;
    let booster = Booster::from_config(&config)?;
    booster.run().await?;
    Ok(())
}
