use anyhow::Result;
use clap::Parser;
use testsmith::cli::{run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt::init();
    tracing::info!("testsmith startup: tracing initialised, environment loaded");

    let cli = Cli::parse();
    let result = run(cli).await;
    match &result {
        Ok(_) => tracing::info!("testsmith completed successfully"),
        Err(e) => tracing::error!(error = %e, "testsmith exited with error"),
    }
    result
}
