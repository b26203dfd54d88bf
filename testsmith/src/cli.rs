//! Command-line interface for testsmith.
//!
//! Two subcommands: `serve` runs the HTTP service, `generate` runs the
//! pipeline once from the shell and leaves the archive on disk. Both
//! construct the OpenAI synthesizer up front so a missing API key fails
//! hard before any work starts.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use testsmith_core::cleanup;
use testsmith_core::pipeline::generate_tests;
use testsmith_core::synthesize::OpenAiSynthesizer;

use crate::server;

/// CLI for testsmith: LLM-written unit tests for every Python function in
/// a git repository.
#[derive(Parser)]
#[clap(
    name = "testsmith",
    version,
    about = "Clone a repository, extract its Python functions and generate a unit-test archive"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP service
    Serve {
        /// Address to bind
        #[clap(long, default_value = "127.0.0.1:8000")]
        addr: SocketAddr,
    },
    /// Run the pipeline once and print the archive path
    Generate {
        /// URL of the repository to clone
        #[clap(long)]
        repo_url: String,
        /// Directory holding the clone, the test tree and the archive
        #[clap(long, default_value = ".")]
        workspace: PathBuf,
        /// Keep the cloned repository and test tree next to the archive
        #[clap(long)]
        keep: bool,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Serve { addr } => {
            let synthesizer = OpenAiSynthesizer::new_from_env()?;
            server::serve(addr, Arc::new(synthesizer)).await
        }
        Commands::Generate {
            repo_url,
            workspace,
            keep,
        } => {
            let synthesizer = OpenAiSynthesizer::new_from_env()?;
            tracing::info!(repo_url = %repo_url, workspace = %workspace.display(), "Starting test generation");

            let output = generate_tests(&repo_url, &workspace, &synthesizer).await?;

            for skipped in &output.report.skipped {
                tracing::warn!(
                    function = %skipped.function,
                    file = %skipped.file.display(),
                    "Function skipped: no extractable definition"
                );
            }
            if !keep {
                cleanup::remove_dir(&output.repo_dir);
                cleanup::remove_dir(&output.test_dir);
            }

            println!("{}", output.archive_path.display());
            Ok(())
        }
    }
}
