mod archive;
mod cli;
mod config;
mod error;
mod image;
mod remote;
#[cfg(test)]
mod test_utils;
mod workflow;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use fleet::{DigitalOceanClient, FleetResolver};
use tracing::info;

use crate::archive::{ArchiveProducer, GitCli};
use crate::cli::Args;
use crate::config::{resolve_config_path, Config};
use crate::error::{DeployError, DeployResult};
use crate::remote::SshShell;
use crate::workflow::{Operation, Outcome, Workflow};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing();
    let (operation, words) = args.command.into_parts();
    match run(args.config.as_ref(), operation, &words).await {
        Ok(outcome) => {
            if let Some(output) = outcome.output {
                println!("{output}");
            }
            info!(event = "command.ok", command = operation.name(), "OK");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            if matches!(err, DeployError::InvalidArguments { .. }) {
                eprintln!("usage: faucet {} {}", operation.name(), operation.usage());
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(
    config_path: Option<&PathBuf>,
    operation: Operation,
    words: &[String],
) -> DeployResult<Outcome> {
    let config = Config::load(&resolve_config_path(config_path))?;
    let api =
        DigitalOceanClient::new(config.credentials(), config.api_url()).map_err(DeployError::Api)?;
    let workflow = Workflow::new(
        FleetResolver::new(api),
        SshShell::new(config.ssh_args().to_vec()),
        ArchiveProducer::new(GitCli),
    );
    workflow.run(operation, words).await
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
