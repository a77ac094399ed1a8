use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd;
mod output;
mod prompts;

/// chainwright - contract deployment & reconciliation
#[derive(Parser)]
#[command(name = "chainwright")]
#[command(author, version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Deploy components and reconcile wiring against a network
  Deploy {
    /// Directory holding manifest.json, flags.json and owner-actions.json
    #[arg(long, default_value = "deployment")]
    deployment_path: PathBuf,

    /// Compiled artifacts file
    #[arg(long, default_value = "artifacts.json")]
    artifacts: PathBuf,

    /// Deployment plan file
    #[arg(long, default_value = "plan.json")]
    plan: PathBuf,

    /// Node gateway base URL
    #[arg(long)]
    endpoint: String,

    /// Address of the account the gateway signs with
    #[arg(long)]
    account: String,

    /// Network name recorded in the manifest
    #[arg(long)]
    network: String,

    /// Block-explorer URL prefix for recorded links
    #[arg(long)]
    explorer: Option<String>,

    /// Deploy these components even if absent from the flags file
    #[arg(long, value_delimiter = ',')]
    force_components: Vec<String>,

    /// Skip all confirmation prompts
    #[arg(short = 'y', long)]
    yes: bool,
  },

  /// Show the recorded deployment state
  Status {
    #[arg(long, default_value = "deployment")]
    deployment_path: PathBuf,

    /// Output as JSON
    #[arg(long)]
    json: bool,
  },

  /// List pending owner actions
  Actions {
    #[arg(long, default_value = "deployment")]
    deployment_path: PathBuf,

    /// Include actions already marked complete
    #[arg(long)]
    all: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .without_time()
    .init();

  let cli = Cli::parse();

  match cli.command {
    Commands::Deploy {
      deployment_path,
      artifacts,
      plan,
      endpoint,
      account,
      network,
      explorer,
      force_components,
      yes,
    } => cmd::cmd_deploy(&cmd::DeployArgs {
      deployment_path,
      artifacts,
      plan,
      endpoint,
      account,
      network,
      explorer,
      force_components,
      yes,
    }),
    Commands::Status { deployment_path, json } => cmd::cmd_status(&deployment_path, json),
    Commands::Actions {
      deployment_path,
      all,
      json,
    } => cmd::cmd_actions(&deployment_path, all, json),
  }
}
