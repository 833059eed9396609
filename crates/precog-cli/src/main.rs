/*
[INPUT]:  CLI arguments, ~/.precog/config.json, PRECOG_* environment
[OUTPUT]: Wallet authentication, session status and access requirements
[POS]:    Binary entry point
[UPDATE]: When changing CLI flags, subcommands, or startup flow
*/

mod cli;

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use precog_cli::PrecogConfig;

#[derive(Parser, Debug)]
#[command(name = "precog", version, about = "Precog prediction API client")]
struct Cli {
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with a wallet and store the session
    Authenticate {
        /// Wallet name; skips the interactive prompts
        #[arg(long, value_name = "NAME")]
        wallet: Option<String>,
        #[arg(long = "token-file", value_name = "PATH")]
        token_file: Option<PathBuf>,
    },
    /// Show the stake requirements for API access
    Requirements,
    /// Show configuration and session state
    Status,
    /// Remove the stored session
    Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(&args.log_level)?;

    let config = PrecogConfig::load().context("load config")?;
    debug!(api_url = %config.api_url, token_file = %config.token_file.display(), "configuration loaded");

    match args.command {
        Command::Authenticate { wallet, token_file } => {
            cli::run_authenticate(config, wallet, token_file).await
        }
        Command::Requirements => cli::run_requirements(config).await,
        Command::Status => cli::run_status(config).await,
        Command::Logout => cli::run_logout(config).await,
    }
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(log_level).context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(())
}
