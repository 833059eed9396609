/*
[INPUT]:  Stored configuration, token file and the auth requirements endpoint
[OUTPUT]: Human-readable status output; cleared sessions
[POS]:    CLI layer - `precog status`, `precog requirements`, `precog logout`
[UPDATE]: When session states or printed fields change
*/

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use console::style;
use precog_client::auth::session_state;
use precog_client::{
    AuthRequirements, HttpAuthTransport, SessionState, TokenStore, WalletSigner,
};
use tracing::warn;

use precog_cli::PrecogConfig;

pub fn print_config(config: &PrecogConfig) {
    println!(
        "  Wallet:     {}",
        config.wallet_name.as_deref().unwrap_or("not set")
    );
    println!("  Token file: {}", config.token_file.display());
    println!("  API URL:    {}", config.api_url);
}

pub async fn run_status(config: PrecogConfig) -> Result<()> {
    if !config.is_configured() {
        println!("{}", style("Precog API is not configured").red());
        println!("Run 'precog authenticate' to get started");
        return Ok(());
    }

    println!("{}", style("Precog API is configured").green());
    print_config(&config);

    let mut session = config
        .token_store()
        .load()
        .await
        .context("failed to read token file")?;

    // Only a session issued to the configured wallet counts
    match config.open_wallet() {
        Ok(wallet) => {
            if session
                .as_ref()
                .is_some_and(|stored| !stored.belongs_to(wallet.address()))
            {
                println!(
                    "  {}",
                    style("Stored session belongs to another wallet").yellow()
                );
                session = None;
            }
        }
        Err(err) => {
            warn!(error = %err, "cannot open configured wallet");
            println!("  {} {err:#}", style("Wallet unavailable:").yellow());
        }
    }

    let margin = Duration::seconds(config.safety_margin_secs);
    let state = session_state(session.as_ref(), Utc::now(), margin);
    let label = match state {
        SessionState::NoSession => style("no session").yellow(),
        SessionState::Active => style("active").green(),
        SessionState::AccessStale => style("access token expired (refresh pending)").yellow(),
        SessionState::RefreshStale => style("expired (login required)").red(),
    };
    println!("  Session:    {label}");
    if let Some(session) = session {
        println!("  Signed in:  {}", session.wallet_identity);
        println!(
            "  Refresh by: {}",
            session.tokens.refresh_expires_at.to_rfc3339()
        );
    }
    Ok(())
}

pub async fn run_requirements(config: PrecogConfig) -> Result<()> {
    println!("{}", style("Precog API Authentication Requirements").bold().cyan());

    let transport = HttpAuthTransport::new(&config.api_url, config.client_config())
        .context("failed to build auth client")?;
    let requirements = match transport.requirements().await {
        Ok(requirements) => {
            println!("To access the Precog API, you need:");
            requirements
        }
        Err(err) => {
            warn!(error = %err, "requirements endpoint unavailable");
            println!("{} {err}", style("Failed to fetch requirements:").red());
            println!("Default requirements:");
            AuthRequirements::fallback()
        }
    };

    if let Some(stake) = requirements.minimum_alpha_stake {
        println!("  Minimum alpha stake: {stake} Alpha");
    }
    if let Some(netuid) = requirements.netuid {
        println!("  Subnet (netuid):     {netuid}");
    }
    Ok(())
}

pub async fn run_logout(config: PrecogConfig) -> Result<()> {
    config
        .token_store()
        .clear()
        .await
        .context("failed to clear stored session")?;
    println!(
        "{} {}",
        style("Session cleared:").green(),
        config.token_file.display()
    );
    Ok(())
}
