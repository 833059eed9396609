/*
[INPUT]:  Stored configuration and interactive user input
[OUTPUT]: Saved wallet/token-file configuration and a fresh API session
[POS]:    CLI layer - `precog authenticate`
[UPDATE]: When the login flow or configuration fields change
*/

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select, theme::ColorfulTheme};
use precog_client::KeyfileWallet;
use tracing::info;

use precog_cli::{PrecogConfig, expand_tilde};

use super::status::print_config;

pub async fn run_authenticate(
    mut config: PrecogConfig,
    wallet: Option<String>,
    token_file: Option<PathBuf>,
) -> Result<()> {
    let theme = ColorfulTheme::default();
    let interactive = wallet.is_none();
    println!("{}", style("Precog API Authentication").bold().cyan());

    if interactive && config.is_configured() {
        println!("{}", style("Precog API is already configured").green());
        print_config(&config);
        let again = Confirm::with_theme(&theme)
            .with_prompt("Re-authenticate?")
            .default(false)
            .interact()?;
        if !again {
            println!("{}", style("Authentication cancelled.").yellow());
            return Ok(());
        }
    }

    let wallet_name = match wallet {
        Some(name) => name,
        None => prompt_wallet_name(&config, &theme)?,
    };
    let token_file = match token_file {
        Some(path) => expand_tilde(&path),
        None if interactive => {
            let entered: String = Input::with_theme(&theme)
                .with_prompt("Token file")
                .default(config.token_file.display().to_string())
                .interact_text()?;
            expand_tilde(Path::new(entered.trim()))
        }
        None => config.token_file.clone(),
    };

    config.wallet_name = Some(wallet_name);
    config.token_file = token_file;
    let saved_to = config.save()?;
    println!(
        "Configuration saved to: {}",
        style(saved_to.display()).cyan()
    );

    let wallet = config.open_wallet()?;
    let manager = config.token_manager(wallet)?;
    println!("{}", style("Authenticating with your wallet...").dim());

    match manager.login().await {
        Ok(session) => {
            info!(wallet = %session.wallet_identity, "authenticated");
            println!("\n{}", style("Authentication completed successfully!").bold().green());
            println!(
                "Session valid until: {}",
                style(session.tokens.refresh_expires_at.to_rfc3339()).cyan()
            );
            Ok(())
        }
        Err(err) => {
            println!(
                "\n{}",
                style("Configuration saved, but authentication failed.").red()
            );
            println!("You can try again with: precog authenticate");
            Err(err).context("login failed")
        }
    }
}

fn prompt_wallet_name(config: &PrecogConfig, theme: &ColorfulTheme) -> Result<String> {
    let wallets = KeyfileWallet::list_wallets(&config.wallets_dir);
    if !wallets.is_empty() {
        let default = config
            .wallet_name
            .as_ref()
            .and_then(|current| wallets.iter().position(|name| name == current))
            .unwrap_or(0);
        let selection = Select::with_theme(theme)
            .with_prompt("Wallet")
            .items(&wallets)
            .default(default)
            .interact()?;
        return Ok(wallets[selection].clone());
    }

    println!(
        "{} {}",
        style("No wallets found in").yellow(),
        style(config.wallets_dir.display()).cyan()
    );
    loop {
        let mut input = Input::<String>::with_theme(theme).with_prompt("Wallet name");
        if let Some(current) = &config.wallet_name {
            input = input.default(current.clone());
        }
        let name = input.interact_text()?.trim().to_string();
        let coldkey = KeyfileWallet::coldkey_path(&config.wallets_dir, &name);
        if coldkey.exists() {
            return Ok(name);
        }
        println!(
            "{} {}",
            style("Coldkey not found:").red(),
            coldkey.display()
        );
    }
}
