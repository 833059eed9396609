/*
[INPUT]:  Wallet name (argv[1]), ~/.precog/wallets, PRECOG_API_URL
[OUTPUT]: Recent predictions printed as JSON
[POS]:    Examples - authenticated prediction queries
[UPDATE]: When the token manager or prediction client API changes
*/

use std::sync::Arc;

use precog_client::http::DEFAULT_API_URL;
use precog_client::*;

/// Example: fetch recent predictions with automatic token management
///
/// The first run logs in with the wallet and stores the session in
/// ~/.precog/tokens.json; later runs reuse or refresh it.
#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let wallet_name = std::env::args().nth(1).unwrap_or_else(|| "default".to_string());
    let api_url = std::env::var("PRECOG_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
    let home = std::env::var("HOME")?;
    let precog_dir = std::path::Path::new(&home).join(".precog");

    let wallet = KeyfileWallet::open(precog_dir.join("wallets"), &wallet_name)?;
    println!("Wallet {} -> {}", wallet.name(), wallet.address());

    let config = ClientConfig::default();
    let manager = TokenManager::new(
        Arc::new(FileTokenStore::new(precog_dir.join("tokens.json"))),
        Arc::new(HttpAuthTransport::new(&api_url, config.clone())?),
        Arc::new(wallet),
    );
    let client = PrecogClient::new(&api_url, config, manager)?;

    let recent = client.get_recent_predictions(10).await?;
    println!("{}", serde_json::to_string_pretty(&recent)?);

    println!(
        "Session state: {:?}",
        client.token_manager().session_state().await?
    );
    Ok(())
}
