/*
[INPUT]:  ~/.precog/config.json, PRECOG_* environment variables, API_URL
[OUTPUT]: Layered client configuration and the token manager built from it
[POS]:    Configuration layer - wallet, token file and API settings
[UPDATE]: When adding new configuration options
*/

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use config::{Config, Environment, File, FileFormat, Map};
use precog_client::http::DEFAULT_API_URL;
use precog_client::{
    ClientConfig, FileTokenStore, HttpAuthTransport, KeyfileWallet, TokenManager,
};
use serde::{Deserialize, Serialize};

const CONFIG_DIR: &str = ".precog";
const CONFIG_FILE: &str = "config.json";

/// Settings shared by every `precog` command
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PrecogConfig {
    /// Wallet directory name under `wallets_dir`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_name: Option<String>,
    pub token_file: PathBuf,
    pub api_url: String,
    pub wallets_dir: PathBuf,
    pub timeout_secs: u64,
    pub safety_margin_secs: i64,
}

impl PrecogConfig {
    /// Defaults rooted at `base` (normally `~/.precog`)
    pub fn defaults_in(base: &Path) -> Self {
        Self {
            wallet_name: None,
            token_file: base.join("tokens.json"),
            api_url: DEFAULT_API_URL.to_string(),
            wallets_dir: base.join("wallets"),
            timeout_secs: 30,
            safety_margin_secs: 30,
        }
    }

    /// Load from the default location and the process environment
    pub fn load() -> Result<Self> {
        let base = config_dir()?;
        Self::load_with_env(
            &base.join(CONFIG_FILE),
            &base,
            std::env::vars().collect(),
        )
    }

    /// Layering: defaults, then the JSON file (optional), then `PRECOG_*`, then `API_URL`
    pub fn load_with_env(path: &Path, base: &Path, env: Map<String, String>) -> Result<Self> {
        let api_url = env.get("API_URL").cloned();

        let defaults = Config::try_from(&Self::defaults_in(base))
            .context("failed to build default configuration")?;
        let mut config: Self = Config::builder()
            .add_source(defaults)
            .add_source(File::from(path).format(FileFormat::Json).required(false))
            .add_source(
                Environment::with_prefix("PRECOG")
                    .try_parsing(true)
                    .source(Some(env)),
            )
            .build()
            .with_context(|| format!("failed to read configuration from {}", path.display()))?
            .try_deserialize()
            .context("invalid configuration")?;

        if let Some(url) = api_url.filter(|url| !url.trim().is_empty()) {
            config.api_url = url;
        }
        config.token_file = expand_tilde(&config.token_file);
        config.wallets_dir = expand_tilde(&config.wallets_dir);
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = config_dir()?.join(CONFIG_FILE);
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let content =
            serde_json::to_string_pretty(self).context("failed to serialize configuration")?;
        std::fs::write(path, content)
            .with_context(|| format!("failed to write config to {}", path.display()))?;
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.wallet_name
            .as_deref()
            .is_some_and(|name| !name.trim().is_empty())
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            ..ClientConfig::default()
        }
    }

    pub fn token_store(&self) -> FileTokenStore {
        FileTokenStore::new(&self.token_file)
    }

    pub fn open_wallet(&self) -> Result<KeyfileWallet> {
        let name = self
            .wallet_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| anyhow!("no wallet configured; run `precog authenticate` first"))?;
        KeyfileWallet::open(&self.wallets_dir, name)
            .with_context(|| format!("failed to open wallet '{name}'"))
    }

    pub fn token_manager(&self, wallet: KeyfileWallet) -> Result<TokenManager> {
        let transport = HttpAuthTransport::new(&self.api_url, self.client_config())
            .context("failed to build auth client")?;
        Ok(TokenManager::builder(
            Arc::new(self.token_store()),
            Arc::new(transport),
            Arc::new(wallet),
        )
        .safety_margin(chrono::Duration::seconds(self.safety_margin_secs))
        .build())
    }
}

/// `~/.precog`
pub fn config_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(CONFIG_DIR))
        .ok_or_else(|| anyhow!("could not determine home directory"))
}

/// Replace a leading `~` with the home directory; other paths pass through
pub fn expand_tilde(path: &Path) -> PathBuf {
    expand_tilde_with(path, dirs::home_dir().as_deref())
}

fn expand_tilde_with(path: &Path, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix("~"), home) {
        (Ok(rest), Some(home)) if rest.as_os_str().is_empty() => home.to_path_buf(),
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_rooted_at_base() {
        let config = PrecogConfig::defaults_in(Path::new("/home/u/.precog"));
        assert_eq!(config.token_file, PathBuf::from("/home/u/.precog/tokens.json"));
        assert_eq!(config.wallets_dir, PathBuf::from("/home/u/.precog/wallets"));
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert!(!config.is_configured());
    }

    #[test]
    fn test_blank_wallet_name_is_not_configured() {
        let mut config = PrecogConfig::defaults_in(Path::new("/tmp"));
        config.wallet_name = Some("  ".to_string());
        assert!(!config.is_configured());
        assert!(config.open_wallet().is_err());

        config.wallet_name = Some("miner".to_string());
        assert!(config.is_configured());
    }

    #[test]
    fn test_expand_tilde() {
        let home = Some(Path::new("/home/u"));

        assert_eq!(
            expand_tilde_with(Path::new("~/tokens.json"), home),
            PathBuf::from("/home/u/tokens.json")
        );
        assert_eq!(
            expand_tilde_with(Path::new("~"), home),
            PathBuf::from("/home/u")
        );
        assert_eq!(
            expand_tilde_with(Path::new("/var/lib/tokens.json"), home),
            PathBuf::from("/var/lib/tokens.json")
        );
        assert_eq!(
            expand_tilde_with(Path::new("~other/tokens.json"), home),
            PathBuf::from("~other/tokens.json")
        );
        assert_eq!(
            expand_tilde_with(Path::new("~/tokens.json"), None),
            PathBuf::from("~/tokens.json")
        );
    }

    #[test]
    fn test_client_config_uses_timeout() {
        let mut config = PrecogConfig::defaults_in(Path::new("/tmp"));
        config.timeout_secs = 5;
        assert_eq!(config.client_config().timeout, Duration::from_secs(5));
    }
}
