/*
[INPUT]:  Wallet directory and wallet name
[OUTPUT]: Ed25519 wallet signer with an SS58 address
[POS]:    Auth layer - file-backed wallet implementation
[UPDATE]: When key file format or address encoding changes
*/

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use blake2::{Blake2b512, Digest};
use ed25519_dalek::{Signer, SigningKey};

use crate::auth::WalletSigner;
use crate::http::{AuthFailure, PrecogError, Result};

const COLDKEY_FILE: &str = "coldkey";

/// Generic Substrate address format, used by Bittensor
pub const SS58_PREFIX: u8 = 42;

/// Wallet whose Ed25519 secret lives in `<wallets_dir>/<name>/coldkey` (base64, 32 bytes).
///
/// The address is the standard SS58 encoding of the public key. Signatures
/// are Ed25519, so the server must accept Ed25519 coldkeys; sr25519 keys
/// from a Bittensor keystore cannot be loaded here.
#[derive(Debug)]
pub struct KeyfileWallet {
    name: String,
    signing_key: SigningKey,
    address: String,
}

impl KeyfileWallet {
    /// Open the named wallet under `wallets_dir`
    pub fn open(wallets_dir: impl AsRef<Path>, name: &str) -> Result<Self> {
        let path = Self::coldkey_path(wallets_dir, name);
        let content = fs::read_to_string(&path).map_err(|e| {
            PrecogError::authentication(
                AuthFailure::WalletUnavailable,
                format!("cannot read coldkey {}: {e}", path.display()),
            )
        })?;

        let bytes = STANDARD.decode(content.trim()).map_err(|e| {
            PrecogError::authentication(
                AuthFailure::WalletUnavailable,
                format!("coldkey {} is not valid base64: {e}", path.display()),
            )
        })?;

        let secret: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            PrecogError::authentication(
                AuthFailure::WalletUnavailable,
                format!(
                    "coldkey {} must hold 32 bytes, found {}",
                    path.display(),
                    bytes.len()
                ),
            )
        })?;

        Ok(Self::from_secret_key(name, &secret))
    }

    /// Build a wallet from raw secret key bytes
    pub fn from_secret_key(name: &str, secret: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(secret);
        let address = ss58_encode(signing_key.verifying_key().as_bytes(), SS58_PREFIX);
        Self {
            name: name.to_string(),
            signing_key,
            address,
        }
    }

    /// Expected coldkey location for a wallet name
    pub fn coldkey_path(wallets_dir: impl AsRef<Path>, name: &str) -> PathBuf {
        wallets_dir.as_ref().join(name).join(COLDKEY_FILE)
    }

    /// Names of wallet directories that contain a coldkey
    pub fn list_wallets(wallets_dir: impl AsRef<Path>) -> Vec<String> {
        let mut wallets = Vec::new();
        if let Ok(entries) = fs::read_dir(wallets_dir.as_ref()) {
            for entry in entries.flatten() {
                if entry.path().join(COLDKEY_FILE).is_file() {
                    if let Some(name) = entry.file_name().to_str() {
                        wallets.push(name.to_string());
                    }
                }
            }
        }
        wallets.sort();
        wallets
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }
}

/// `base58(prefix ++ key ++ blake2b("SS58PRE" ++ prefix ++ key)[..2])`
pub fn ss58_encode(public_key: &[u8; 32], prefix: u8) -> String {
    let mut payload = Vec::with_capacity(35);
    payload.push(prefix);
    payload.extend_from_slice(public_key);

    let mut hasher = Blake2b512::new();
    hasher.update(b"SS58PRE");
    hasher.update(&payload);
    let checksum = hasher.finalize();
    payload.extend_from_slice(&checksum[..2]);

    bs58::encode(payload).into_string()
}

#[async_trait]
impl WalletSigner for KeyfileWallet {
    fn address(&self) -> &str {
        &self.address
    }

    async fn sign(&self, challenge: &[u8]) -> Result<Vec<u8>> {
        Ok(self.signing_key.sign(challenge).to_bytes().to_vec())
    }
}
