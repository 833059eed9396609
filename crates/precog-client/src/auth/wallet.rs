/*
[INPUT]:  Challenge bytes issued by the auth server
[OUTPUT]: Wallet address and signature bytes proving wallet ownership
[POS]:    Auth layer - wallet integration abstraction
[UPDATE]: When adding new wallet types or changing signature format
*/

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::http::{AuthFailure, PrecogError, Result};

/// Trait for wallet signing operations
///
/// The trait is async to support hardware wallets and external signers.
/// Errors from `sign` are reported to callers as `AuthenticationRequired`.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// Public address the server identifies the caller by
    fn address(&self) -> &str;

    /// Sign a server challenge and return the raw signature
    async fn sign(&self, challenge: &[u8]) -> Result<Vec<u8>>;
}

/// Mock wallet signer for testing
#[derive(Debug)]
pub struct MockWalletSigner {
    address: String,
    signature: Option<Vec<u8>>,
    sign_calls: AtomicUsize,
}

impl MockWalletSigner {
    /// Create a new mock signer with predetermined signature
    pub fn new(address: &str, signature: &[u8]) -> Self {
        Self {
            address: address.to_string(),
            signature: Some(signature.to_vec()),
            sign_calls: AtomicUsize::new(0),
        }
    }

    /// Mock signer whose wallet refuses to sign (e.g. locked)
    pub fn locked(address: &str) -> Self {
        Self {
            address: address.to_string(),
            signature: None,
            sign_calls: AtomicUsize::new(0),
        }
    }

    pub fn sign_calls(&self) -> usize {
        self.sign_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletSigner for MockWalletSigner {
    fn address(&self) -> &str {
        &self.address
    }

    async fn sign(&self, _challenge: &[u8]) -> Result<Vec<u8>> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        self.signature.clone().ok_or_else(|| {
            PrecogError::authentication(AuthFailure::WalletUnavailable, "wallet is locked")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_signer() {
        let signer = MockWalletSigner::new("5Fmock", b"mock_signature");

        assert_eq!(signer.address(), "5Fmock");

        let signature = signer.sign(b"test message").await.unwrap();
        assert_eq!(signature, b"mock_signature".to_vec());
        assert_eq!(signer.sign_calls(), 1);
    }

    #[tokio::test]
    async fn test_locked_mock_signer() {
        let signer = MockWalletSigner::locked("5Fmock");
        let err = signer.sign(b"challenge").await.unwrap_err();
        assert_eq!(err.auth_failure(), Some(AuthFailure::WalletUnavailable));
    }
}
