/*
[INPUT]:  Wallet address, challenge signatures, refresh tokens
[OUTPUT]: Auth challenges and token grants from the auth server
[POS]:    Auth layer - network seam between token manager and auth endpoints
[UPDATE]: When auth endpoints or error classification change
*/

use async_trait::async_trait;
use serde::Deserialize;

use crate::http::Result;

use super::TokenGrant;

/// Single-use server nonce to be signed by the wallet.
///
/// Submitting a login consumes it.
#[derive(Debug, PartialEq, Eq, Deserialize)]
pub struct AuthChallenge {
    pub challenge_id: String,
    pub challenge_text: String,
}

/// Network operations the token manager needs.
///
/// Implementations report network failures and timeouts as
/// `Transport`/`Timeout`, a rejected login as `AuthenticationRequired` and a
/// rejected refresh token as `RefreshTokenExpired`.
#[async_trait]
pub trait AuthTransport: Send + Sync {
    async fn request_challenge(&self, address: &str) -> Result<AuthChallenge>;

    async fn submit_login(
        &self,
        challenge: AuthChallenge,
        address: &str,
        signature: &[u8],
    ) -> Result<TokenGrant>;

    async fn submit_refresh(&self, refresh_token: &str) -> Result<TokenGrant>;
}
