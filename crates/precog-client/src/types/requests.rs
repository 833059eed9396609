/*
[INPUT]:  Wallet address, challenge, signature and refresh token
[OUTPUT]: Serializable auth request bodies
[POS]:    Data layer - request payloads for /auth endpoints
[UPDATE]: When auth request schema changes
*/

use serde::Serialize;

/// Body of `POST /auth/authenticate`
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub challenge_id: String,
    /// Hex-encoded signature over the challenge text
    pub signature: String,
    /// Wallet address the challenge was issued to
    pub coldkey: String,
}

/// Body of `POST /auth/refresh`
#[derive(Debug, Clone, Serialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}
