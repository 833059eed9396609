/*
[INPUT]:  Wallet address, signatures and refresh tokens
[OUTPUT]: Challenges, token grants and access requirements from /auth endpoints
[POS]:    HTTP layer - AuthTransport implementation over the Precog REST API
[UPDATE]: When auth endpoints, payloads or status-code semantics change
*/

use async_trait::async_trait;
use reqwest::{Method, Response, StatusCode};
use tracing::debug;

use crate::auth::{AuthChallenge, AuthTransport, TokenGrant};
use crate::http::client::{error_message, status_error};
use crate::http::{ApiClient, AuthFailure, ClientConfig, PrecogError, Result};
use crate::types::{AuthRequirements, LoginRequest, RefreshRequest};

/// Auth endpoints of the Precog API
#[derive(Debug, Clone)]
pub struct HttpAuthTransport {
    client: ApiClient,
}

impl HttpAuthTransport {
    pub fn new(api_url: &str, config: ClientConfig) -> Result<Self> {
        Ok(Self {
            client: ApiClient::new(api_url, config)?,
        })
    }

    pub fn from_client(client: ApiClient) -> Self {
        Self { client }
    }

    /// Access policy (minimum stake, subnet)
    ///
    /// GET /auth/requirements
    pub async fn requirements(&self) -> Result<AuthRequirements> {
        let builder = self.client.request(Method::GET, "/auth/requirements")?;
        self.client.send_json(builder).await
    }

    async fn read_login_step<T: serde::de::DeserializeOwned>(
        &self,
        response: Response,
    ) -> Result<T> {
        let status = response.status();
        if status.is_client_error()
            && status != StatusCode::TOO_MANY_REQUESTS
            && status != StatusCode::REQUEST_TIMEOUT
        {
            let body = response.text().await.unwrap_or_default();
            return Err(login_rejection(status, &body));
        }
        self.client.read_json(response).await
    }
}

#[async_trait]
impl AuthTransport for HttpAuthTransport {
    /// GET /auth/challenge?coldkey={address}
    async fn request_challenge(&self, address: &str) -> Result<AuthChallenge> {
        let builder = self
            .client
            .request(Method::GET, "/auth/challenge")?
            .query(&[("coldkey", address)]);
        let response = self.client.send(builder).await?;
        let challenge: AuthChallenge = self.read_login_step(response).await?;
        debug!(challenge_id = %challenge.challenge_id, "challenge received");
        Ok(challenge)
    }

    /// POST /auth/authenticate
    async fn submit_login(
        &self,
        challenge: AuthChallenge,
        address: &str,
        signature: &[u8],
    ) -> Result<TokenGrant> {
        let body = LoginRequest {
            challenge_id: challenge.challenge_id,
            signature: hex::encode(signature),
            coldkey: address.to_string(),
        };
        let builder = self
            .client
            .request(Method::POST, "/auth/authenticate")?
            .json(&body);
        let response = self.client.send(builder).await?;
        self.read_login_step(response).await
    }

    /// POST /auth/refresh
    async fn submit_refresh(&self, refresh_token: &str) -> Result<TokenGrant> {
        let body = RefreshRequest {
            refresh_token: refresh_token.to_string(),
        };
        let builder = self
            .client
            .request(Method::POST, "/auth/refresh")?
            .json(&body);
        let response = self.client.send(builder).await?;

        let status = response.status();
        if status.is_client_error()
            && status != StatusCode::TOO_MANY_REQUESTS
            && status != StatusCode::REQUEST_TIMEOUT
        {
            let body = response.text().await.unwrap_or_default();
            return Err(PrecogError::refresh_expired(format!(
                "server rejected refresh token ({status}): {}",
                error_message(&body)
            )));
        }
        self.client.read_json(response).await
    }
}

/// 401 means the signature did not verify, 403 that the wallet fails the access policy
fn login_rejection(status: StatusCode, body: &str) -> PrecogError {
    let message = error_message(body);
    let reason = match status {
        StatusCode::UNAUTHORIZED => AuthFailure::BadSignature,
        StatusCode::FORBIDDEN => AuthFailure::PolicyNotMet,
        _ if status.is_client_error() => AuthFailure::Rejected,
        _ => return status_error(status, body),
    };
    PrecogError::authentication(reason, message)
}
