/*
[INPUT]:  Prediction query parameters and a token manager
[OUTPUT]: Prediction data as JSON from authenticated endpoints
[POS]:    HTTP layer - prediction endpoints (require bearer token)
[UPDATE]: When adding new prediction endpoints or changing query parameters
*/

use reqwest::{Method, Response, StatusCode};
use serde_json::Value;
use tracing::warn;

use crate::auth::TokenManager;
use crate::http::{ApiClient, AuthFailure, ClientConfig, PrecogError, Result};
use crate::types::{HistoricalQuery, validate_hotkey, validate_limit, validate_miner_uid};

/// Prediction API client with automatic token management
#[derive(Debug, Clone)]
pub struct PrecogClient {
    client: ApiClient,
    tokens: TokenManager,
}

impl PrecogClient {
    pub fn new(api_url: &str, config: ClientConfig, tokens: TokenManager) -> Result<Self> {
        Ok(Self {
            client: ApiClient::new(api_url, config)?,
            tokens,
        })
    }

    pub fn token_manager(&self) -> &TokenManager {
        &self.tokens
    }

    /// Recent predictions for all miners
    ///
    /// GET /predictions/recent?limit={limit}
    pub async fn get_recent_predictions(&self, limit: u32) -> Result<Value> {
        validate_limit(limit)?;
        self.get("/predictions/recent", &[("limit", limit.to_string())])
            .await
    }

    /// GET /predictions/recent/uid/{uid}?limit={limit}
    pub async fn get_recent_predictions_by_uid(&self, miner_uid: u16, limit: u32) -> Result<Value> {
        validate_miner_uid(miner_uid)?;
        validate_limit(limit)?;
        let endpoint = format!("/predictions/recent/uid/{miner_uid}");
        self.get(&endpoint, &[("limit", limit.to_string())]).await
    }

    /// GET /predictions/recent/hotkey/{hotkey}?limit={limit}
    pub async fn get_recent_predictions_by_hotkey(
        &self,
        miner_hotkey: &str,
        limit: u32,
    ) -> Result<Value> {
        validate_hotkey(miner_hotkey)?;
        validate_limit(limit)?;
        let endpoint = format!("/predictions/recent/hotkey/{miner_hotkey}");
        self.get(&endpoint, &[("limit", limit.to_string())]).await
    }

    /// Historical predictions for all miners, paginated
    ///
    /// GET /predictions/historical?start_date=..&end_date=..&page=..&page_size=..
    pub async fn get_historical_predictions(&self, query: &HistoricalQuery) -> Result<Value> {
        query.validate()?;
        self.get("/predictions/historical", &query.to_query()).await
    }

    /// GET /predictions/historical/uid/{uid}
    pub async fn get_historical_predictions_by_uid(
        &self,
        miner_uid: u16,
        query: &HistoricalQuery,
    ) -> Result<Value> {
        validate_miner_uid(miner_uid)?;
        query.validate()?;
        let endpoint = format!("/predictions/historical/uid/{miner_uid}");
        self.get(&endpoint, &query.to_query()).await
    }

    /// GET /predictions/historical/hotkey/{hotkey}
    pub async fn get_historical_predictions_by_hotkey(
        &self,
        miner_hotkey: &str,
        query: &HistoricalQuery,
    ) -> Result<Value> {
        validate_hotkey(miner_hotkey)?;
        query.validate()?;
        let endpoint = format!("/predictions/historical/hotkey/{miner_hotkey}");
        self.get(&endpoint, &query.to_query()).await
    }

    /// Authenticated GET; a 401 renews the token once and retries
    async fn get(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Value> {
        let token = self.tokens.ensure_valid_access_token().await?;
        let response = self.send_with_token(endpoint, query, &token).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return self.client.read_json(response).await;
        }

        warn!(endpoint, "access token rejected by API, renewing");
        let token = self.tokens.renew_rejected_token(&token).await?;
        let response = self.send_with_token(endpoint, query, &token).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(PrecogError::authentication(
                AuthFailure::Rejected,
                "API rejected a freshly issued access token",
            ));
        }
        self.client.read_json(response).await
    }

    async fn send_with_token(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
        token: &str,
    ) -> Result<Response> {
        let builder = self
            .client
            .request(Method::GET, endpoint)?
            .bearer_auth(token)
            .query(query);
        self.client.send(builder).await
    }
}
