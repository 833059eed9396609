/*
[INPUT]:  HTTP configuration (base URL, timeouts)
[OUTPUT]: Configured reqwest client with typed response handling
[POS]:    HTTP layer - core client implementation shared by auth and prediction endpoints
[UPDATE]: When adding connection options or changing status-code handling
*/

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::http::{PrecogError, Result};

/// Default Precog API base URL
pub const DEFAULT_API_URL: &str = "https://precog-api.example.com";

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Upper bound for a whole request, including reading the body
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Thin reqwest wrapper bound to one API base URL
#[derive(Debug, Clone)]
pub struct ApiClient {
    http_client: Client,
    base_url: Url,
    timeout: Duration,
}

impl ApiClient {
    pub fn new(base_url: &str, config: ClientConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| PrecogError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url: normalize_base_url(base_url)?,
            timeout: config.timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build full URL; the endpoint is resolved below the base path
    pub fn url(&self, endpoint: &str) -> Result<Url> {
        Ok(self.base_url.join(endpoint.trim_start_matches('/'))?)
    }

    pub fn request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder> {
        let url = self.url(endpoint)?;
        Ok(self.http_client.request(method, url))
    }

    /// Send a request; network failures become `Transport`/`Timeout`, statuses are left to the caller
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        builder.send().await.map_err(|e| self.map_send_error(e))
    }

    /// Decode a successful response or turn an error status into `PrecogError`
    pub async fn read_json<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let bytes = response.bytes().await.map_err(|e| self.map_send_error(e))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| PrecogError::InvalidResponse(format!("unexpected response body: {e}")))
    }

    pub async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.send(builder).await?;
        self.read_json(response).await
    }

    fn map_send_error(&self, err: reqwest::Error) -> PrecogError {
        if err.is_timeout() {
            PrecogError::Timeout {
                duration: self.timeout.as_secs(),
            }
        } else {
            PrecogError::from(err)
        }
    }
}

fn normalize_base_url(base_url: &str) -> Result<Url> {
    let trimmed = base_url.trim();
    if trimmed.ends_with('/') {
        Ok(Url::parse(trimmed)?)
    } else {
        Ok(Url::parse(&format!("{trimmed}/"))?)
    }
}

/// Server-side failures and throttling are transport problems; other statuses are API errors
pub(crate) fn status_error(status: StatusCode, body: &str) -> PrecogError {
    let message = error_message(body);
    if status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
    {
        PrecogError::transport(format!("server returned {status}: {message}"))
    } else {
        PrecogError::api_error(status, message)
    }
}

/// Pull a human-readable message out of an error body (`detail`, `message` or `error`)
pub(crate) fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["detail", "message", "error"] {
            match value.get(key) {
                Some(serde_json::Value::String(text)) => return text.clone(),
                Some(other) if !other.is_null() => return other.to_string(),
                _ => {}
            }
        }
    }
    let body = body.trim();
    if body.is_empty() {
        "no details provided".to_string()
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_keeps_base_path() {
        let client = ApiClient::new("https://api.example.com/v1", ClientConfig::default()).unwrap();
        assert_eq!(
            client.url("/auth/challenge").unwrap().as_str(),
            "https://api.example.com/v1/auth/challenge"
        );
        assert_eq!(
            client.url("predictions/recent").unwrap().as_str(),
            "https://api.example.com/v1/predictions/recent"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let err = ApiClient::new("not a url", ClientConfig::default()).unwrap_err();
        assert!(matches!(err, PrecogError::UrlParse(_)));
    }

    #[test]
    fn test_status_error_classification() {
        let err = status_error(StatusCode::BAD_GATEWAY, "upstream down");
        assert!(err.is_retryable());

        let err = status_error(StatusCode::TOO_MANY_REQUESTS, "");
        assert!(err.is_retryable());

        let err = status_error(StatusCode::NOT_FOUND, r#"{"detail": "Miner not found"}"#);
        match err {
            PrecogError::Api { code, message } => {
                assert_eq!(code, 404);
                assert_eq!(message, "Miner not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_error_message_fallbacks() {
        assert_eq!(error_message(r#"{"message": "nope"}"#), "nope");
        assert_eq!(error_message("plain text"), "plain text");
        assert_eq!(error_message("  "), "no details provided");
    }
}
