/*
[INPUT]:  Error sources (HTTP transport, auth server verdicts, wallet, token storage)
[OUTPUT]: Typed error kinds callers can branch on without matching message text
[POS]:    Error handling layer - unified error types for entire crate
[UPDATE]: When adding new error sources or changing auth failure classification
*/

use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

/// Why a login could not produce a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// Server rejected the challenge signature
    BadSignature,
    /// Wallet is valid but does not meet the access policy (e.g. insufficient stake)
    PolicyNotMet,
    /// Wallet could not be opened or refused to sign
    WalletUnavailable,
    /// Server rejected the login for a reason it did not classify
    Rejected,
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            AuthFailure::BadSignature => "challenge signature was rejected",
            AuthFailure::PolicyNotMet => "wallet does not meet the access policy",
            AuthFailure::WalletUnavailable => "wallet is unavailable",
            AuthFailure::Rejected => "login was rejected",
        };
        f.write_str(text)
    }
}

/// Main error type for the Precog client.
///
/// `Clone` so that one in-flight renewal can hand the same outcome to every waiter.
#[derive(Error, Debug, Clone)]
pub enum PrecogError {
    /// Login failed or never happened; the user has to authenticate again
    #[error(
        "Authentication required ({reason}): {message}. Run `precog authenticate` to re-authenticate"
    )]
    AuthenticationRequired { reason: AuthFailure, message: String },

    /// Refresh token is past expiry or was rejected by the server
    #[error("Refresh token expired: {message}")]
    RefreshTokenExpired { message: String },

    /// Network-level failure talking to the API
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Request did not complete within the configured timeout
    #[error("Request timed out after {duration}s")]
    Timeout { duration: u64 },

    /// Local token persistence failed
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// API returned an error response
    #[error("API error (code {code}): {message}")]
    Api { code: u16, message: String },

    /// Invalid response from server
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller supplied an out-of-range argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A token renewal aborted without producing a result
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PrecogError {
    pub fn authentication(reason: AuthFailure, message: impl Into<String>) -> Self {
        PrecogError::AuthenticationRequired {
            reason,
            message: message.into(),
        }
    }

    pub fn refresh_expired(message: impl Into<String>) -> Self {
        PrecogError::RefreshTokenExpired {
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        PrecogError::Transport {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        PrecogError::Storage {
            message: message.into(),
        }
    }

    /// Check if the error is retryable ("try again later")
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PrecogError::Transport { .. }
                | PrecogError::Timeout { .. }
                | PrecogError::InvalidResponse(_)
        )
    }

    /// Check if error indicates authentication failure
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            PrecogError::AuthenticationRequired { .. } | PrecogError::RefreshTokenExpired { .. }
        )
    }

    /// Check if the user has to run the interactive authentication again ("go re-authenticate")
    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, PrecogError::AuthenticationRequired { .. })
    }

    /// Returns the auth failure classification when this is an `AuthenticationRequired`
    pub fn auth_failure(&self) -> Option<AuthFailure> {
        match self {
            PrecogError::AuthenticationRequired { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    /// Create an API error from status code and message
    pub fn api_error(status: StatusCode, message: impl Into<String>) -> Self {
        PrecogError::Api {
            code: status.as_u16(),
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for PrecogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return PrecogError::InvalidResponse(err.to_string());
        }
        PrecogError::transport(err.to_string())
    }
}

impl From<serde_json::Error> for PrecogError {
    fn from(err: serde_json::Error) -> Self {
        PrecogError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for PrecogError {
    fn from(err: std::io::Error) -> Self {
        PrecogError::storage(err.to_string())
    }
}

/// Result type alias for Precog operations
pub type Result<T> = std::result::Result<T, PrecogError>;
