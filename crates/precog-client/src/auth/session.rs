/*
[INPUT]:  Token grants returned by the auth server and the current time
[OUTPUT]: Absolute-expiry token pairs, persisted sessions and their lifecycle state
[POS]:    Auth layer - session data model
[UPDATE]: When the persisted layout or expiry rules change
*/

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::http::{PrecogError, Result};

/// Access/refresh credentials with absolute expiries.
///
/// The two expiries are independent; the access token may outlive the refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
}

impl TokenPair {
    /// Access token stays valid for more than `margin` after `now`
    pub fn access_valid(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        self.access_expires_at - now > margin
    }

    /// Refresh token has not reached its expiry yet
    pub fn refresh_usable(&self, now: DateTime<Utc>) -> bool {
        now < self.refresh_expires_at
    }
}

/// Login/refresh response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
    /// Refresh token lifetime in seconds; servers that omit it reuse `expires_in`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_expires_in: Option<u64>,
}

impl TokenGrant {
    /// Stamp relative lifetimes into absolute expiries.
    ///
    /// Lifetimes that do not fit a timestamp are an `InvalidResponse`.
    pub fn into_pair(self, now: DateTime<Utc>) -> Result<TokenPair> {
        let refresh_expires_in = self.refresh_expires_in.unwrap_or(self.expires_in);
        Ok(TokenPair {
            access_expires_at: expiry(now, self.expires_in, "expires_in")?,
            refresh_expires_at: expiry(now, refresh_expires_in, "refresh_expires_in")?,
            access_token: self.access_token,
            refresh_token: self.refresh_token,
        })
    }
}

fn expiry(now: DateTime<Utc>, secs: u64, field: &str) -> Result<DateTime<Utc>> {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| {
            PrecogError::InvalidResponse(format!("{field} of {secs}s is out of range"))
        })
}

/// Where a session sits in its lifecycle at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NoSession,
    /// Access token usable beyond the safety margin
    Active,
    /// Access token expired or inside the margin, refresh token still usable
    AccessStale,
    /// Refresh token past expiry; only a new login helps
    RefreshStale,
}

/// Token pair bound to the wallet that obtained it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub wallet_identity: String,
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub issued_at: DateTime<Utc>,
}

impl PersistedSession {
    pub fn new(wallet_identity: impl Into<String>, tokens: TokenPair, issued_at: DateTime<Utc>) -> Self {
        Self {
            wallet_identity: wallet_identity.into(),
            tokens,
            issued_at,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.tokens.access_token
    }

    /// Session was obtained by the wallet with this address
    pub fn belongs_to(&self, address: &str) -> bool {
        self.wallet_identity == address
    }

    pub fn state(&self, now: DateTime<Utc>, margin: Duration) -> SessionState {
        if self.tokens.access_valid(now, margin) {
            SessionState::Active
        } else if self.tokens.refresh_usable(now) {
            SessionState::AccessStale
        } else {
            SessionState::RefreshStale
        }
    }
}

/// Lifecycle state of an optional session
pub fn session_state(
    session: Option<&PersistedSession>,
    now: DateTime<Utc>,
    margin: Duration,
) -> SessionState {
    session.map_or(SessionState::NoSession, |s| s.state(now, margin))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn session(access_at: i64, refresh_at: i64) -> PersistedSession {
        PersistedSession::new(
            "5Fwallet",
            TokenPair {
                access_token: "access".to_string(),
                access_expires_at: at(access_at),
                refresh_token: "refresh".to_string(),
                refresh_expires_at: at(refresh_at),
            },
            at(0),
        )
    }

    #[test]
    fn test_grant_falls_back_to_access_lifetime() {
        let grant = TokenGrant {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_in: 900,
            refresh_expires_in: None,
        };
        let pair = grant.into_pair(at(0)).unwrap();
        assert_eq!(pair.access_expires_at, at(900));
        assert_eq!(pair.refresh_expires_at, at(900));
    }

    #[test]
    fn test_grant_uses_refresh_lifetime() {
        let grant: TokenGrant = serde_json::from_value(serde_json::json!({
            "access_token": "a",
            "refresh_token": "r",
            "expires_in": 60,
            "refresh_expires_in": 86400,
        }))
        .unwrap();
        let pair = grant.into_pair(at(10)).unwrap();
        assert_eq!(pair.access_expires_at, at(70));
        assert_eq!(pair.refresh_expires_at, at(86410));
    }

    #[test]
    fn test_oversized_lifetimes_are_invalid_responses() {
        let grant = |expires_in: u64, refresh_expires_in: Option<u64>| TokenGrant {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_in,
            refresh_expires_in,
        };

        for bad in [
            grant(u64::MAX, Some(60)),
            grant(60, Some(u64::MAX)),
            grant(9_000_000_000_000, None),
            grant(i64::MAX as u64, Some(60)),
        ] {
            let err = bad.into_pair(at(0)).unwrap_err();
            assert!(matches!(err, PrecogError::InvalidResponse(_)), "{err:?}");
        }
    }

    #[test]
    fn test_belongs_to_compares_wallet() {
        let s = session(60, 300);
        assert!(s.belongs_to("5Fwallet"));
        assert!(!s.belongs_to("5Fother"));
    }

    #[test]
    fn test_state_transitions_over_time() {
        let margin = Duration::seconds(5);
        let s = session(60, 300);
        assert_eq!(s.state(at(50), margin), SessionState::Active);
        assert_eq!(s.state(at(55), margin), SessionState::AccessStale);
        assert_eq!(s.state(at(56), margin), SessionState::AccessStale);
        assert_eq!(s.state(at(299), margin), SessionState::AccessStale);
        assert_eq!(s.state(at(300), margin), SessionState::RefreshStale);
        assert_eq!(session_state(None, at(0), margin), SessionState::NoSession);
    }

    #[test]
    fn test_access_may_outlive_refresh() {
        let margin = Duration::seconds(5);
        let s = session(600, 100);
        assert_eq!(s.state(at(200), margin), SessionState::Active);
        assert!(!s.tokens.refresh_usable(at(200)));
    }

    #[test]
    fn test_persisted_layout_is_flat() {
        let value = serde_json::to_value(session(60, 300)).unwrap();
        for key in [
            "wallet_identity",
            "access_token",
            "access_expires_at",
            "refresh_token",
            "refresh_expires_at",
            "issued_at",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
    }
}
