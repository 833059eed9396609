/*
[INPUT]:  API response JSON
[OUTPUT]: Typed response structures
[POS]:    Data layer - response payloads for /auth endpoints
[UPDATE]: When API response format changes
*/

use serde::{Deserialize, Serialize};

/// Access policy published by `GET /auth/requirements`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthRequirements {
    /// Minimum alpha stake the wallet must hold
    #[serde(default)]
    pub minimum_alpha_stake: Option<f64>,
    /// Subnet the stake is checked on
    #[serde(default)]
    pub netuid: Option<u16>,
}

impl AuthRequirements {
    /// Requirements assumed when the API cannot be reached
    pub fn fallback() -> Self {
        Self {
            minimum_alpha_stake: Some(1000.0),
            netuid: Some(55),
        }
    }
}
