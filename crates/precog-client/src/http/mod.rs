/*
[INPUT]:  HTTP client configuration and API endpoints
[OUTPUT]: HTTP responses and typed API results
[POS]:    HTTP layer - REST API communication
[UPDATE]: When adding new endpoints or changing client behavior
*/

pub mod auth;
pub mod client;
pub mod error;
pub mod predictions;

pub use auth::HttpAuthTransport;
pub use client::{ApiClient, ClientConfig, DEFAULT_API_URL};
pub use error::{AuthFailure, PrecogError, Result};
pub use predictions::PrecogClient;
