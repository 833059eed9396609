/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public Precog client crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod auth;
pub mod http;
pub mod types;

// Re-export commonly used types from auth
pub use auth::{
    AuthChallenge,
    AuthTransport,
    Clock,
    FileTokenStore,
    KeyfileWallet,
    ManualClock,
    MemoryTokenStore,
    MockWalletSigner,
    PersistedSession,
    SessionState,
    SystemClock,
    TokenGrant,
    TokenManager,
    TokenPair,
    TokenStore,
    WalletSigner,
};

// Re-export commonly used types from http
pub use http::{
    ApiClient,
    AuthFailure,
    ClientConfig,
    HttpAuthTransport,
    PrecogClient,
    PrecogError,
    Result,
};

// Re-export all types
pub use types::*;
