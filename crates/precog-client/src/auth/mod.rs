/*
[INPUT]:  Wallet signer, auth transport, token storage location
[OUTPUT]: Valid access tokens and the persisted session lifecycle
[POS]:    Auth layer - wallet login and token lifecycle for the Precog API
[UPDATE]: When auth flow, session model or storage strategy change
*/

pub mod clock;
pub mod keyfile;
pub mod manager;
pub mod session;
pub mod store;
pub mod transport;
pub mod wallet;

pub use clock::{Clock, ManualClock, SystemClock};
pub use keyfile::KeyfileWallet;
pub use manager::{DEFAULT_SAFETY_MARGIN_SECS, TokenManager, TokenManagerBuilder};
pub use session::{PersistedSession, SessionState, TokenGrant, TokenPair, session_state};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use transport::{AuthChallenge, AuthTransport};
pub use wallet::{MockWalletSigner, WalletSigner};
