#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod gate;
pub mod inspect;
#[cfg(feature = "middleware")]
pub mod middleware;
pub mod proxy;
pub mod refresh;
pub mod session;
pub mod types;

// Re-exports for convenient access
pub use config::BackendConfig;
pub use error::Error;
pub use gate::{GuardedResponse, TERMS_REQUIRED_STATUS, guard};
pub use inspect::{Signal, classify, decode_expiry, looks_expired, looks_terms_required};
pub use proxy::{BackendClient, BackendResponse, ProxyRequest};
pub use refresh::{RefreshOutcome, Refresher};
pub use session::{MemorySessionStore, SessionCredentials, SessionStore, Slot};
pub use types::{AccessToken, RefreshToken};
