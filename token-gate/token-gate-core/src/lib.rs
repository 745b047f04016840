pub mod config;
pub mod error;
pub mod store;
pub mod token;

pub use config::GateConfig;
pub use error::{StoreError, TokenError};
pub use store::{ClaimStore, MemoryClaimStore, RedisClaimStore, StoreBackend, StoreProvider};
pub use token::{issue, OneTimeTokens};
