//! Mortise Core - Fencing-token mutual exclusion over a coordination store
//!
//! This crate provides:
//! - The store contract and its Redis and in-memory implementations
//! - Fencing token generation per lock domain
//! - The lock/unlock protocol with a bounded retry policy
//! - Read-only token validation for resource-access code
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use mortise_core::{MutexManager, RedisTokenStore};
//!
//! # async fn run() -> mortise_core::Result<()> {
//! let store = Arc::new(RedisTokenStore::connect("redis://127.0.0.1:6379/0").await?);
//! let mutex = MutexManager::new("SyncJob", store);
//!
//! let token = mutex.lock("report:2024", Duration::from_millis(300)).await?;
//! mutex.check_current_fencing_token("report:2024", token).await?;
//! // ... touch the protected resource ...
//! mutex.unlock("report:2024", token).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod generator;
pub mod mutex;
pub mod store;
mod validator;

pub use config::{MortiseConfig, RetryPolicy};
pub use generator::FencingTokenGenerator;
pub use mutex::MutexManager;
pub use store::{DeleteOutcome, MemoryTokenStore, RedisTokenStore, SetOutcome, TokenStore};

pub use mortise_common::{
    ErrorKind, FencingToken, MortiseError, Result, TokenRelation, compare_tokens,
};
