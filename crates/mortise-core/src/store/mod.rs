//! Coordination store contract
//!
//! The mutex manager needs four primitives from the store, each atomic on the
//! server side:
//! - increment-and-return on an integer key
//! - plain get of a raw value
//! - set-if-absent with expiry, reporting the existing value otherwise
//! - compare-and-delete, reporting the existing value on mismatch

mod memory;
mod redis_store;

use std::time::Duration;

use async_trait::async_trait;
use mortise_common::{FencingToken, Result};

pub use memory::MemoryTokenStore;
pub use redis_store::RedisTokenStore;

/// Outcome of [`TokenStore::set_if_absent`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetOutcome {
    /// The key was empty and now holds the given token
    Acquired,
    /// The key already held this raw value and was left untouched
    Held(String),
}

/// Outcome of [`TokenStore::compare_and_delete`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The key held the given token and has been removed
    Deleted,
    /// The key held a different raw value, or nothing at all
    Mismatch(Option<String>),
}

/// Key-value store providing the atomic primitives fencing locks rely on
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Atomically increment the integer at `key` and return the new value
    async fn incr(&self, key: &str) -> Result<i64>;

    /// Read the raw value at `key`
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `token` at `key` with expiry `ttl` unless the key already has a value
    async fn set_if_absent(
        &self,
        key: &str,
        token: FencingToken,
        ttl: Duration,
    ) -> Result<SetOutcome>;

    /// Delete `key` only if it currently holds `token`
    async fn compare_and_delete(&self, key: &str, token: FencingToken) -> Result<DeleteOutcome>;
}
