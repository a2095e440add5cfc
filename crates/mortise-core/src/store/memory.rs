//! In-process token store
//!
//! Each operation holds the map entry for its key while it runs, which gives
//! the same per-key atomicity the Redis scripts provide. Expired entries are
//! dropped lazily when touched.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use mortise_common::{FencingToken, MortiseError, Result};
use tokio::time::Instant;

use super::{DeleteOutcome, SetOutcome, TokenStore};

#[derive(Debug, Clone)]
struct StoredValue {
    value: String,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Token store kept in process memory
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    entries: Arc<DashMap<String, StoredValue>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a raw value, bypassing every protocol check
    pub fn put_raw(&self, key: impl Into<String>, value: impl Into<String>, ttl: Option<Duration>) {
        let expires_at = ttl.and_then(|ttl| Instant::now().checked_add(ttl));
        self.entries.insert(
            key.into(),
            StoredValue {
                value: value.into(),
                expires_at,
            },
        );
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn incr(&self, key: &str) -> Result<i64> {
        let now = Instant::now();
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| StoredValue {
                value: "0".to_string(),
                expires_at: None,
            });
        if entry.is_expired(now) {
            entry.value = "0".to_string();
            entry.expires_at = None;
        }

        let current: i64 = entry
            .value
            .parse()
            .map_err(|_| MortiseError::store(format!("value at '{}' is not an integer", key)))?;
        let next = current
            .checked_add(1)
            .ok_or_else(|| MortiseError::store(format!("increment at '{}' would overflow", key)))?;
        entry.value = next.to_string();
        Ok(next)
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        if let Entry::Occupied(entry) = self.entries.entry(key.to_string()) {
            if entry.get().is_expired(now) {
                entry.remove();
                return Ok(None);
            }
            return Ok(Some(entry.get().value.clone()));
        }
        Ok(None)
    }

    async fn set_if_absent(
        &self,
        key: &str,
        token: FencingToken,
        ttl: Duration,
    ) -> Result<SetOutcome> {
        let now = Instant::now();
        // An expiry past the clock's range never fires.
        let stored = StoredValue {
            value: token.to_string(),
            expires_at: now.checked_add(ttl),
        };
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get().is_expired(now) {
                    entry.insert(stored);
                    Ok(SetOutcome::Acquired)
                } else {
                    Ok(SetOutcome::Held(entry.get().value.clone()))
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(stored);
                Ok(SetOutcome::Acquired)
            }
        }
    }

    async fn compare_and_delete(&self, key: &str, token: FencingToken) -> Result<DeleteOutcome> {
        let now = Instant::now();
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(entry) => {
                if entry.get().is_expired(now) {
                    entry.remove();
                    return Ok(DeleteOutcome::Mismatch(None));
                }
                if entry.get().value == token.to_string() {
                    entry.remove();
                    Ok(DeleteOutcome::Deleted)
                } else {
                    Ok(DeleteOutcome::Mismatch(Some(entry.get().value.clone())))
                }
            }
            Entry::Vacant(_) => Ok(DeleteOutcome::Mismatch(None)),
        }
    }
}
