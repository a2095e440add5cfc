//! Redis-backed token store
//!
//! Acquire and release are expressed as Lua scripts so that the read and the
//! conditional write run as one step on the server.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use mortise_common::{FencingToken, MortiseError, Result};
use redis::AsyncCommands;
use redis::Script;
use redis::aio::ConnectionManager;

use super::{DeleteOutcome, SetOutcome, TokenStore};

/// Returns `{1, token}` after storing the token, `{0, existing}` otherwise
static LOCK_SCRIPT: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r#"
local v = redis.call('GET', KEYS[1])
if v then
    return {0, v}
end
redis.call('SET', KEYS[1], ARGV[1], 'NX', 'PX', ARGV[2])
return {1, ARGV[1]}
"#,
    )
});

/// Returns `{1, token}` after deleting, `{0, existing-or-nil}` otherwise
static UNLOCK_SCRIPT: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r#"
local v = redis.call('GET', KEYS[1])
if v == ARGV[1] then
    redis.call('DEL', KEYS[1])
    return {1, v}
end
return {0, v}
"#,
    )
});

/// Token store talking to a Redis server through a multiplexed connection
#[derive(Clone)]
pub struct RedisTokenStore {
    conn: ConnectionManager,
}

impl RedisTokenStore {
    /// Connect to the server at `url` (e.g. `redis://127.0.0.1:6379/0`)
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(MortiseError::store)?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(MortiseError::store)?;
        tracing::debug!(url = %url, "Connected to redis token store");
        Ok(Self { conn })
    }
}

/// Longest expiry sent to Redis.
///
/// Redis adds the current time to `PX` and rejects any sum past `i64::MAX`;
/// half that range still lasts longer than any lock is meant to.
pub const MAX_TTL_MILLIS: u64 = i64::MAX as u64 / 2;

/// Redis `PX` rejects zero, so sub-millisecond expiries round up; longer
/// ones are capped at [`MAX_TTL_MILLIS`]
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis())
        .unwrap_or(u64::MAX)
        .clamp(1, MAX_TTL_MILLIS)
}

#[async_trait]
impl TokenStore for RedisTokenStore {
    async fn incr(&self, key: &str) -> Result<i64> {
        let mut conn = self.conn.clone();
        let value: i64 = conn.incr(key, 1i64).await.map_err(MortiseError::store)?;
        Ok(value)
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await.map_err(MortiseError::store)?;
        Ok(value)
    }

    async fn set_if_absent(
        &self,
        key: &str,
        token: FencingToken,
        ttl: Duration,
    ) -> Result<SetOutcome> {
        let mut conn = self.conn.clone();
        let (stored, value): (i64, String) = LOCK_SCRIPT
            .key(key)
            .arg(token)
            .arg(ttl_millis(ttl))
            .invoke_async(&mut conn)
            .await
            .map_err(MortiseError::store)?;

        if stored == 1 {
            Ok(SetOutcome::Acquired)
        } else {
            Ok(SetOutcome::Held(value))
        }
    }

    async fn compare_and_delete(&self, key: &str, token: FencingToken) -> Result<DeleteOutcome> {
        let mut conn = self.conn.clone();
        let (deleted, value): (i64, Option<String>) = UNLOCK_SCRIPT
            .key(key)
            .arg(token)
            .invoke_async(&mut conn)
            .await
            .map_err(MortiseError::store)?;

        if deleted == 1 {
            Ok(DeleteOutcome::Deleted)
        } else {
            Ok(DeleteOutcome::Mismatch(value))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_millis() {
        assert_eq!(ttl_millis(Duration::from_millis(300)), 300);
        assert_eq!(ttl_millis(Duration::from_secs(2)), 2000);
        assert_eq!(ttl_millis(Duration::from_micros(10)), 1);
        assert_eq!(ttl_millis(Duration::ZERO), 1);
    }

    #[test]
    fn test_ttl_millis_capped() {
        assert_eq!(ttl_millis(Duration::MAX), MAX_TTL_MILLIS);
        assert_eq!(ttl_millis(Duration::from_millis(u64::MAX)), MAX_TTL_MILLIS);
        assert_eq!(
            ttl_millis(Duration::from_millis(MAX_TTL_MILLIS)),
            MAX_TTL_MILLIS
        );
    }
}
