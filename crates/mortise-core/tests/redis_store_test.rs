// Integration tests against a live Redis server
// Run with: MORTISE_REDIS_URL=redis://127.0.0.1:6379/0 cargo test -- --ignored

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use mortise_core::{ErrorKind, MutexManager, RedisTokenStore};

fn redis_url() -> String {
    std::env::var("MORTISE_REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/0".to_string())
}

/// Generate a unique resource key to avoid conflicts between test runs
fn unique_key(prefix: &str) -> String {
    let micros = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_micros();
    format!("{}-{}", prefix, micros)
}

async fn redis_manager() -> MutexManager {
    let store = RedisTokenStore::connect(&redis_url())
        .await
        .expect("Failed to connect to redis");
    MutexManager::new("test", Arc::new(store))
}

#[tokio::test]
#[ignore = "requires running redis"]
async fn test_redis_lock_then_occupied() {
    let mutex = redis_manager().await;
    let key = unique_key("test");

    let t1 = mutex.lock(&key, Duration::from_millis(300)).await.unwrap();
    let err = mutex.lock(&key, Duration::from_millis(300)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MutexOccupied);
    assert_eq!(err.current_token(), Some(t1));

    mutex.unlock(&key, t1).await.unwrap();
    let t2 = mutex.lock(&key, Duration::from_millis(300)).await.unwrap();
    assert!(t2 > t1);
}

#[tokio::test]
#[ignore = "requires running redis"]
async fn test_redis_unlock_outdated_after_expiry() {
    let mutex = redis_manager().await;
    let key = unique_key("test");

    let t1 = mutex.lock(&key, Duration::from_millis(10)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let t2 = mutex.lock(&key, Duration::from_millis(300)).await.unwrap();

    let err = mutex.unlock(&key, t1).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutdatedToken);
    assert_eq!(err.current_token(), Some(t2));
}

#[tokio::test]
#[ignore = "requires running redis"]
async fn test_redis_retries() {
    let holder = redis_manager().await;
    let mut waiter = redis_manager().await;
    waiter.set_retries(10, Duration::from_millis(50));
    let key = unique_key("test");

    // The holder's lock expires while the waiter is still retrying.
    let held = holder.lock(&key, Duration::from_millis(150)).await.unwrap();
    let token = waiter.lock(&key, Duration::from_millis(300)).await.unwrap();
    assert!(token > held);
    assert_eq!(waiter.get_current_fencing_token(&key).await.unwrap(), token);

    let err = holder.unlock(&key, held).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutdatedToken);
}

#[tokio::test]
#[ignore = "requires running redis"]
async fn test_redis_retries_exhausted_while_held() {
    let holder = redis_manager().await;
    let mut waiter = redis_manager().await;
    waiter.set_retries(2, Duration::from_millis(10));
    let key = unique_key("test");

    let held = holder.lock(&key, Duration::from_secs(5)).await.unwrap();
    let err = waiter.lock(&key, Duration::from_millis(300)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MutexOccupied);
    assert_eq!(err.current_token(), Some(held));

    holder.unlock(&key, held).await.unwrap();
}

#[tokio::test]
#[ignore = "requires running redis"]
async fn test_redis_get_current_fencing_token() {
    let mutex = redis_manager().await;
    let key = unique_key("test");

    let token = mutex.lock(&key, Duration::from_millis(300)).await.unwrap();
    assert_eq!(mutex.get_current_fencing_token(&key).await.unwrap(), token);
    assert!(mutex.check_current_fencing_token(&key, token).await.unwrap());

    mutex.unlock(&key, token).await.unwrap();
    let err = mutex.get_current_fencing_token(&key).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StoreFailure);
}
