//! Fencing-token mutex manager
//!
//! Lock and unlock run against the coordination store as single atomic
//! steps. In front of them sits an in-process guard so that tasks sharing one
//! manager issue their store requests one at a time; exclusivity between
//! processes comes only from the store.

use std::sync::Arc;
use std::time::Duration;

use mortise_common::{
    FencingToken, MortiseError, Result, compare_tokens, parse_token, resource_key,
};
use tokio::sync::Mutex;

use crate::config::{MortiseConfig, RetryPolicy};
use crate::generator::FencingTokenGenerator;
use crate::store::{DeleteOutcome, SetOutcome, TokenStore};

/// Mutex manager bound to one lock domain and one store
pub struct MutexManager {
    name: String,
    pub(crate) store: Arc<dyn TokenStore>,
    generator: FencingTokenGenerator,
    local: Mutex<()>,
    retry: RetryPolicy,
}

impl MutexManager {
    /// Create a manager for the lock domain `name`.
    ///
    /// The name selects the fencing token counter and should be unique per
    /// independent resource space.
    pub fn new(name: impl Into<String>, store: Arc<dyn TokenStore>) -> Self {
        let name = name.into();
        let generator = FencingTokenGenerator::new(&name, store.clone());
        Self {
            name,
            store,
            generator,
            local: Mutex::new(()),
            retry: RetryPolicy::none(),
        }
    }

    /// Build a manager from configuration (domain name and retry policy)
    pub fn from_config(config: &MortiseConfig, store: Arc<dyn TokenStore>) -> Self {
        Self::new(config.mutex_name(), store).with_retry_policy(config.retry_policy())
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the retry count and the spacing between attempts for `lock`
    pub fn set_retries(&mut self, retries: u32, delay: Duration) {
        self.retry = RetryPolicy::new(retries, delay);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Draw the next token of this manager's domain
    pub async fn next_token(&self) -> Result<FencingToken> {
        self.generator.next_token().await
    }

    /// Acquire `key` for `ttl` and return the fencing token now recorded for it.
    ///
    /// Every attempt consumes a fresh token, including attempts that fail.
    /// Without a retry policy a single attempt is made.
    pub async fn lock(&self, key: &str, ttl: Duration) -> Result<FencingToken> {
        let _guard = self.local.lock().await;
        let resource_key = resource_key(key);
        let max_attempts = self.retry.max_attempts();

        let mut attempt = 1;
        loop {
            metrics::counter!("mortise_lock_attempts_total").increment(1);
            match self.try_lock(&resource_key, ttl).await {
                Ok(token) => {
                    metrics::counter!("mortise_lock_acquired_total").increment(1);
                    tracing::debug!(
                        domain = %self.name,
                        resource_key = %resource_key,
                        token,
                        attempt,
                        "Lock acquired"
                    );
                    return Ok(token);
                }
                Err(err) => {
                    let exhausted = attempt >= max_attempts || !err.is_retryable();
                    tracing::debug!(
                        domain = %self.name,
                        resource_key = %resource_key,
                        attempt,
                        max_attempts,
                        error = %err,
                        "Lock attempt failed"
                    );
                    if exhausted {
                        let kind = err.kind().as_str();
                        metrics::counter!("mortise_lock_failed_total", "kind" => kind).increment(1);
                        return Err(err);
                    }
                }
            }

            attempt += 1;
            if !self.retry.delay.is_zero() {
                tokio::time::sleep(self.retry.delay).await;
            }
        }
    }

    /// One acquisition attempt: new token, then atomic set-if-absent
    async fn try_lock(&self, resource_key: &str, ttl: Duration) -> Result<FencingToken> {
        let token = self.generator.next_token().await?;
        match self.store.set_if_absent(resource_key, token, ttl).await? {
            SetOutcome::Acquired => Ok(token),
            SetOutcome::Held(raw) => {
                let locked_token = parse_token(resource_key, &raw)?;
                // Equal tokens mean the counter was reused; the key is ours.
                compare_tokens(locked_token, token)?;
                tracing::warn!(
                    resource_key = %resource_key,
                    token,
                    "Resource already recorded the freshly issued token"
                );
                Ok(token)
            }
        }
    }

    /// Release `key` if it is still held under `token`.
    ///
    /// A key that has already expired or was never set is treated as
    /// released. A key held under another token is reported through the
    /// token comparison rule.
    pub async fn unlock(&self, key: &str, token: FencingToken) -> Result<()> {
        let _guard = self.local.lock().await;
        let resource_key = resource_key(key);

        let result = match self.store.compare_and_delete(&resource_key, token).await? {
            DeleteOutcome::Deleted => Ok(()),
            DeleteOutcome::Mismatch(None) => {
                tracing::debug!(
                    domain = %self.name,
                    resource_key = %resource_key,
                    token,
                    "Lock already expired before unlock"
                );
                Ok(())
            }
            DeleteOutcome::Mismatch(Some(raw)) => {
                let locked_token = parse_token(&resource_key, &raw)?;
                if locked_token == token {
                    // The store kept a value equal to our token; the lock is still held.
                    Err(MortiseError::MalformedReply {
                        key: resource_key.clone(),
                        value: raw,
                    })
                } else {
                    compare_tokens(locked_token, token)
                }
            }
        };

        let outcome = match &result {
            Ok(()) => "released",
            Err(err) => err.kind().as_str(),
        };
        metrics::counter!("mortise_unlock_total", "result" => outcome).increment(1);
        tracing::debug!(
            domain = %self.name,
            resource_key = %resource_key,
            token,
            outcome,
            "Unlock finished"
        );
        result
    }
}

impl std::fmt::Debug for MutexManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutexManager")
            .field("name", &self.name)
            .field("counter_key", &self.generator.counter_key())
            .field("retry", &self.retry)
            .finish()
    }
}
