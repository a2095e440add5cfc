//! Fencing token generation

use std::sync::Arc;

use mortise_common::{FencingToken, fencing_token_key};

use crate::store::TokenStore;

/// Issues strictly increasing tokens for one lock domain
///
/// The counter lives in the store, so every generator bound to the same
/// domain name draws from the same sequence.
#[derive(Clone)]
pub struct FencingTokenGenerator {
    counter_key: String,
    store: Arc<dyn TokenStore>,
}

impl FencingTokenGenerator {
    pub fn new(domain: &str, store: Arc<dyn TokenStore>) -> Self {
        Self {
            counter_key: fencing_token_key(domain),
            store,
        }
    }

    pub fn counter_key(&self) -> &str {
        &self.counter_key
    }

    /// Increment the domain counter and return the new token
    pub async fn next_token(&self) -> mortise_common::Result<FencingToken> {
        let token = self.store.incr(&self.counter_key).await?;
        tracing::trace!(counter_key = %self.counter_key, token, "Issued fencing token");
        Ok(token)
    }
}
