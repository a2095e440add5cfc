//! Read-only token checks
//!
//! Resource-access code calls [`MutexManager::check_current_fencing_token`]
//! with the token it was issued right before touching the protected
//! resource. The lock itself does not gate access.

use mortise_common::{
    FencingToken, MortiseError, Result, TokenRelation, compare_tokens, parse_token, resource_key,
};

use crate::mutex::MutexManager;

impl MutexManager {
    /// Token currently recorded for `key`; an absent key is an error
    pub async fn get_current_fencing_token(&self, key: &str) -> Result<FencingToken> {
        let resource_key = resource_key(key);
        match self.store.get(&resource_key).await? {
            Some(raw) => parse_token(&resource_key, &raw),
            None => Err(MortiseError::store(format!(
                "no fencing token recorded at '{}'",
                resource_key
            ))),
        }
    }

    /// `Ok(true)` when `token` is the one recorded for `key`, otherwise the
    /// classified mismatch
    pub async fn check_current_fencing_token(
        &self,
        key: &str,
        token: FencingToken,
    ) -> Result<bool> {
        let locked_token = self.get_current_fencing_token(key).await?;
        compare_tokens(locked_token, token)?;
        Ok(true)
    }

    /// Relation of `token` to the recorded one, without turning it into an error
    pub async fn token_relation(&self, key: &str, token: FencingToken) -> Result<TokenRelation> {
        let locked_token = self.get_current_fencing_token(key).await?;
        Ok(TokenRelation::of(locked_token, token))
    }
}
