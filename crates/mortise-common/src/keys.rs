//! Store key naming
//!
//! Keys must stay byte-compatible with every deployment sharing the store:
//! - counter key: `mortise:<domain>:fencingToken`
//! - resource key: `mortise:<resource>`

/// Namespace prefix for every key written by Mortise
pub const KEY_PREFIX: &str = "mortise";

const FENCING_TOKEN_SUFFIX: &str = "fencingToken";

/// Key holding the fencing token counter of a lock domain
pub fn fencing_token_key(domain: &str) -> String {
    format!("{}:{}:{}", KEY_PREFIX, domain, FENCING_TOKEN_SUFFIX)
}

/// Key holding the current holder's token for a resource
pub fn resource_key(resource: &str) -> String {
    format!("{}:{}", KEY_PREFIX, resource)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fencing_token_key() {
        assert_eq!(fencing_token_key("SyncJob"), "mortise:SyncJob:fencingToken");
    }

    #[test]
    fn test_resource_key() {
        assert_eq!(resource_key("Sync:42"), "mortise:Sync:42");
        assert_eq!(resource_key(""), "mortise:");
    }
}
