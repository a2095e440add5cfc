//! Mortise Common - Shared types for fencing-token locks
//!
//! This crate provides:
//! - Error taxonomy matched on by lock callers
//! - The token comparison rule
//! - Store key naming

pub mod error;
pub mod keys;
pub mod token;

// Re-exports for convenience
pub use error::{ErrorKind, MortiseError, Result, StoreCause};
pub use keys::{KEY_PREFIX, fencing_token_key, resource_key};
pub use token::{FencingToken, TokenRelation, compare_tokens, parse_token};
