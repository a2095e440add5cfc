//! Fencing token comparison and parsing

use std::cmp::Ordering;

use crate::error::{MortiseError, Result};

/// Fencing tokens are signed 64-bit integers issued by the store's counter
pub type FencingToken = i64;

/// Relation between the token recorded at a resource key and a token under test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRelation {
    /// Both tokens are equal, the caller is the current holder
    Current,
    /// A newer holder has been recorded
    Outdated,
    /// The recorded token is older than the caller's
    Occupied,
}

impl TokenRelation {
    pub fn of(locked_token: FencingToken, have_token: FencingToken) -> Self {
        match locked_token.cmp(&have_token) {
            Ordering::Greater => TokenRelation::Outdated,
            Ordering::Less => TokenRelation::Occupied,
            Ordering::Equal => TokenRelation::Current,
        }
    }
}

/// Classify `have_token` against the authoritative `locked_token`.
///
/// A recorded token that is *older* than the caller's is still reported as
/// the caller being occupied by that older value.
pub fn compare_tokens(locked_token: FencingToken, have_token: FencingToken) -> Result<()> {
    match TokenRelation::of(locked_token, have_token) {
        TokenRelation::Current => Ok(()),
        TokenRelation::Outdated => Err(MortiseError::OutdatedToken {
            current_token: locked_token,
            hold_token: have_token,
        }),
        TokenRelation::Occupied => Err(MortiseError::MutexOccupied {
            current_token: locked_token,
            hold_token: have_token,
        }),
    }
}

/// Parse a raw store value read from `key` as a fencing token.
///
/// Only the canonical decimal form is accepted. Stores compare tokens as
/// strings, so a value like `"05"` or `" 5"` never matches token 5 there and
/// must not match it here either.
pub fn parse_token(key: &str, raw: &str) -> Result<FencingToken> {
    let malformed = || MortiseError::MalformedReply {
        key: key.to_string(),
        value: raw.to_string(),
    };
    let token = raw.parse::<FencingToken>().map_err(|_| malformed())?;
    if token.to_string() != raw {
        return Err(malformed());
    }
    Ok(token)
}
