//! Error types for Mortise
//!
//! This module defines:
//! - `MortiseError`: the closed set of failures the lock protocol reports
//! - `ErrorKind`: a field-less tag for matching on the failure class

use std::fmt::{Display, Formatter};

/// Boxed cause carried by [`MortiseError::StoreFailure`]
pub type StoreCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by the mutex manager
#[derive(thiserror::Error, Debug)]
pub enum MortiseError {
    /// The coordination store was unreachable or failed the command
    #[error("redis exception: {source}")]
    StoreFailure {
        #[source]
        source: StoreCause,
    },

    /// The caller's token was superseded by a newer holder
    #[error("key:{hold_token} outdated, current key is {current_token}")]
    OutdatedToken { current_token: i64, hold_token: i64 },

    /// The resource is held under a different (older) token
    #[error("key:{hold_token} has been occupied by {current_token}")]
    MutexOccupied { current_token: i64, hold_token: i64 },

    /// The store returned a value that is not a fencing token
    #[error("malformed reply for '{key}': {value:?} is not an integer token")]
    MalformedReply { key: String, value: String },
}

/// Result alias used across Mortise crates
pub type Result<T> = std::result::Result<T, MortiseError>;

/// Failure class of a [`MortiseError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    StoreFailure,
    OutdatedToken,
    MutexOccupied,
    MalformedReply,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::StoreFailure => "store_failure",
            ErrorKind::OutdatedToken => "outdated_token",
            ErrorKind::MutexOccupied => "mutex_occupied",
            ErrorKind::MalformedReply => "malformed_reply",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl MortiseError {
    /// Wrap any store-side error as a `StoreFailure`
    pub fn store<E>(err: E) -> Self
    where
        E: Into<StoreCause>,
    {
        MortiseError::StoreFailure { source: err.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            MortiseError::StoreFailure { .. } => ErrorKind::StoreFailure,
            MortiseError::OutdatedToken { .. } => ErrorKind::OutdatedToken,
            MortiseError::MutexOccupied { .. } => ErrorKind::MutexOccupied,
            MortiseError::MalformedReply { .. } => ErrorKind::MalformedReply,
        }
    }

    /// Token recorded at the resource key when the error was classified
    pub fn current_token(&self) -> Option<i64> {
        match self {
            MortiseError::OutdatedToken { current_token, .. }
            | MortiseError::MutexOccupied { current_token, .. } => Some(*current_token),
            _ => None,
        }
    }

    /// Token the caller presented
    pub fn hold_token(&self) -> Option<i64> {
        match self {
            MortiseError::OutdatedToken { hold_token, .. }
            | MortiseError::MutexOccupied { hold_token, .. } => Some(*hold_token),
            _ => None,
        }
    }

    /// Whether the lock retry loop may try again after this error.
    ///
    /// A malformed reply means the store and this client disagree on the
    /// data format, so another attempt cannot succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, MortiseError::MalformedReply { .. })
    }

    pub fn is_outdated(&self) -> bool {
        self.kind() == ErrorKind::OutdatedToken
    }

    pub fn is_occupied(&self) -> bool {
        self.kind() == ErrorKind::MutexOccupied
    }
}
