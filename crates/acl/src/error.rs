//! crates/acl/src/error.rs
//!
//! Error types for ACL manipulation.

use std::io;

use aclkit_sys::{TextError, ValidityError};
use thiserror::Error;

/// Result type for ACL operations.
pub type Result<T> = std::result::Result<T, AclError>;

/// Errors produced by [`Acl`](crate::Acl) and [`Entry`](crate::Entry).
#[derive(Debug, Error)]
pub enum AclError {
    /// libacl ran out of memory for entries or text.
    #[error("failed to allocate ACL storage: {0}")]
    Allocation(#[source] io::Error),

    /// ACL text could not be parsed.
    #[error("malformed ACL text{}", at_line(.line))]
    Parse {
        /// 1-based line of the first entry that fails to parse on its own,
        /// when one does.
        line: Option<usize>,
    },

    /// An argument was rejected before reaching libacl.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Reading or writing an object's ACL failed.
    #[error("failed to {context} {target}: {source}")]
    Io {
        /// Operation that was attempted, e.g. `read ACL of`.
        context: &'static str,
        /// Path or descriptor the operation addressed.
        target: String,
        /// Error reported by the operating system.
        #[source]
        source: io::Error,
    },

    /// libacl rejected an operation on the ACL or one of its entries.
    #[error("{operation} failed: {source}")]
    Os {
        /// Primitive that failed.
        operation: &'static str,
        /// Error reported by libacl.
        #[source]
        source: io::Error,
    },

    /// An entry was used after its ACL gained or lost an entry.
    #[error("stale ACL entry reference; enumerate the ACL again")]
    StaleReference,

    /// The ACL breaks a structural rule.
    #[error("invalid ACL: {0}")]
    Invalid(#[from] ValidityError),
}

#[allow(clippy::ref_option)]
fn at_line(line: &Option<usize>) -> String {
    line.map_or_else(String::new, |line| format!(" at line {line}"))
}

impl AclError {
    pub(crate) fn os(operation: &'static str, source: io::Error) -> Self {
        Self::Os { operation, source }
    }

    /// Like [`AclError::os`], but `ENOMEM` becomes [`AclError::Allocation`].
    pub(crate) fn storage(operation: &'static str, source: io::Error) -> Self {
        if source.raw_os_error() == Some(libc::ENOMEM) {
            Self::Allocation(source)
        } else {
            Self::os(operation, source)
        }
    }

    pub(crate) fn io(context: &'static str, target: impl ToString, source: io::Error) -> Self {
        Self::Io {
            context,
            target: target.to_string(),
            source,
        }
    }

    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Returns the errno carried by [`AclError::Allocation`],
    /// [`AclError::Io`] and [`AclError::Os`].
    #[must_use]
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::Allocation(source) | Self::Io { source, .. } | Self::Os { source, .. } => {
                source.raw_os_error()
            }
            _ => None,
        }
    }
}

impl From<TextError> for AclError {
    fn from(error: TextError) -> Self {
        match error {
            TextError::Syntax { line } => Self::Parse { line },
            TextError::Os(error) => Self::storage("parse ACL text", error),
        }
    }
}
