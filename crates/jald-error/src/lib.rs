//! Error taxonomy shared by every crate in the ingestion daemon.
//!
//! The variants mirror the table in the core specification: each one has a
//! single, fixed recovery policy applied at the worker or process boundary
//! (never partway through a handler).

use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Taxonomy of errors the ingestion pipeline can produce.
///
/// Recovery policy lives with the caller (acceptor, handler, or `main`), not
/// here: this type only classifies *what* happened.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed header, wrong BREAK delimiter, or otherwise invalid framing.
    /// Policy: close the connection, discard the partial record.
    #[error("protocol parse error: {0}")]
    Parse(String),

    /// I/O failure on a payload write or `digest_fd`.
    /// Policy: abort the handler, unlink the partial payload file.
    #[error("file I/O error: {0}")]
    FileIo(#[from] std::io::Error),

    /// Allocation failure.
    /// Policy: abort the handler, worker exits.
    #[error("allocation failure")]
    NoMem,

    /// Store insert refused the record (exceeds configured size limits).
    /// Policy: report to stderr, worker exits cleanly.
    #[error("record rejected: {0}")]
    Reject(String),

    /// Store insert failed on an internal fault (index corruption, etc).
    /// Policy: report to stderr, worker exits.
    #[error("internal store error: {0}")]
    InternalError(String),

    /// Digest or crypto primitive misuse. Folded into `InternalError` handling.
    #[error("invalid cryptographic operation: {0}")]
    Invalid(String),

    /// A disallowed syscall tripped the steady-state (or startup) seccomp filter.
    /// Policy: process exits with code 2.
    #[error("seccomp violation: syscall {syscall_nr} ({syscall_name})")]
    SeccompViolation {
        syscall_nr: i32,
        syscall_name: String,
    },

    /// Config parse, key load, or socket bind failed before the accept loop.
    /// Policy: fatal, process exits non-zero.
    #[error("startup failure: {0}")]
    StartupFailure(String),
}

impl Error {
    pub fn reject(msg: impl fmt::Display) -> Self {
        Error::Reject(msg.to_string())
    }

    pub fn internal(msg: impl fmt::Display) -> Self {
        Error::InternalError(msg.to_string())
    }

    pub fn invalid(msg: impl fmt::Display) -> Self {
        Error::Invalid(msg.to_string())
    }

    pub fn startup(msg: impl fmt::Display) -> Self {
        Error::StartupFailure(msg.to_string())
    }

    pub fn parse(msg: impl fmt::Display) -> Self {
        Error::Parse(msg.to_string())
    }

    /// Whether this error should be treated as `InternalError` by handlers
    /// that don't have a variant of their own for it (per spec §7: `Invalid`
    /// is treated as internal error).
    pub fn is_internal(&self) -> bool {
        matches!(self, Error::InternalError(_) | Error::Invalid(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reject_and_internal_are_distinct_variants() {
        let reject = Error::reject("record too large");
        let internal = Error::internal("index corrupt");
        assert!(matches!(reject, Error::Reject(_)));
        assert!(!reject.is_internal());
        assert!(internal.is_internal());
    }

    #[test]
    fn invalid_folds_into_internal_policy() {
        let invalid = Error::invalid("digest context misuse");
        assert!(invalid.is_internal());
    }

    #[test]
    fn io_error_converts_via_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::FileIo(_)));
    }
}
