//! # EMBER Error Handling
//!
//! Error types for the tracing subsystem.
//!
//! Error handling in EMBER follows these principles:
//! - Errors are typed and categorized
//! - No panics in production code paths
//! - Teardown paths never fail; device destroy errors are logged and ignored
//! - Errors are `no_std` compatible

use core::fmt;

// =============================================================================
// RESULT TYPE
// =============================================================================

/// EMBER Result type alias
pub type Result<T> = core::result::Result<T, Error>;

// =============================================================================
// ERROR ENUM
// =============================================================================

/// EMBER unified error type
///
/// Covers all error conditions across the tracing subsystem, categorized
/// by the phase of the query lifecycle they occur in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    // =========================================================================
    // Generic Errors
    // =========================================================================
    /// Invalid parameter provided
    InvalidParameter,

    // =========================================================================
    // Context Construction Errors
    // =========================================================================
    /// Device timestamp object creation failed; context construction is
    /// fully unwound before this is returned
    DeviceResourceExhausted,

    // =========================================================================
    // Query Insertion Errors
    // =========================================================================
    /// Free list empty when a query was requested. The pool size is a
    /// deployment-time capacity decision, so this is a capacity error
    /// rather than a recoverable runtime condition.
    PoolExhausted,
    /// Device refused a timestamp record command
    RecordFailed,

    // =========================================================================
    // Collection Errors
    // =========================================================================
    /// Device timestamp not yet resolved. Transient: collection stops
    /// early and retries on a later call; never surfaced to callers.
    QueryPending,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParameter => write!(f, "invalid parameter"),
            Self::DeviceResourceExhausted => write!(f, "device timestamp resources exhausted"),
            Self::PoolExhausted => write!(f, "timestamp query pool exhausted"),
            Self::RecordFailed => write!(f, "timestamp record command failed"),
            Self::QueryPending => write!(f, "timestamp query not yet resolved"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
