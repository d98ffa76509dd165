//! # EMBER Core
//!
//! Foundational traits, types, and error handling for GPU timeline tracing.
//!
//! This crate defines the capability seams the tracing context is built on:
//! the device driver binding that records and resolves timestamps, the host
//! clock used for cross-domain calibration, and the sink that renders the
//! resulting timeline.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ember-core                             │
//! │  ┌──────────────────┐  ┌─────────────┐  ┌────────────────┐  │
//! │  │     Traits       │  │   Types     │  │     Error      │  │
//! │  │ (TimestampDevice,│  │ (QueryId,   │  │   Handling     │  │
//! │  │ TraceSink, Clock)│  │ TimelineId) │  │                │  │
//! │  └──────────────────┘  └─────────────┘  └────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]

#[cfg(feature = "std")]
extern crate std;

// =============================================================================
// MODULE EXPORTS
// =============================================================================

pub mod error;
pub mod traits;
pub mod types;

// Re-exports for convenience
pub use error::{Error, Result};
pub use traits::*;
pub use types::*;
