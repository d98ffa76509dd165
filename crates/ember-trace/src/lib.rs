//! # EMBER Tracing Context
//!
//! GPU timestamp pool, submission queue, and host-side collection.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        Tracing Context                           │
//! │                                                                  │
//! │  ┌──────────────┐     ┌───────────────┐     ┌───────────────┐    │
//! │  │  Free List   │────▶│  Submission   │────▶│  Submission   │    │
//! │  │ (idle slots) │     │    Chain      │     │    Queue      │    │
//! │  │              │◀────│ (recording)   │     │  (in flight)  │    │
//! │  └──────────────┘     └───────────────┘     └───────┬───────┘    │
//! │         ▲                                           │            │
//! │         │                                  ┌────────▼────────┐   │
//! │         └──────────── free_chain ──────────│     Collect     │   │
//! │                                            │ (resolve+notify)│   │
//! │                                            └─────────────────┘   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Query Lifetime
//!
//! 1. Every slot's device timestamp object is created when the tracing
//!    context is created; the hot path never allocates.
//! 2. A zone begin/end call pulls a slot from the free list, records a
//!    timestamp command, and appends the slot to the caller's
//!    [`SubmissionChain`].
//! 3. When the command buffer or graph is handed to the device,
//!    `notify_submitted` moves the chain into the submission queue.
//! 4. `collect` resolves completed timestamps in submission order and
//!    reports them to the sink.
//! 5. When the command buffer is destroyed, `free_chain` splices the
//!    chain's slots back onto the free list for reuse.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::new_without_default)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod calibration;
pub mod chain;
pub mod context;
pub mod pool;

#[cfg(test)]
mod mock;

// Re-exports
pub use calibration::Calibration;
pub use chain::SubmissionChain;
pub use context::{ContextConfig, TracingContext, DEFAULT_QUERY_CAPACITY};
pub use pool::{EventPool, PoolStats, SlotState};
