//! # EMBER Capability Traits
//!
//! The capability seams the tracing context is built on.
//!
//! These traits enable:
//! - Hardware abstraction across device timing APIs
//! - Compile-time polymorphism (no vtables in hot paths)
//! - Unit testing with mock devices and sinks
//!
//! ## Capability Hierarchy
//!
//! ```text
//! TracingContext<D, S>
//!    │
//!    ├── D: TimestampDevice  (consumed: record/query/elapsed)
//!    │
//!    ├── S: TraceSink        (produced to: zone begin/end/notify)
//!    │
//!    └── HostClock           (consumed once, at calibration)
//! ```

use crate::error::Result;
use crate::types::*;

// =============================================================================
// TIMESTAMP DEVICE TRAIT
// =============================================================================

/// Device driver binding for timestamp primitives
///
/// One implementation per driver backend. Timestamp objects are created
/// once per pool slot at context allocation and reused for the life of
/// the context; the record/query cycle is the only hot-path traffic.
pub trait TimestampDevice: Send + Sync {
    /// Opaque device timestamp object
    type Timestamp: Send + Sync;

    /// Execution stream timestamps are recorded against
    type Stream;

    /// Not-yet-submitted command graph timestamps can be recorded into
    type Graph;

    /// Node handle within a command graph, used as a dependency edge
    type GraphNode;

    /// Create a timestamp object
    ///
    /// Failures map to [`crate::Error::DeviceResourceExhausted`] during
    /// context construction.
    fn create_timestamp(&self) -> Result<Self::Timestamp>;

    /// Destroy a timestamp object
    ///
    /// Best-effort: teardown paths log and ignore failures.
    fn destroy_timestamp(&self, timestamp: Self::Timestamp) -> Result<()>;

    /// Record a timestamp command against an execution stream
    ///
    /// Enqueues only; must not block on the device.
    fn record(&self, timestamp: &Self::Timestamp, stream: &Self::Stream) -> Result<()>;

    /// Insert a timestamp-record node into a not-yet-submitted command
    /// graph, ordered after the given dependency nodes
    ///
    /// Returns the new node so the caller can extend its dependency set.
    fn record_graph(
        &self,
        timestamp: &Self::Timestamp,
        graph: &mut Self::Graph,
        dependencies: &[Self::GraphNode],
    ) -> Result<Self::GraphNode>;

    /// Block until a timestamp has been written by the device
    ///
    /// Only used to force-flush the calibration anchor during context
    /// allocation; collection never blocks.
    fn synchronize(&self, timestamp: &Self::Timestamp) -> Result<()>;

    /// Non-blocking completion check
    ///
    /// A query-before-ready condition (or any device-level read failure)
    /// is reported as [`QueryStatus::Pending`], never as an error.
    fn query(&self, timestamp: &Self::Timestamp) -> QueryStatus;

    /// Elapsed device time between two resolved timestamps, in
    /// milliseconds
    ///
    /// Only differences between two device timestamps are meaningful;
    /// absolute device clock values are never read.
    fn elapsed_millis(&self, start: &Self::Timestamp, end: &Self::Timestamp) -> Result<f32>;

    /// Device timestamp clock period, forwarded to the sink at context
    /// allocation
    fn timestamp_period(&self) -> f32 {
        1.0
    }
}

// =============================================================================
// HOST CLOCK TRAIT
// =============================================================================

/// Host wall-clock capability
///
/// Consumed exactly once per context, at calibration: the anchor
/// timestamp's completion host-time becomes time zero for the timeline.
pub trait HostClock {
    /// Current host time in nanoseconds
    ///
    /// Must use the same epoch as the host-side spans the sink renders
    /// alongside this timeline.
    fn now_ns(&self) -> i64;
}

// =============================================================================
// TRACE SINK TRAIT
// =============================================================================

/// Tracing/visualization sink the subsystem produces to
///
/// The tracing context is the sole producer of [`QueryId`] values and
/// guarantees each is reported via [`TraceSink::zone_notify`] exactly
/// once with a real or synthetic timestamp, even on discard.
pub trait TraceSink: Send + Sync {
    /// Allocate a device timeline, returning its sink-assigned id
    ///
    /// `cpu_timestamp_ns`/`gpu_timestamp_ns`/`period` carry the initial
    /// calibration sample.
    fn gpu_context_allocate(
        &self,
        kind: GpuContextKind,
        name: &str,
        is_calibrated: bool,
        cpu_timestamp_ns: i64,
        gpu_timestamp_ns: i64,
        period: f32,
    ) -> TimelineId;

    /// A zone opened, identified by a static source location
    fn zone_begin(&self, timeline: TimelineId, query: QueryId, location: &SourceLocation);

    /// A zone opened, identified by runtime strings
    fn zone_begin_external(
        &self,
        timeline: TimelineId,
        query: QueryId,
        file: &str,
        line: u32,
        function: &str,
        name: &str,
    );

    /// The most recently opened zone closed
    fn zone_end(&self, timeline: TimelineId, query: QueryId);

    /// A query's device timestamp resolved to a host-relative value in
    /// nanoseconds (zero for discarded, never-submitted queries)
    fn zone_notify(&self, timeline: TimelineId, query: QueryId, timestamp_ns: i64);
}

// =============================================================================
// STATIC ASSERTIONS
// =============================================================================

// Ensure key types stay cheap to copy and safe to share
static_assertions::assert_impl_all!(QueryId: Send, Sync, Copy);
static_assertions::assert_impl_all!(TimelineId: Send, Sync, Copy);
static_assertions::assert_impl_all!(Verbosity: Send, Sync, Copy);
static_assertions::assert_impl_all!(SourceLocation: Send, Sync, Copy);
static_assertions::assert_eq_size!(QueryId, u16);
static_assertions::assert_eq_size!(TimelineId, u8);
