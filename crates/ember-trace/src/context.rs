//! # Tracing Context
//!
//! Root of the subsystem: owns the event pool, the submission queue, the
//! calibration anchor, and the lock guarding them.
//!
//! One context is created per device queue or stream. Multiple threads may
//! record zones concurrently while another collects; a single mutex
//! serializes all pool, chain, and queue mutation. Nothing on the zone
//! path blocks on the device, and collection only performs non-blocking
//! completion queries. The sole blocking device wait is the anchor flush
//! during allocation.

use alloc::vec::Vec;

use ember_core::{
    Error, GpuContextKind, HostClock, QueryId, QueryStatus, Result, SourceLocation, TimelineId,
    TimestampDevice, TraceSink, Verbosity,
};
use spin::Mutex;

use crate::calibration::Calibration;
use crate::chain::SubmissionChain;
use crate::pool::{EventPool, PoolStats, SlotState};

/// Default number of queries per tracing context. This bounds the number
/// of outstanding timestamps before collection is required; room is left
/// below the page-multiple for the context structure itself.
pub const DEFAULT_QUERY_CAPACITY: u32 = 16 * 1024 - 256;

// =============================================================================
// CONTEXT CONFIGURATION
// =============================================================================

/// Tracing context configuration
#[derive(Debug, Clone)]
pub struct ContextConfig<'a> {
    /// Timeline name shown by the sink (typically the queue name)
    pub name: &'a str,
    /// Device API kind reported to the sink
    pub kind: GpuContextKind,
    /// Query pool capacity; at most `u16::MAX` slots
    pub capacity: u32,
    /// Verbosity threshold; zone calls above it are no-ops
    pub verbosity: Verbosity,
}

impl<'a> ContextConfig<'a> {
    /// Create a configuration with default capacity and verbosity
    pub fn new(name: &'a str, kind: GpuContextKind) -> Self {
        Self {
            name,
            kind,
            capacity: DEFAULT_QUERY_CAPACITY,
            verbosity: Verbosity::Fine,
        }
    }

    /// With an explicit pool capacity
    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    /// With an explicit verbosity threshold
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }
}

impl Default for ContextConfig<'_> {
    fn default() -> Self {
        Self::new("", GpuContextKind::Invalid)
    }
}

// =============================================================================
// TRACING CONTEXT
// =============================================================================

/// GPU timeline tracing context
///
/// Generic over the device driver binding `D` and the trace sink `S`.
/// Dropping the context performs a final collection, then destroys every
/// device timestamp object; teardown never fails.
pub struct TracingContext<D: TimestampDevice, S: TraceSink> {
    device: D,
    sink: S,
    /// Anchor timestamp all reported times are relative to. `Some` for
    /// the whole life of the context; taken only in `drop`.
    anchor: Option<D::Timestamp>,
    calibration: Calibration,
    timeline: TimelineId,
    verbosity: Verbosity,
    pool: Mutex<EventPool<D::Timestamp>>,
}

impl<D: TimestampDevice, S: TraceSink> TracingContext<D, S> {
    /// Allocate a tracing context for one device queue or stream
    ///
    /// Creates every pool timestamp object eagerly, records the anchor on
    /// `stream` and force-waits for it, captures the host time at that
    /// instant, and registers the timeline with the sink. On any device
    /// creation failure the partial state is torn down and
    /// [`Error::DeviceResourceExhausted`] is returned.
    pub fn allocate(
        device: D,
        sink: S,
        clock: &impl HostClock,
        stream: &D::Stream,
        config: &ContextConfig<'_>,
    ) -> Result<Self> {
        if config.capacity > u16::MAX as u32 {
            return Err(Error::InvalidParameter);
        }

        // Pre-allocate the whole pool; the zone path never creates
        // device objects.
        let mut timestamps = Vec::with_capacity(config.capacity as usize);
        for _ in 0..config.capacity {
            match device.create_timestamp() {
                Ok(timestamp) => timestamps.push(timestamp),
                Err(_) => {
                    Self::destroy_timestamps(&device, timestamps);
                    return Err(Error::DeviceResourceExhausted);
                }
            }
        }

        let anchor = match device.create_timestamp() {
            Ok(anchor) => anchor,
            Err(_) => {
                Self::destroy_timestamps(&device, timestamps);
                return Err(Error::DeviceResourceExhausted);
            }
        };

        // Record the anchor and force-flush it; its completion host-time
        // is time zero for this timeline.
        if let Err(err) = device
            .record(&anchor, stream)
            .and_then(|()| device.synchronize(&anchor))
        {
            timestamps.push(anchor);
            Self::destroy_timestamps(&device, timestamps);
            return Err(err);
        }
        let host_epoch_ns = clock.now_ns();
        let period = device.timestamp_period();
        let calibration = Calibration::new(host_epoch_ns, period);

        // The initial sample carries the calibration; the timeline is
        // reported as uncalibrated so the sink keeps resynchronizing
        // display offsets itself.
        let timeline = sink.gpu_context_allocate(
            config.kind,
            config.name,
            false,
            host_epoch_ns,
            0,
            period,
        );
        log::debug!(
            "allocated gpu tracing context '{}': timeline {}, {} queries",
            config.name,
            timeline.raw(),
            config.capacity
        );

        Ok(Self {
            device,
            sink,
            anchor: Some(anchor),
            calibration,
            timeline,
            verbosity: config.verbosity,
            pool: Mutex::new(EventPool::new(timestamps)),
        })
    }

    /// Sink-assigned timeline id
    pub fn timeline(&self) -> TimelineId {
        self.timeline
    }

    /// Configured verbosity threshold
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Calibration anchor in effect for this context
    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    /// Query pool capacity
    pub fn capacity(&self) -> usize {
        self.pool.lock().capacity()
    }

    /// Queries currently available to the zone path
    pub fn free_query_count(&self) -> usize {
        self.pool.lock().free_count()
    }

    /// Snapshot of the pool counters
    pub fn stats(&self) -> PoolStats {
        self.pool.lock().stats.clone()
    }

    // =========================================================================
    // ZONE INSTRUMENTATION (HOT PATH)
    // =========================================================================

    /// Pull a query slot from the free list, record its timestamp against
    /// `stream`, and append it to `chain`
    ///
    /// The sole allocation point for a slot. Fails with
    /// [`Error::PoolExhausted`] when every slot is in flight.
    pub fn insert_query(
        &self,
        chain: &mut SubmissionChain,
        stream: &D::Stream,
    ) -> Result<QueryId> {
        let mut pool = self.pool.lock();
        let id = pool.pop_free()?;

        // A refused record leaves a hole in the timeline, not a broken
        // pool; keep the slot in the chain so the id still resolves.
        if let Err(err) = self.device.record(&pool.slot(id).timestamp, stream) {
            log::warn!("timestamp record failed for query {}: {}", id, err);
        }

        pool.append_to_chain(chain, id);
        Ok(id)
    }

    /// Graph variant of [`Self::insert_query`]: inserts a timestamp-record
    /// node into a not-yet-submitted command graph, ordered after
    /// `dependencies`, and returns the new node alongside the query id
    pub fn insert_query_graph(
        &self,
        chain: &mut SubmissionChain,
        graph: &mut D::Graph,
        dependencies: &[D::GraphNode],
    ) -> Result<(QueryId, D::GraphNode)> {
        let mut pool = self.pool.lock();
        let id = pool.pop_free()?;

        let node = match self
            .device
            .record_graph(&pool.slot(id).timestamp, graph, dependencies)
        {
            Ok(node) => node,
            Err(err) => {
                // Unlike the stream path the caller needs the node, so a
                // refusal unwinds the slot and surfaces.
                pool.push_free(id);
                return Err(err);
            }
        };

        pool.append_to_chain(chain, id);
        Ok((id, node))
    }

    /// Open a zone identified by a static source location
    pub fn zone_begin(
        &self,
        chain: &mut SubmissionChain,
        stream: &D::Stream,
        verbosity: Verbosity,
        location: &SourceLocation,
    ) -> Result<()> {
        if verbosity > self.verbosity {
            return Ok(());
        }
        let id = self.insert_query(chain, stream)?;
        self.sink.zone_begin(self.timeline, id, location);
        Ok(())
    }

    /// Open a zone identified by runtime strings
    #[allow(clippy::too_many_arguments)]
    pub fn zone_begin_external(
        &self,
        chain: &mut SubmissionChain,
        stream: &D::Stream,
        verbosity: Verbosity,
        file: &str,
        line: u32,
        function: &str,
        name: &str,
    ) -> Result<()> {
        if verbosity > self.verbosity {
            return Ok(());
        }
        let id = self.insert_query(chain, stream)?;
        self.sink
            .zone_begin_external(self.timeline, id, file, line, function, name);
        Ok(())
    }

    /// Close the most recently opened zone on `chain`
    pub fn zone_end(
        &self,
        chain: &mut SubmissionChain,
        stream: &D::Stream,
        verbosity: Verbosity,
    ) -> Result<()> {
        if verbosity > self.verbosity {
            return Ok(());
        }
        let id = self.insert_query(chain, stream)?;
        self.sink.zone_end(self.timeline, id);
        Ok(())
    }

    /// Graph variant of [`Self::zone_begin_external`]
    ///
    /// Returns the inserted record node so the caller can extend its
    /// dependency edges, or `None` when filtered by verbosity.
    #[allow(clippy::too_many_arguments)]
    pub fn zone_begin_external_graph(
        &self,
        chain: &mut SubmissionChain,
        graph: &mut D::Graph,
        dependencies: &[D::GraphNode],
        verbosity: Verbosity,
        file: &str,
        line: u32,
        function: &str,
        name: &str,
    ) -> Result<Option<D::GraphNode>> {
        if verbosity > self.verbosity {
            return Ok(None);
        }
        let (id, node) = self.insert_query_graph(chain, graph, dependencies)?;
        self.sink
            .zone_begin_external(self.timeline, id, file, line, function, name);
        Ok(Some(node))
    }

    /// Graph variant of [`Self::zone_end`]
    pub fn zone_end_graph(
        &self,
        chain: &mut SubmissionChain,
        graph: &mut D::Graph,
        dependencies: &[D::GraphNode],
        verbosity: Verbosity,
    ) -> Result<Option<D::GraphNode>> {
        if verbosity > self.verbosity {
            return Ok(None);
        }
        let (id, node) = self.insert_query_graph(chain, graph, dependencies)?;
        self.sink.zone_end(self.timeline, id);
        Ok(Some(node))
    }

    // =========================================================================
    // SUBMISSION AND COMPLETION
    // =========================================================================

    /// The chain's command buffer or graph was handed to the device:
    /// move the chain into the submission queue (FIFO by submission order)
    pub fn notify_submitted(&self, chain: &SubmissionChain) {
        if chain.is_empty() {
            return;
        }
        self.pool.lock().enqueue_submitted(chain);
    }

    /// Resolve completed timestamps and report them to the sink
    ///
    /// Walks the submission queue in FIFO order and each chain in append
    /// order. Stops at the first timestamp the device has not written
    /// yet; everything from there on, including chains queued behind it,
    /// waits for a later call. Resolved slots stay out of the free list
    /// until the owner reclaims them via [`Self::free_chain`].
    pub fn collect(&self) {
        let Some(anchor) = self.anchor.as_ref() else {
            return;
        };
        let mut pool = self.pool.lock();
        if pool.queue_head.is_none() {
            return;
        }

        let mut collected = 0u64;
        'queue: while let Some(chain_head) = pool.queue_head {
            let mut cursor = Some(chain_head);
            while let Some(id) = cursor {
                // Skip the prefix already reported by an earlier pass.
                if pool.slot(id).state == SlotState::Resolved {
                    cursor = pool.slot(id).next_in_chain;
                    continue;
                }

                if self.device.query(&pool.slot(id).timestamp) == QueryStatus::Pending {
                    break 'queue;
                }

                let elapsed_millis =
                    match self.device.elapsed_millis(anchor, &pool.slot(id).timestamp) {
                        Ok(millis) => millis,
                        Err(err) => {
                            log::warn!("elapsed-time read failed for query {}: {}", id, err);
                            0.0
                        }
                    };
                self.sink
                    .zone_notify(self.timeline, id, self.calibration.timeline_ns(elapsed_millis));

                let slot = pool.slot_mut(id);
                debug_assert_eq!(slot.state, SlotState::Queued);
                slot.state = SlotState::Resolved;
                collected += 1;
                cursor = slot.next_in_chain;
            }

            // Chain fully reported: retire it from the queue.
            let next = {
                let head = pool.slot_mut(chain_head);
                head.was_submitted = true;
                head.next_submission.take()
            };
            pool.queue_head = next;
            if next.is_none() {
                pool.queue_tail = None;
            }
        }

        pool.stats.collected += collected;
        log::trace!(
            "timeline {}: collected {} queries",
            self.timeline.raw(),
            collected
        );
    }

    /// Reclaim a chain's slots onto the free list
    ///
    /// If the chain was never submitted, every query still owes the sink
    /// a notification; a zero timestamp is synthesized per slot so the
    /// sink's timeline stays consistent for discarded work.
    pub fn free_chain(&self, chain: &mut SubmissionChain) {
        let Some(head) = chain.head() else {
            return;
        };
        let mut pool = self.pool.lock();

        if !pool.slot(head).was_submitted {
            let mut cursor = Some(head);
            while let Some(id) = cursor {
                self.sink.zone_notify(self.timeline, id, 0);
                cursor = pool.slot(id).next_in_chain;
            }
        }

        pool.release_chain(chain);
    }

    fn destroy_timestamps(device: &D, timestamps: Vec<D::Timestamp>) {
        for timestamp in timestamps {
            if let Err(err) = device.destroy_timestamp(timestamp) {
                log::warn!("leaking device timestamp object: {}", err);
            }
        }
    }
}

impl<D: TimestampDevice, S: TraceSink> Drop for TracingContext<D, S> {
    fn drop(&mut self) {
        // Final forced collection so already-resolved values are not lost.
        self.collect();

        let timestamps = self.pool.get_mut().take_timestamps();
        Self::destroy_timestamps(&self.device, timestamps);
        if let Some(anchor) = self.anchor.take() {
            if let Err(err) = self.device.destroy_timestamp(anchor) {
                log::warn!("leaking anchor timestamp object: {}", err);
            }
        }
        log::debug!("freed gpu tracing context: timeline {}", self.timeline.raw());
    }
}

// =============================================================================
// TESTS
// =============================================================================
