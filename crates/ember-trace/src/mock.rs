//! Test doubles for the device, clock, and sink capabilities.
//!
//! The mock device models completion with a tick counter: every record
//! stamps the next tick, and a timestamp is resolved once the completion
//! watermark reaches its tick. One tick equals one millisecond of device
//! time, so expected timeline values stay readable in tests.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU32, Ordering};

use ember_core::{
    Error, GpuContextKind, HostClock, QueryId, QueryStatus, Result, SourceLocation, TimelineId,
    TimestampDevice, TraceSink,
};
use spin::Mutex;

// =============================================================================
// MOCK DEVICE
// =============================================================================

#[derive(Debug, Default)]
struct DeviceState {
    /// Tick recorded per timestamp object; 0 = never recorded
    ticks: Mutex<Vec<u32>>,
    /// Advances by one per record
    clock: AtomicU32,
    /// Timestamps with ticks at or below this are resolved
    watermark: AtomicU32,
    destroyed: AtomicU32,
    /// Remaining successful creations; `u32::MAX` = unlimited
    create_budget: AtomicU32,
}

/// Cloneable handle to a shared mock device
#[derive(Debug, Clone)]
pub struct MockDevice(Arc<DeviceState>);

impl MockDevice {
    pub fn new() -> Self {
        Self::with_create_budget(u32::MAX)
    }

    /// Device that fails timestamp creation after `budget` successes
    pub fn with_create_budget(budget: u32) -> Self {
        let state = DeviceState::default();
        state.create_budget.store(budget, Ordering::Relaxed);
        Self(Arc::new(state))
    }

    /// Mark every recorded timestamp as completed by the device
    pub fn complete_all(&self) {
        self.0
            .watermark
            .store(self.0.clock.load(Ordering::Relaxed), Ordering::Relaxed);
    }

    /// Mark timestamps recorded at or before `tick` as completed
    pub fn complete_through(&self, tick: u32) {
        self.0.watermark.store(tick, Ordering::Relaxed);
    }

    pub fn destroyed(&self) -> u32 {
        self.0.destroyed.load(Ordering::Relaxed)
    }
}

impl TimestampDevice for MockDevice {
    type Timestamp = u32;
    type Stream = ();
    type Graph = Vec<u32>;
    type GraphNode = u32;

    fn create_timestamp(&self) -> Result<u32> {
        let budget = self.0.create_budget.load(Ordering::Relaxed);
        if budget == 0 {
            return Err(Error::DeviceResourceExhausted);
        }
        if budget != u32::MAX {
            self.0.create_budget.store(budget - 1, Ordering::Relaxed);
        }
        let mut ticks = self.0.ticks.lock();
        ticks.push(0);
        Ok((ticks.len() - 1) as u32)
    }

    fn destroy_timestamp(&self, _timestamp: u32) -> Result<()> {
        self.0.destroyed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn record(&self, timestamp: &u32, _stream: &()) -> Result<()> {
        let tick = self.0.clock.fetch_add(1, Ordering::Relaxed) + 1;
        self.0.ticks.lock()[*timestamp as usize] = tick;
        Ok(())
    }

    fn record_graph(
        &self,
        timestamp: &u32,
        graph: &mut Vec<u32>,
        _dependencies: &[u32],
    ) -> Result<u32> {
        let tick = self.0.clock.fetch_add(1, Ordering::Relaxed) + 1;
        self.0.ticks.lock()[*timestamp as usize] = tick;
        graph.push(tick);
        Ok(tick)
    }

    fn synchronize(&self, _timestamp: &u32) -> Result<()> {
        Ok(())
    }

    fn query(&self, timestamp: &u32) -> QueryStatus {
        let tick = self.0.ticks.lock()[*timestamp as usize];
        if tick != 0 && tick <= self.0.watermark.load(Ordering::Relaxed) {
            QueryStatus::Ready
        } else {
            QueryStatus::Pending
        }
    }

    fn elapsed_millis(&self, start: &u32, end: &u32) -> Result<f32> {
        let ticks = self.0.ticks.lock();
        Ok((ticks[*end as usize] - ticks[*start as usize]) as f32)
    }
}

// =============================================================================
// MOCK CLOCK
// =============================================================================

/// Host clock pinned to a fixed instant
#[derive(Debug, Clone, Copy)]
pub struct MockClock(pub i64);

impl HostClock for MockClock {
    fn now_ns(&self) -> i64 {
        self.0
    }
}

// =============================================================================
// MOCK SINK
// =============================================================================

/// One recorded sink call
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    ContextAllocate {
        kind: GpuContextKind,
        name: String,
        is_calibrated: bool,
        cpu_timestamp_ns: i64,
        gpu_timestamp_ns: i64,
        period: f32,
    },
    Begin {
        timeline: TimelineId,
        query: QueryId,
    },
    BeginExternal {
        timeline: TimelineId,
        query: QueryId,
        name: String,
    },
    End {
        timeline: TimelineId,
        query: QueryId,
    },
    Notify {
        timeline: TimelineId,
        query: QueryId,
        timestamp_ns: i64,
    },
}

/// Cloneable handle to a sink that records every call in order
#[derive(Debug, Clone, Default)]
pub struct MockSink(Arc<Mutex<Vec<SinkEvent>>>);

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every recorded call, in order
    pub fn events(&self) -> Vec<SinkEvent> {
        self.0.lock().clone()
    }

    /// Just the zone notifications, in order
    pub fn notifications(&self) -> Vec<(QueryId, i64)> {
        self.0
            .lock()
            .iter()
            .filter_map(|event| match event {
                SinkEvent::Notify {
                    query, timestamp_ns, ..
                } => Some((*query, *timestamp_ns)),
                _ => None,
            })
            .collect()
    }
}

impl TraceSink for MockSink {
    fn gpu_context_allocate(
        &self,
        kind: GpuContextKind,
        name: &str,
        is_calibrated: bool,
        cpu_timestamp_ns: i64,
        gpu_timestamp_ns: i64,
        period: f32,
    ) -> TimelineId {
        self.0.lock().push(SinkEvent::ContextAllocate {
            kind,
            name: String::from(name),
            is_calibrated,
            cpu_timestamp_ns,
            gpu_timestamp_ns,
            period,
        });
        TimelineId::new(1)
    }

    fn zone_begin(&self, timeline: TimelineId, query: QueryId, _location: &SourceLocation) {
        self.0.lock().push(SinkEvent::Begin { timeline, query });
    }

    fn zone_begin_external(
        &self,
        timeline: TimelineId,
        query: QueryId,
        _file: &str,
        _line: u32,
        _function: &str,
        name: &str,
    ) {
        self.0.lock().push(SinkEvent::BeginExternal {
            timeline,
            query,
            name: String::from(name),
        });
    }

    fn zone_end(&self, timeline: TimelineId, query: QueryId) {
        self.0.lock().push(SinkEvent::End { timeline, query });
    }

    fn zone_notify(&self, timeline: TimelineId, query: QueryId, timestamp_ns: i64) {
        self.0.lock().push(SinkEvent::Notify {
            timeline,
            query,
            timestamp_ns,
        });
    }
}
