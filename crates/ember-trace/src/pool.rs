//! # Event Pool
//!
//! Fixed-capacity arena of reusable device timestamp slots.
//!
//! Every slot is created when the pool is built and reused for the life of
//! the context. Slots move between three memberships: the free list, a
//! caller-owned submission chain, and the submission queue. Membership is
//! tracked by an explicit state tag and per-relationship index links, so a
//! slot can never be on two lists at once.

use alloc::vec::Vec;

use ember_core::{Error, QueryId, Result};

use crate::chain::SubmissionChain;

// =============================================================================
// SLOT STATE
// =============================================================================

/// Membership state of a pool slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// On the free list, available to `insert_query`
    Free,
    /// Appended to a submission chain not yet handed to the device
    Chained,
    /// In the submission queue, awaiting device completion
    Queued,
    /// Timestamp reported to the sink; awaiting reclamation
    Resolved,
}

// =============================================================================
// EVENT SLOT
// =============================================================================

/// One reusable timestamp slot
///
/// Links are pool indices rather than pointers; each relationship has its
/// own field, and the state tag says which are meaningful.
#[derive(Debug)]
pub struct EventSlot<T> {
    /// Device timestamp object (created once, reused forever)
    pub(crate) timestamp: T,
    /// Current membership
    pub(crate) state: SlotState,
    /// Next slot on the free list (meaningful while `Free`)
    pub(crate) next_free: Option<QueryId>,
    /// Next slot in the same submission chain
    pub(crate) next_in_chain: Option<QueryId>,
    /// Head of the next chain in the submission queue (chain heads only)
    pub(crate) next_submission: Option<QueryId>,
    /// True once collection confirmed the device consumed this chain
    /// (chain heads only)
    pub(crate) was_submitted: bool,
}

// =============================================================================
// POOL STATISTICS
// =============================================================================

/// Pool statistics
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Total queries inserted
    pub inserts: u64,
    /// Total slots reclaimed via chain release
    pub releases: u64,
    /// Total timestamps resolved and reported
    pub collected: u64,
    /// High water mark of in-flight slots
    pub peak_used: u32,
}

// =============================================================================
// EVENT POOL
// =============================================================================

/// Fixed-capacity arena of timestamp slots plus the submission queue
///
/// All mutation happens under the owning context's lock; the pool itself
/// is plain data.
#[derive(Debug)]
pub struct EventPool<T> {
    /// Slot storage; a slot's index is its [`QueryId`]
    slots: Vec<EventSlot<T>>,
    /// Head of the free list
    free_head: Option<QueryId>,
    /// Free slot count (kept exact for capacity checks and stats)
    free_count: usize,
    /// Oldest submitted chain head
    pub(crate) queue_head: Option<QueryId>,
    /// Newest submitted chain head
    pub(crate) queue_tail: Option<QueryId>,
    /// Counters
    pub(crate) stats: PoolStats,
}

impl<T> EventPool<T> {
    /// Build a pool from pre-created timestamp objects, linking every slot
    /// into a single free list in index order
    pub(crate) fn new(timestamps: Vec<T>) -> Self {
        debug_assert!(timestamps.len() <= u16::MAX as usize);
        let count = timestamps.len();
        let slots: Vec<EventSlot<T>> = timestamps
            .into_iter()
            .enumerate()
            .map(|(i, timestamp)| EventSlot {
                timestamp,
                state: SlotState::Free,
                next_free: if i + 1 < count {
                    Some(QueryId::new((i + 1) as u16))
                } else {
                    None
                },
                next_in_chain: None,
                next_submission: None,
                was_submitted: false,
            })
            .collect();

        Self {
            slots,
            free_head: if count > 0 { Some(QueryId::new(0)) } else { None },
            free_count: count,
            queue_head: None,
            queue_tail: None,
            stats: PoolStats::default(),
        }
    }

    /// Total slot count
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Slots currently on the free list
    pub fn free_count(&self) -> usize {
        self.free_count
    }

    /// Borrow a slot
    pub(crate) fn slot(&self, id: QueryId) -> &EventSlot<T> {
        &self.slots[id.index()]
    }

    /// Mutably borrow a slot
    pub(crate) fn slot_mut(&mut self, id: QueryId) -> &mut EventSlot<T> {
        &mut self.slots[id.index()]
    }

    /// Pop the free list head
    ///
    /// The sole allocation point for a slot. Pool size is a deployment-time
    /// capacity decision, so an empty free list is an error, not a wait.
    pub(crate) fn pop_free(&mut self) -> Result<QueryId> {
        let id = self.free_head.ok_or(Error::PoolExhausted)?;
        let slot = &mut self.slots[id.index()];
        debug_assert_eq!(slot.state, SlotState::Free);
        self.free_head = slot.next_free.take();
        slot.state = SlotState::Chained;
        slot.next_in_chain = None;
        self.free_count -= 1;

        self.stats.inserts += 1;
        let used = (self.slots.len() - self.free_count) as u32;
        if used > self.stats.peak_used {
            self.stats.peak_used = used;
        }
        Ok(id)
    }

    /// Return a single slot to the free list front
    ///
    /// Undo path for a query whose record command was refused by the
    /// device before it joined any chain.
    pub(crate) fn push_free(&mut self, id: QueryId) {
        let free_head = self.free_head;
        let slot = &mut self.slots[id.index()];
        debug_assert_eq!(slot.state, SlotState::Chained);
        slot.state = SlotState::Free;
        slot.next_in_chain = None;
        slot.next_free = free_head;
        self.free_head = Some(id);
        self.free_count += 1;
    }

    /// Append a freshly popped slot to a caller's chain
    pub(crate) fn append_to_chain(&mut self, chain: &mut SubmissionChain, id: QueryId) {
        debug_assert_eq!(self.slots[id.index()].state, SlotState::Chained);
        match chain.tail {
            None => chain.head = Some(id),
            Some(tail) => self.slots[tail.index()].next_in_chain = Some(id),
        }
        chain.tail = Some(id);
    }

    /// Move a chain into the submission queue (FIFO by submission order)
    pub(crate) fn enqueue_submitted(&mut self, chain: &SubmissionChain) {
        let Some(head) = chain.head else { return };

        let mut cursor = Some(head);
        while let Some(id) = cursor {
            let slot = &mut self.slots[id.index()];
            debug_assert_eq!(slot.state, SlotState::Chained);
            slot.state = SlotState::Queued;
            cursor = slot.next_in_chain;
        }

        match self.queue_tail {
            None => self.queue_head = Some(head),
            Some(tail) => self.slots[tail.index()].next_submission = Some(head),
        }
        self.queue_tail = Some(head);
    }

    /// Splice an entire chain onto the front of the free list and clear
    /// the caller's handle
    ///
    /// Chains still in the submission queue must be collected first; the
    /// debug assert below catches callers reclaiming in-flight slots.
    pub(crate) fn release_chain(&mut self, chain: &mut SubmissionChain) {
        let (Some(head), Some(tail)) = (chain.head, chain.tail) else {
            return;
        };

        let mut cursor = Some(head);
        while let Some(id) = cursor {
            let slot = &mut self.slots[id.index()];
            debug_assert_ne!(slot.state, SlotState::Queued, "chain freed while in flight");
            debug_assert_ne!(slot.state, SlotState::Free, "double free of chain slot");
            let next = slot.next_in_chain.take();
            slot.state = SlotState::Free;
            slot.was_submitted = false;
            slot.next_submission = None;
            slot.next_free = next;
            self.free_count += 1;
            self.stats.releases += 1;
            cursor = next;
        }

        self.slots[tail.index()].next_free = self.free_head;
        self.free_head = Some(head);
        chain.clear();
    }

    /// Take every timestamp object out of the pool (teardown only)
    pub(crate) fn take_timestamps(&mut self) -> Vec<T> {
        self.free_head = None;
        self.free_count = 0;
        self.queue_head = None;
        self.queue_tail = None;
        core::mem::take(&mut self.slots)
            .into_iter()
            .map(|slot| slot.timestamp)
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
