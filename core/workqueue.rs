//! Deferred work
//!
//! A [`WorkItem`] wraps a [`Runnable`] body with a three-bit state word:
//!
//! - `PENDING`: a run has been requested and not yet claimed
//! - `RUNNING`: the body is executing on a worker
//! - `QUEUED`: a handle to the item sits in the work queue
//!
//! Scheduling an item that is already pending (or running, since the runner
//! re-checks `PENDING` before it retires) merges into the outstanding run
//! instead of queueing a duplicate. Together with the claim rule in
//! [`WorkItem::execute`] this keeps at most one body active per item.
//!
//! A handle left in the queue by [`WorkItem::flush`] is reused by the next
//! [`WorkItem::schedule`], so an item never occupies more than one slot no
//! matter how often it is flushed between worker passes.
//!
//! Items are handed to a [`WorkQueue`]; [`BoundedWorkQueue`] is a fixed
//! capacity lock-free queue drained by whatever context acts as the worker.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicU8, Ordering};
use heapless::mpmc::MpMcQueue;

use crate::{Error, Result};

/// Run requested, not yet claimed
const PENDING: u8 = 1 << 0;
/// Body executing
const RUNNING: u8 = 1 << 1;
/// Handle sitting in the work queue
const QUEUED: u8 = 1 << 2;

/// Body of a work item
pub trait Runnable: Send + Sync {
    /// Execute in worker context (may block)
    fn run(&self);
}

/// Worker facility
pub trait WorkQueue: Send + Sync {
    /// Queue `work` for one call to [`WorkItem::execute`]
    ///
    /// Must not block; called from interrupt context.
    fn enqueue(&self, work: Arc<WorkItem>) -> Result<()>;
}

/// Coalescing deferred-work item
pub struct WorkItem {
    /// PENDING / RUNNING / QUEUED bits
    state: AtomicU8,
    /// Name for diagnostics
    name: &'static str,
    /// Work body
    body: Arc<dyn Runnable>,
}

impl WorkItem {
    /// Create a new idle work item
    pub fn new(name: &'static str, body: Arc<dyn Runnable>) -> Arc<Self> {
        Arc::new(Self {
            state: AtomicU8::new(0),
            name,
            body,
        })
    }

    /// Get the item name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Check if a run is requested and not yet claimed
    pub fn is_pending(&self) -> bool {
        self.state.load(Ordering::Acquire) & PENDING != 0
    }

    /// Check if the body is executing
    pub fn is_running(&self) -> bool {
        self.state.load(Ordering::Acquire) & RUNNING != 0
    }

    /// Check if a handle to the item sits in the work queue
    pub fn is_queued(&self) -> bool {
        self.state.load(Ordering::Acquire) & QUEUED != 0
    }

    /// Request a run
    ///
    /// Returns `Ok(true)` if a new run was requested, `Ok(false)` if the
    /// request merged into an outstanding run. Only an item with no handle
    /// in `queue` is enqueued. Safe from interrupt context. If the queue
    /// refuses the item the request is retracted and the queue's error is
    /// returned.
    pub fn schedule(self: &Arc<Self>, queue: &dyn WorkQueue) -> Result<bool> {
        let mut prev = self.state.load(Ordering::Acquire);
        loop {
            let next = if prev == 0 {
                PENDING | QUEUED
            } else {
                prev | PENDING
            };
            match self.state.compare_exchange_weak(
                prev,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => prev = actual,
            }
        }

        if prev & (PENDING | RUNNING) != 0 {
            // Already pending, or running and bound to re-check PENDING.
            return Ok(false);
        }
        if prev & QUEUED != 0 {
            // A retracted handle is still queued and will claim this run.
            return Ok(true);
        }

        if let Err(err) = queue.enqueue(Arc::clone(self)) {
            self.state.fetch_and(!(PENDING | QUEUED), Ordering::AcqRel);
            return Err(err);
        }
        Ok(true)
    }

    /// Run the body for every outstanding request
    ///
    /// Called by the worker for each dequeued handle. Returns the number of
    /// body invocations; zero when another worker holds the item or the
    /// request was retracted by [`WorkItem::flush`].
    pub fn execute(&self) -> usize {
        // The handle has left the queue; later requests need a new one.
        self.state.fetch_and(!QUEUED, Ordering::AcqRel);

        let mut runs = 0;
        loop {
            if !self.claim() {
                return runs;
            }

            self.body.run();
            runs += 1;

            let prev = self.state.fetch_and(!RUNNING, Ordering::AcqRel);
            if prev & PENDING == 0 {
                return runs;
            }
            // Rescheduled while running: go round again.
        }
    }

    /// Move PENDING to RUNNING if no other worker holds the item
    fn claim(&self) -> bool {
        let mut cur = self.state.load(Ordering::Acquire);
        loop {
            if cur & PENDING == 0 || cur & RUNNING != 0 {
                return false;
            }
            match self.state.compare_exchange_weak(
                cur,
                (cur & !PENDING) | RUNNING,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => cur = actual,
            }
        }
    }

    /// Drain barrier
    ///
    /// Retracts an unclaimed request and waits for a running body to
    /// return. When this returns the body is not executing and will not
    /// execute again unless the item is rescheduled. A queued handle stays
    /// queued and is picked up again by the next `schedule`. The caller
    /// must have stopped all sources of `schedule` first.
    pub fn flush(&self) {
        loop {
            let prev = self.state.fetch_and(!PENDING, Ordering::AcqRel);
            if prev & RUNNING == 0 {
                break;
            }
            while self.is_running() {
                core::hint::spin_loop();
            }
        }
        log::trace!("work '{}' flushed", self.name);
    }
}

/// Fixed-capacity work queue
///
/// `N` must be a power of two. The owner of the worker context calls
/// [`BoundedWorkQueue::run_pending`].
pub struct BoundedWorkQueue<const N: usize> {
    slots: MpMcQueue<Arc<WorkItem>, N>,
}

impl<const N: usize> BoundedWorkQueue<N> {
    /// Create an empty queue
    pub const fn new() -> Self {
        Self {
            slots: MpMcQueue::new(),
        }
    }

    /// Execute every queued item, including ones queued while running
    ///
    /// Returns the number of handles dequeued.
    pub fn run_pending(&self) -> usize {
        let mut handled = 0;
        while let Some(work) = self.slots.dequeue() {
            let runs = work.execute();
            log::trace!("work '{}' executed {} time(s)", work.name(), runs);
            handled += 1;
        }
        handled
    }
}

impl<const N: usize> Default for BoundedWorkQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> WorkQueue for BoundedWorkQueue<N> {
    fn enqueue(&self, work: Arc<WorkItem>) -> Result<()> {
        self.slots.enqueue(work).map_err(|work| {
            log::error!("work queue full, dropping '{}'", work.name());
            Error::QueueFull
        })
    }
}
