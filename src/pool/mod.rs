//! Fixed-size worker pool and completion tracking
//!
//! One mutex guards every piece of shared state: the idle set, the busy map,
//! the in-flight counter, the dispatch counter and the running sum.
//!
//! Two condition variables hang off that mutex:
//! - `workers_available`: notified after every insertion into the idle set
//! - `all_done`: notified when the in-flight counter drops to zero
//!
//! Waiters always re-check their predicate in a loop, so spurious wakeups
//! are harmless.

mod worker;

pub use worker::ClaimedWorker;

use worker::Worker;

use std::sync::{Condvar, Mutex, MutexGuard};

use bitvec::prelude::*;
use tracing::{debug, trace, warn};

use crate::CalculationError;

/// First failure recorded by a worker
#[derive(Debug, Clone, PartialEq, Eq)]
struct Failure {
    worker: usize,
    reason: String,
}

/// State guarded by the pool mutex
#[derive(Debug)]
struct PoolState<'t> {
    /// Workers available for dispatch (order irrelevant)
    idle: Vec<Worker<'t>>,

    /// Dispatched workers, one bit per worker id
    busy: BitVec,

    /// Dispatched but not yet published
    in_flight: usize,

    /// Monotonic dispatch count
    total_dispatched: u64,

    /// Aggregated partial sums
    running_sum: u64,

    /// Set once; later failures are only logged
    failure: Option<Failure>,
}

/// Snapshot of pool counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of workers the pool was created with
    pub size: usize,
    /// Workers currently idle
    pub idle: usize,
    /// Workers currently dispatched
    pub busy: usize,
    /// Dispatched tasks not yet finished
    pub in_flight: usize,
    /// Tasks dispatched since creation
    pub total_dispatched: u64,
    /// Sum published so far
    pub running_sum: u64,
}

/// Worker pool coordinating dispatch and result aggregation
///
/// `'t` is the lifetime of the tree the workers borrow subtrees from.
#[derive(Debug)]
pub struct WorkerPool<'t> {
    size: usize,
    state: Mutex<PoolState<'t>>,
    workers_available: Condvar,
    all_done: Condvar,
}

impl<'t> WorkerPool<'t> {
    /// Create a pool holding `size` idle workers
    ///
    /// A pool of zero workers would block the first dispatch forever, so it is
    /// rejected.
    pub fn initialize(size: usize) -> Result<Self, CalculationError> {
        if size == 0 {
            return Err(CalculationError::InvalidThreadCount(size));
        }

        let pool = Self {
            size,
            state: Mutex::new(PoolState {
                idle: Vec::with_capacity(size),
                busy: bitvec![0; size],
                in_flight: 0,
                total_dispatched: 0,
                running_sum: 0,
                failure: None,
            }),
            workers_available: Condvar::new(),
            all_done: Condvar::new(),
        };

        {
            let mut state = pool.lock()?;
            state.idle.extend((0..size).map(Worker::new));
        }
        pool.workers_available.notify_all();

        debug!(size, "worker pool initialized");
        Ok(pool)
    }

    /// Number of workers owned by the pool
    pub fn size(&self) -> usize {
        self.size
    }

    fn lock(&self) -> Result<MutexGuard<'_, PoolState<'t>>, CalculationError> {
        self.state.lock().map_err(|_| CalculationError::Poisoned)
    }

    /// Lock state with poison recovery
    ///
    /// Used on the publishing path: a worker must always return itself and
    /// decrement the in-flight counter, otherwise `await_completion` hangs.
    fn lock_or_recover(&self) -> MutexGuard<'_, PoolState<'t>> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poison) => poison.into_inner(),
        }
    }

    /// Claim an idle worker, blocking until one is available
    ///
    /// Counts the claim as a dispatched task. The claim is settled when the
    /// returned worker is executed or dropped.
    pub fn acquire_worker(&self) -> Result<ClaimedWorker<'_, 't>, CalculationError> {
        let mut state = self.lock()?;
        let worker = loop {
            if let Some(worker) = state.idle.pop() {
                break worker;
            }
            trace!("no idle worker, waiting");
            state = self
                .workers_available
                .wait(state)
                .map_err(|_| CalculationError::Poisoned)?;
        };

        debug_assert!(
            !state.busy[worker.id()],
            "worker {} handed out twice",
            worker.id()
        );
        state.busy.set(worker.id(), true);
        state.in_flight += 1;
        state.total_dispatched += 1;

        trace!(
            worker = worker.id(),
            in_flight = state.in_flight,
            "worker acquired"
        );
        Ok(ClaimedWorker::new(self, worker))
    }

    /// Publish a worker's outcome and return it to the idle set
    ///
    /// The whole sequence runs in a single critical section.
    fn complete(&self, mut worker: Worker<'t>, outcome: Result<u64, String>) {
        let mut state = self.lock_or_recover();

        match outcome {
            Ok(sum) => {
                state.running_sum += sum;
                trace!(worker = worker.id(), sum, "partial sum published");
            }
            Err(reason) => {
                warn!(worker = worker.id(), %reason, "worker failed");
                state.failure.get_or_insert(Failure {
                    worker: worker.id(),
                    reason,
                });
            }
        }

        let id = worker.id();
        worker.reset();
        state.busy.set(id, false);
        state.idle.push(worker);
        self.workers_available.notify_one();

        self.finish_task(&mut state);
    }

    fn finish_task(&self, state: &mut PoolState<'t>) {
        debug_assert!(state.in_flight > 0, "task finished with none in flight");
        state.in_flight = state.in_flight.saturating_sub(1);
        if state.in_flight == 0 {
            self.all_done.notify_all();
        }
    }

    /// Block until no task is in flight, then return the aggregated sum
    ///
    /// Fails if any worker recorded a failure during the run.
    pub fn await_completion(&self) -> Result<u64, CalculationError> {
        let mut state = self.lock()?;
        while state.in_flight > 0 {
            state = self
                .all_done
                .wait(state)
                .map_err(|_| CalculationError::Poisoned)?;
        }

        if let Some(failure) = &state.failure {
            return Err(CalculationError::WorkerFailed {
                worker: failure.worker,
                reason: failure.reason.clone(),
            });
        }

        debug!(
            sum = state.running_sum,
            total_dispatched = state.total_dispatched,
            "all tasks completed"
        );
        Ok(state.running_sum)
    }

    /// Consistent snapshot of the pool counters
    pub fn stats(&self) -> Result<PoolStats, CalculationError> {
        let state = self.lock()?;
        Ok(PoolStats {
            size: self.size,
            idle: state.idle.len(),
            busy: state.busy.count_ones(),
            in_flight: state.in_flight,
            total_dispatched: state.total_dispatched,
            running_sum: state.running_sum,
        })
    }
}
