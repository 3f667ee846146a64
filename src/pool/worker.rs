//! Reusable worker and its claim guard
//!
//! Lifecycle: idle (in the pool) → busy (claimed + assigned) → idle again
//! after publishing its partial sum. Ownership moves with the state: the pool
//! owns idle workers, a [`ClaimedWorker`] owns a busy one.
//!
//! A claim always ends in the pool's publishing critical section: either via
//! [`ClaimedWorker::execute`] or, if the claim is dropped unexecuted, via
//! `Drop`, which returns the worker and records the dispatch as failed.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use super::WorkerPool;
use crate::tree::Tree;

/// Unit of execution that sums one subtree per dispatch
#[derive(Debug)]
pub(super) struct Worker<'t> {
    /// Index into the pool's busy map
    id: usize,

    /// Subtree to sum; present only while busy
    subtree: Option<&'t Tree>,
}

impl<'t> Worker<'t> {
    pub(super) fn new(id: usize) -> Self {
        Self { id, subtree: None }
    }

    pub(super) fn id(&self) -> usize {
        self.id
    }

    fn is_idle(&self) -> bool {
        self.subtree.is_none()
    }

    fn assign(&mut self, subtree: &'t Tree) {
        debug_assert!(self.is_idle(), "worker {} assigned twice", self.id);
        self.subtree = Some(subtree);
    }

    /// Sum the assigned subtree; the partial sum starts from zero every time
    fn sum_assigned(&self) -> Result<u64, String> {
        match self.subtree {
            Some(subtree) => panic::catch_unwind(AssertUnwindSafe(|| subtree.sum_sequential()))
                .map_err(|payload| format!("summation panicked: {}", panic_message(payload.as_ref()))),
            None => Err("executed without an assigned subtree".to_string()),
        }
    }

    /// Back to the idle state
    pub(super) fn reset(&mut self) {
        self.subtree = None;
    }
}

/// Worker claimed from a [`WorkerPool`]
///
/// Holds the pool it came from, so the result always lands in the right
/// pool. Dropping it without calling [`execute`](Self::execute) hands the
/// worker back and marks the run failed, keeping the in-flight counter
/// consistent.
#[derive(Debug)]
#[must_use = "a claimed worker that is not executed fails the run when dropped"]
pub struct ClaimedWorker<'p, 't> {
    pool: &'p WorkerPool<'t>,
    id: usize,
    worker: Option<Worker<'t>>,
}

impl<'p, 't> ClaimedWorker<'p, 't> {
    pub(super) fn new(pool: &'p WorkerPool<'t>, worker: Worker<'t>) -> Self {
        Self {
            pool,
            id: worker.id(),
            worker: Some(worker),
        }
    }

    /// Worker identifier (stable for the pool's lifetime)
    pub fn id(&self) -> usize {
        self.id
    }

    /// No subtree assigned yet
    pub fn is_idle(&self) -> bool {
        self.worker.as_ref().map_or(true, Worker::is_idle)
    }

    /// Hand the worker a subtree; does not start execution
    pub fn assign(&mut self, subtree: &'t Tree) {
        if let Some(worker) = self.worker.as_mut() {
            worker.assign(subtree);
        }
    }

    /// Sum the assigned subtree and publish the result to the owning pool
    ///
    /// Runs on the dispatch thread. The worker comes back to the pool's idle
    /// set inside the publishing critical section, whether or not the
    /// summation succeeded.
    pub fn execute(mut self) {
        if let Some(worker) = self.worker.take() {
            let outcome = worker.sum_assigned();
            self.pool.complete(worker, outcome);
        }
    }
}

impl Drop for ClaimedWorker<'_, '_> {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            self.pool
                .complete(worker, Err("released without executing".to_string()));
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic payload"
    }
}
