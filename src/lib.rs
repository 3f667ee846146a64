//! # Pooled Parallel Tree Summation
//!
//! Sums the values of a complete binary tree twice, once by plain recursion
//! and once through a fixed-size worker pool, and checks that both agree.
//!
//! ## Core Algorithm
//!
//! 1. **Generation**: complete tree of height H, values 1..=2^(H+1)-1 in pre-order
//! 2. **Level cutoff**: recurse in the caller down to the parallel level L
//! 3. **Dispatch**: each child of a level-L node goes to an idle worker on a new thread
//! 4. **Aggregation**: workers publish partial sums under the pool mutex;
//!    the caller blocks until the in-flight counter reaches zero
//!
//! Result: 2^(L+1) tasks regardless of pool size; a small pool simply makes
//! the dispatching thread wait for workers to come back.
//!
//! ## Usage Example
//!
//! ```
//! use treecalc::{CalculationConfig, TreeCalculation};
//!
//! let config = CalculationConfig::new(3, 1, 4);
//! let report = TreeCalculation::new(config).run()?;
//! assert_eq!(report.parallel_sum, 120);
//! assert_eq!(report.tasks_dispatched, 4);
//! # Ok::<(), treecalc::CalculationError>(())
//! ```

#![warn(missing_docs, missing_debug_implementations)]
#![allow(clippy::new_without_default)]

pub mod pool;   // Worker pool and completion tracking
pub mod report; // Timings and consistency diagnostics
pub mod tree;   // Tree generation and traversals

// Re-exports for convenience
pub use pool::{ClaimedWorker, PoolStats, WorkerPool};
pub use report::{CalculationReport, Diagnostic, Timings};
pub use tree::{parallel_sum, walk, NodeCounter, ParallelOutcome, Tree};

use std::io;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info, info_span};

/// Parameters of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalculationConfig {
    /// Tree height (0 = single node)
    pub height: u32,

    /// Depth whose nodes dispatch their children to workers
    pub parallel_level: u32,

    /// Worker pool size
    pub thread_count: usize,
}

impl CalculationConfig {
    /// Create configuration
    pub fn new(height: u32, parallel_level: u32, thread_count: usize) -> Self {
        Self {
            height,
            parallel_level,
            thread_count,
        }
    }

    /// Reject parameters the run cannot honour
    pub fn validate(&self) -> Result<(), CalculationError> {
        if self.height > tree::MAX_HEIGHT {
            return Err(CalculationError::HeightTooLarge {
                height: self.height,
                max: tree::MAX_HEIGHT,
            });
        }
        if self.thread_count == 0 {
            return Err(CalculationError::InvalidThreadCount(self.thread_count));
        }
        Ok(())
    }

    /// Tasks a correct run dispatches
    pub fn expected_tasks(&self) -> u64 {
        tree::expected_tasks(self.height, self.parallel_level)
    }
}

/// Errors that can occur during a calculation
#[derive(Error, Debug)]
pub enum CalculationError {
    /// Worker pool must hold at least one worker
    #[error("Invalid thread count {0}: at least one worker is required")]
    InvalidThreadCount(usize),

    /// Tree too tall for the node numbering to fit in u64
    #[error("Tree height {height} exceeds maximum {max}")]
    HeightTooLarge {
        /// Requested height
        height: u32,
        /// Largest supported height
        max: u32,
    },

    /// Pool mutex poisoned by a panicking thread
    #[error("Worker pool lock poisoned")]
    Poisoned,

    /// Worker thread could not be started
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),

    /// A dispatched worker did not produce a partial sum
    #[error("Worker {worker} failed: {reason}")]
    WorkerFailed {
        /// Worker identifier
        worker: usize,
        /// What went wrong
        reason: String,
    },
}

/// Driver for one sequential + parallel run
///
/// Coordinates generation, both traversals, timing and the consistency check
#[derive(Debug)]
pub struct TreeCalculation {
    config: CalculationConfig,
}

impl TreeCalculation {
    /// Create driver
    pub fn new(config: CalculationConfig) -> Self {
        Self { config }
    }

    /// Run parameters
    pub fn config(&self) -> &CalculationConfig {
        &self.config
    }

    /// Generate the tree, time both traversals and compare the results
    ///
    /// Sum or task-count mismatches end up in the report's diagnostics;
    /// only failures that prevent a result are returned as errors.
    pub fn run(&self) -> Result<CalculationReport, CalculationError> {
        self.config.validate()?;

        let span = info_span!(
            "tree_calculation",
            height = self.config.height,
            parallel_level = self.config.parallel_level,
            threads = self.config.thread_count
        );
        let _enter = span.enter();

        let mut counter = NodeCounter::new();
        let tree = Tree::generate_with(self.config.height, &mut counter);
        let node_count = counter.issued();
        debug!(node_count, "tree generated");

        let start = Instant::now();
        let sequential_sum = tree.sum_sequential();
        let sequential = start.elapsed();

        let start = Instant::now();
        let outcome = parallel_sum(&tree, self.config.parallel_level, self.config.thread_count)?;
        let parallel = start.elapsed();

        let mut report = CalculationReport {
            config: self.config,
            node_count,
            reference_sum: tree::reference_sum(node_count),
            sequential_sum,
            parallel_sum: outcome.sum,
            tasks_dispatched: outcome.tasks_dispatched,
            expected_tasks: self.config.expected_tasks(),
            timings: Timings {
                sequential,
                parallel,
            },
            diagnostics: Vec::new(),
        };
        report.check();

        info!(
            consistent = report.is_consistent(),
            speedup = report.timings.speedup(),
            "calculation finished"
        );
        Ok(report)
    }
}
