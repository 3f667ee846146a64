//! Binary tree and its traversals
//!
//! Explicit representation: every node is stored, children are boxed.
//! Trees are immutable once generated and shared read-only across workers.

mod node;
mod traversal;

pub use node::{expected_node_count, reference_sum, NodeCounter, Tree};
pub use traversal::{parallel_sum, walk, ParallelOutcome};

/// Largest supported height
///
/// Keeps 2^(H+1) - 1 nodes and their closed-form sum within `u64`.
pub const MAX_HEIGHT: u32 = 31;

/// Expected number of dispatched tasks for a complete tree
///
/// Each node on the parallel level dispatches its two children, so there
/// are 2^(L+1) tasks as long as that level has children at all.
pub fn expected_tasks(height: u32, parallel_level: u32) -> u64 {
    if parallel_level < height {
        2u64 << parallel_level
    } else {
        0
    }
}
