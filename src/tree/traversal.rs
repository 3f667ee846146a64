//! Sequential and parallel traversal
//!
//! Parallel scheme: recurse in the calling thread down to the parallel
//! level, then hand each child of a level-L node to a pooled worker running
//! on its own thread. Nothing below level L dispatches again.
//!
//! Dispatched tasks for a complete tree of height H:
//!   L < H:  2^(L+1)  (two children at each of the 2^L level-L nodes)
//!   L >= H: 0        (level-L nodes, if any, are leaves)

use std::thread::{self, Scope};

use tracing::{debug, trace};

use super::Tree;
use crate::pool::{PoolStats, WorkerPool};
use crate::CalculationError;

impl Tree {
    /// Sum of all values in this subtree (absent child = 0)
    pub fn sum_sequential(&self) -> u64 {
        self.value
            + self.left.as_ref().map_or(0, |left| left.sum_sequential())
            + self.right.as_ref().map_or(0, |right| right.sum_sequential())
    }
}

/// Walk `node`, dispatching the children of every level-`parallel_level`
/// node to workers from `pool`
///
/// Returns only the part of the sum computed in the calling thread; the
/// dispatched part arrives in the pool's running sum. Workers are spawned
/// into `scope` and not joined here: call [`WorkerPool::await_completion`]
/// before leaving the scope.
pub fn walk<'scope, 'env, 't>(
    node: &'t Tree,
    parallel_level: u32,
    pool: &'scope WorkerPool<'t>,
    scope: &'scope Scope<'scope, 'env>,
) -> Result<u64, CalculationError>
where
    't: 'scope,
{
    if node.level == parallel_level {
        for child in node.children() {
            dispatch(child, pool, scope)?;
        }
        return Ok(node.value);
    }

    let mut sum = node.value;
    for child in node.children() {
        sum += walk(child, parallel_level, pool, scope)?;
    }
    Ok(sum)
}

fn dispatch<'scope, 'env, 't>(
    subtree: &'t Tree,
    pool: &'scope WorkerPool<'t>,
    scope: &'scope Scope<'scope, 'env>,
) -> Result<(), CalculationError>
where
    't: 'scope,
{
    let mut worker = pool.acquire_worker()?;
    let id = worker.id();
    worker.assign(subtree);
    trace!(worker = id, subtree = %subtree, "dispatching");

    // On spawn failure the closure is dropped with the claim inside it,
    // which hands the worker back and marks the run failed
    thread::Builder::new()
        .name(format!("treecalc-worker-{id}"))
        .spawn_scoped(scope, move || worker.execute())
        .map_err(CalculationError::Spawn)?;
    Ok(())
}

/// Result of a complete parallel traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelOutcome {
    /// Total sum (walk part + aggregated worker part)
    pub sum: u64,

    /// Tasks dispatched during the run
    pub tasks_dispatched: u64,

    /// Pool counters after completion
    pub stats: PoolStats,
}

/// Sum `tree` in parallel with a fresh pool of `thread_count` workers
pub fn parallel_sum(
    tree: &Tree,
    parallel_level: u32,
    thread_count: usize,
) -> Result<ParallelOutcome, CalculationError> {
    let pool = WorkerPool::initialize(thread_count)?;

    let sum = thread::scope(|scope| -> Result<u64, CalculationError> {
        let partial = walk(tree, parallel_level, &pool, scope);
        // Always drain in-flight workers, even when the walk bailed out
        let remaining = pool.await_completion();
        Ok(partial? + remaining?)
    })?;

    let stats = pool.stats()?;
    debug!(
        sum,
        tasks = stats.total_dispatched,
        parallel_level,
        thread_count,
        "parallel traversal finished"
    );

    Ok(ParallelOutcome {
        sum,
        tasks_dispatched: stats.total_dispatched,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_sum_matches_formula() {
        for height in 0..12 {
            let tree = Tree::generate(height);
            let n = crate::tree::expected_node_count(height);
            assert_eq!(tree.sum_sequential(), crate::tree::reference_sum(n));
        }
    }

    #[test]
    fn test_sequential_sum_partial_tree() {
        let mut root = Tree::leaf(10, 0);
        root.right = Some(Box::new(Tree::leaf(5, 1)));
        assert_eq!(root.sum_sequential(), 15);
    }

    #[test]
    fn test_height_three_level_one() {
        let tree = Tree::generate(3);
        let outcome = parallel_sum(&tree, 1, 4).unwrap();
        assert_eq!(outcome.sum, 120);
        assert_eq!(outcome.tasks_dispatched, 4);
        assert_eq!(outcome.stats.in_flight, 0);
        assert_eq!(outcome.stats.idle, 4);
    }

    #[test]
    fn test_single_node_dispatches_nothing() {
        let tree = Tree::generate(0);
        for level in 0..3 {
            let outcome = parallel_sum(&tree, level, 2).unwrap();
            assert_eq!(outcome.sum, 1);
            assert_eq!(outcome.tasks_dispatched, 0);
        }
    }

    #[test]
    fn test_root_level_dispatch() {
        let tree = Tree::generate(4);
        let outcome = parallel_sum(&tree, 0, 2).unwrap();
        assert_eq!(outcome.sum, tree.sum_sequential());
        assert_eq!(outcome.tasks_dispatched, 2);
    }

    #[test]
    fn test_single_thread_serializes() {
        let tree = Tree::generate(8);
        let outcome = parallel_sum(&tree, 4, 1).unwrap();
        assert_eq!(outcome.sum, tree.sum_sequential());
        assert_eq!(outcome.tasks_dispatched, 32);
        assert_eq!(outcome.stats.idle, 1);
    }

    #[test]
    fn test_walk_without_dispatch_is_sequential() {
        let tree = Tree::generate(3);
        let pool = WorkerPool::initialize(1).unwrap();
        let partial = thread::scope(|scope| walk(&tree, 10, &pool, scope)).unwrap();
        assert_eq!(partial, 120);
        assert_eq!(pool.stats().unwrap().total_dispatched, 0);
    }

    #[cfg(debug_assertions)]
    #[test]
    fn test_panicking_subtree_fails_run_and_drains_pool() {
        // Left subtree overflows u64 while summing (debug builds panic)
        let mut overflowing = Tree::leaf(u64::MAX, 1);
        overflowing.left = Some(Box::new(Tree::leaf(1, 2)));
        let mut root = Tree::leaf(1, 0);
        root.left = Some(Box::new(overflowing));
        root.right = Some(Box::new(Tree::leaf(2, 1)));

        assert!(matches!(
            parallel_sum(&root, 0, 2),
            Err(CalculationError::WorkerFailed { .. })
        ));

        let pool = WorkerPool::initialize(2).unwrap();
        let result = thread::scope(|scope| {
            let partial = walk(&root, 0, &pool, scope).unwrap();
            assert_eq!(partial, 1);
            pool.await_completion()
        });
        match result {
            Err(CalculationError::WorkerFailed { reason, .. }) => {
                assert!(reason.contains("panicked"), "reason: {reason}");
            }
            other => panic!("expected worker failure, got {other:?}"),
        }

        let stats = pool.stats().unwrap();
        assert_eq!(stats.in_flight, 0);
        assert_eq!(stats.busy, 0);
        assert_eq!(stats.idle, 2);
        assert_eq!(stats.total_dispatched, 2);
        // The healthy sibling still published its sum
        assert_eq!(stats.running_sum, 2);
    }

    #[test]
    fn test_zero_threads_rejected() {
        let tree = Tree::generate(2);
        assert!(matches!(
            parallel_sum(&tree, 1, 0),
            Err(CalculationError::InvalidThreadCount(0))
        ));
    }
}
