//! Run report and consistency diagnostics
//!
//! Mismatches are not errors: they are collected and rendered as
//! `ERROR:` lines ahead of the timing summary.

use std::fmt;
use std::time::Duration;

use crate::CalculationConfig;

/// Wall-clock time of both traversals
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Timings {
    /// Sequential traversal
    pub sequential: Duration,
    /// Pool setup + parallel traversal + completion wait
    pub parallel: Duration,
}

impl Timings {
    /// Sequential time over parallel time (0 when nothing was measured)
    pub fn speedup(&self) -> f64 {
        let parallel = self.parallel.as_secs_f64();
        if parallel > 0.0 {
            self.sequential.as_secs_f64() / parallel
        } else {
            0.0
        }
    }
}

/// Consistency problem found after a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnostic {
    /// Sequential sum differs from n(n+1)/2
    SequentialMismatch {
        /// Sequential sum
        sum: u64,
        /// Closed-form expectation
        reference: u64,
    },
    /// Parallel sum differs from sequential sum
    ParallelMismatch {
        /// Sequential sum
        sequential: u64,
        /// Parallel sum
        parallel: u64,
    },
    /// Dispatched task count differs from 2^(L+1)
    TaskCountMismatch {
        /// Tasks actually dispatched
        observed: u64,
        /// Tasks expected for the tree shape
        expected: u64,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SequentialMismatch { sum, reference } => {
                write!(f, "sum {} != reference {}", sum, reference)
            }
            Self::ParallelMismatch {
                sequential,
                parallel,
            } => write!(f, "sum {} != parallel {}", sequential, parallel),
            // Expected count first, as in the reference report
            Self::TaskCountMismatch { observed, expected } => {
                write!(f, "ntasks {} != {}", expected, observed)
            }
        }
    }
}

/// Outcome of one sequential + parallel run
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationReport {
    /// Parameters of the run
    pub config: CalculationConfig,

    /// Nodes generated
    pub node_count: u64,

    /// n(n+1)/2 for the generated node count
    pub reference_sum: u64,

    /// Sum from the sequential traversal
    pub sequential_sum: u64,

    /// Sum from the parallel traversal
    pub parallel_sum: u64,

    /// Tasks the pool dispatched
    pub tasks_dispatched: u64,

    /// Tasks a correct run dispatches for this shape
    pub expected_tasks: u64,

    /// Measured times
    pub timings: Timings,

    /// Detected mismatches (empty when consistent)
    pub diagnostics: Vec<Diagnostic>,
}

impl CalculationReport {
    /// Compare the three sums and the task count
    pub fn check(&mut self) {
        self.diagnostics.clear();

        if self.sequential_sum != self.reference_sum {
            self.diagnostics.push(Diagnostic::SequentialMismatch {
                sum: self.sequential_sum,
                reference: self.reference_sum,
            });
        }
        if self.sequential_sum != self.parallel_sum {
            self.diagnostics.push(Diagnostic::ParallelMismatch {
                sequential: self.sequential_sum,
                parallel: self.parallel_sum,
            });
        }
        if self.tasks_dispatched != self.expected_tasks {
            self.diagnostics.push(Diagnostic::TaskCountMismatch {
                observed: self.tasks_dispatched,
                expected: self.expected_tasks,
            });
        }
    }

    /// No mismatch detected
    pub fn is_consistent(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// One-line timing summary
    pub fn summary(&self) -> String {
        format!(
            "tree height: {:2} sequential: {:.6} parallel with {:3} threads and {:6} tasks: {:.6}  speedup: {:.3} count: {}",
            self.config.height,
            self.timings.sequential.as_secs_f64(),
            self.config.thread_count,
            self.tasks_dispatched,
            self.timings.parallel.as_secs_f64(),
            self.timings.speedup(),
            self.reference_sum
        )
    }
}

impl fmt::Display for CalculationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for diagnostic in &self.diagnostics {
            writeln!(f, "ERROR: {}", diagnostic)?;
        }
        write!(f, "{}", self.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CalculationReport {
        CalculationReport {
            config: CalculationConfig::new(3, 1, 4),
            node_count: 15,
            reference_sum: 120,
            sequential_sum: 120,
            parallel_sum: 120,
            tasks_dispatched: 4,
            expected_tasks: 4,
            timings: Timings {
                sequential: Duration::from_millis(4),
                parallel: Duration::from_millis(2),
            },
            diagnostics: Vec::new(),
        }
    }

    #[test]
    fn test_consistent_report() {
        let mut report = sample();
        report.check();
        assert!(report.is_consistent());
        assert!(!report.to_string().contains("ERROR"));
    }

    #[test]
    fn test_mismatches_are_collected() {
        let mut report = CalculationReport {
            parallel_sum: 119,
            tasks_dispatched: 3,
            ..sample()
        };
        report.check();

        assert_eq!(
            report.diagnostics,
            vec![
                Diagnostic::ParallelMismatch {
                    sequential: 120,
                    parallel: 119
                },
                Diagnostic::TaskCountMismatch {
                    observed: 3,
                    expected: 4
                },
            ]
        );

        let rendered = report.to_string();
        assert!(rendered.starts_with("ERROR: sum 120 != parallel 119\nERROR: ntasks 4 != 3\n"));
    }

    #[test]
    fn test_summary_format() {
        let report = sample();
        assert_eq!(
            report.summary(),
            "tree height:  3 sequential: 0.004000 parallel with   4 threads and      4 tasks: 0.002000  speedup: 2.000 count: 120"
        );
    }

    #[test]
    fn test_speedup_without_measurement() {
        assert_eq!(Timings::default().speedup(), 0.0);
    }
}
