//! Full integration tests

use treecalc::*;
use test_helpers::*;

#[test]
fn test_end_to_end_report() {
    let report = run(3, 1, 4);

    assert!(report.is_consistent(), "unexpected diagnostics: {:?}", report.diagnostics);
    assert_eq!(report.config, CalculationConfig::new(3, 1, 4));
    assert_eq!(report.expected_tasks, 4);

    let rendered = report.to_string();
    assert!(!rendered.contains("ERROR"));
    assert!(rendered.starts_with("tree height:  3 sequential: "));
    assert!(rendered.contains("parallel with   4 threads and      4 tasks: "));
    assert!(rendered.ends_with("count: 120"));
}

#[test]
fn test_single_node_run() {
    let report = run(0, 0, 1);
    assert_eq!(report.sequential_sum, 1);
    assert_eq!(report.parallel_sum, 1);
    assert_eq!(report.tasks_dispatched, 0);
    assert!(report.is_consistent());
}

#[test]
fn test_large_tree_small_pool() {
    let report = run(16, 8, 2);
    assert_eq!(report.tasks_dispatched, 512);
    assert_eq!(report.parallel_sum, report.reference_sum);
    assert!(report.timings.parallel > std::time::Duration::ZERO);
}

#[test]
fn test_invalid_configurations() {
    let zero_threads = TreeCalculation::new(CalculationConfig::new(4, 1, 0)).run();
    assert!(matches!(zero_threads, Err(CalculationError::InvalidThreadCount(0))));

    let too_tall = TreeCalculation::new(CalculationConfig::new(40, 1, 2)).run();
    match too_tall {
        Err(err @ CalculationError::HeightTooLarge { .. }) => {
            assert_eq!(err.to_string(), "Tree height 40 exceeds maximum 31");
        }
        other => panic!("expected height error, got {:?}", other.map(|r| r.parallel_sum)),
    }
}
