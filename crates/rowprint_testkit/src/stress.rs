//! Stress tests for the optimistic record store.
//!
//! Many threads run read-modify-write cycles against a few hot rows. With
//! fingerprint checks in place no update is lost: the final stock of every
//! product equals the number of increments that reported success.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use rowprint_core::{RecordKey, RecordStore, WriteOutcome};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total write cycles attempted.
    pub total_ops: usize,
    /// Cycles whose write was applied.
    pub applied_ops: usize,
    /// Cycles that ran out of attempts on conflicts.
    pub conflicted_ops: usize,
    /// Cycles that failed with an error.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(applied: usize, conflicted: usize, failed: usize, duration: Duration) -> Self {
        let total = applied + conflicted + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            applied_ops: applied,
            conflicted_ops: conflicted,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total operations: {}", self.total_ops);
        println!("Applied: {}", self.applied_ops);
        println!("Conflicted: {}", self.conflicted_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of write cycles to perform across all threads.
    pub operations: usize,
    /// Number of concurrent threads.
    pub threads: usize,
    /// Number of distinct rows contended for. Keys are `1..=rows`.
    pub rows: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 2_000,
            threads: 4,
            rows: 4,
        }
    }
}

/// Increments `UnitsInStock` of product rows from many threads at once.
///
/// Each cycle loads a row, adds one to its stock and writes it back through
/// [`RecordStore::modify`]. Threads start together and pick rows round-robin,
/// so conflicts are frequent.
pub fn stress_concurrent_increments(store: &RecordStore, config: &StressConfig) -> StressTestResult {
    let applied = AtomicUsize::new(0);
    let conflicted = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let ops_per_thread = config.operations / config.threads.max(1);
    let rows = config.rows.max(1);

    let start = Instant::now();

    thread::scope(|scope| {
        for t in 0..config.threads {
            let (applied, conflicted, failed) = (&applied, &conflicted, &failed);
            scope.spawn(move || {
                for i in 0..ops_per_thread {
                    let id = ((t + i) % rows + 1) as i64;
                    let outcome = store.modify(&RecordKey::from(id), |loaded| {
                        let stock = loaded
                            .snapshot()
                            .get("UnitsInStock")
                            .and_then(|v| v.as_integer())
                            .unwrap_or_default();
                        loaded
                            .snapshot()
                            .with_value("UnitsInStock", stock + 1)
                            .ok_or_else(|| {
                                rowprint_core::CoreError::invalid_operation("no UnitsInStock")
                            })
                    });
                    let counter = match outcome {
                        Ok(WriteOutcome::Conflict(_)) => conflicted,
                        Ok(_) => applied,
                        Err(_) => failed,
                    };
                    counter.fetch_add(1, Ordering::Relaxed);
                }
            });
        }
    });

    StressTestResult::new(
        applied.load(Ordering::Relaxed),
        conflicted.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Sum of `UnitsInStock` over every row in the store.
pub fn total_stock(store: &RecordStore) -> i64 {
    store
        .keys()
        .iter()
        .filter_map(|key| store.load(key).ok())
        .filter_map(|loaded| loaded.snapshot().get("UnitsInStock").and_then(|v| v.as_integer()))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::product_store;
    use rowprint_core::Config;

    #[test]
    fn test_no_lost_updates() {
        let store = product_store(4, Config::new().max_write_attempts(1_000)).unwrap();
        let config = StressConfig {
            operations: 800,
            threads: 4,
            rows: 4,
        };

        let result = stress_concurrent_increments(&store, &config);
        assert_eq!(result.failed_ops, 0);
        assert_eq!(result.total_ops, 800);
        assert_eq!(total_stock(&store), result.applied_ops as i64);
    }

    #[test]
    fn test_single_attempt_may_conflict_but_never_loses() {
        let store = product_store(1, Config::new().max_write_attempts(1)).unwrap();
        let config = StressConfig {
            operations: 400,
            threads: 4,
            rows: 1,
        };

        let result = stress_concurrent_increments(&store, &config);
        assert_eq!(result.failed_ops, 0);
        assert_eq!(result.applied_ops + result.conflicted_ops, 400);
        assert_eq!(total_stock(&store), result.applied_ops as i64);
    }
}
