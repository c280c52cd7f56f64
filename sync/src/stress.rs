//! mutual-exclusion stress harness for any [`IndexedLock`].
//!
//! every worker repeatedly locks the same index and bumps a shared counter
//! with a deliberately non-atomic read / spin / write. if two workers were
//! ever inside together, increments are lost and the final count comes up
//! short.
//!
//! # example
//!
//! ```
//! use bitmux_sync::{stress, ShardedBitMutex, StressConfig};
//!
//! let mutex = ShardedBitMutex::new();
//! let config = StressConfig::new().with_threads(4).with_iterations(1_000).with_index(9);
//!
//! let report = stress::run(&mutex, &config).unwrap();
//! assert_eq!(report.counter, 4_000);
//! ```

use crate::config::StressConfig;
use crate::error::{Error, Result};
use crate::guard::IndexedLock;
use crate::index::check_index;
use bitmux_cpu::CachePadded;
use log::{debug, info, warn};
use std::cell::UnsafeCell;
use std::hint;
use std::ptr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// outcome of a successful stress run.
#[derive(Debug, Clone)]
pub struct StressReport {
    pub threads: usize,
    /// acquisitions per worker, in spawn order. no fairness is promised, so
    /// these only sum to `acquisitions`; they need not be equal mid-run.
    pub per_worker: Vec<u64>,
    pub acquisitions: u64,
    /// final value of the unsynchronised shared counter.
    pub counter: u64,
    pub elapsed: Duration,
}

impl StressReport {
    /// wall-clock nanoseconds per acquisition across all workers.
    pub fn ns_per_op(&self) -> f64 {
        if self.acquisitions == 0 {
            return 0.0;
        }
        self.elapsed.as_nanos() as f64 / self.acquisitions as f64
    }
}

// counter only the lock holder may touch
struct RacyCounter(UnsafeCell<u64>);

// safety: every access happens under the lock being tested; a broken lock
// shows up as lost increments
unsafe impl Sync for RacyCounter {}

impl RacyCounter {
    fn new() -> Self {
        Self(UnsafeCell::new(0))
    }

    // safety: caller holds the lock guarding this counter
    #[inline]
    unsafe fn bump(&self, hold_spins: u32) {
        let slot = self.0.get();
        let value = unsafe { ptr::read_volatile(slot) };
        for _ in 0..hold_spins {
            hint::spin_loop();
        }
        unsafe { ptr::write_volatile(slot, value + 1) };
    }

    fn into_inner(self) -> u64 {
        self.0.into_inner()
    }
}

/// run the stress workload against `lock`.
///
/// fails with [`Error::InvalidConfig`] or [`Error::IndexOutOfRange`] before
/// spawning anything, [`Error::WorkerPanicked`] if a worker panics, and
/// [`Error::ExclusionViolated`] if increments were lost.
pub fn run<L: IndexedLock>(lock: &L, config: &StressConfig) -> Result<StressReport> {
    config.validate()?;
    check_index(L::NAME, config.index, L::CAPACITY)?;

    debug!(
        "stress {}: threads={} iterations={} index={} hold_spins={}",
        L::NAME,
        config.threads,
        config.iterations,
        config.index,
        config.hold_spins
    );

    let counter = RacyCounter::new();
    let slots: Vec<CachePadded<AtomicU64>> = (0..config.threads)
        .map(|_| CachePadded::new(AtomicU64::new(0)))
        .collect();

    let start = Instant::now();
    let panicked = thread::scope(|s| {
        let counter = &counter;
        let handles: Vec<_> = slots
            .iter()
            .map(|slot| {
                s.spawn(move || {
                    for _ in 0..config.iterations {
                        let _guard = lock.guard(config.index);
                        // safety: `_guard` holds `config.index`
                        unsafe { counter.bump(config.hold_spins) };
                        slot.fetch_add(1, Ordering::Relaxed);
                    }
                })
            })
            .collect();

        handles
            .into_iter()
            .enumerate()
            .filter_map(|(worker, handle)| handle.join().err().map(|_| worker))
            .min()
    });
    let elapsed = start.elapsed();

    if let Some(worker) = panicked {
        warn!("stress {}: worker {} panicked", L::NAME, worker);
        return Err(Error::WorkerPanicked { worker });
    }

    let per_worker: Vec<u64> = slots.iter().map(|slot| slot.load(Ordering::Relaxed)).collect();
    let acquisitions = per_worker.iter().sum();
    let counter = counter.into_inner();
    let expected = config.total_iterations();

    if counter != expected {
        warn!(
            "stress {}: lost updates, expected {} observed {}",
            L::NAME,
            expected,
            counter
        );
        return Err(Error::ExclusionViolated {
            expected,
            observed: counter,
        });
    }

    let report = StressReport {
        threads: config.threads,
        per_worker,
        acquisitions,
        counter,
        elapsed,
    };

    info!(
        "stress {}: {} acquisitions in {:?} ({:.1} ns/op)",
        L::NAME,
        report.acquisitions,
        report.elapsed,
        report.ns_per_op()
    );

    Ok(report)
}
