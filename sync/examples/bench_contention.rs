//! benchmark: BitMutex vs PaddedBitMutex vs ShardedBitMutex under contention
//!
//! covers single-threaded cost, same-bit and different-bit contention, the
//! sharded index mapping (consecutive indices, one shard, spread shards),
//! try_lock success under heavy occupancy and localized access patterns.
//!
//! run with: cargo run --release --example bench_contention
//! knobs: BITMUX_THREADS (default 8), BITMUX_ITERATIONS (ops per round, default 10000)

use bitmux_sync::{stress, BitMutex, IndexedLock, PaddedBitMutex, ShardedBitMutex, StressConfig};
use std::hint::black_box;
use std::thread;
use std::time::{Duration, Instant};

/// timed rounds per scenario, median reported
const ROUNDS: usize = 25;
const WARMUP_ROUNDS: usize = 3;

struct Bench {
    threads: usize,
    ops: usize,
}

impl Bench {
    /// median wall time of `ROUNDS` runs of `f`
    fn measure(&self, mut f: impl FnMut() -> Duration) -> Duration {
        for _ in 0..WARMUP_ROUNDS {
            black_box(f());
        }
        let mut samples: Vec<Duration> = (0..ROUNDS).map(|_| f()).collect();
        samples.sort_unstable();
        samples[ROUNDS / 2]
    }

    fn report(&self, name: &str, elapsed: Duration) {
        let ns_per_op = elapsed.as_nanos() as f64 / self.ops as f64;
        println!("  {:<44} {:>10.2} ns/op  ({:>9} ns/round)", name, ns_per_op, elapsed.as_nanos());
    }

    /// `ops` lock/unlock pairs on one thread, index chosen by `pick(op)`
    fn single<L: IndexedLock>(&self, lock: &L, pick: impl Fn(usize) -> usize) -> Duration {
        let start = Instant::now();
        for j in 0..self.ops {
            let i = pick(j);
            black_box(lock).lock(i);
            black_box(lock).unlock(i);
        }
        start.elapsed()
    }

    /// `ops` lock/unlock pairs split across `threads`, index chosen by `pick(thread, op)`
    fn concurrent<L: IndexedLock>(
        &self,
        lock: &L,
        pick: impl Fn(usize, usize) -> usize + Sync,
    ) -> Duration {
        let per_thread = self.ops / self.threads;
        let pick = &pick;
        let start = Instant::now();
        thread::scope(|s| {
            for t in 0..self.threads {
                s.spawn(move || {
                    for j in 0..per_thread {
                        let i = pick(t, j);
                        lock.lock(i);
                        lock.unlock(i);
                    }
                });
            }
        });
        start.elapsed()
    }
}

/// fraction of try_lock probes that succeed; `probe(op)` picks the index
fn try_lock_success<L: IndexedLock>(lock: &L, probes: usize, probe: impl Fn(usize) -> usize) -> f64 {
    let mut success = 0usize;
    for j in 0..probes {
        let i = probe(j);
        if black_box(lock).try_lock(i) {
            success += 1;
            lock.unlock(i);
        }
    }
    success as f64 / probes as f64 * 100.0
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match StressConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("config error: {}", e);
            std::process::exit(1);
        }
    };

    let bench = Bench {
        threads: config.threads,
        ops: config.iterations as usize,
    };
    let threads = bench.threads;

    println!("bitmux contention benchmark");
    println!("===========================");
    println!("threads: {}  ops/round: {}  rounds: {}", threads, bench.ops, ROUNDS);

    println!("\n--- single thread ---");
    let m = BitMutex::new();
    bench.report("BitMutex lock/unlock (j % 64)", bench.measure(|| bench.single(&m, |j| j % 64)));

    let elapsed = bench.measure(|| {
        let start = Instant::now();
        for j in 0..bench.ops {
            if black_box(&m).try_lock(j % 64) {
                m.unlock(j % 64);
            }
        }
        start.elapsed()
    });
    bench.report("BitMutex try_lock/unlock (j % 64)", elapsed);

    let p = PaddedBitMutex::new();
    bench.report("PaddedBitMutex lock/unlock (j % 64)", bench.measure(|| bench.single(&p, |j| j % 64)));

    let s = ShardedBitMutex::new();
    bench.report("ShardedBitMutex lock/unlock (j % 512)", bench.measure(|| bench.single(&s, |j| j % 512)));

    println!("\n--- BitMutex / PaddedBitMutex, {} threads ---", threads);
    bench.report("BitMutex same bit (5)", bench.measure(|| bench.concurrent(&m, |_, _| 5)));
    bench.report(
        "BitMutex different bits (t * 8)",
        bench.measure(|| bench.concurrent(&m, |t, _| (t * 8) % 64)),
    );
    bench.report("PaddedBitMutex same bit (10)", bench.measure(|| bench.concurrent(&p, |_, _| 10)));

    println!("\n--- ShardedBitMutex, {} threads ---", threads);
    bench.report(
        "consecutive indices (t * 10 + j)",
        bench.measure(|| bench.concurrent(&s, |t, j| (t * 10 + j) % 512)),
    );
    bench.report(
        "same shard (t * 8, all shard 0)",
        bench.measure(|| bench.concurrent(&s, |t, _| (t * 8) % 512)),
    );
    bench.report(
        "different shards (t, bit 0 of shard t)",
        bench.measure(|| bench.concurrent(&s, |t, _| t % 512)),
    );

    println!("\n--- same bit (7), BitMutex vs ShardedBitMutex ---");
    bench.report("BitMutex", bench.measure(|| bench.concurrent(&m, |_, _| 7)));
    bench.report("ShardedBitMutex", bench.measure(|| bench.concurrent(&s, |_, _| 7)));

    println!("\n--- localized access ---");
    bench.report(
        "BitMutex (t * 8 + j % 8)",
        bench.measure(|| bench.concurrent(&m, |t, j| (t * 8 + j % 8) % 64)),
    );
    bench.report(
        "ShardedBitMutex (t * 64 + j % 64)",
        bench.measure(|| bench.concurrent(&s, |t, j| (t * 64 + j % 64) % 512)),
    );

    println!("\n--- try_lock success under occupancy ---");
    let busy = BitMutex::new();
    for i in 0..32 {
        busy.lock(i * 2);
    }
    let rate = try_lock_success(&busy, bench.ops, |j| (j * 3 + 1) % 64);
    println!("  {:<44} {:>9.2} %success", "BitMutex, even bits held", rate);

    let busy = ShardedBitMutex::new();
    for i in 0..128 {
        busy.lock(i * 4);
    }
    let rate = try_lock_success(&busy, bench.ops, |j| (j * 5 + 1) % 512);
    println!("  {:<44} {:>9.2} %success", "ShardedBitMutex, every 4th held", rate);

    println!("\n--- exclusion check ---");
    match stress::run(&s, &config) {
        Ok(report) => println!(
            "  {:<44} {:>10.2} ns/op  (counter {} OK)",
            "ShardedBitMutex stress",
            report.ns_per_op(),
            report.counter
        ),
        Err(e) => {
            eprintln!("stress failed: {}", e);
            std::process::exit(1);
        }
    }
}
