//! benchmark: false sharing between neighbouring mutexes
//!
//! every thread hammers bit 0 of its *own* mutex, so there is no logical
//! contention at all. with plain `BitMutex`es packed next to each other the
//! words share cache lines and the line ping-pongs between cores; padded
//! layouts keep each word on a private line.
//!
//! run with: cargo run --release --example bench_false_sharing
//! knobs: BITMUX_THREADS (default 8), BITMUX_ITERATIONS (ops per thread, default 10000)

use bitmux_sync::{BitMutex, CachePadded, PaddedBitMutex, StressConfig, CACHE_LINE_SIZE};
use log::info;
use std::hint::black_box;
use std::mem::size_of;
use std::thread;
use std::time::{Duration, Instant};

const ROUNDS: usize = 15;

/// each thread locks/unlocks bit 0 of `locks[t]` `ops` times; median of ROUNDS
fn run<M: Sync>(locks: &[M], ops: u64, lock: impl Fn(&M) + Sync, unlock: impl Fn(&M) + Sync) -> Duration {
    let (lock, unlock) = (&lock, &unlock);
    let mut samples: Vec<Duration> = (0..ROUNDS)
        .map(|_| {
            let start = Instant::now();
            thread::scope(|s| {
                for m in locks {
                    s.spawn(move || {
                        for _ in 0..ops {
                            lock(black_box(m));
                            unlock(m);
                        }
                    });
                }
            });
            start.elapsed()
        })
        .collect();
    samples.sort_unstable();
    samples[ROUNDS / 2]
}

fn print_row(name: &str, stride: usize, elapsed: Duration, total_ops: u64, baseline: Duration) {
    let ns_per_op = elapsed.as_nanos() as f64 / total_ops as f64;
    let ratio = elapsed.as_nanos() as f64 / baseline.as_nanos().max(1) as f64;
    println!(
        "  {:<28} stride {:>4} B  {:>8.2} ns/op  {:.2}x",
        name, stride, ns_per_op, ratio
    );
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
    let threads = config.threads;
    let ops = config.iterations;
    let total_ops = threads as u64 * ops;

    info!("false sharing: {} threads x {} ops, cache line {} B", threads, ops, CACHE_LINE_SIZE);

    println!("bitmux false sharing benchmark");
    println!("==============================");
    println!("threads: {}  ops/thread: {}  rounds: {}", threads, ops, ROUNDS);
    println!();

    let packed: Vec<BitMutex> = (0..threads).map(|_| BitMutex::new()).collect();
    let padded: Vec<PaddedBitMutex> = (0..threads).map(|_| PaddedBitMutex::new()).collect();
    let aligned: Vec<CachePadded<BitMutex>> =
        (0..threads).map(|_| CachePadded::new(BitMutex::new())).collect();

    let padded_time = run(&padded[..], ops, |m| m.lock(0), |m| m.unlock(0));
    let packed_time = run(&packed[..], ops, |m| m.lock(0), |m| m.unlock(0));
    let aligned_time = run(&aligned[..], ops, |m| m.lock(0), |m| m.unlock(0));

    print_row("PaddedBitMutex", size_of::<PaddedBitMutex>(), padded_time, total_ops, padded_time);
    print_row("CachePadded<BitMutex>", size_of::<CachePadded<BitMutex>>(), aligned_time, total_ops, padded_time);
    print_row("BitMutex (packed)", size_of::<BitMutex>(), packed_time, total_ops, padded_time);

    println!();
    println!("packed words per cache line: {}", CACHE_LINE_SIZE / size_of::<BitMutex>());
}
