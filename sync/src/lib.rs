//! bit-packed spin mutexes.
//!
//! many independent locks packed into one or a few machine words, so that
//! unrelated resources (buckets of a sharded cache, slots of a connection
//! table) can be locked separately without a full mutex per resource.
//!
//! # available primitives
//!
//! - [`BitMutex`]: 64 locks in one `AtomicU64`
//! - [`PaddedBitMutex`]: a `BitMutex` isolated on its own cache line
//! - [`ShardedBitMutex`]: 512 locks over 8 padded words, adjacent indices on
//!   different words
//!
//! all three are zero-initialised value types: no allocation, no teardown,
//! usable in a `static`. acquisition is CAS plus bounded exponential yield
//! backoff; there is no parking, fairness, reentrancy or poisoning. keep
//! critical sections short.
//!
//! an out-of-range index is a bug in the caller and panics immediately.
//!
//! # example
//!
//! ```
//! use bitmux_sync::ShardedBitMutex;
//!
//! static BUCKET_LOCKS: ShardedBitMutex = ShardedBitMutex::new();
//!
//! fn with_bucket<R>(hash: u64, f: impl FnOnce() -> R) -> R {
//!     let _guard = BUCKET_LOCKS.lock_guard((hash % 512) as usize);
//!     f()
//! }
//!
//! assert_eq!(with_bucket(1234, || 7), 7);
//! ```

#![warn(rust_2018_idioms)]

mod bit_mutex;
mod config;
mod error;
mod guard;
mod index;
mod padded;
mod sharded;
pub mod stress;

pub use bit_mutex::BitMutex;
pub use config::{StressConfig, ENV_HOLD_SPINS, ENV_INDEX, ENV_ITERATIONS, ENV_THREADS};
pub use error::{Error, Result};
pub use guard::{IndexGuard, IndexedLock};
pub use index::{check_index, BITS_PER_WORD, SHARDED_CAPACITY, SHARD_COUNT};
pub use padded::PaddedBitMutex;
pub use sharded::{split_index, ShardedBitMutex};
pub use stress::StressReport;

pub use bitmux_cpu::{CachePadded, CACHE_LINE_SIZE};
