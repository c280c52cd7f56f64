//! ShardedBitMutex: 512 locks spread over 8 cache-line isolated words.
//!
//! # index mapping
//!
//! logical index `i` lives in shard `i % 8` at bit `i / 8`:
//!
//! ```text
//! i      0  1  2 ... 7  8  9 ... 15  16 ... 511
//! shard  0  1  2 ... 7  0  1 ...  7   0 ...   7
//! bit    0  0  0 ... 0  1  1 ...  1   2 ...  63
//! ```
//!
//! consecutive indices go round-robin across shards, so callers working on
//! neighbouring resources (adjacent hash buckets, slots) hit different words
//! and different cache lines. grouping 64-at-a-time (`i / 64`, `i % 64`) would
//! put all of them on one word.
//!
//! # trade-off
//!
//! sharding is static. indices that collide mod 8 (0, 8, 16, ...) share a word
//! and contend exactly like a plain [`BitMutex`](crate::BitMutex); a workload
//! concentrated on one residue class gains nothing and pays the extra index
//! arithmetic. there is no rebalancing.

use crate::index::{assert_index, SHARDED_CAPACITY, SHARD_COUNT};
use crate::padded::PaddedBitMutex;

/// map a logical index to `(shard, bit)`.
///
/// defined for every `i`; callers bounds-check against
/// [`SHARDED_CAPACITY`] first, which keeps `shard < 8` and `bit < 64`.
///
/// ```
/// use bitmux_sync::split_index;
///
/// assert_eq!(split_index(9), (1, 1));
/// assert_eq!(split_index(511), (7, 63));
/// ```
#[inline(always)]
pub const fn split_index(i: usize) -> (usize, usize) {
    (i % SHARD_COUNT, i / SHARD_COUNT)
}

/// 512 spin locks in 8 padded shards.
///
/// ```
/// use bitmux_sync::ShardedBitMutex;
///
/// let mutex = ShardedBitMutex::new();
///
/// mutex.lock(0);
/// assert!(!mutex.try_lock(0));
///
/// // same shard as 0, different bit
/// mutex.lock(8);
///
/// mutex.unlock(0);
/// assert!(mutex.try_lock(0));
/// assert!(!mutex.try_lock(8));
///
/// mutex.unlock(0);
/// mutex.unlock(8);
/// ```
#[derive(Default)]
pub struct ShardedBitMutex {
    shards: [PaddedBitMutex; SHARD_COUNT],
}

impl ShardedBitMutex {
    pub(crate) const NAME: &'static str = "ShardedBitMutex";

    /// number of independent locks.
    pub const CAPACITY: usize = SHARDED_CAPACITY;

    #[inline]
    pub const fn new() -> Self {
        Self {
            shards: [const { PaddedBitMutex::new() }; SHARD_COUNT],
        }
    }

    /// acquire lock `i`, yielding while it is held.
    ///
    /// # panics
    ///
    /// if `i >= 512`.
    #[inline]
    #[track_caller]
    pub fn lock(&self, i: usize) {
        assert_index(Self::NAME, i, Self::CAPACITY);
        let (shard, bit) = split_index(i);
        self.shards[shard].word().lock_bit(bit);
    }

    /// release lock `i`. the caller must hold it.
    ///
    /// # panics
    ///
    /// if `i >= 512`.
    #[inline]
    #[track_caller]
    pub fn unlock(&self, i: usize) {
        assert_index(Self::NAME, i, Self::CAPACITY);
        let (shard, bit) = split_index(i);
        self.shards[shard].word().unlock_bit(bit);
    }

    /// one CAS attempt at lock `i`.
    ///
    /// # panics
    ///
    /// if `i >= 512`.
    #[inline]
    #[track_caller]
    pub fn try_lock(&self, i: usize) -> bool {
        assert_index(Self::NAME, i, Self::CAPACITY);
        let (shard, bit) = split_index(i);
        self.shards[shard].word().try_lock_bit(bit)
    }

    #[inline]
    #[track_caller]
    pub fn is_locked(&self, i: usize) -> bool {
        assert_index(Self::NAME, i, Self::CAPACITY);
        let (shard, bit) = split_index(i);
        self.shards[shard].word().is_bit_locked(bit)
    }

    /// relaxed snapshot of shard `shard`'s word.
    ///
    /// # panics
    ///
    /// if `shard >= 8`.
    #[inline]
    #[track_caller]
    pub fn shard_bits(&self, shard: usize) -> u64 {
        assert_index(Self::NAME, shard, SHARD_COUNT);
        self.shards[shard].bits()
    }
}

impl std::fmt::Debug for ShardedBitMutex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut list = f.debug_list();
        for shard in &self.shards {
            list.entry(&format_args!("{:#018x}", shard.bits()));
        }
        list.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, UnwindSafe};
    use std::sync::Arc;
    use std::thread;

    fn panics<F: FnOnce() + UnwindSafe>(f: F) -> bool {
        catch_unwind(f).is_err()
    }

    #[test]
    fn test_split_index_table() {
        let cases = [
            (0, (0, 0)),
            (1, (1, 0)),
            (2, (2, 0)),
            (7, (7, 0)),
            (8, (0, 1)),
            (9, (1, 1)),
            (15, (7, 1)),
            (500, (4, 62)),
            (511, (7, 63)),
        ];
        for (i, expected) in cases {
            assert_eq!(split_index(i), expected, "split_index({i})");
        }
    }

    #[test]
    fn test_split_index_law() {
        let mut seen = [[false; 64]; SHARD_COUNT];
        for i in 0..SHARDED_CAPACITY {
            let (shard, bit) = split_index(i);
            assert_eq!((shard, bit), (i % 8, i / 8));
            assert!(shard < SHARD_COUNT && bit < 64);
            assert!(!seen[shard][bit], "{i} collides");
            seen[shard][bit] = true;
        }
    }

    #[test]
    fn test_boundaries() {
        let m = ShardedBitMutex::new();

        for i in [0, 256, 511] {
            m.lock(i);
            assert!(!m.try_lock(i));
            m.unlock(i);
        }
        for shard in 0..SHARD_COUNT {
            assert_eq!(m.shard_bits(shard), 0);
        }
    }

    #[test]
    fn test_lock_lands_in_mapped_shard() {
        let m = ShardedBitMutex::new();

        m.lock(500);
        assert_eq!(m.shard_bits(4), 1 << 62);
        for shard in (0..SHARD_COUNT).filter(|&s| s != 4) {
            assert_eq!(m.shard_bits(shard), 0);
        }
        m.unlock(500);
    }

    #[test]
    fn test_every_pair_independent() {
        let m = ShardedBitMutex::new();

        for i in 0..SHARDED_CAPACITY {
            m.lock(i);
            for j in (0..SHARDED_CAPACITY).filter(|&j| j != i) {
                assert!(m.try_lock(j), "{j} blocked while {i} held");
                m.unlock(j);
            }
            m.unlock(i);
        }
        for shard in 0..SHARD_COUNT {
            assert_eq!(m.shard_bits(shard), 0);
        }
    }

    #[test]
    fn test_end_to_end() {
        let m = ShardedBitMutex::new();

        m.lock(0);
        assert!(!m.try_lock(0));

        m.lock(8);
        assert!(m.is_locked(8));

        m.unlock(0);
        assert!(m.try_lock(0));
        assert!(!m.try_lock(8));

        m.unlock(8);
        assert!(m.try_lock(8));

        m.unlock(0);
        m.unlock(8);
    }

    #[test]
    fn test_try_lock_stride() {
        let m = ShardedBitMutex::default();

        for i in (0..50).step_by(5) {
            assert!(m.try_lock(i));
            assert!(!m.try_lock(i));
            m.unlock(i);
            assert!(m.try_lock(i));
            m.unlock(i);
        }
    }

    #[test]
    fn test_out_of_range_panics() {
        let m = ShardedBitMutex::new();
        for i in [512, 1000, usize::MAX] {
            assert!(panics(|| m.lock(i)), "lock({i})");
            assert!(panics(|| m.unlock(i)), "unlock({i})");
            assert!(panics(|| {
                m.try_lock(i);
            }), "try_lock({i})");
        }
    }

    #[test]
    #[should_panic(expected = "ShardedBitMutex: index 512 out of range (limit 512)")]
    fn test_panic_message() {
        ShardedBitMutex::new().try_lock(512);
    }

    #[test]
    #[should_panic(expected = "ShardedBitMutex: index 8 out of range (limit 8)")]
    fn test_shard_bits_out_of_range() {
        ShardedBitMutex::new().shard_bits(SHARD_COUNT);
    }

    #[test]
    fn test_size_is_eight_padded_words() {
        assert_eq!(
            std::mem::size_of::<ShardedBitMutex>(),
            SHARD_COUNT * std::mem::size_of::<PaddedBitMutex>()
        );
    }

    #[test]
    fn test_concurrent_consecutive_indices() {
        let m = Arc::new(ShardedBitMutex::new());

        let handles: Vec<_> = (0..16)
            .map(|idx| {
                let m = Arc::clone(&m);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        m.lock(idx);
                        m.unlock(idx);
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        for i in 0..16 {
            assert!(m.try_lock(i));
            m.unlock(i);
        }
    }

    #[test]
    fn test_concurrent_same_shard() {
        let m = Arc::new(ShardedBitMutex::new());

        let handles: Vec<_> = [0, 8, 16, 24, 32, 40, 48, 56]
            .into_iter()
            .map(|idx| {
                let m = Arc::clone(&m);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        m.lock(idx);
                        m.unlock(idx);
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(m.shard_bits(0), 0);
    }

    #[test]
    fn test_debug_lists_shards() {
        let m = ShardedBitMutex::new();
        m.lock(1);
        let debug = format!("{:?}", m);
        assert_eq!(debug.matches("0x").count(), SHARD_COUNT);
        assert!(debug.contains("0x0000000000000001"));
        m.unlock(1);
    }
}
