//! index bounds shared by the mutex family.

use crate::error::{Error, Result};

/// locks packed into one word (bits of a `u64`).
pub const BITS_PER_WORD: usize = u64::BITS as usize;

/// number of padded words inside a [`ShardedBitMutex`](crate::ShardedBitMutex).
pub const SHARD_COUNT: usize = 8;

/// index range of a [`ShardedBitMutex`](crate::ShardedBitMutex).
pub const SHARDED_CAPACITY: usize = SHARD_COUNT * BITS_PER_WORD;

/// validate `index < limit` without panicking.
///
/// for callers that compute indices from external input and want to reject
/// them before touching a mutex.
///
/// ```
/// use bitmux_sync::{check_index, BITS_PER_WORD};
///
/// assert!(check_index("BitMutex", 63, BITS_PER_WORD).is_ok());
/// assert!(check_index("BitMutex", 64, BITS_PER_WORD).is_err());
/// ```
#[inline]
pub fn check_index(kind: &'static str, index: usize, limit: usize) -> Result<()> {
    if index < limit {
        Ok(())
    } else {
        Err(Error::IndexOutOfRange { kind, index, limit })
    }
}

/// fail fast on an out-of-range index, reporting the caller's location.
#[inline(always)]
#[track_caller]
pub(crate) fn assert_index(kind: &'static str, index: usize, limit: usize) {
    if index >= limit {
        out_of_range(kind, index, limit);
    }
}

#[cold]
#[inline(never)]
#[track_caller]
fn out_of_range(kind: &'static str, index: usize, limit: usize) -> ! {
    panic!("{}", Error::IndexOutOfRange { kind, index, limit })
}

/// single-bit mask for a bit index already known to be `< 64`.
#[inline(always)]
pub(crate) const fn bit_mask(bit: usize) -> u64 {
    1u64 << bit
}
