//! BitMutex packs 64 independent spin locks into one `u64`.
//!
//! bit `i` set means resource `i` is held. all state changes are atomic
//! read-modify-writes on the word, so unrelated indices never block each other
//! beyond the cost of sharing a cache line.
//!
//! # characteristics
//!
//! - **no owner**: unlocking a bit the caller does not hold is a contract
//!   violation the type cannot detect
//! - **no fairness**: first successful CAS wins, waiters are unordered
//! - **no parking**: contended `lock` yields with bounded exponential backoff
//! - **fail fast**: any index `>= 64` panics
//!
//! # example
//!
//! ```
//! use bitmux_sync::BitMutex;
//!
//! let mutex = BitMutex::new();
//!
//! mutex.lock(5);
//! assert!(!mutex.try_lock(5));
//! assert!(mutex.try_lock(10));
//!
//! mutex.unlock(5);
//! mutex.unlock(10);
//! assert_eq!(mutex.bits(), 0);
//! ```

use crate::index::{assert_index, bit_mask, BITS_PER_WORD};
use bitmux_cpu::Backoff;
use std::sync::atomic::{AtomicU64, Ordering};

/// 64 spin locks in one atomic word.
///
/// zero-initialised means everything unlocked, so `BitMutex::new()`,
/// `BitMutex::default()` and a `static` all work without setup.
#[derive(Default)]
#[repr(transparent)]
pub struct BitMutex {
    word: AtomicU64,
}

impl BitMutex {
    pub(crate) const NAME: &'static str = "BitMutex";

    /// number of independent locks.
    pub const CAPACITY: usize = BITS_PER_WORD;

    /// create a mutex with every bit unlocked.
    #[inline]
    pub const fn new() -> Self {
        Self {
            word: AtomicU64::new(0),
        }
    }

    /// acquire lock `i`, yielding while another caller holds it.
    ///
    /// retries until it wins; there is no timeout. callers that need one can
    /// poll [`try_lock`](Self::try_lock) under their own deadline.
    ///
    /// # panics
    ///
    /// if `i >= 64`.
    #[inline]
    #[track_caller]
    pub fn lock(&self, i: usize) {
        assert_index(Self::NAME, i, Self::CAPACITY);
        self.lock_bit(i);
    }

    /// release lock `i`.
    ///
    /// the caller must hold `i`. releasing an unheld bit leaves the word
    /// unchanged but is not a supported use.
    ///
    /// # panics
    ///
    /// if `i >= 64`.
    #[inline]
    #[track_caller]
    pub fn unlock(&self, i: usize) {
        assert_index(Self::NAME, i, Self::CAPACITY);
        self.unlock_bit(i);
    }

    /// try to acquire lock `i` with a single CAS.
    ///
    /// returns `true` if the lock was taken, `false` if it was held or the word
    /// changed underneath the attempt. never yields and never retries.
    ///
    /// # panics
    ///
    /// if `i >= 64`.
    #[inline]
    #[track_caller]
    pub fn try_lock(&self, i: usize) -> bool {
        assert_index(Self::NAME, i, Self::CAPACITY);
        self.try_lock_bit(i)
    }

    /// relaxed snapshot of lock `i`. diagnostic only, may be stale on return.
    ///
    /// # panics
    ///
    /// if `i >= 64`.
    #[inline]
    #[track_caller]
    pub fn is_locked(&self, i: usize) -> bool {
        assert_index(Self::NAME, i, Self::CAPACITY);
        self.is_bit_locked(i)
    }

    /// relaxed snapshot of the whole word.
    #[inline]
    pub fn bits(&self) -> u64 {
        self.word.load(Ordering::Relaxed)
    }

    // unchecked paths, `bit < 64` is the caller's obligation

    pub(crate) fn lock_bit(&self, bit: usize) {
        let mask = bit_mask(bit);
        let mut backoff = Backoff::new();

        loop {
            let old = self.word.load(Ordering::Relaxed);

            if old & mask != 0 {
                backoff.snooze();
                continue;
            }

            // failure (other bits moved, or spurious) holds nothing: reload
            if self
                .word
                .compare_exchange_weak(old, old | mask, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return;
            }
        }
    }

    #[inline(always)]
    pub(crate) fn unlock_bit(&self, bit: usize) {
        self.word.fetch_and(!bit_mask(bit), Ordering::Release);
    }

    #[inline(always)]
    pub(crate) fn try_lock_bit(&self, bit: usize) -> bool {
        let mask = bit_mask(bit);
        let old = self.word.load(Ordering::Relaxed);
        if old & mask != 0 {
            return false;
        }
        self.word
            .compare_exchange(old, old | mask, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    #[inline(always)]
    pub(crate) fn is_bit_locked(&self, bit: usize) -> bool {
        self.bits() & bit_mask(bit) != 0
    }
}

impl std::fmt::Debug for BitMutex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitMutex")
            .field("bits", &format_args!("{:#018x}", self.bits()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, UnwindSafe};
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::thread;

    fn panics<F: FnOnce() + UnwindSafe>(f: F) -> bool {
        catch_unwind(f).is_err()
    }

    #[test]
    fn test_lock_unlock() {
        let m = BitMutex::new();

        m.lock(5);
        assert!(!m.try_lock(5));
        m.unlock(5);

        assert!(m.try_lock(5));
        m.unlock(5);
        assert_eq!(m.bits(), 0);
    }

    #[test]
    fn test_independent_bits() {
        let m = BitMutex::new();

        m.lock(3);
        assert!(m.try_lock(10));
        assert_eq!(m.bits(), (1 << 3) | (1 << 10));

        m.unlock(3);
        m.unlock(10);

        assert!(m.try_lock(3));
        assert!(m.try_lock(10));
        m.unlock(3);
        m.unlock(10);
    }

    #[test]
    fn test_boundary_bits() {
        let m = BitMutex::new();

        m.lock(0);
        assert!(!m.try_lock(0));
        m.unlock(0);

        m.lock(63);
        assert!(!m.try_lock(63));
        assert!(m.is_locked(63));
        m.unlock(63);

        assert!(m.try_lock(0));
        assert!(m.try_lock(63));
        m.unlock(0);
        m.unlock(63);
    }

    #[test]
    fn test_try_lock_round_trip() {
        let m = BitMutex::default();

        assert!(m.try_lock(20));
        assert!(!m.try_lock(20));
        m.unlock(20);
        assert!(m.try_lock(20));
        m.unlock(20);
    }

    #[test]
    fn test_mixed_lock_and_try_lock() {
        let m = BitMutex::new();

        m.lock(1);
        m.lock(2);
        m.lock(3);
        assert!(!m.try_lock(1));
        assert!(!m.try_lock(2));
        assert!(!m.try_lock(3));
        assert!(m.try_lock(4));
        assert!(m.try_lock(5));

        for i in 1..=5 {
            m.unlock(i);
        }
        for i in 1..=5 {
            assert!(m.try_lock(i));
            m.unlock(i);
        }
    }

    #[test]
    fn test_every_bit() {
        let m = BitMutex::new();
        for i in 0..BitMutex::CAPACITY {
            assert!(m.try_lock(i));
        }
        assert_eq!(m.bits(), u64::MAX);
        for i in 0..BitMutex::CAPACITY {
            m.unlock(i);
        }
        assert_eq!(m.bits(), 0);
    }

    #[test]
    fn test_out_of_range_panics() {
        let m = BitMutex::new();
        for i in [64, 100, usize::MAX] {
            assert!(panics(|| m.lock(i)), "lock({i})");
            assert!(panics(|| m.unlock(i)), "unlock({i})");
            assert!(panics(|| {
                m.try_lock(i);
            }), "try_lock({i})");
        }
        assert_eq!(m.bits(), 0);
    }

    #[test]
    #[should_panic(expected = "BitMutex: index 64 out of range (limit 64)")]
    fn test_panic_message() {
        BitMutex::new().lock(64);
    }

    #[test]
    fn test_held_lock_rejects_other_threads() {
        let m = Arc::new(BitMutex::new());
        m.lock(7);

        let handles: Vec<_> = (0..100)
            .map(|_| {
                let m = Arc::clone(&m);
                thread::spawn(move || m.try_lock(7))
            })
            .collect();

        for h in handles {
            assert!(!h.join().unwrap());
        }

        m.unlock(7);
        assert!(m.try_lock(7));
        m.unlock(7);
    }

    #[test]
    fn test_concurrent_distinct_bits() {
        let m = Arc::new(BitMutex::new());

        let handles: Vec<_> = (0..10)
            .map(|n| {
                let m = Arc::clone(&m);
                thread::spawn(move || {
                    let bit = n * 6;
                    for _ in 0..1000 {
                        m.lock(bit);
                        m.unlock(bit);
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(m.bits(), 0);
    }

    #[test]
    fn test_lock_waits_for_release() {
        let m = Arc::new(BitMutex::new());
        let released = Arc::new(AtomicBool::new(false));
        m.lock(9);

        let waiter = {
            let m = Arc::clone(&m);
            let released = Arc::clone(&released);
            thread::spawn(move || {
                m.lock(9);
                let saw_release = released.load(Ordering::Acquire);
                m.unlock(9);
                saw_release
            })
        };

        thread::sleep(std::time::Duration::from_millis(20));
        released.store(true, Ordering::Release);
        m.unlock(9);

        assert!(waiter.join().unwrap());
    }

    #[test]
    fn test_exclusion_same_bit() {
        let m = Arc::new(BitMutex::new());
        let inside = Arc::new(AtomicBool::new(false));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let m = Arc::clone(&m);
                let inside = Arc::clone(&inside);
                thread::spawn(move || {
                    for _ in 0..2000 {
                        m.lock(42);
                        assert!(!inside.swap(true, Ordering::Relaxed), "two holders of bit 42");
                        inside.store(false, Ordering::Relaxed);
                        m.unlock(42);
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn test_debug() {
        let m = BitMutex::new();
        m.lock(4);
        let debug = format!("{:?}", m);
        assert!(debug.contains("BitMutex"));
        assert!(debug.contains("0x0000000000000010"));
        m.unlock(4);
    }
}
