//! scoped acquisition over any of the bit mutexes.
//!
//! the raw API leaves pairing `lock`/`unlock` to the caller. [`IndexGuard`]
//! releases on drop, so early returns, `?` and unwinding all unlock.
//!
//! ```
//! use bitmux_sync::{IndexedLock, ShardedBitMutex};
//!
//! let mutex = ShardedBitMutex::new();
//!
//! {
//!     let guard = mutex.lock_guard(42);
//!     assert_eq!(guard.index(), 42);
//!     assert!(mutex.try_guard(42).is_none());
//! }
//!
//! assert!(mutex.try_lock_guard(42).is_some());
//! ```

use crate::{BitMutex, PaddedBitMutex, ShardedBitMutex};
use std::fmt;

/// a fixed-capacity family of independent spin locks addressed by index.
///
/// every method panics when `index >= CAPACITY`.
pub trait IndexedLock: Send + Sync {
    /// number of addressable locks.
    const CAPACITY: usize;

    /// type name used in panic messages and debug output.
    const NAME: &'static str;

    fn lock(&self, index: usize);

    fn unlock(&self, index: usize);

    fn try_lock(&self, index: usize) -> bool;

    /// lock `index` and release it when the guard drops.
    #[inline]
    #[track_caller]
    fn guard(&self, index: usize) -> IndexGuard<'_, Self>
    where
        Self: Sized,
    {
        self.lock(index);
        IndexGuard { lock: self, index }
    }

    /// single attempt; `None` if `index` is held.
    #[inline]
    #[track_caller]
    fn try_guard(&self, index: usize) -> Option<IndexGuard<'_, Self>>
    where
        Self: Sized,
    {
        if self.try_lock(index) {
            Some(IndexGuard { lock: self, index })
        } else {
            None
        }
    }
}

/// holds one index of an [`IndexedLock`]; unlocks on drop.
///
/// the primitive has no owner, so a guard may move to and drop on another thread.
#[must_use = "dropping the guard releases the lock immediately"]
pub struct IndexGuard<'a, L: IndexedLock> {
    lock: &'a L,
    index: usize,
}

impl<L: IndexedLock> IndexGuard<'_, L> {
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }
}

impl<L: IndexedLock> Drop for IndexGuard<'_, L> {
    #[inline]
    fn drop(&mut self) {
        self.lock.unlock(self.index);
    }
}

impl<L: IndexedLock> fmt::Debug for IndexGuard<'_, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexGuard")
            .field("lock", &L::NAME)
            .field("index", &self.index)
            .finish()
    }
}

// trait impl plus inherent `lock_guard`/`try_lock_guard` shorthands
macro_rules! impl_indexed_lock {
    ($($ty:ty),+ $(,)?) => {$(
        impl IndexedLock for $ty {
            const CAPACITY: usize = <$ty>::CAPACITY;
            const NAME: &'static str = <$ty>::NAME;

            #[inline]
            #[track_caller]
            fn lock(&self, index: usize) {
                <$ty>::lock(self, index)
            }

            #[inline]
            #[track_caller]
            fn unlock(&self, index: usize) {
                <$ty>::unlock(self, index)
            }

            #[inline]
            #[track_caller]
            fn try_lock(&self, index: usize) -> bool {
                <$ty>::try_lock(self, index)
            }
        }

        impl $ty {
            /// lock `index` for the lifetime of the returned guard.
            #[inline]
            #[track_caller]
            pub fn lock_guard(&self, index: usize) -> IndexGuard<'_, Self> {
                IndexedLock::guard(self, index)
            }

            /// single attempt at a guarded lock on `index`.
            #[inline]
            #[track_caller]
            pub fn try_lock_guard(&self, index: usize) -> Option<IndexGuard<'_, Self>> {
                IndexedLock::try_guard(self, index)
            }
        }
    )+};
}

impl_indexed_lock!(BitMutex, PaddedBitMutex, ShardedBitMutex);
