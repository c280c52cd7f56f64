//! PaddedBitMutex: a [`BitMutex`] that owns its cache line.
//!
//! a full line of padding sits on each side of the live word, so whatever
//! 64-byte line the word lands in holds nothing else that is ever written.
//! arrays of these (the shards of [`ShardedBitMutex`](crate::ShardedBitMutex))
//! therefore never false-share, whatever the array's own alignment is.
//!
//! semantics are exactly those of [`BitMutex`]; only the layout differs.

use crate::bit_mutex::BitMutex;
use crate::index::assert_index;
use bitmux_cpu::LinePad;

/// cache-line isolated [`BitMutex`], 64 locks.
///
/// ```
/// use bitmux_sync::PaddedBitMutex;
///
/// let mutex = PaddedBitMutex::new();
/// mutex.lock(3);
/// assert!(!mutex.try_lock(3));
/// mutex.unlock(3);
/// ```
#[derive(Default)]
#[repr(C)]
pub struct PaddedBitMutex {
    _head: LinePad,
    inner: BitMutex,
    _tail: LinePad,
}

impl PaddedBitMutex {
    pub(crate) const NAME: &'static str = "PaddedBitMutex";

    /// number of independent locks.
    pub const CAPACITY: usize = BitMutex::CAPACITY;

    #[inline]
    pub const fn new() -> Self {
        Self {
            _head: LinePad::new(),
            inner: BitMutex::new(),
            _tail: LinePad::new(),
        }
    }

    /// see [`BitMutex::lock`].
    #[inline]
    #[track_caller]
    pub fn lock(&self, i: usize) {
        assert_index(Self::NAME, i, Self::CAPACITY);
        self.inner.lock_bit(i);
    }

    /// see [`BitMutex::unlock`].
    #[inline]
    #[track_caller]
    pub fn unlock(&self, i: usize) {
        assert_index(Self::NAME, i, Self::CAPACITY);
        self.inner.unlock_bit(i);
    }

    /// see [`BitMutex::try_lock`].
    #[inline]
    #[track_caller]
    pub fn try_lock(&self, i: usize) -> bool {
        assert_index(Self::NAME, i, Self::CAPACITY);
        self.inner.try_lock_bit(i)
    }

    #[inline]
    #[track_caller]
    pub fn is_locked(&self, i: usize) -> bool {
        assert_index(Self::NAME, i, Self::CAPACITY);
        self.inner.is_bit_locked(i)
    }

    #[inline]
    pub fn bits(&self) -> u64 {
        self.inner.bits()
    }

    #[inline]
    pub(crate) fn word(&self) -> &BitMutex {
        &self.inner
    }
}

impl std::fmt::Debug for PaddedBitMutex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaddedBitMutex")
            .field("bits", &format_args!("{:#018x}", self.bits()))
            .finish()
    }
}
