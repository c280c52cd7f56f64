// cache-line isolation helpers
//
// false sharing: two threads writing distinct words that sit on one cache line
// still bounce that line between cores, because coherence works per line
//
// two tools here:
// - CachePadded<T>: aligns a value to 64 and rounds its size up to 64, so
//   neighbouring elements of an array never share a line
// - LinePad: one line of opaque bytes, for layouts that need explicit space
//   on both sides of a hot field regardless of the enclosing alignment

use core::fmt;
use core::ops::Deref;

pub const CACHE_LINE_SIZE: usize = 64;

// one full cache line of padding bytes, never read
#[derive(Clone, Copy)]
#[repr(transparent)]
#[allow(dead_code)]
pub struct LinePad([u8; CACHE_LINE_SIZE]);

impl LinePad {
    #[inline]
    pub const fn new() -> Self {
        Self([0; CACHE_LINE_SIZE])
    }
}

impl Default for LinePad {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LinePad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LinePad({})", CACHE_LINE_SIZE)
    }
}

// aligns value to a cache-line boundary
//
// guarantees:
// - alignment 64
// - value field at offset 0
// - size rounded up to multiple of 64
#[repr(C, align(64))]
pub struct CachePadded<T> {
    value: T,
}

impl<T> CachePadded<T> {
    #[inline]
    pub const fn new(value: T) -> Self {
        Self { value }
    }

    #[inline]
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> Deref for CachePadded<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: Default> Default for CachePadded<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for CachePadded<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CachePadded").field(&self.value).finish()
    }
}

// true when both addresses fall inside the same 64-byte line
#[inline]
pub fn same_cache_line<A, B>(a: *const A, b: *const B) -> bool {
    (a as usize) / CACHE_LINE_SIZE == (b as usize) / CACHE_LINE_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem::{align_of, size_of};
    use core::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn test_padded_layout() {
        assert_eq!(align_of::<CachePadded<AtomicU64>>(), CACHE_LINE_SIZE);
        assert_eq!(size_of::<CachePadded<AtomicU64>>(), CACHE_LINE_SIZE);
        assert_eq!(size_of::<CachePadded<[u8; 65]>>(), 2 * CACHE_LINE_SIZE);
        assert_eq!(size_of::<LinePad>(), CACHE_LINE_SIZE);
    }

    #[test]
    fn test_array_elements_on_distinct_lines() {
        let slots: [CachePadded<AtomicU64>; 4] = Default::default();
        for pair in slots.windows(2) {
            let (a, b): (*const AtomicU64, *const AtomicU64) = (&*pair[0], &*pair[1]);
            assert!(!same_cache_line(a, b));
        }
    }

    #[test]
    fn test_deref_reaches_value() {
        let slot = CachePadded::new(AtomicU64::new(7));
        slot.fetch_add(1, Ordering::Relaxed);
        assert_eq!(slot.into_inner().into_inner(), 8);
    }

    #[test]
    fn test_same_cache_line() {
        let base = CachePadded::new([0u8; 128]);
        let start = base.as_ptr();
        assert!(same_cache_line(start, start.wrapping_add(63)));
        assert!(!same_cache_line(start, start.wrapping_add(64)));
    }
}
