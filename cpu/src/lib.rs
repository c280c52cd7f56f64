// bitmux-cpu

mod backoff;
mod cache_padded;

pub use {
    backoff::{Backoff, MAX_SPIN},
    cache_padded::{same_cache_line, CachePadded, LinePad, CACHE_LINE_SIZE},
};
