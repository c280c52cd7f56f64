// bounded exponential yield backoff
//
// used while a spin lock observes its target as held:
// - round n yields the thread `spins` times, starting at 1
// - spins doubles after every round until it reaches MAX_SPIN
// - once saturated every further round yields MAX_SPIN times

// ceiling on yields per backoff round
pub const MAX_SPIN: u32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    spins: u32,
}

impl Backoff {
    #[inline]
    pub const fn new() -> Self {
        Self { spins: 1 }
    }

    // yield `spins` times, then grow the next round
    #[inline]
    pub fn snooze(&mut self) {
        for _ in 0..self.spins {
            std::thread::yield_now();
        }
        if self.spins < MAX_SPIN {
            self.spins *= 2;
        }
    }

    #[inline]
    pub fn reset(&mut self) {
        self.spins = 1;
    }

    // number of yields the next snooze() will perform
    #[inline]
    pub const fn spins(&self) -> u32 {
        self.spins
    }

    #[inline]
    pub const fn is_saturated(&self) -> bool {
        self.spins >= MAX_SPIN
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}
