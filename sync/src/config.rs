//! stress run configuration: builder defaults plus `BITMUX_*` environment
//! overrides, validated before a run starts.

use crate::error::{Error, Result};
use std::env;
use std::str::FromStr;

/// environment variable overriding [`StressConfig::threads`].
pub const ENV_THREADS: &str = "BITMUX_THREADS";
/// environment variable overriding [`StressConfig::iterations`].
pub const ENV_ITERATIONS: &str = "BITMUX_ITERATIONS";
/// environment variable overriding [`StressConfig::index`].
pub const ENV_INDEX: &str = "BITMUX_INDEX";
/// environment variable overriding [`StressConfig::hold_spins`].
pub const ENV_HOLD_SPINS: &str = "BITMUX_HOLD_SPINS";

/// configuration for a mutual-exclusion stress run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StressConfig {
    /// number of contending worker threads.
    pub threads: usize,

    /// lock/unlock rounds per worker.
    pub iterations: u64,

    /// lock index every worker contends on.
    pub index: usize,

    /// spin hints between the read and the write of the shared counter,
    /// widening the window in which a broken lock would lose updates.
    pub hold_spins: u32,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            threads: 8,
            iterations: 10_000,
            index: 0,
            hold_spins: 16,
        }
    }
}

impl StressConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// defaults overridden by any `BITMUX_*` variables that are set.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(threads) = env_var(ENV_THREADS)? {
            config.threads = threads;
        }
        if let Some(iterations) = env_var(ENV_ITERATIONS)? {
            config.iterations = iterations;
        }
        if let Some(index) = env_var(ENV_INDEX)? {
            config.index = index;
        }
        if let Some(hold_spins) = env_var(ENV_HOLD_SPINS)? {
            config.hold_spins = hold_spins;
        }

        config.validate()?;
        Ok(config)
    }

    /// set worker thread count.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// set rounds per worker.
    pub fn with_iterations(mut self, iterations: u64) -> Self {
        self.iterations = iterations;
        self
    }

    /// set contended index.
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    /// set spin hints held inside the critical section.
    pub fn with_hold_spins(mut self, hold_spins: u32) -> Self {
        self.hold_spins = hold_spins;
        self
    }

    /// total acquisitions a run performs.
    pub fn total_iterations(&self) -> u64 {
        self.threads as u64 * self.iterations
    }

    /// reject configurations a run cannot execute: zero `threads`, zero
    /// `iterations`, or a `threads * iterations` total that overflows `u64`.
    ///
    /// `index` is not checked here; [`stress::run`](crate::stress::run)
    /// checks it against the capacity of the lock under test.
    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(Error::InvalidConfig(
                "threads must be greater than 0".to_string(),
            ));
        }

        if self.iterations == 0 {
            return Err(Error::InvalidConfig(
                "iterations must be greater than 0".to_string(),
            ));
        }

        if self.threads as u64 > u64::MAX / self.iterations {
            return Err(Error::InvalidConfig(format!(
                "{} threads x {} iterations overflows the counter",
                self.threads, self.iterations
            )));
        }

        Ok(())
    }
}

fn env_var<T: FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::InvalidConfig(format!("{name}={raw:?} is not a valid number"))),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => {
            Err(Error::InvalidConfig(format!("{name} is not valid unicode")))
        }
    }
}
