//! Batch capacity policy.

use shelfdb_core::config::BatchSettings;
use std::num::NonZeroUsize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizingStrategy {
    /// Capacity stays at its initial value.
    Fixed,
    /// Capacity grows by the initial value after `streak` consecutive commits
    /// each faster than `fast_commit`, up to `max_capacity`.
    Adaptive { max_capacity: NonZeroUsize, fast_commit: Duration, streak: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSizing {
    pub capacity: NonZeroUsize,
    pub strategy: SizingStrategy,
}

impl BatchSizing {
    pub fn fixed(capacity: NonZeroUsize) -> Self {
        Self { capacity, strategy: SizingStrategy::Fixed }
    }

    pub fn adaptive(capacity: NonZeroUsize, max_capacity: NonZeroUsize, fast_commit: Duration, streak: u32) -> Self {
        Self {
            capacity,
            strategy: SizingStrategy::Adaptive { max_capacity: max_capacity.max(capacity), fast_commit, streak: streak.max(1) },
        }
    }

    /// `None` when the configured capacity is zero.
    pub fn from_settings(settings: &BatchSettings) -> Option<Self> {
        let capacity = NonZeroUsize::new(settings.capacity)?;
        if !settings.dynamic {
            return Some(Self::fixed(capacity));
        }
        let max_capacity = NonZeroUsize::new(settings.max_capacity).unwrap_or(capacity);
        Some(Self::adaptive(capacity, max_capacity, Duration::from_millis(settings.fast_commit_ms), settings.fast_streak))
    }
}

impl Default for BatchSizing {
    fn default() -> Self {
        Self::fixed(NonZeroUsize::MIN.saturating_add(9))
    }
}

/// Tracks the live capacity during one ingest run.
#[derive(Debug)]
pub struct BatchSizer {
    sizing: BatchSizing,
    current: NonZeroUsize,
    fast_commits: u32,
}

impl BatchSizer {
    pub fn new(sizing: BatchSizing) -> Self {
        Self { sizing, current: sizing.capacity, fast_commits: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.current.get()
    }

    /// Feed the duration of a successful commit.
    pub fn observe(&mut self, elapsed: Duration) {
        let SizingStrategy::Adaptive { max_capacity, fast_commit, streak } = self.sizing.strategy else {
            return;
        };
        if elapsed >= fast_commit {
            self.fast_commits = 0;
            return;
        }
        self.fast_commits += 1;
        if self.fast_commits < streak || self.current >= max_capacity {
            return;
        }
        self.fast_commits = 0;
        let grown = self.current.saturating_add(self.sizing.capacity.get()).min(max_capacity);
        debug!(from = self.current.get(), to = grown.get(), "growing batch capacity");
        self.current = grown;
    }
}
