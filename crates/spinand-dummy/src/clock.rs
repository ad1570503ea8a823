//! Simulated millisecond clock shared between the emulator and the driver

use alloc::sync::Arc;
use core::sync::atomic::{AtomicU32, Ordering};

use spinand_core::programmer::Clock;

/// A tick counter that only moves when read or advanced
///
/// Clones share the same counter. The emulator holds one clone to time its
/// busy windows; the driver reads another through [`Clock::now_ms`], which
/// advances the counter by `step` after each read so busy-polling makes
/// progress without any real waiting.
#[derive(Debug, Clone)]
pub struct SimClock {
    ticks: Arc<AtomicU32>,
    step: u32,
}

impl SimClock {
    /// Start at tick 0, advancing 1 ms per read
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Start at an arbitrary tick (useful for wrap-around tests)
    pub fn starting_at(tick: u32) -> Self {
        Self {
            ticks: Arc::new(AtomicU32::new(tick)),
            step: 1,
        }
    }

    /// Same counter, different step per read
    pub fn with_step(&self, step: u32) -> Self {
        Self {
            ticks: Arc::clone(&self.ticks),
            step,
        }
    }

    /// Current tick without advancing
    pub fn now(&self) -> u32 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Move time forward
    pub fn advance(&self, ms: u32) {
        self.ticks.fetch_add(ms, Ordering::Relaxed);
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SimClock {
    fn now_ms(&mut self) -> u32 {
        self.ticks.fetch_add(self.step, Ordering::Relaxed)
    }
}
