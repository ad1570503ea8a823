//! Millisecond tick source

/// Monotonic millisecond counter used to bound busy-polling
///
/// The counter may wrap; callers only ever look at wrapping differences.
/// Tests inject a simulated clock so busy windows are deterministic.
pub trait Clock {
    /// Current tick in milliseconds
    fn now_ms(&mut self) -> u32;
}

impl<C: Clock + ?Sized> Clock for &mut C {
    fn now_ms(&mut self) -> u32 {
        (**self).now_ms()
    }
}

#[cfg(feature = "alloc")]
impl<C: Clock + ?Sized> Clock for alloc::boxed::Box<C> {
    fn now_ms(&mut self) -> u32 {
        (**self).now_ms()
    }
}

/// Wall clock based on [`std::time::Instant`]
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl StdClock {
    /// Start counting from now
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for StdClock {
    fn now_ms(&mut self) -> u32 {
        self.origin.elapsed().as_millis() as u32
    }
}
