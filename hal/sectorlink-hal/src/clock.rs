//! Monotonic tick source
//!
//! Deadlines are measured against a free-running millisecond counter that
//! is allowed to wrap; callers compare with `wrapping_sub`.

/// Millisecond tick counter
pub trait Monotonic {
    /// Milliseconds since an arbitrary fixed point
    fn now_ms(&self) -> u32;

    /// Milliseconds elapsed since `since`, tolerant of counter wrap
    fn elapsed_ms(&self, since: u32) -> u32 {
        self.now_ms().wrapping_sub(since)
    }
}

impl<T: Monotonic + ?Sized> Monotonic for &T {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

/// Host clock backed by `std::time::Instant`
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl StdClock {
    /// Create a clock whose zero is now
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Monotonic for StdClock {
    fn now_ms(&self) -> u32 {
        // Truncation is intended: the counter wraps like a hardware tick
        self.origin.elapsed().as_millis() as u32
    }
}
