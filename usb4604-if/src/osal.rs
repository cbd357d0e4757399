use core::time::Duration;

/// Timing services supplied by the platform.
pub trait Kernel: Send + Sync {
    /// Blocks the calling thread for at least `duration`.
    fn delay(&self, duration: Duration);

    /// Blocks for a time within `[min, max]`.
    ///
    /// Platforms with a timer slack mechanism may pick any point in the
    /// range; the default sleeps for `min`.
    fn sleep_range(&self, min: Duration, max: Duration) {
        debug_assert!(min <= max);
        self.delay(min);
    }
}
