//! Abstract monotonic time so timers can be driven by `std` or tokio time (or a test clock).
use core::ops::Add;
use core::time::Duration;

pub trait TimestampTrait: Sized + Add<Duration, Output = Self> + Clone + Copy + Ord + Eq {
    fn now() -> Self;
    fn with_delay(delay: core::time::Duration) -> Self {
        Self::now() + delay
    }
    /// Returns `Some(self - other)` or `None` if `self < other`
    fn until(&self, other: Self) -> Option<Duration>;
}
impl TimestampTrait for std::time::Instant {
    fn now() -> Self {
        std::time::Instant::now()
    }

    fn until(&self, other: Self) -> Option<Duration> {
        self.checked_duration_since(other)
    }
}
