//! Frame ticker for driving a [`SmoothBuffer`](crate::buffer::SmoothBuffer).

use crate::buffer::SmoothBuffer;
use std::time::Duration;
use tokio::time::{interval, Interval, MissedTickBehavior};

/// Default tick cadence, roughly one display refresh at 60Hz.
pub const DEFAULT_FRAME_PERIOD: Duration = Duration::from_millis(16);

/// Shortest accepted tick period.
pub const MIN_FRAME_PERIOD: Duration = Duration::from_millis(1);

/// Periodic frame source.
///
/// Missed frames are skipped rather than replayed in a burst, like a
/// display refresh callback.
#[derive(Debug)]
pub struct FrameTicker {
    interval: Interval,
    period: Duration,
}

impl FrameTicker {
    /// Create a ticker with the given period.
    ///
    /// Periods below [`MIN_FRAME_PERIOD`] are raised to it.
    pub fn new(period: Duration) -> Self {
        let period = period.max(MIN_FRAME_PERIOD);
        let mut interval = interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval, period }
    }

    /// The tick period.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Wait for the next frame. Cancel-safe.
    pub async fn tick(&mut self) {
        self.interval.tick().await;
    }

    /// Tick `buffer` until it has caught up with its target.
    pub async fn drive(&mut self, buffer: &mut SmoothBuffer) {
        while buffer.is_animating() {
            self.tick().await;
            buffer.tick();
        }
    }
}

impl Default for FrameTicker {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_PERIOD)
    }
}
