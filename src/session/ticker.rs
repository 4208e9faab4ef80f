use std::future::pending;
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// The session's periodic task.
///
/// Dropping the ticker releases the timer; no tick fires afterwards. Ticks that fall due while the
/// previous one is still being handled are skipped, not queued.
#[derive(Debug)]
pub struct PollTicker {
    interval: Interval,
}

impl PollTicker {
    /// Starts ticking every `period`. The first tick is immediate when `immediate` is set, otherwise
    /// one period from now.
    pub fn start(period: Duration, immediate: bool) -> Self {
        let first = if immediate {
            Instant::now()
        } else {
            Instant::now() + period
        };
        let mut interval = interval_at(first, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }

    pub fn period(&self) -> Duration {
        self.interval.period()
    }

    pub async fn tick(&mut self) -> Instant {
        self.interval.tick().await
    }
}

/// Waits for the next tick, or forever once the ticker is gone.
pub(crate) async fn next_tick(ticker: &mut Option<PollTicker>) -> Instant {
    match ticker {
        Some(ticker) => ticker.tick().await,
        None => pending().await,
    }
}
