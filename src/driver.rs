//! Fixed-interval scheduler that drives a simulation.
//!
//! [`Driver::start`] spawns a tokio task that calls a tick closure once per
//! period. The closure runs to completion on every tick; stopping only takes
//! effect between ticks.

use std::ops::ControlFlow;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::error::Result;

/// Default period between ticks.
pub const DEFAULT_SPEED: Duration = Duration::from_millis(100);

/// Handle to a running tick loop.
pub struct Driver {
    period: Duration,
    stop: watch::Sender<bool>,
    handle: JoinHandle<u64>,
}

impl Driver {
    /// Start ticking every `period`, first tick one period from now.
    ///
    /// The loop ends when `tick` returns [`ControlFlow::Break`] or when
    /// [`Driver::stop`] is called. Must be called inside a tokio runtime.
    pub fn start<F>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        let (stop, mut stopped) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut ticks = 0u64;
            loop {
                tokio::select! {
                    biased;
                    changed = stopped.changed() => {
                        if changed.is_err() || *stopped.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        ticks += 1;
                        if tick().is_break() {
                            debug!(ticks, "driver halted by tick");
                            break;
                        }
                    }
                }
            }
            ticks
        });
        info!(period_ms = period.as_millis() as u64, "driver started");
        Self { period, stop, handle }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// False once the loop has ended, by stop or by a halting tick.
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Cancel between ticks and return how many ticks ran.
    pub async fn stop(self) -> Result<u64> {
        // A send error only means the loop already ended.
        let _ = self.stop.send(true);
        let ticks = self.handle.await?;
        info!(ticks, "driver stopped");
        Ok(ticks)
    }

    /// Wait for the tick closure to halt the loop.
    pub async fn join(self) -> Result<u64> {
        let Self { stop, handle, .. } = self;
        let ticks = handle.await?;
        drop(stop);
        Ok(ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[tokio::test]
    async fn halting_tick_ends_the_loop() {
        let mut left = 3;
        let driver = Driver::start(Duration::from_millis(1), move || {
            left -= 1;
            if left == 0 { ControlFlow::Break(()) } else { ControlFlow::Continue(()) }
        });
        assert_eq!(driver.join().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn stop_cancels_between_ticks() {
        let count = Arc::new(AtomicU64::new(0));
        let seen = Arc::clone(&count);
        let driver = Driver::start(Duration::from_millis(2), move || {
            seen.fetch_add(1, Ordering::SeqCst);
            ControlFlow::Continue(())
        });
        assert!(driver.is_running());
        time::sleep(Duration::from_millis(30)).await;
        let ticks = driver.stop().await.unwrap();
        assert_eq!(ticks, count.load(Ordering::SeqCst));
        time::sleep(Duration::from_millis(20)).await;
        assert_eq!(ticks, count.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn stop_before_first_period_runs_nothing() {
        let driver = Driver::start(Duration::from_secs(60), || ControlFlow::Continue(()));
        assert_eq!(driver.period(), Duration::from_secs(60));
        assert_eq!(driver.stop().await.unwrap(), 0);
    }
}
