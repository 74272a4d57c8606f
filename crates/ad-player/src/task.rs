//! Cancellable scheduled work.
//!
//! Every timer the engine starts (tracking sampler, duration monitor, notice
//! refresh) is a [`ScheduledTask`]. The owning display cycle cancels it at
//! completion; dropping the handle cancels it too.

use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// When the first tick of a polling task runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstTick {
    Immediately,
    AfterPeriod,
}

/// Handle to a spawned, cancellable task.
#[derive(Debug)]
pub struct ScheduledTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Spawn `work` with a fresh cancellation token.
    pub fn spawn<F, Fut>(work: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let handle = tokio::spawn(work(token.clone()));
        Self { token, handle }
    }

    /// Run `tick` every `period` until it breaks or the task is cancelled.
    pub fn poll<F>(period: Duration, first: FirstTick, mut tick: F) -> Self
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        Self::spawn(move |token| async move {
            let start = match first {
                FirstTick::Immediately => Instant::now(),
                FirstTick::AfterPeriod => Instant::now() + period,
            };
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        if token.is_cancelled() || tick().is_break() {
                            break;
                        }
                    }
                }
            }
        })
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Token shared with the task, for listeners that must go inert with it.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_poll_immediately_ticks_at_start() {
        let ticks = Arc::new(AtomicU32::new(0));
        let counter = ticks.clone();
        let task = ScheduledTask::poll(Duration::from_millis(100), FirstTick::Immediately, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            ControlFlow::Continue(())
        });

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        task.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_after_period_waits() {
        let ticks = Arc::new(AtomicU32::new(0));
        let counter = ticks.clone();
        let _task = ScheduledTask::poll(Duration::from_millis(100), FirstTick::AfterPeriod, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            ControlFlow::Continue(())
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticking() {
        let ticks = Arc::new(AtomicU32::new(0));
        let counter = ticks.clone();
        let task = ScheduledTask::poll(Duration::from_millis(100), FirstTick::Immediately, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            ControlFlow::Continue(())
        });

        tokio::time::sleep(Duration::from_millis(150)).await;
        task.cancel();
        let seen = ticks.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), seen);
        assert!(task.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_break_ends_task() {
        let task = ScheduledTask::poll(Duration::from_millis(10), FirstTick::Immediately, || {
            ControlFlow::Break(())
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(task.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let ticks = Arc::new(AtomicU32::new(0));
        let counter = ticks.clone();
        let task = ScheduledTask::poll(Duration::from_millis(10), FirstTick::AfterPeriod, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            ControlFlow::Continue(())
        });
        drop(task);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
    }
}
