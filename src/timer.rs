//! Cancellable timers that report back through the event channel.

use crate::app::events::{AppEvent, EventSender};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// A running timer task. Dropping the handle cancels it.
#[derive(Debug)]
pub struct TimerHandle(JoinHandle<()>);

impl TimerHandle {
    pub fn is_finished(&self) -> bool {
        self.0.is_finished()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Fires `event` once after `delay`.
pub fn after(delay: Duration, tx: &EventSender, event: AppEvent) -> TimerHandle {
    let tx = tx.clone();
    TimerHandle(tokio::spawn(async move {
        time::sleep(delay).await;
        let _ = tx.send(event);
    }))
}

/// Fires `make_event()` at `start`, then every `period`. Late ticks are
/// skipped rather than bunched up.
pub fn every<F>(start: Instant, period: Duration, tx: &EventSender, make_event: F) -> TimerHandle
where
    F: Fn() -> AppEvent + Send + 'static,
{
    let tx = tx.clone();
    TimerHandle(tokio::spawn(async move {
        let mut interval = time::interval_at(start, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            if tx.send(make_event()).is_err() {
                break;
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn test_after_fires_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _timer = after(Duration::from_millis(500), &tx, AppEvent::RenderTick);

        time::sleep(Duration::from_millis(499)).await;
        assert!(rx.try_recv().is_err());

        time::sleep(Duration::from_millis(2)).await;
        assert!(matches!(rx.try_recv(), Ok(AppEvent::RenderTick)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let timer = after(Duration::from_millis(100), &tx, AppEvent::RenderTick);
        drop(timer);

        time::sleep(Duration::from_millis(200)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_ticks_periodically() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _timer = every(Instant::now(), Duration::from_millis(200), &tx, || AppEvent::RenderTick);

        time::sleep(Duration::from_millis(650)).await;
        let mut ticks = 0;
        while rx.try_recv().is_ok() {
            ticks += 1;
        }
        // t=0, 200, 400, 600
        assert_eq!(ticks, 4);
    }
}
