use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;

/// Handle to one background poll loop. The loop sleeps for the configured
/// interval, runs the tick exactly once, and repeats until cancelled; two
/// iterations never overlap because the tick is awaited in place.
pub struct PollTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PollTask {
    /// The tick closure owns its error handling; a failed tick must log and
    /// return so the loop keeps running.
    pub fn spawn<F, Fut>(interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (shutdown, mut signal) = watch::channel(false);
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    // Cancellation during the sleep aborts without an extra tick.
                    _ = signal.changed() => break,
                    _ = time::sleep(interval) => tick().await,
                }
            }
        });
        Self { shutdown, handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cooperative stop: signal the loop, then wait for it (and any tick in
    /// flight) to wind down. A replacement loop may only be spawned after
    /// this returns.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_tick_runs_once_per_interval() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let task = PollTask::spawn(Duration::from_millis(10), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        time::sleep(Duration::from_millis(100)).await;
        task.stop().await;

        let seen = ticks.load(Ordering::SeqCst);
        assert!(seen >= 2, "expected repeated ticks, saw {seen}");
    }

    #[tokio::test]
    async fn test_stop_during_sleep_skips_the_pending_tick() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let task = PollTask::spawn(Duration::from_secs(60), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        time::sleep(Duration::from_millis(20)).await;
        task.stop().await;

        assert_eq!(ticks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stop_waits_for_a_tick_in_flight() {
        let finished = Arc::new(AtomicUsize::new(0));
        let counter = finished.clone();
        let task = PollTask::spawn(Duration::from_millis(5), move || {
            let counter = counter.clone();
            async move {
                time::sleep(Duration::from_millis(50)).await;
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        // Let the first tick start, then stop mid-tick.
        time::sleep(Duration::from_millis(20)).await;
        task.stop().await;

        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_loop_survives_a_failing_tick() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let task = PollTask::spawn(Duration::from_millis(10), move || {
            let counter = counter.clone();
            async move {
                let attempt = counter.fetch_add(1, Ordering::SeqCst);
                let result: Result<(), &str> = if attempt == 0 { Err("boom") } else { Ok(()) };
                if let Err(err) = result {
                    tracing::warn!("poll tick failed: {err}");
                }
            }
        });

        time::sleep(Duration::from_millis(80)).await;
        assert!(!task.is_finished(), "loop must outlive a failed tick");
        task.stop().await;

        assert!(ticks.load(Ordering::SeqCst) >= 2);
    }
}
