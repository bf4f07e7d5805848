//! Periodic Poller
//!
//! Runs an async refresh immediately and then at a fixed period.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Shortest period a poller runs at.
pub const MIN_PERIOD: Duration = Duration::from_secs(1);

/// Spawns a background task that calls `tick` now and then every `period`.
///
/// Ticks missed while a slow refresh was running are skipped rather than
/// replayed in a burst. Periods below `MIN_PERIOD` are raised to it.
///
/// # Arguments
/// * `name` - Label used in logs
/// * `period` - Interval between refreshes
/// * `tick` - Produces one refresh future per run
///
/// # Returns
/// A JoinHandle for the spawned task, aborted during graceful shutdown.
///
/// # Example
/// ```ignore
/// let saint = Arc::clone(&saint_widget);
/// let handle = spawn_poller("saint", Duration::from_secs(60), move || {
///     let saint = Arc::clone(&saint);
///     async move {
///         saint.refresh().await;
///     }
/// });
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_poller<F, Fut>(name: &'static str, period: Duration, mut tick: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let period = if period < MIN_PERIOD {
        warn!("{} poller period {:?} too short, using {:?}", name, period, MIN_PERIOD);
        MIN_PERIOD
    } else {
        period
    };

    tokio::spawn(async move {
        info!("Starting {} poller with interval of {:?}", name, period);

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            debug!("{} poller tick", name);
            tick().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting(period: Duration) -> (JoinHandle<()>, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let handle = spawn_poller("test", period, move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        (handle, count)
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_runs_immediately_then_periodically() {
        let (handle, count) = counting(Duration::from_secs(60));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(150)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_period_is_raised() {
        let (handle, count) = counting(Duration::ZERO);

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert!(!handle.is_finished());
        assert_eq!(count.load(Ordering::SeqCst), 3);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_can_be_aborted() {
        let (handle, count) = counting(Duration::from_secs(1));
        tokio::time::sleep(Duration::from_millis(10)).await;

        handle.abort();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");

        let seen = count.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), seen);
    }
}
