//! Periodic background loops
//!
//! Each loop owns one timer and awaits its work before the next tick, so a
//! task never overlaps itself. All loops stop when the shared shutdown flag
//! flips to `true` or its sender goes away.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::services::injection::{FaultDomain, FaultInjector};
use crate::traits::ClusterClient;
use shared::{ProcessId, logging, process_debug, process_info};

/// Shutdown flag that flips to `true` once `signal` resolves
///
/// If the signal listener itself fails the flag stays `false` and its sender
/// is held for the life of the process.
pub fn shutdown_on<S>(signal: S) -> watch::Receiver<bool>
where
    S: Future<Output = std::io::Result<()>> + Send + 'static,
{
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match signal.await {
            Ok(()) => {
                logging::log_shutdown(ProcessId::current(), "Received Ctrl+C signal");
                let _ = shutdown_tx.send(true);
            }
            Err(err) => {
                logging::log_error(ProcessId::current(), "Signal handling", &err);
                std::future::pending::<()>().await;
            }
        }
    });
    shutdown_rx
}

/// Sleep for `delay` unless shutdown arrives first; `false` means shut down
pub async fn sleep_or_shutdown(delay: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    if *shutdown.borrow() {
        return false;
    }
    tokio::select! {
        _ = tokio::time::sleep(delay) => true,
        changed = shutdown.changed() => changed.is_ok() && !*shutdown.borrow(),
    }
}

/// Run `tick` every `period`, first run one full period from now
pub async fn run_periodic<F, Fut>(
    task: &'static str,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut tick: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            _ = ticker.tick() => {
                process_debug!(ProcessId::current(), "⏱️ {} tick", task);
                tick().await;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    process_info!(ProcessId::current(), "🛑 {} loop stopped", task);
}

/// Spawn the expiry sweep for one fault registry
pub fn spawn_expiry_sweep<D, C>(
    task: &'static str,
    injector: Arc<FaultInjector<D, C>>,
    period: Duration,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    D: FaultDomain + 'static,
    C: ClusterClient + 'static,
{
    tokio::spawn(async move {
        run_periodic(task, period, shutdown, || {
            let injector = Arc::clone(&injector);
            async move {
                let expired = injector.cleanup_expired().await;
                if !expired.is_empty() {
                    process_info!(ProcessId::current(), "🧹 {} removed {} expired faults", task, expired.len());
                }
            }
        })
        .await;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_waits_one_period() {
        let (tx, rx) = watch::channel(false);
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);

        let handle = tokio::spawn(run_periodic("test", Duration::from_secs(30), rx, move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        }));

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_interrupted_by_shutdown() {
        let (tx, mut rx) = watch::channel(false);
        let sleeper = tokio::spawn(async move { sleep_or_shutdown(Duration::from_secs(60), &mut rx).await });

        tokio::time::sleep(Duration::from_secs(1)).await;
        tx.send(true).unwrap();

        assert!(!sleeper.await.unwrap());
    }

    #[tokio::test]
    async fn test_signal_flips_shutdown() {
        let mut rx = shutdown_on(async { Ok(()) });

        rx.changed().await.unwrap();
        assert!(*rx.borrow());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_signal_listener_keeps_running() {
        let mut rx = shutdown_on(async { Err(std::io::Error::other("no signal driver")) });

        let changed = tokio::time::timeout(Duration::from_secs(3600), rx.changed()).await;
        assert!(changed.is_err());
        assert!(!*rx.borrow());
        assert!(sleep_or_shutdown(Duration::from_secs(5), &mut rx).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_sender_stops_loop() {
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(run_periodic("orphan", Duration::from_secs(5), rx, || async {}));

        drop(tx);
        tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }
}
