// src/pipeline/watch.rs

//! Periodic cycle scheduling.

use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

/// Run `cycle` immediately and then once per `period` until `shutdown`
/// completes. Returns the number of cycles run.
///
/// Cycles never overlap: a slow cycle delays the next tick. `shutdown` is
/// polled once up front and then only between cycles, so a signal arriving
/// mid-cycle is kept and stops the loop as soon as that cycle finishes.
/// `period` must be non-zero.
pub async fn run_every<S, F, Fut>(period: Duration, shutdown: S, mut cycle: F) -> usize
where
    S: Future,
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut cycles = 0;
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            _ = ticker.tick() => {}
        }
        cycle().await;
        cycles += 1;
    }
    cycles
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_signal_during_cycle_stops_after_it() {
        let (tx, rx) = oneshot::channel::<()>();
        let tx = Mutex::new(Some(tx));

        let cycles = run_every(Duration::from_millis(1), rx, || {
            if let Some(tx) = tx.lock().unwrap().take() {
                let _ = tx.send(());
            }
            async {}
        })
        .await;

        assert_eq!(cycles, 1);
    }

    #[tokio::test]
    async fn test_runs_until_shutdown() {
        let (tx, rx) = oneshot::channel::<()>();
        let mut tx = Some(tx);
        let mut count = 0;

        let cycles = run_every(Duration::from_millis(1), rx, || {
            count += 1;
            if count == 3 {
                if let Some(tx) = tx.take() {
                    let _ = tx.send(());
                }
            }
            async {}
        })
        .await;

        assert_eq!(cycles, 3);
    }
}
