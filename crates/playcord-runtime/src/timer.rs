//! One-shot and repeating timers tied to a cancellation token.
//!
//! Once the token is cancelled no further callback starts; a callback
//! already running is left to finish on its own.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Run `fut` once after `delay`, unless `token` is cancelled first.
pub fn after<Fut>(token: &CancellationToken, delay: Duration, fut: Fut) -> JoinHandle<()>
where
    Fut: Future<Output = ()> + Send + 'static,
{
    let token = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            biased;
            _ = token.cancelled() => {}
            _ = time::sleep(delay) => fut.await,
        }
    })
}

/// Call `f` every `period` (first call after one period), at most
/// `limit` times when given. Calls never overlap; a slow call delays
/// the next one.
pub fn every<F, Fut>(
    token: &CancellationToken,
    period: Duration,
    limit: Option<u32>,
    mut f: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let token = token.clone();
    tokio::spawn(async move {
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut fired = 0u32;
        while limit.map_or(true, |n| fired < n) {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }
            f().await;
            fired += 1;
        }
    })
}
