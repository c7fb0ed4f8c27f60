//! Bounded polling

use crate::error::{NetcheckError, NetcheckResult};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Poll `probe` up to `tries` times, sleeping `delay` between attempts, until
/// it yields a value. The probe always runs at least once.
///
/// Errors returned by the probe abort the wait immediately. Running out of
/// tries yields `NetcheckError::Timeout` carrying `what`.
pub async fn poll_until<T, F, Fut>(
    what: &str,
    delay: Duration,
    tries: u32,
    mut probe: F,
) -> NetcheckResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = NetcheckResult<Option<T>>>,
{
    let tries = tries.max(1);
    for attempt in 1..=tries {
        if let Some(value) = probe().await? {
            debug!("{} satisfied after {} attempt(s)", what, attempt);
            return Ok(value);
        }
        if attempt < tries {
            tokio::time::sleep(delay).await;
        }
    }

    Err(NetcheckError::Timeout(format!(
        "{} not satisfied after {} tries ({:?} apart)",
        what, tries, delay
    )))
}

/// Poll a boolean `predicate`; see [`poll_until`].
pub async fn wait_until<F, Fut>(
    what: &str,
    delay: Duration,
    tries: u32,
    mut predicate: F,
) -> NetcheckResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = NetcheckResult<bool>>,
{
    poll_until(what, delay, tries, || {
        let fut = predicate();
        async move { Ok(fut.await?.then_some(())) }
    })
    .await
}

/// Try count covering `timeout` at `poll` intervals (at least one try).
pub fn tries_for(timeout: Duration, poll: Duration) -> u32 {
    if poll.is_zero() {
        return 1;
    }
    let tries = timeout.as_millis() / poll.as_millis().max(1);
    u32::try_from(tries).unwrap_or(u32::MAX).max(1)
}
