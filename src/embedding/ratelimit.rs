//! Request throttling for hosted providers.
//!
//! A generic cell rate limiter: one request per `interval` on average, with up
//! to `burst` requests admitted back to back. Callers wait for their slot
//! instead of being rejected.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    /// How far the theoretical arrival time may run ahead of now.
    tolerance: Duration,
    /// Theoretical arrival time of the next request.
    tat: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// `interval` of zero disables throttling. `burst` below 1 is treated as 1.
    pub fn new(interval: Duration, burst: u32) -> Self {
        let burst = burst.max(1);
        Self {
            interval,
            tolerance: interval * (burst - 1),
            tat: Mutex::new(None),
        }
    }

    /// Reserve the next slot. Returns the slot and how long until it opens.
    fn reserve(&self) -> (Instant, Duration) {
        let now = Instant::now();
        let mut tat = self.tat.lock().unwrap_or_else(PoisonError::into_inner);
        let arrival = tat.map_or(now, |t| t.max(now));
        *tat = Some(arrival + self.interval);
        let delay = arrival.saturating_duration_since(now).saturating_sub(self.tolerance);
        (arrival, delay)
    }

    /// Hand an unused slot back, but only while it is still the newest
    /// reservation. Later waiters are already sleeping toward the slots behind
    /// it, so giving back an earlier slot would let two requests share one.
    fn release(&self, slot: Instant) {
        let mut tat = self.tat.lock().unwrap_or_else(PoisonError::into_inner);
        if *tat == Some(slot + self.interval) {
            *tat = Some(slot);
        }
    }

    /// Wait until a request may be sent. Returns `Error::Cancelled` promptly if
    /// `cancel` fires while waiting.
    pub async fn wait(&self, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if self.interval.is_zero() {
            return Ok(());
        }

        let (slot, delay) = self.reserve();
        if delay.is_zero() {
            return Ok(());
        }

        tracing::debug!(delay_ms = delay.as_millis() as u64, "rate limited, waiting");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                self.release(slot);
                Err(Error::Cancelled)
            }
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn calls_are_spaced_by_interval() {
        let limiter = RateLimiter::new(Duration::from_millis(100), 1);
        let cancel = CancellationToken::new();

        let start = Instant::now();
        for _ in 0..3 {
            limiter.wait(&cancel).await.unwrap();
        }
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn burst_is_admitted_immediately() {
        let limiter = RateLimiter::new(Duration::from_millis(500), 5);
        let cancel = CancellationToken::new();

        let start = Instant::now();
        for _ in 0..5 {
            limiter.wait(&cancel).await.unwrap();
        }
        assert_eq!(start.elapsed(), Duration::ZERO);

        limiter.wait(&cancel).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_never_waits() {
        let limiter = RateLimiter::new(Duration::ZERO, 1);
        let cancel = CancellationToken::new();
        let start = Instant::now();
        for _ in 0..10 {
            limiter.wait(&cancel).await.unwrap();
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_aborts_pending_wait() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_secs(60), 1));
        let cancel = CancellationToken::new();
        limiter.wait(&cancel).await.unwrap();

        let waiter = {
            let limiter = Arc::clone(&limiter);
            let cancel = cancel.clone();
            tokio::spawn(async move { limiter.wait(&cancel).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        let cancelled_at = Instant::now();
        cancel.cancel();

        let result = waiter.await.unwrap();
        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(cancelled_at.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_wait_returns_its_slot() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(100), 1));
        limiter.wait(&CancellationToken::new()).await.unwrap();

        let cancel = CancellationToken::new();
        let waiter = {
            let limiter = Arc::clone(&limiter);
            let cancel = cancel.clone();
            tokio::spawn(async move { limiter.wait(&cancel).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();
        assert!(waiter.await.unwrap().is_err());

        // Without the returned slot this would wait ~190ms.
        let start = Instant::now();
        limiter.wait(&CancellationToken::new()).await.unwrap();
        assert!(start.elapsed() <= Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_waiter_behind_others_keeps_spacing() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(100), 1));
        let start = Instant::now();
        limiter.wait(&CancellationToken::new()).await.unwrap();

        let spawn_waiter = |cancel: CancellationToken| {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move {
                limiter.wait(&cancel).await.map(|()| start.elapsed())
            })
        };

        // B queues for 100ms, C for 200ms.
        let b_cancel = CancellationToken::new();
        let b = spawn_waiter(b_cancel.clone());
        tokio::task::yield_now().await;
        let c = spawn_waiter(CancellationToken::new());
        tokio::task::yield_now().await;

        tokio::time::sleep(Duration::from_millis(10)).await;
        b_cancel.cancel();
        assert!(matches!(b.await.unwrap(), Err(Error::Cancelled)));

        let d = spawn_waiter(CancellationToken::new());
        let c_at = c.await.unwrap().unwrap();
        let d_at = d.await.unwrap().unwrap();

        assert!(c_at >= Duration::from_millis(200));
        assert!(d_at >= c_at + Duration::from_millis(100), "C at {c_at:?}, D at {d_at:?}");
    }
}
