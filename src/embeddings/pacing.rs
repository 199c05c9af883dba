//! Pacing between embedding batches
//!
//! The embedding provider rate-limits bursts, so batch embedding pauses
//! between chunks. The policy is a trait so the client can be given a fixed
//! delay in production, a token bucket when a hard per-second rate is
//! configured, or no pause at all in tests.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};

use crate::config::SearchConfig;
use crate::types::{AppError, AppResult};

/// Gate awaited between two consecutive batch chunks.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self);
}

/// Sleep for a fixed interval.
#[derive(Debug, Clone)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

#[async_trait]
impl Pacer for FixedDelay {
    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

/// Token bucket allowing `per_second` chunk starts per second.
pub struct TokenBucket {
    limiter: DefaultDirectRateLimiter,
}

impl TokenBucket {
    pub fn per_second(per_second: u32) -> AppResult<Self> {
        let rate = NonZeroU32::new(per_second).ok_or_else(|| {
            AppError::Config("Embedding rate must be greater than zero".to_string())
        })?;
        // Burst of one: every pause waits for its own token
        let quota = Quota::per_second(rate).allow_burst(NonZeroU32::MIN);
        Ok(Self {
            limiter: RateLimiter::direct(quota),
        })
    }
}

#[async_trait]
impl Pacer for TokenBucket {
    async fn pause(&self) {
        self.limiter.until_ready().await;
    }
}

/// No pacing at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPause;

#[async_trait]
impl Pacer for NoPause {
    async fn pause(&self) {}
}

/// Pick the pacing policy described by the search configuration.
pub fn pacer_from_config(config: &SearchConfig) -> AppResult<Arc<dyn Pacer>> {
    match config.embed_rate_per_second {
        Some(rate) => Ok(Arc::new(TokenBucket::per_second(rate)?)),
        None => Ok(Arc::new(FixedDelay::new(Duration::from_millis(
            config.embed_batch_delay_ms,
        )))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_fixed_delay_sleeps() {
        let pacer = FixedDelay::new(Duration::from_millis(20));
        let start = Instant::now();
        pacer.pause().await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_token_bucket_first_token_is_immediate() {
        let pacer = TokenBucket::per_second(1000).unwrap();
        let start = Instant::now();
        pacer.pause().await;
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn test_token_bucket_rejects_zero() {
        assert!(matches!(TokenBucket::per_second(0), Err(AppError::Config(_))));
    }

    #[test]
    fn test_pacer_from_config() {
        let mut config = SearchConfig::default();
        assert!(pacer_from_config(&config).is_ok());
        config.embed_rate_per_second = Some(0);
        assert!(pacer_from_config(&config).is_err());
    }
}
