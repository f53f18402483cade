//! Retry Policy: bounded retries with full-jitter exponential backoff.
//!
//! After failed attempt `k` (1-based) the policy sleeps
//! `jitter() * min(max_backoff, base^k)` before trying again. The last attempt's
//! error is returned as-is, with no trailing sleep. Non-retryable errors are
//! returned immediately.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

/// Outcome classification for one fallible step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    #[error("{0}")]
    Retryable(String),

    #[error("{0}")]
    Fatal(String),
}

/// Errors that know whether another attempt could succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for StepError {
    fn is_retryable(&self) -> bool {
        matches!(self, StepError::Retryable(_))
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RetryConfigError {
    #[error("max_attempts must be at least 1, got {0}")]
    ZeroAttempts(u32),

    #[error("backoff base must be a finite number >= 1, got {0}")]
    InvalidBase(f64),
}

// ────────────────────────────────────────────────────────────────────────────
// Injectable sleep and randomness
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Uniform samples in `[0, 1)`.
pub trait JitterSource: Send + Sync {
    fn sample(&self) -> f64;
}

pub struct RandomJitter;

impl JitterSource for RandomJitter {
    fn sample(&self) -> f64 {
        rand::random::<f64>()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Policy
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base: f64,
    max_backoff: Duration,
    sleeper: Arc<dyn Sleeper>,
    jitter: Arc<dyn JitterSource>,
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base", &self.base)
            .field("max_backoff", &self.max_backoff)
            .finish()
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base: f64, max_backoff: Duration) -> Result<Self, RetryConfigError> {
        if max_attempts < 1 {
            return Err(RetryConfigError::ZeroAttempts(max_attempts));
        }
        if !base.is_finite() || base < 1.0 {
            return Err(RetryConfigError::InvalidBase(base));
        }
        Ok(Self {
            max_attempts,
            base,
            max_backoff,
            sleeper: Arc::new(TokioSleeper),
            jitter: Arc::new(RandomJitter),
        })
    }

    #[cfg(test)]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    #[cfg(test)]
    pub fn with_jitter(mut self, jitter: Arc<dyn JitterSource>) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay after failed attempt `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let cap = self.max_backoff.as_secs_f64().min(self.base.powi(exponent));
        let factor = self.jitter.sample().clamp(0.0, 1.0);
        Duration::from_secs_f64(factor * cap)
    }

    /// Runs `op` until it succeeds, fails fatally, or the attempt budget is spent.
    pub async fn run<T, E, F, Fut>(&self, step: &str, mut op: F) -> Result<T, E>
    where
        E: Retryable + Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() || attempt >= self.max_attempts => return Err(e),
                Err(e) => {
                    let delay = self.backoff(attempt);
                    warn!(
                        step,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "step failed, retrying: {e}"
                    );
                    self.sleeper.sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Like [`run`](Self::run) for synchronous work; each attempt runs on the blocking pool.
    pub async fn run_blocking<T, F>(&self, step: &str, op: F) -> Result<T, StepError>
    where
        T: Send + 'static,
        F: Fn() -> Result<T, StepError> + Send + Sync + 'static,
    {
        let op = Arc::new(op);
        self.run(step, || {
            let op = Arc::clone(&op);
            async move {
                tokio::task::spawn_blocking(move || op())
                    .await
                    .map_err(|e| StepError::Fatal(format!("worker thread failed: {e}")))?
            }
        })
        .await
    }
}
