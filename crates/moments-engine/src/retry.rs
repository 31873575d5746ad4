//! Bounded retry with exponential backoff, shared by every provider.

use std::fmt::Display;
use std::thread;
use std::time::Duration;

use moments_contracts::providers::{NamedProvider, ProviderKind};

use crate::{EngineError, GeneratedImage, MarketingProvider};

pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts is `max_retries + 1`.
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// A policy that retries without sleeping.
    pub fn immediate(max_retries: u32) -> Self {
        Self::new(max_retries, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay after the zero-based `attempt` failed: `base * 2^attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor)
    }
}

/// Runs `operation` until it succeeds or the attempt budget is spent. The
/// final error is returned exactly as the operation produced it.
pub fn retry_with_policy<T, E, F>(policy: &RetryPolicy, label: &str, mut operation: F) -> Result<T, E>
where
    E: Display,
    F: FnMut(u32) -> Result<T, E>,
{
    let mut attempt = 0;
    loop {
        match operation(attempt) {
            Ok(value) => return Ok(value),
            Err(err) => {
                tracing::warn!(
                    operation = label,
                    attempt = attempt + 1,
                    max_attempts = policy.max_attempts(),
                    "attempt failed: {err}"
                );
                if attempt >= policy.max_retries {
                    return Err(err);
                }
                let delay = policy.delay_for(attempt);
                if !delay.is_zero() {
                    thread::sleep(delay);
                }
                attempt += 1;
            }
        }
    }
}

/// Wraps any provider so each of its operations runs under one policy.
pub struct Retrying<P> {
    inner: P,
    policy: RetryPolicy,
}

impl<P: MarketingProvider> Retrying<P> {
    pub fn new(inner: P, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P: MarketingProvider> NamedProvider for Retrying<P> {
    fn kind(&self) -> ProviderKind {
        self.inner.kind()
    }
}

impl<P: MarketingProvider> MarketingProvider for Retrying<P> {
    fn generate_image(&self) -> Result<GeneratedImage, EngineError> {
        let label = format!("{}.generate_image", self.kind());
        retry_with_policy(&self.policy, &label, |_| self.inner.generate_image())
    }

    fn describe_image(&self, image_payload: &str) -> Result<String, EngineError> {
        let label = format!("{}.describe_image", self.kind());
        retry_with_policy(&self.policy, &label, |_| {
            self.inner.describe_image(image_payload)
        })
    }

    fn generate_text(
        &self,
        image_payload: &str,
        selling_point: &str,
        image_description: &str,
    ) -> Result<Vec<String>, EngineError> {
        let label = format!("{}.generate_text", self.kind());
        retry_with_policy(&self.policy, &label, |_| {
            self.inner
                .generate_text(image_payload, selling_point, image_description)
        })
    }
}
