//! Request pacing for page drivers
//!
//! Every navigation a driver performs goes through a [`Pacer`]. The first
//! request is never delayed; later ones are spaced according to the
//! configured [`PacingPolicy`].

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::time::Duration;
use tokio::time::Instant;

/// Delay rule applied before each navigation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PacingPolicy {
    /// No spacing between requests
    None,
    /// Fixed minimum gap between consecutive requests
    FixedDelay { millis: u64 },
    /// At most `per_second` requests per second, no bursting
    RateLimited { per_second: u32 },
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self::FixedDelay { millis: 1500 }
    }
}

impl PacingPolicy {
    /// Human readable description for logs
    pub fn describe(&self) -> String {
        match self {
            Self::None => "none".to_string(),
            Self::FixedDelay { millis } => format!("fixed_delay({millis}ms)"),
            Self::RateLimited { per_second } => format!("rate_limited({per_second}/s)"),
        }
    }
}

/// Stateful pacer owned by one driver
pub struct Pacer {
    policy: PacingPolicy,
    last_request: Option<Instant>,
    limiter: Option<DefaultDirectRateLimiter>,
}

impl Pacer {
    pub fn new(policy: &PacingPolicy) -> Self {
        let limiter = match policy {
            PacingPolicy::RateLimited { per_second } => {
                let rate = NonZeroU32::new(*per_second).unwrap_or(NonZeroU32::MIN);
                let quota = Quota::per_second(rate).allow_burst(NonZeroU32::MIN);
                Some(RateLimiter::direct(quota))
            }
            _ => None,
        };

        Self {
            policy: policy.clone(),
            last_request: None,
            limiter,
        }
    }

    pub fn policy(&self) -> &PacingPolicy {
        &self.policy
    }

    /// Wait until the next request is allowed, then record it
    pub async fn pace(&mut self) {
        match &self.policy {
            PacingPolicy::None => {}
            PacingPolicy::FixedDelay { millis } => {
                if let Some(last) = self.last_request {
                    let gap = Duration::from_millis(*millis);
                    let elapsed = last.elapsed();
                    if elapsed < gap {
                        tokio::time::sleep(gap - elapsed).await;
                    }
                }
            }
            PacingPolicy::RateLimited { .. } => {
                if let Some(limiter) = &self.limiter {
                    limiter.until_ready().await;
                }
            }
        }

        self.last_request = Some(Instant::now());
    }
}
