use std::future::Future;
use std::time::Duration;

use log::warn;

use crate::error::ApiError;

pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(15);

/// How to react to a 429 answer.
///
/// The delay never grows. `max_retries: None` keeps retrying for as long as
/// the server keeps rate-limiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub delay: Duration,
    pub max_retries: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: DEFAULT_RETRY_DELAY,
            max_retries: None,
        }
    }
}

/// Runs `request` until it yields anything other than
/// [`ApiError::RateLimited`], sleeping `policy.delay` between attempts.
pub async fn retry_rate_limited<T, F, Fut>(
    policy: &RetryPolicy,
    mut request: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut retries = 0u32;
    loop {
        match request().await {
            Err(ApiError::RateLimited) => {
                if policy.max_retries.is_some_and(|max| retries >= max) {
                    return Err(ApiError::RateLimited);
                }
                retries += 1;
                warn!(
                    "rate-limited, sleeping for {}s (retry {})",
                    policy.delay.as_secs(),
                    retries
                );
                tokio::time::sleep(policy.delay).await;
            }
            result => return result,
        }
    }
}
