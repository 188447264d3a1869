use std::time::Duration;

/// Bounded exponential backoff with jitter for transient storage failures.
#[derive(Clone)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    pub jitter_max: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_backoff: Duration::from_millis(25),
            max_backoff: Duration::from_millis(400),
            jitter_max: Duration::from_millis(50),
        }
    }
}

/// Run `f` until it succeeds or `max_attempts` is exhausted. Only use with
/// operations that are safe to repeat (reads, idempotent writes).
pub async fn retry_async<F, Fut, T, E>(config: RetryConfig, mut f: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    let mut backoff = config.base_backoff;
    let mut attempts_left = config.max_attempts.max(1);

    loop {
        match f().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                attempts_left -= 1;
                if attempts_left == 0 {
                    return Err(e);
                }

                let jitter_ms = config.jitter_max.as_millis() as u64;
                let jitter = if jitter_ms == 0 {
                    0
                } else {
                    rand::random::<u64>() % (jitter_ms + 1)
                };
                tokio::time::sleep(backoff + Duration::from_millis(jitter)).await;
                backoff = std::cmp::min(backoff * 2, config.max_backoff);
            }
        }
    }
}
