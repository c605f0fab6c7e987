use std::time::Duration;

use rand::Rng;

const MAX_ATTEMPTS: u32 = 3;
const BASE_DELAY: Duration = Duration::from_millis(500);
const BACKOFF_FACTOR: u32 = 2;
const RETRY_AFTER_CAP: Duration = Duration::from_secs(120);

/// Exponential backoff with full jitter: `delay = random(0, base * factor^attempt)`.
pub fn backoff_delay(attempt: u32) -> Duration {
    let scale = BACKOFF_FACTOR.saturating_pow(attempt);
    let max_delay = BASE_DELAY.saturating_mul(scale);
    let jittered_millis = rand::rng().random_range(0..=max_delay.as_millis().max(1) as u64);
    Duration::from_millis(jittered_millis)
}

/// Caps an upstream `Retry-After` value so a misbehaving host cannot stall a
/// worker indefinitely.
pub fn capped_retry_after(retry_after: Duration) -> Duration {
    retry_after.min(RETRY_AFTER_CAP)
}

pub fn max_attempts() -> u32 {
    MAX_ATTEMPTS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_with_attempt_and_stays_bounded() {
        for attempt in 0..MAX_ATTEMPTS {
            let delay = backoff_delay(attempt);
            let ceiling = BASE_DELAY * BACKOFF_FACTOR.pow(attempt);
            assert!(delay <= ceiling);
        }
    }

    #[test]
    fn retry_after_is_capped() {
        assert_eq!(capped_retry_after(Duration::from_secs(300)), RETRY_AFTER_CAP);
        assert_eq!(capped_retry_after(Duration::from_secs(10)), Duration::from_secs(10));
    }
}
