use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Mutex;

use governor::{Quota, RateLimiter};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};

type HostLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Steady-state rate and burst size for a token bucket.
#[derive(Debug, Clone, Copy)]
pub struct RateSpec {
    pub steady_per_sec: u32,
    pub burst: u32,
}

impl RateSpec {
    const fn new(steady_per_sec: u32, burst: u32) -> Self {
        Self { steady_per_sec, burst }
    }

    fn quota(&self) -> Quota {
        let burst = NonZeroU32::new(self.burst.max(1)).expect("burst is nonzero");
        Quota::per_second(NonZeroU32::new(self.steady_per_sec.max(1)).expect("rate is nonzero"))
            .allow_burst(burst)
    }
}

/// Unknown hosts get a conservative default; ATS vendor APIs are more
/// permissive because they are built to serve this traffic pattern.
const DEFAULT_HOST_RATE: RateSpec = RateSpec::new(1, 2);

fn ats_override(ats_type: Option<&str>) -> Option<RateSpec> {
    match ats_type {
        Some("greenhouse") | Some("lever") | Some("ashby") | Some("workday") => {
            Some(RateSpec::new(5, 10))
        }
        _ => None,
    }
}

/// Per-host token buckets, guarded by a short mutex per spec.md §5's
/// "token-bucket state is guarded by a short mutex".
pub struct HostRateLimiters {
    buckets: Mutex<HashMap<String, std::sync::Arc<HostLimiter>>>,
}

impl HostRateLimiters {
    pub fn new() -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
        }
    }

    fn limiter_for(&self, host: &str, ats_type: Option<&str>) -> std::sync::Arc<HostLimiter> {
        let mut buckets = self.buckets.lock().expect("rate limiter mutex poisoned");
        if let Some(existing) = buckets.get(host) {
            return existing.clone();
        }
        let spec = ats_override(ats_type).unwrap_or(DEFAULT_HOST_RATE);
        let limiter = std::sync::Arc::new(RateLimiter::direct(spec.quota()));
        buckets.insert(host.to_string(), limiter.clone());
        limiter
    }

    /// Blocks the calling task until a token is available for `host`.
    pub async fn acquire(&self, host: &str, ats_type: Option<&str>) {
        let limiter = self.limiter_for(host, ats_type);
        limiter.until_ready().await;
    }
}

impl Default for HostRateLimiters {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ats_hosts_get_a_more_permissive_quota() {
        let default_spec = DEFAULT_HOST_RATE;
        let greenhouse_spec = ats_override(Some("greenhouse")).unwrap();
        assert!(greenhouse_spec.steady_per_sec > default_spec.steady_per_sec);
        assert!(ats_override(Some("unknown-vendor")).is_none());
    }

    #[tokio::test]
    async fn acquire_reuses_the_same_bucket_per_host() {
        let limiters = HostRateLimiters::new();
        limiters.acquire("boards.greenhouse.io", Some("greenhouse")).await;
        limiters.acquire("boards.greenhouse.io", Some("greenhouse")).await;
        assert_eq!(limiters.buckets.lock().unwrap().len(), 1);
    }
}
