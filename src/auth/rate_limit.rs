use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use actix_web::HttpRequest;

const MAX_ATTEMPTS: usize = 5;
const WINDOW_SECS: u64 = 900; // 15 minutes
/// Tracked IPs before a failure sweeps out every expired entry.
const PRUNE_ABOVE: usize = 1024;

/// The peer address the limiter keys on. Requests without one share a
/// single bucket.
pub fn client_ip(req: &HttpRequest) -> IpAddr {
    req.peer_addr()
        .map(|addr| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Failed password checks per client IP, shared across workers.
#[derive(Clone)]
pub struct RateLimiter {
    attempts: Arc<Mutex<HashMap<IpAddr, Vec<Instant>>>>,
    max_attempts: usize,
    window: Duration,
    prune_above: usize,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_limits(MAX_ATTEMPTS, Duration::from_secs(WINDOW_SECS))
    }

    pub fn with_limits(max_attempts: usize, window: Duration) -> Self {
        Self {
            attempts: Arc::new(Mutex::new(HashMap::new())),
            max_attempts,
            window,
            prune_above: PRUNE_ABOVE,
        }
    }

    /// Check if the given IP is rate-limited. Returns true if blocked.
    /// Also lazily cleans up stale entries for the checked IP.
    pub fn is_blocked(&self, ip: IpAddr) -> bool {
        let mut map = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        let window = self.window;

        match map.get_mut(&ip) {
            Some(timestamps) => {
                timestamps.retain(|t| now.duration_since(*t) < window);
                let blocked = timestamps.len() >= self.max_attempts;
                if timestamps.is_empty() {
                    map.remove(&ip);
                }
                blocked
            }
            None => false,
        }
    }

    /// Record a failed attempt for the given IP. Once the map grows past
    /// `prune_above` entries, IPs with no failure inside the window are
    /// dropped so one-off clients do not accumulate.
    pub fn record_failure(&self, ip: IpAddr) {
        let mut map = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        if map.len() >= self.prune_above {
            let window = self.window;
            map.retain(|_, timestamps| {
                timestamps.retain(|t| now.duration_since(*t) < window);
                !timestamps.is_empty()
            });
        }
        map.entry(ip).or_default().push(now);
    }

    /// Clear all recorded attempts for the given IP (call on successful login).
    pub fn clear(&self, ip: IpAddr) {
        let mut map = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
        map.remove(&ip);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn blocks_after_max_failures() {
        let limiter = RateLimiter::with_limits(3, Duration::from_secs(60));
        for _ in 0..2 {
            limiter.record_failure(ip(1));
        }
        assert!(!limiter.is_blocked(ip(1)));
        limiter.record_failure(ip(1));
        assert!(limiter.is_blocked(ip(1)));
        assert!(!limiter.is_blocked(ip(2)));
    }

    #[test]
    fn clear_unblocks() {
        let limiter = RateLimiter::with_limits(1, Duration::from_secs(60));
        limiter.record_failure(ip(3));
        assert!(limiter.is_blocked(ip(3)));
        limiter.clear(ip(3));
        assert!(!limiter.is_blocked(ip(3)));
    }

    #[test]
    fn old_failures_expire() {
        let limiter = RateLimiter::with_limits(1, Duration::from_millis(20));
        limiter.record_failure(ip(4));
        assert!(limiter.is_blocked(ip(4)));
        std::thread::sleep(Duration::from_millis(40));
        assert!(!limiter.is_blocked(ip(4)));
    }

    #[test]
    fn one_off_failures_are_pruned() {
        let limiter = RateLimiter {
            prune_above: 4,
            ..RateLimiter::with_limits(5, Duration::from_millis(20))
        };
        for last in 10..14 {
            limiter.record_failure(ip(last));
        }
        std::thread::sleep(Duration::from_millis(40));
        limiter.record_failure(ip(20));
        limiter.record_failure(ip(20));

        let map = limiter.attempts.lock().unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&ip(20)).map(Vec::len), Some(2));
    }
}
