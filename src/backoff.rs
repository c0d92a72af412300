//! Retry delay computation: capped exponential backoff with jitter, overridden
//! by a server-supplied `Retry-After` hint when one is present and parseable.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;

/// Fraction of the exponential component drawn as jitter. Jitter keeps
/// independent callers from retrying in lockstep; the exact distribution is
/// not load-bearing but must stay non-negative and bounded.
const JITTER_FACTOR: f64 = 0.2;

/// Capped exponential backoff policy.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    base: Duration,
    cap: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            cap: Duration::from_secs(30),
        }
    }
}

impl BackoffPolicy {
    #[must_use]
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap }
    }

    /// Compute the wait before the next attempt.
    ///
    /// A parseable `retry_after` hint (integer seconds or an HTTP-date) wins
    /// outright; malformed hints are ignored. Otherwise the delay is
    /// `min(cap, base * 2^(attempt-1))` plus uniform jitter in
    /// `[0, JITTER_FACTOR * exponential]`, so the non-hinted path never
    /// exceeds `cap * (1 + JITTER_FACTOR)`.
    #[must_use]
    pub fn delay(&self, attempt: u32, retry_after: Option<&str>) -> Duration {
        if let Some(hinted) = retry_after.and_then(parse_retry_after) {
            return hinted;
        }

        let exponential = self.exponential_secs(attempt);
        let jitter = rand::thread_rng().gen_range(0.0..=exponential * JITTER_FACTOR);
        Duration::from_secs_f64(exponential + jitter)
    }

    /// Pre-jitter exponential component in seconds, non-decreasing in
    /// `attempt` up to the cap.
    fn exponential_secs(&self, attempt: u32) -> f64 {
        let doubling = 2f64.powi(attempt.saturating_sub(1).min(i32::MAX as u32) as i32);
        self.cap
            .as_secs_f64()
            .min(self.base.as_secs_f64() * doubling)
    }
}

/// Parse a `Retry-After` header value into a delay.
///
/// Accepts a non-negative integer count of seconds or an RFC 2822 HTTP-date;
/// a date in the past clamps to zero. Anything else yields `None`.
fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if value.bytes().all(|b| b.is_ascii_digit()) {
        return value.parse::<u64>().ok().map(Duration::from_secs);
    }

    let date = DateTime::parse_from_rfc2822(value).ok()?;
    let delta = date.signed_duration_since(Utc::now());
    Some(delta.to_std().unwrap_or(Duration::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_bounded_by_cap_plus_jitter() {
        let policy = BackoffPolicy::default();
        let bound = Duration::from_secs(30).as_secs_f64() * (1.0 + JITTER_FACTOR);
        for attempt in 1..=12 {
            for _ in 0..50 {
                let delay = policy.delay(attempt, None);
                assert!(delay.as_secs_f64() <= bound, "attempt {attempt}: {delay:?}");
            }
        }
    }

    #[test]
    fn test_exponential_component_non_decreasing() {
        let policy = BackoffPolicy::default();
        let mut previous = 0.0;
        for attempt in 1..=12 {
            let current = policy.exponential_secs(attempt);
            assert!(current >= previous, "attempt {attempt} decreased");
            previous = current;
        }
        // And it saturates at the cap
        assert_eq!(policy.exponential_secs(12), 30.0);
    }

    #[test]
    fn test_exponential_doubles_until_cap() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.exponential_secs(1), 1.0);
        assert_eq!(policy.exponential_secs(2), 2.0);
        assert_eq!(policy.exponential_secs(3), 4.0);
        assert_eq!(policy.exponential_secs(5), 16.0);
        assert_eq!(policy.exponential_secs(6), 30.0);
    }

    #[test]
    fn test_retry_after_seconds_override() {
        let policy = BackoffPolicy::default();
        for attempt in [1, 3, 5] {
            assert_eq!(
                policy.delay(attempt, Some("120")),
                Duration::from_secs(120)
            );
        }
    }

    #[test]
    fn test_retry_after_http_date() {
        let policy = BackoffPolicy::default();
        let future = (Utc::now() + chrono::Duration::seconds(90)).to_rfc2822();
        let delay = policy.delay(1, Some(&future));
        assert!(delay >= Duration::from_secs(80), "{delay:?}");
        assert!(delay <= Duration::from_secs(90), "{delay:?}");
    }

    #[test]
    fn test_retry_after_past_date_clamps_to_zero() {
        let past = (Utc::now() - chrono::Duration::seconds(600)).to_rfc2822();
        assert_eq!(parse_retry_after(&past), Some(Duration::ZERO));
    }

    #[test]
    fn test_malformed_hint_ignored() {
        let policy = BackoffPolicy::default();
        for hint in ["soon", "-5", "12.5", ""] {
            let delay = policy.delay(1, Some(hint));
            // Falls back to the computed backoff for attempt 1
            assert!(delay.as_secs_f64() <= 1.0 * (1.0 + JITTER_FACTOR), "{hint:?}");
        }
    }

    #[test]
    fn test_parse_retry_after_rejects_garbage() {
        assert_eq!(parse_retry_after("not a date"), None);
        assert_eq!(parse_retry_after(""), None);
        assert_eq!(parse_retry_after("  "), None);
    }

    #[test]
    fn test_parse_retry_after_trims_whitespace() {
        assert_eq!(parse_retry_after(" 42 "), Some(Duration::from_secs(42)));
    }
}
