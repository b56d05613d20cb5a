//! Retry backoff controller
//!
//! Decides how long to wait after each failed attempt. A rate-limit hint
//! from the server always wins and is used as-is; anything else falls back
//! to a jittered exponential schedule.

use crate::error::Error;
use rand::Rng;
use std::time::Duration;

/// Maximum number of attempts per request, the first one included
pub const MAX_TRIES: u32 = 8;

/// Convert a `rate-limit-msec-left` value into a whole-second wait
pub fn wait_from_msec_left(msec_left: u64) -> Duration {
    Duration::from_secs(msec_left.div_ceil(1000))
}

/// Configuration for the backoff schedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffConfig {
    /// Maximum number of attempts
    pub max_tries: u32,
    /// First exponential wait (doubles afterwards)
    pub factor: Duration,
    /// Cap on a single exponential wait
    pub max_backoff: Duration,
    /// Upper bound of the random jitter added to exponential waits
    pub max_jitter: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            max_tries: MAX_TRIES,
            factor: Duration::from_secs(2),
            max_backoff: Duration::from_secs(300),
            max_jitter: Duration::from_secs(1),
        }
    }
}

impl BackoffConfig {
    /// Schedule without jitter, mostly for tests
    #[must_use]
    pub fn without_jitter(mut self) -> Self {
        self.max_jitter = Duration::ZERO;
        self
    }

    /// Set the first exponential wait
    #[must_use]
    pub fn with_factor(mut self, factor: Duration) -> Self {
        self.factor = factor;
        self
    }

    /// Set the maximum number of attempts
    #[must_use]
    pub fn with_max_tries(mut self, max_tries: u32) -> Self {
        self.max_tries = max_tries;
        self
    }
}

/// Which schedule produced the last wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffMode {
    /// Waiting exactly as long as the server asked
    RateLimitHint,
    /// Generic jittered exponential backoff
    Exponential,
}

/// Decision after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Sleep for the duration, then try again
    Retry(Duration),
    /// Stop and surface the failure
    GiveUp,
}

/// Per-request backoff state
///
/// Feed it every failure with [`BackoffController::next`]; it counts
/// attempts and answers with the next wait or [`Backoff::GiveUp`].
#[derive(Debug, Clone)]
pub struct BackoffController {
    config: BackoffConfig,
    attempts: u32,
    exponential_waits: u32,
    mode: Option<BackoffMode>,
}

impl BackoffController {
    /// Create a controller with the given schedule
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            attempts: 0,
            exponential_waits: 0,
            mode: None,
        }
    }

    /// Record a failed attempt and decide what to do next
    pub fn next(&mut self, failure: &Error) -> Backoff {
        self.attempts += 1;

        if !failure.is_retryable() || self.attempts >= self.config.max_tries {
            return Backoff::GiveUp;
        }

        if let Some(hint) = failure.rate_limit_hint() {
            self.mode = Some(BackoffMode::RateLimitHint);
            return Backoff::Retry(hint);
        }

        self.mode = Some(BackoffMode::Exponential);
        let wait = self.exponential(self.exponential_waits) + self.jitter();
        self.exponential_waits += 1;
        Backoff::Retry(wait)
    }

    /// Failed attempts recorded so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Maximum attempts allowed
    pub fn max_tries(&self) -> u32 {
        self.config.max_tries
    }

    /// Schedule used for the most recent wait
    pub fn mode(&self) -> Option<BackoffMode> {
        self.mode
    }

    fn exponential(&self, n: u32) -> Duration {
        let delay = self.config.factor.saturating_mul(2u32.saturating_pow(n));
        std::cmp::min(delay, self.config.max_backoff)
    }

    fn jitter(&self) -> Duration {
        let max_ms = self.config.max_jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..=max_ms))
    }
}

impl Default for BackoffController {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}

#[cfg(test)]
mod backoff_tests {
    use super::*;

    fn rate_limited(ms: u64) -> Error {
        Error::from_status(429, "", Some(ms))
    }

    fn server_error() -> Error {
        Error::from_status(503, "unavailable", None)
    }

    #[test]
    fn test_wait_from_msec_left_rounds_up() {
        assert_eq!(wait_from_msec_left(125_000), Duration::from_secs(125));
        assert_eq!(wait_from_msec_left(125_001), Duration::from_secs(126));
        assert_eq!(wait_from_msec_left(1), Duration::from_secs(1));
        assert_eq!(wait_from_msec_left(0), Duration::ZERO);
    }

    #[test]
    fn test_rate_limit_hint_is_exact() {
        // default config has jitter enabled; the hint must ignore it
        let mut controller = BackoffController::default();
        for _ in 0..5 {
            assert_eq!(
                controller.next(&rate_limited(125_000)),
                Backoff::Retry(Duration::from_secs(125))
            );
        }
        assert_eq!(controller.mode(), Some(BackoffMode::RateLimitHint));
    }

    #[test]
    fn test_exponential_fallback() {
        let mut controller = BackoffController::new(
            BackoffConfig::default()
                .with_factor(Duration::from_secs(2))
                .without_jitter(),
        );

        assert_eq!(
            controller.next(&server_error()),
            Backoff::Retry(Duration::from_secs(2))
        );
        assert_eq!(
            controller.next(&server_error()),
            Backoff::Retry(Duration::from_secs(4))
        );
        assert_eq!(
            controller.next(&server_error()),
            Backoff::Retry(Duration::from_secs(8))
        );
        assert_eq!(controller.mode(), Some(BackoffMode::Exponential));
    }

    #[test]
    fn test_exponential_jitter_is_bounded() {
        let mut controller = BackoffController::default();
        let Backoff::Retry(wait) = controller.next(&server_error()) else {
            panic!("Expected retry");
        };
        assert!(wait >= Duration::from_secs(2));
        assert!(wait <= Duration::from_secs(3));
    }

    #[test]
    fn test_exponential_is_capped() {
        let mut controller = BackoffController::new(
            BackoffConfig {
                max_tries: 20,
                factor: Duration::from_secs(100),
                max_backoff: Duration::from_secs(150),
                max_jitter: Duration::ZERO,
            },
        );
        controller.next(&server_error());
        assert_eq!(
            controller.next(&server_error()),
            Backoff::Retry(Duration::from_secs(150))
        );
    }

    #[test]
    fn test_hint_and_fallback_interleave() {
        let mut controller =
            BackoffController::new(BackoffConfig::default().without_jitter());

        assert_eq!(
            controller.next(&server_error()),
            Backoff::Retry(Duration::from_secs(2))
        );
        assert_eq!(
            controller.next(&rate_limited(3_500)),
            Backoff::Retry(Duration::from_secs(4))
        );
        // the exponential schedule resumes where it left off
        assert_eq!(
            controller.next(&server_error()),
            Backoff::Retry(Duration::from_secs(4))
        );
    }

    #[test]
    fn test_gives_up_after_max_tries() {
        let mut controller =
            BackoffController::new(BackoffConfig::default().without_jitter());

        for _ in 1..MAX_TRIES {
            assert!(matches!(
                controller.next(&rate_limited(0)),
                Backoff::Retry(_)
            ));
        }
        assert_eq!(controller.next(&rate_limited(0)), Backoff::GiveUp);
        assert_eq!(controller.attempts(), MAX_TRIES);
    }

    #[test]
    fn test_non_retryable_gives_up_immediately() {
        let mut controller = BackoffController::default();
        assert_eq!(
            controller.next(&Error::from_status(404, "not found", None)),
            Backoff::GiveUp
        );
        assert_eq!(controller.next(&Error::auth("bad password")), Backoff::GiveUp);
    }

    #[test]
    fn test_rate_limit_without_hint_uses_exponential() {
        let mut controller =
            BackoffController::new(BackoffConfig::default().without_jitter());
        assert_eq!(
            controller.next(&Error::from_status(429, "", None)),
            Backoff::Retry(Duration::from_secs(2))
        );
    }
}
