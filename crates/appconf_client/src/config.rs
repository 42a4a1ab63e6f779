//! Configuration for the transport and its retry behaviour.

use appconf_core::wire::API_VERSION;
use appconf_core::AppConfigError;
use std::time::Duration;

/// Configuration for HTTP calls against one store.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout.
    pub timeout: Duration,
    /// Value of the `User-Agent` header.
    pub user_agent: String,
    /// Value of the `api-version` query parameter.
    pub api_version: String,
}

impl ClientConfig {
    /// Creates a configuration with default settings.
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("appconf/{}", env!("CARGO_PKG_VERSION")),
            api_version: API_VERSION.to_string(),
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome classes a [`RetryPolicy`] may retry on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryCondition {
    /// The entry is not (yet) visible.
    NotFound,
    /// The store answered 429.
    Throttled,
}

impl RetryCondition {
    fn matches(self, err: &AppConfigError) -> bool {
        match self {
            RetryCondition::NotFound => err.is_not_found(),
            RetryCondition::Throttled => err.is_throttled(),
        }
    }
}

/// Retry behaviour for reads.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, the first one included.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Multiplier applied per further attempt; `1.0` gives fixed spacing.
    pub backoff_multiplier: f64,
    /// Outcomes that trigger another attempt.
    pub retry_on: Vec<RetryCondition>,
}

impl RetryPolicy {
    /// Creates a policy with fixed 500 ms spacing that retries on not-found.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 1.0,
            retry_on: vec![RetryCondition::NotFound],
        }
    }

    /// Policy used to ride out the store's eventual-consistency window:
    /// 5 attempts, 500 ms apart, retrying only on not-found.
    pub fn eventual_consistency() -> Self {
        Self::new(5)
    }

    /// Creates a policy with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            retry_on: Vec::new(),
        }
    }

    /// Sets the maximum number of attempts.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Also retries throttled (429) responses.
    pub fn retry_on_throttled(mut self) -> Self {
        if !self.retry_on.contains(&RetryCondition::Throttled) {
            self.retry_on.push(RetryCondition::Throttled);
        }
        self
    }

    /// Returns true if `err` should trigger another attempt.
    pub fn should_retry(&self, err: &AppConfigError) -> bool {
        self.retry_on.iter().any(|condition| condition.matches(err))
    }

    /// Calculates the delay before a given attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let delay_secs = self.initial_delay.as_secs_f64()
            * self
                .backoff_multiplier
                .powi(attempt.saturating_sub(1) as i32);

        if !delay_secs.is_finite() || delay_secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(delay_secs.max(0.0))
    }

    /// Longest time a caller can be blocked waiting between attempts.
    pub fn total_delay(&self) -> Duration {
        (1..self.max_attempts)
            .map(|attempt| self.delay_for_attempt(attempt))
            .sum()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::eventual_consistency()
    }
}
