//! Generic circuit breaker used by the contact/group caches and any
//! other outbound call that needs failure isolation (spec §4.K)
//!
//! States: `Closed`, `Open`, `HalfOpen`. A consecutive-failure count in
//! `Closed` trips the breaker; `Open` denies every call until a
//! timeout elapses, then probes in `HalfOpen` up to a bounded number
//! of calls before closing or re-opening.

use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

/// Configuration for a circuit breaker.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures in `Closed` before opening.
    pub failure_threshold: u32,
    /// Consecutive successes in `HalfOpen` before closing.
    pub success_threshold: u32,
    /// Seconds to wait in `Open` before probing in `HalfOpen`.
    pub half_open_timeout_secs: u64,
    /// Maximum calls admitted while `HalfOpen`.
    pub half_open_max_calls: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            half_open_timeout_secs: 30,
            half_open_max_calls: 2,
        }
    }
}

impl CircuitBreakerConfig {
    /// A tighter configuration for sensitive/critical dependencies.
    #[must_use]
    pub const fn sensitive() -> Self {
        Self {
            failure_threshold: 3,
            success_threshold: 1,
            half_open_timeout_secs: 10,
            half_open_max_calls: 1,
        }
    }

    /// A looser configuration tolerant of flaky dependencies.
    #[must_use]
    pub const fn resilient() -> Self {
        Self {
            failure_threshold: 10,
            success_threshold: 3,
            half_open_timeout_secs: 60,
            half_open_max_calls: 5,
        }
    }
}

/// The circuit breaker's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half-open",
        };
        write!(f, "{label}")
    }
}

/// Returned when a call is denied because the breaker is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("circuit breaker is open")]
pub struct CircuitOpenError;

struct State {
    current: CircuitState,
    failures: u32,
    successes: u32,
    half_open_calls: u32,
    last_failure: Option<Instant>,
}

/// A named, thread-safe circuit breaker.
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    state: RwLock<State>,
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("state", &state.current)
            .field("failures", &state.failures)
            .finish()
    }
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, CircuitBreakerConfig::default())
    }

    #[must_use]
    pub fn with_config(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            state: RwLock::new(State {
                current: CircuitState::Closed,
                failures: 0,
                successes: 0,
                half_open_calls: 0,
                last_failure: None,
            }),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The current state, lazily transitioning `Open` → `HalfOpen`
    /// once the timeout has elapsed.
    #[must_use]
    pub fn state(&self) -> CircuitState {
        {
            let state = self.state.read();
            if state.current != CircuitState::Open {
                return state.current;
            }
            let Some(last_failure) = state.last_failure else {
                return state.current;
            };
            if last_failure.elapsed() < Duration::from_secs(self.config.half_open_timeout_secs) {
                return state.current;
            }
        }
        let mut state = self.state.write();
        if state.current == CircuitState::Open {
            state.current = CircuitState::HalfOpen;
            state.half_open_calls = 0;
            state.successes = 0;
        }
        state.current
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state() == CircuitState::Closed
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    /// Whether a call may proceed right now, admitting half-open
    /// probes up to the configured quota.
    fn allow(&self) -> bool {
        match self.state() {
            CircuitState::Closed => true,
            CircuitState::Open => false,
            CircuitState::HalfOpen => {
                let mut state = self.state.write();
                if state.half_open_calls < self.config.half_open_max_calls {
                    state.half_open_calls += 1;
                    true
                } else {
                    false
                }
            },
        }
    }

    fn on_success(&self) {
        let mut state = self.state.write();
        match state.current {
            CircuitState::Closed => {
                state.failures = 0;
            },
            CircuitState::HalfOpen => {
                state.successes += 1;
                if state.successes >= self.config.success_threshold {
                    state.current = CircuitState::Closed;
                    state.failures = 0;
                    state.successes = 0;
                    state.half_open_calls = 0;
                }
            },
            CircuitState::Open => {},
        }
    }

    fn on_failure(&self) {
        let mut state = self.state.write();
        match state.current {
            CircuitState::Closed => {
                state.failures += 1;
                if state.failures >= self.config.failure_threshold {
                    state.current = CircuitState::Open;
                    state.last_failure = Some(Instant::now());
                }
            },
            CircuitState::HalfOpen => {
                state.current = CircuitState::Open;
                state.last_failure = Some(Instant::now());
                state.successes = 0;
                state.half_open_calls = 0;
            },
            CircuitState::Open => {},
        }
    }

    /// Force the breaker back to `Closed` and clear counters.
    pub fn reset(&self) {
        let mut state = self.state.write();
        state.current = CircuitState::Closed;
        state.failures = 0;
        state.successes = 0;
        state.half_open_calls = 0;
        state.last_failure = None;
    }

    /// Execute `operation` if the breaker allows it, recording the
    /// outcome against the breaker's state.
    pub async fn call<F, Fut, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        if !self.allow() {
            return Err(CircuitBreakerError::CircuitOpen);
        }
        match operation().await {
            Ok(value) => {
                self.on_success();
                Ok(value)
            },
            Err(error) => {
                self.on_failure();
                Err(CircuitBreakerError::ServiceError(error))
            },
        }
    }
}

/// Wraps either a denied call or the underlying operation's error.
#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    #[error("circuit breaker is open")]
    CircuitOpen,
    #[error(transparent)]
    ServiceError(E),
}

impl<E> CircuitBreakerError<E> {
    #[must_use]
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_after_failure_threshold() {
        let breaker = CircuitBreaker::with_config(
            "test",
            CircuitBreakerConfig {
                failure_threshold: 2,
                success_threshold: 1,
                half_open_timeout_secs: 30,
                half_open_max_calls: 1,
            },
        );

        for _ in 0..2 {
            let _ = breaker.call(|| async { Err::<(), _>("boom") }).await;
        }

        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[tokio::test]
    async fn denies_calls_while_open() {
        let breaker = CircuitBreaker::with_config(
            "test",
            CircuitBreakerConfig {
                failure_threshold: 1,
                success_threshold: 1,
                half_open_timeout_secs: 3600,
                half_open_max_calls: 1,
            },
        );
        let _ = breaker.call(|| async { Err::<(), _>("boom") }).await;

        let result = breaker.call(|| async { Ok::<_, &str>(()) }).await;
        assert!(matches!(result, Err(CircuitBreakerError::CircuitOpen)));
    }

    #[tokio::test]
    async fn single_success_clears_failures_in_closed() {
        let breaker = CircuitBreaker::with_config(
            "test",
            CircuitBreakerConfig {
                failure_threshold: 3,
                success_threshold: 1,
                half_open_timeout_secs: 30,
                half_open_max_calls: 1,
            },
        );
        let _ = breaker.call(|| async { Err::<(), _>("boom") }).await;
        let _ = breaker.call(|| async { Ok::<_, &str>(()) }).await;
        assert_eq!(breaker.state(), CircuitState::Closed);

        for _ in 0..2 {
            let _ = breaker.call(|| async { Err::<(), _>("boom") }).await;
        }
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn reset_forces_closed() {
        let breaker = CircuitBreaker::with_config(
            "test",
            CircuitBreakerConfig {
                failure_threshold: 1,
                success_threshold: 1,
                half_open_timeout_secs: 3600,
                half_open_max_calls: 1,
            },
        );
        breaker.on_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        breaker.reset();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_admits_only_quota_calls() {
        let breaker = CircuitBreaker::with_config(
            "test",
            CircuitBreakerConfig {
                failure_threshold: 1,
                success_threshold: 5,
                half_open_timeout_secs: 0,
                half_open_max_calls: 2,
            },
        );
        breaker.on_failure();
        // timeout is zero, so state() transitions Open -> HalfOpen immediately
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(breaker.allow());
        assert!(breaker.allow());
        assert!(!breaker.allow());
    }

    #[test]
    fn half_open_failure_returns_to_open() {
        let breaker = CircuitBreaker::with_config(
            "test",
            CircuitBreakerConfig {
                failure_threshold: 1,
                success_threshold: 2,
                half_open_timeout_secs: 0,
                half_open_max_calls: 3,
            },
        );
        breaker.on_failure();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        breaker.on_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn half_open_success_quota_closes_breaker() {
        let breaker = CircuitBreaker::with_config(
            "test",
            CircuitBreakerConfig {
                failure_threshold: 1,
                success_threshold: 2,
                half_open_timeout_secs: 0,
                half_open_max_calls: 3,
            },
        );
        breaker.on_failure();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        breaker.on_success();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        breaker.on_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn circuit_breaker_error_reports_open() {
        let err: CircuitBreakerError<&str> = CircuitBreakerError::CircuitOpen;
        assert!(err.is_circuit_open());
        let err: CircuitBreakerError<&str> = CircuitBreakerError::ServiceError("boom");
        assert!(!err.is_circuit_open());
    }
}
