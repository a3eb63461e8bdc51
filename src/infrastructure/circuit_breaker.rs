//! Circuit Breaker Pattern
//!
//! Stops talking to a failing dependency (the translation cache store) for a
//! while, so a store outage costs one failed call per reset period instead of
//! one per field.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Circuit breaker configuration.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before opening the circuit
    pub failure_threshold: u32,
    /// Duration to keep circuit open before testing
    pub reset_timeout: Duration,
    /// Number of successes in half-open to close circuit
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(30),
            success_threshold: 1,
        }
    }
}

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CircuitState {
    /// Normal operation - calls allowed
    #[default]
    Closed,
    /// Circuit tripped - calls skipped
    Open,
    /// Testing recovery - calls allowed, first failure re-opens
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Lock-free circuit breaker guarding a single dependency.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    /// 0=Closed, 1=Open, 2=HalfOpen
    state: AtomicU32,
    failures: AtomicU32,
    successes: AtomicU32,
    /// ms since `epoch`
    opened_at_ms: AtomicU64,
    epoch: Instant,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            state: AtomicU32::new(0),
            failures: AtomicU32::new(0),
            successes: AtomicU32::new(0),
            opened_at_ms: AtomicU64::new(0),
            epoch: Instant::now(),
        }
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// Current state of the circuit.
    pub fn state(&self) -> CircuitState {
        match self.state.load(Ordering::SeqCst) {
            0 => CircuitState::Closed,
            1 => CircuitState::Open,
            _ => CircuitState::HalfOpen,
        }
    }

    fn set_state(&self, state: CircuitState) {
        let val = match state {
            CircuitState::Closed => 0,
            CircuitState::Open => 1,
            CircuitState::HalfOpen => 2,
        };
        self.state.store(val, Ordering::SeqCst);
    }

    fn open(&self) {
        self.set_state(CircuitState::Open);
        self.opened_at_ms.store(self.now_ms(), Ordering::Relaxed);
        self.successes.store(0, Ordering::Relaxed);
    }

    /// Check whether a call to the dependency may go ahead.
    pub fn allow_request(&self) -> bool {
        match self.state() {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let opened_at = self.opened_at_ms.load(Ordering::Relaxed);
                let reset_timeout_ms = self.config.reset_timeout.as_millis() as u64;

                if self.now_ms().saturating_sub(opened_at) >= reset_timeout_ms {
                    self.set_state(CircuitState::HalfOpen);
                    self.successes.store(0, Ordering::Relaxed);
                    tracing::info!("circuit breaker for {} transitioning to half-open", self.name);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful call.
    pub fn record_success(&self) {
        match self.state() {
            CircuitState::HalfOpen => {
                let successes = self.successes.fetch_add(1, Ordering::Relaxed) + 1;
                if successes >= self.config.success_threshold {
                    self.set_state(CircuitState::Closed);
                    self.failures.store(0, Ordering::Relaxed);
                    self.successes.store(0, Ordering::Relaxed);
                    tracing::info!("circuit breaker for {} closed (recovered)", self.name);
                }
            }
            CircuitState::Closed => {
                self.failures.store(0, Ordering::Relaxed);
            }
            CircuitState::Open => {}
        }
    }

    /// Record a failed call.
    pub fn record_failure(&self) {
        match self.state() {
            CircuitState::Closed => {
                let failures = self.failures.fetch_add(1, Ordering::Relaxed) + 1;
                if failures >= self.config.failure_threshold {
                    self.open();
                    tracing::warn!(
                        "circuit breaker for {} opened after {} failures",
                        self.name,
                        failures
                    );
                }
            }
            CircuitState::HalfOpen => {
                self.open();
                tracing::warn!(
                    "circuit breaker for {} re-opened (failed in half-open)",
                    self.name
                );
            }
            CircuitState::Open => {
                self.opened_at_ms.store(self.now_ms(), Ordering::Relaxed);
            }
        }
    }

    /// Consecutive failures counted while closed.
    pub fn failures(&self) -> u32 {
        self.failures.load(Ordering::Relaxed)
    }
}
