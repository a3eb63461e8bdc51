//! Infrastructure Layer
//!
//! Cross-cutting concerns and infrastructure components.

pub mod circuit_breaker;
pub mod shutdown;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use shutdown::shutdown_signal;
