// Circuit breaker around calls to the server proxy

use crate::core::fault::{CodedFault, X_NETWORK_ERROR};
use failsafe::futures::CircuitBreaker;
use failsafe::{backoff, failure_policy, Config, Error, StateMachine};
use std::time::Duration;

/// Circuit breaker used for upstream forwarding
///
/// Policy:
/// - 5 consecutive failures triggers OPEN state
/// - 5 seconds cool-down period before HALF-OPEN (retry)
pub type UpstreamCircuitBreaker =
    StateMachine<failure_policy::ConsecutiveFailures<backoff::Constant>, ()>;

pub fn create_circuit_breaker() -> UpstreamCircuitBreaker {
    Config::new()
        .failure_policy(failure_policy::consecutive_failures(
            5,
            backoff::constant(Duration::from_secs(5)),
        ))
        .build()
}

/// Run an upstream call under the circuit breaker.
///
/// Both operation failures and rejections by an open circuit surface as
/// `Server.ClientProxy.NetworkError`.
pub async fn execute_with_cb<F, Fut, T, E>(
    cb: &UpstreamCircuitBreaker,
    operation: F,
) -> Result<T, CodedFault>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
{
    match cb.call(operation()).await {
        Ok(val) => Ok(val),
        Err(Error::Inner(e)) => Err(CodedFault::server(
            X_NETWORK_ERROR,
            format!("Server proxy request failed: {}", e),
        )),
        Err(Error::Rejected) => Err(CodedFault::server(
            X_NETWORK_ERROR,
            "Server proxy unavailable: circuit breaker open",
        )),
    }
}
