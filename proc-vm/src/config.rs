//! Injected runtime configuration.

use std::time::Duration;

use crate::consts::*;

/// Tunables shared by the interpreter and the runtime supervisor.
///
/// A single long-lived instance is expected; every service takes it
/// explicitly instead of reading process-wide state.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Cap on concurrently live workers.
    pub max_concurrent: usize,
    /// Bound on nested non-tail procedure calls per worker.
    pub max_recursion_depth: usize,
    /// Upper bound on a single blocking guard.
    pub block_timeout: Duration,
    /// Pause between blocking-guard re-evaluations.
    pub block_period: Duration,
    /// Timeout for remote parameter operations.
    pub remote_timeout: Duration,
    /// Await acknowledgements for remote parameter writes.
    pub ack_on_push: bool,
    /// Absolute tolerance for floating-point equality comparisons.
    pub float_epsilon: f64,
    /// Network addresses of the executing node's own interfaces.
    ///
    /// An instruction targeting one of these (or node 0) resolves its
    /// parameters locally.
    pub local_addresses: Vec<u16>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_concurrent: MAX_CONCURRENT,
            max_recursion_depth: MAX_RECURSION_DEPTH,
            block_timeout: Duration::from_millis(MAX_BLOCK_TIMEOUT_MS),
            block_period: Duration::from_millis(MIN_BLOCK_PERIOD_MS),
            remote_timeout: Duration::from_millis(PARAM_REMOTE_TIMEOUT_MS),
            ack_on_push: PARAM_ACK_ON_PUSH,
            float_epsilon: PROC_FLOAT_EPSILON,
            local_addresses: Vec::new(),
        }
    }
}
