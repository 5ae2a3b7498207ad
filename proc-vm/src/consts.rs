//! Runtime parameters and protocol constants.

/// Service port procedure requests are addressed to.
pub const PROC_PORT: u8 = 14;

/// Builder-side read-only slot range; slots below this index are refused by
/// client helpers, never by the server.
pub const RESERVED_PROC_SLOTS: u8 = 0;

/// Default cap on concurrently live workers.
pub const MAX_CONCURRENT: usize = 16;

/// Default bound on nested non-tail procedure calls per worker.
pub const MAX_RECURSION_DEPTH: usize = 1000;

/// Default upper bound on a single blocking guard, in milliseconds.
pub const MAX_BLOCK_TIMEOUT_MS: u64 = 5_000_000;

/// Default pause between blocking-guard re-evaluations, in milliseconds.
pub const MIN_BLOCK_PERIOD_MS: u64 = 250;

/// Default timeout for remote parameter operations, in milliseconds.
pub const PARAM_REMOTE_TIMEOUT_MS: u64 = 1_000;

/// Whether remote parameter writes await an acknowledgement by default.
pub const PARAM_ACK_ON_PUSH: bool = true;

/// Absolute tolerance for floating-point equality comparisons.
pub const PROC_FLOAT_EPSILON: f64 = 1e-6;

/// Bound on the stop-all teardown loop.
pub(crate) const STOP_ALL_ITERATION_LIMIT: usize = 1000;
