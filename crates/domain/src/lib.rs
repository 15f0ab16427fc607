//! Shared domain types for the reasoning trace optimizer.
//!
//! Everything here is plain data: the trace records produced by capture,
//! the analysis and optimization results, the loop bookkeeping types, the
//! provider-agnostic wire message types, and the shared error/config types.
//! Behavior lives in `rto-engine` and `rto-providers`.

pub mod analysis;
pub mod config;
pub mod error;
pub mod iteration;
pub mod message;
pub mod optimize;
pub mod stream;
pub mod trace;
