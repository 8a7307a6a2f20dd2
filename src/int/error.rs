//! Telemetry engine error types

use thiserror::Error;

/// Errors produced by the telemetry engine
///
/// Budget rejections are not errors; they surface as
/// [`BudgetDecision`](super::BudgetDecision) values. Only frame embedding,
/// frame extraction and configuration checks fail with this type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntError {
    /// Record pool has no free slot
    #[error("{pool} pool exhausted ({capacity} slots)")]
    PoolExhausted {
        /// Pool name
        pool: &'static str,
        /// Configured capacity
        capacity: usize,
    },

    /// Frame header region cannot grow by the requested amount
    #[error("header allocation failed: need {needed} bytes")]
    HeaderAllocation {
        /// Bytes requested
        needed: usize,
    },

    /// Embedding requested without a carrier
    #[error("no telemetry carrier to embed")]
    NoCarrier,

    /// Information-element list or telemetry content does not decode
    #[error("malformed information element at offset {offset}: {reason}")]
    MalformedElement {
        /// Byte offset within the element list
        offset: usize,
        /// What was wrong
        reason: &'static str,
    },

    /// Configuration value out of range
    #[error("invalid configuration: {field} {reason}")]
    InvalidConfig {
        /// Offending field
        field: &'static str,
        /// Constraint that failed
        reason: &'static str,
    },

    /// Record bytes do not match the engine's record layout
    #[error("record layout mismatch: expected {expected} bytes, got {got}")]
    LayoutMismatch {
        /// Record size of the configured layout
        expected: usize,
        /// Bytes offered
        got: usize,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, IntError>;
