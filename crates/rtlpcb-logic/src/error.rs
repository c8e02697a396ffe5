//! Error types for logic construction, optimisation and simulation

use crate::logic_list::SignalId;
use thiserror::Error;

/// Result type alias for logic operations
pub type Result<T> = std::result::Result<T, LogicError>;

/// Errors that can occur while building or processing a logic list
#[derive(Debug, Error)]
pub enum LogicError {
    /// Signal does not belong to this logic list
    #[error("Unknown signal: {signal}")]
    UnknownSignal {
        /// Offending signal
        signal: SignalId,
    },

    /// Two signals share the same id
    #[error("Duplicate signal id: {signal}")]
    DuplicateSignal {
        /// Offending signal
        signal: SignalId,
    },

    /// LUT table length does not match its input count
    #[error("LUT table has {len} entries, expected 2^{inputs}")]
    TableSize {
        /// Number of LUT inputs
        inputs: usize,
        /// Actual table length
        len: usize,
    },

    /// Vector operands have different widths
    #[error("Width mismatch: {left} vs {right}")]
    WidthMismatch {
        /// Width of the left operand
        left: usize,
        /// Width of the right operand
        right: usize,
    },

    /// Combinational loop found while evaluating a signal
    #[error("Combinational loop through {signal}")]
    CombinationalLoop {
        /// Signal on the loop
        signal: SignalId,
    },

    /// Several drivers produce different values for one signal
    #[error("Conflicting drivers for {signal} in cycle {cycle}")]
    ConflictingDrivers {
        /// Driven signal
        signal: SignalId,
        /// Simulation cycle
        cycle: usize,
    },

    /// Stimulus or evaluation received the wrong number of values
    #[error("Expected {expected} values, got {actual}")]
    ArityMismatch {
        /// Expected count
        expected: usize,
        /// Actual count
        actual: usize,
    },
}

impl LogicError {
    /// Create an unknown signal error
    pub fn unknown_signal(signal: SignalId) -> Self {
        Self::UnknownSignal { signal }
    }

    /// Create a width mismatch error
    pub fn width_mismatch(left: usize, right: usize) -> Self {
        Self::WidthMismatch { left, right }
    }
}
