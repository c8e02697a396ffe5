//! Error types for netlists, placement and file output

use crate::netlist::WireId;
use rtlpcb_logic::LogicError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for net operations
pub type Result<T> = std::result::Result<T, NetError>;

/// Errors that can occur while lowering, placing or exporting a netlist
#[derive(Debug, Error)]
pub enum NetError {
    /// Error from the logic layer
    #[error("Logic error: {source}")]
    Logic {
        /// Underlying logic error
        #[from]
        source: LogicError,
    },

    /// Wire does not belong to this netlist
    #[error("Unknown wire: {wire}")]
    UnknownWire {
        /// Offending wire
        wire: WireId,
    },

    /// Gate table length does not match its input count
    #[error("Gate table has {len} entries, expected 2^{inputs}")]
    TableSize {
        /// Number of gate inputs
        inputs: usize,
        /// Actual table length
        len: usize,
    },

    /// Placement state is inconsistent
    #[error("Placement error: {reason}")]
    Placement {
        /// Reason for failure
        reason: String,
    },

    /// Schematic could not be generated
    #[error("Schematic error: {reason}")]
    Schematic {
        /// Reason for failure
        reason: String,
    },

    /// Configuration file could not be parsed
    #[error("Invalid configuration: {source}")]
    Config {
        /// Underlying TOML error
        #[from]
        source: toml::de::Error,
    },

    /// Configuration file could not be read or output could not be written
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

impl NetError {
    /// Create a placement error
    pub fn placement(reason: impl Into<String>) -> Self {
        Self::Placement {
            reason: reason.into(),
        }
    }

    /// Create a schematic error
    pub fn schematic(reason: impl Into<String>) -> Self {
        Self::Schematic {
            reason: reason.into(),
        }
    }

    /// Create an I/O error for `path`
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an unknown wire error
    pub fn unknown_wire(wire: WireId) -> Self {
        Self::UnknownWire { wire }
    }
}
