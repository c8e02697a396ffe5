//! Technology-independent logic for `rtlpcb`.
//!
//! Designs are written against [`LogicBuilder`], which produces a
//! [`LogicList`]: look-up tables, D flip-flops on a single global clock, and
//! pending connections between signals. The list can be optimised and
//! simulated before it is lowered to transistors by `rtlpcb-net`.
//!
//! # Quick start
//!
//! ```
//! use rtlpcb_logic::{optimize_logic, simulate_idle, Design};
//!
//! # fn main() -> rtlpcb_logic::Result<()> {
//! let mut logic = Design::Counter { bits: 4 }.build()?;
//! optimize_logic(&mut logic)?;
//!
//! let history = simulate_idle(&logic, 5)?;
//! let words: Vec<_> = history.output_words().into_iter().flatten().collect();
//! assert_eq!(words, vec![0, 1, 2, 3, 4]);
//! # Ok(())
//! # }
//! ```
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`logic_list`] | Signals, LUTs, flip-flops, validation and counts |
//! | [`builder`] | Bit / vector / unsigned builder operations |
//! | [`lattice`] | `Undef` / `Def` / `Overdef` lattice |
//! | [`use_def`] | Users and definitions per signal |
//! | [`canonicalize`] | Union-find over equivalence pairs |
//! | [`optimize`] | Connection merge, constant propagation, dead code, dedup |
//! | [`sim`] | Cycle simulator and waveform rendering |
//! | [`designs`] | Counter and SERV ALU |

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod builder;
pub mod canonicalize;
pub mod designs;
mod error;
pub mod lattice;
pub mod logic_list;
pub mod optimize;
pub mod sim;
pub mod use_def;

pub use builder::{Bit, BitVec, LogicBuilder, Unsigned};
pub use canonicalize::canonicalize;
pub use designs::{build_counter, build_serv_alu, Design, ServAluPorts};
pub use error::{LogicError, Result};
pub use lattice::Lattice;
pub use logic_list::{
    Ff, LogicCounts, LogicList, Lut, Signal, SignalId, ValidateOptions, ValidationReport,
    MAX_LUT_INPUTS,
};
pub use optimize::{optimize_logic, OptimizeStats};
pub use sim::{simulate, simulate_idle, History};
pub use use_def::UseDef;

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        optimize_logic, simulate, simulate_idle, Bit, BitVec, Design, LogicBuilder, LogicError,
        LogicList, Result, SignalId, Unsigned,
    };
}
