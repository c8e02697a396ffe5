//! Transistor netlists for `rtlpcb`.
//!
//! A [`LogicList`](rtlpcb_logic::LogicList) is lowered into discrete
//! resistor-transistor logic: NMOS pull-down networks against resistor
//! pull-ups, with master-slave latches for flip-flops. The netlist is then
//! cleaned up, placed on a square grid by simulated annealing and written
//! out as a KiCad schematic.
//!
//! # Quick start
//!
//! ```
//! use rtlpcb_logic::{optimize_logic, Design};
//! use rtlpcb_net::{lower_logic_to_net, optimize_net, Grid};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! # fn main() -> rtlpcb_net::Result<()> {
//! let mut logic = Design::Counter { bits: 2 }.build()?;
//! optimize_logic(&mut logic)?;
//!
//! let mut net = lower_logic_to_net(&logic)?;
//! optimize_net(&mut net);
//! assert!(net.counts().get("Bridge").is_none());
//!
//! let grid = Grid::new(&net, &mut StdRng::seed_from_u64(0))?;
//! grid.check_consistency()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`netlist`] | Wires, components, counts, cost and Graphviz output |
//! | [`gates`] | NOT / NOR / NAND / truth-table gates, latches and flip-flops |
//! | [`lower`] | LUT and flip-flop lowering |
//! | [`optimize`] | Bridge merging and orphan removal |
//! | [`place`] | Grid placement and annealing |
//! | [`kicad`] | S-expressions and schematic export |
//! | [`config`] | TOML flow configuration |

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod config;
mod error;
pub mod gates;
pub mod kicad;
pub mod lower;
pub mod netlist;
pub mod optimize;
pub mod place;

pub use config::{AnnealConfig, CostConfig, FlowConfig, SchematicConfig, SwapStrategy};
pub use error::{NetError, Result};
pub use gates::{InvPair, InverterCache};
pub use kicad::{grid_to_schematic, net_to_schematic, Schematic, SchematicBuilder};
pub use lower::lower_logic_to_net;
pub use netlist::{Component, CostReport, NetList, Wire, WireId};
pub use optimize::{combine_connections, optimize_net, NetOptimizeStats};
pub use place::{anneal, AnnealReport, AnnealSample, Grid};
pub use rtlpcb_logic::canonicalize;

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        anneal, grid_to_schematic, lower_logic_to_net, net_to_schematic, optimize_net,
        FlowConfig, Grid, NetError, NetList, Result, SwapStrategy,
    };
}
