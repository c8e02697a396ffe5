//! KiCad output.

pub mod schematic;
pub mod sexpr;

pub use schematic::{
    grid_to_schematic, net_to_schematic, wire_labels, PlacedLabel, PlacedSymbol, Schematic,
    SchematicBuilder,
};
pub use sexpr::SExpr;
