//! Physical part model for discrete resistor-transistor logic boards.
//!
//! This crate has **no dependencies** and does no I/O. It is a pure model
//! of what ends up on the board: which parts exist, what package they come
//! in, what they cost, how their schematic symbols are pinned out, and what
//! the fab can manufacture.
//!
//! Cost figures are JLCPCB basic-part prices per unit, doubled to account
//! for the board area each part occupies.
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`part`] | Part kinds (NMOS, PMOS, resistor, LED) and reference prefixes |
//! | [`package`] | SOT-23 / SC-70 / SOT-563 / DFN0603 / 0402 body sizes and footprints |
//! | [`cost`] | Unit cost table and totals |
//! | [`fab`] | JLCPCB trace/via capability limits |
//! | [`symbol`] | KiCad symbol pin geometry for each part kind |

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cost;
pub mod fab;
pub mod package;
pub mod part;
pub mod symbol;

pub use cost::CostTable;
pub use fab::FabCapabilities;
pub use package::Package;
pub use part::PartKind;
pub use symbol::{PinDef, SymbolDef};
