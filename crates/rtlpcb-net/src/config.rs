//! Flow configuration, loadable from TOML.
//!
//! ```toml
//! [anneal]
//! steps = 50000
//! seed = 7
//! strategy = "directional"
//!
//! [costs]
//! nmos = 0.0124
//!
//! [schematic]
//! distance = 16
//! ```
//!
//! Every field is optional; missing fields take their defaults.

use crate::error::{NetError, Result};
use rtlpcb_parts::CostTable;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// How [`anneal`](crate::place::anneal) picks the two cells to swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SwapStrategy {
    /// Two uniformly random cells.
    #[default]
    Random,
    /// A component on a wire picked by cost, and a random cell.
    LongWire,
    /// A random component, and a cell near the centroid of its neighbours.
    Directional,
}

impl SwapStrategy {
    /// All strategies.
    pub const ALL: [Self; 3] = [Self::Random, Self::LongWire, Self::Directional];

    /// Config and command-line name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::LongWire => "long-wire",
            Self::Directional => "directional",
        }
    }
}

impl fmt::Display for SwapStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SwapStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|st| st.name() == s)
            .ok_or_else(|| format!("unknown swap strategy '{s}' (random, long-wire, directional)"))
    }
}

/// Simulated annealing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnnealConfig {
    /// Swap attempts.
    pub steps: usize,
    /// Seed for the placement RNG.
    pub seed: u64,
    /// Acceptance probability of a non-improving swap at the first step.
    pub temperature_start: f64,
    /// Acceptance probability of a non-improving swap at the last step.
    pub temperature_end: f64,
    /// Move picker.
    pub strategy: SwapStrategy,
    /// Steps between progress samples.
    pub report_every: usize,
}

impl Default for AnnealConfig {
    fn default() -> Self {
        Self {
            steps: 10_000,
            seed: 0,
            temperature_start: 0.0,
            temperature_end: 0.0,
            strategy: SwapStrategy::Random,
            report_every: 1_000,
        }
    }
}

/// Unit cost overrides in USD.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct CostConfig {
    /// One NMOS.
    pub nmos: f64,
    /// One PMOS.
    pub pmos: f64,
    /// One resistor.
    pub resistor: f64,
    /// One LED.
    pub led: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        let t = CostTable::JLCPCB;
        Self {
            nmos: t.nmos,
            pmos: t.pmos,
            resistor: t.resistor,
            led: t.led,
        }
    }
}

impl CostConfig {
    /// As a cost table.
    pub const fn to_table(self) -> CostTable {
        CostTable {
            nmos: self.nmos,
            pmos: self.pmos,
            resistor: self.resistor,
            led: self.led,
        }
    }
}

/// Schematic layout. A grid cell `(x, y)` lands at
/// `grid_mm * (margin + x * distance)`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SchematicConfig {
    /// KiCad grid pitch in mm.
    pub grid_mm: f64,
    /// Offset of the first cell, in grid units. Also added twice to the
    /// paper size, in mm.
    pub margin: f64,
    /// Cell pitch in grid units.
    pub distance: f64,
}

impl Default for SchematicConfig {
    fn default() -> Self {
        Self {
            grid_mm: 1.27,
            margin: 40.0,
            distance: 20.0,
        }
    }
}

impl SchematicConfig {
    /// Position in mm of grid cell `(x, y)`.
    #[allow(clippy::cast_precision_loss)]
    pub fn position(&self, x: usize, y: usize) -> (f64, f64) {
        (
            self.grid_mm * (self.margin + x as f64 * self.distance),
            self.grid_mm * (self.margin + y as f64 * self.distance),
        )
    }
}

/// Configuration for the whole flow.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Placement.
    pub anneal: AnnealConfig,
    /// Part pricing.
    pub costs: CostConfig,
    /// Schematic output.
    pub schematic: SchematicConfig,
}

impl FlowConfig {
    /// Parse TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Config`] on malformed input.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Io`] if the file cannot be read, or
    /// [`NetError::Config`] on malformed input.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| NetError::io(path, e))?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_is_default() {
        assert_eq!(FlowConfig::from_toml_str("").unwrap(), FlowConfig::default());
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let cfg = FlowConfig::from_toml_str(
            r#"
            [anneal]
            steps = 500
            strategy = "long-wire"

            [costs]
            led = 0.01
            "#,
        )
        .unwrap();
        assert_eq!(cfg.anneal.steps, 500);
        assert_eq!(cfg.anneal.strategy, SwapStrategy::LongWire);
        assert_eq!(cfg.anneal.report_every, 1_000);
        assert!((cfg.costs.to_table().led - 0.01).abs() < 1e-12);
        assert!((cfg.costs.nmos - CostTable::JLCPCB.nmos).abs() < 1e-12);
        assert_eq!(cfg.schematic, SchematicConfig::default());
    }

    #[test]
    fn bad_strategy_is_rejected() {
        let err = FlowConfig::from_toml_str("[anneal]\nstrategy = \"sideways\"").unwrap_err();
        assert!(matches!(err, NetError::Config { .. }));
        assert!("sideways".parse::<SwapStrategy>().is_err());
        assert_eq!("directional".parse::<SwapStrategy>(), Ok(SwapStrategy::Directional));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = FlowConfig::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, NetError::Io { .. }));
    }

    #[test]
    fn cell_position() {
        let (x, y) = SchematicConfig::default().position(1, 0);
        assert!((x - 1.27 * 60.0).abs() < 1e-9);
        assert!((y - 1.27 * 40.0).abs() < 1e-9);
    }
}
