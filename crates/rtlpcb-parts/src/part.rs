//! Part kinds that the gate library can instantiate.

use crate::package::Package;

/// A discrete part that occupies a footprint on the board.
///
/// Bridges (pure wire joins) are not parts and have no kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PartKind {
    /// N-channel MOSFET, the only active pull-down device in use.
    Nmos,
    /// P-channel MOSFET. Modelled, not yet emitted by the gate library.
    Pmos,
    /// Pull-up resistor.
    Resistor,
    /// Indicator LED.
    Led,
}

impl PartKind {
    /// All kinds, in report order.
    pub const ALL: [Self; 4] = [Self::Nmos, Self::Pmos, Self::Resistor, Self::Led];

    /// Schematic reference designator prefix (`N0`, `R12`, ...).
    #[must_use]
    pub const fn ref_prefix(self) -> &'static str {
        match self {
            Self::Nmos => "N",
            Self::Pmos => "P",
            Self::Resistor => "R",
            Self::Led => "D",
        }
    }

    /// Package assumed when nothing else is specified.
    #[must_use]
    pub const fn default_package(self) -> Package {
        match self {
            Self::Nmos | Self::Pmos => Package::Sot23,
            Self::Resistor | Self::Led => Package::R0402,
        }
    }

    /// Human-readable name used in reports.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Nmos => "NMos",
            Self::Pmos => "PMos",
            Self::Resistor => "Resistor",
            Self::Led => "Led",
        }
    }
}

impl std::fmt::Display for PartKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_are_distinct() {
        let mut prefixes: Vec<_> = PartKind::ALL.iter().map(|k| k.ref_prefix()).collect();
        prefixes.sort_unstable();
        prefixes.dedup();
        assert_eq!(prefixes.len(), PartKind::ALL.len());
    }

    #[test]
    fn transistors_default_to_sot23() {
        assert_eq!(PartKind::Nmos.default_package(), Package::Sot23);
        assert_eq!(PartKind::Resistor.default_package(), Package::R0402);
    }
}
