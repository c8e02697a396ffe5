//! Per-part cost model.

use crate::part::PartKind;

/// Board area multiplier applied on top of the part price.
///
/// Assembly and PCB area scale roughly with the part price for these tiny
/// parts, so both are folded into a single factor.
pub const AREA_FACTOR: f64 = 2.0;

/// JLCPCB unit price of a SOT-23 NMOS (USD).
pub const NMOS_UNIT_PRICE: f64 = 0.0062;

/// JLCPCB unit price of a 0402 resistor (USD).
pub const RESISTOR_UNIT_PRICE: f64 = 0.0005;

/// Unit cost per part kind, in USD.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostTable {
    /// Cost of one NMOS.
    pub nmos: f64,
    /// Cost of one PMOS.
    pub pmos: f64,
    /// Cost of one resistor.
    pub resistor: f64,
    /// Cost of one LED.
    pub led: f64,
}

impl CostTable {
    /// Default pricing: NMOS and resistor prices doubled for board area,
    /// unpriced parts at zero.
    pub const JLCPCB: Self = Self {
        nmos: NMOS_UNIT_PRICE * AREA_FACTOR,
        pmos: 0.0,
        resistor: RESISTOR_UNIT_PRICE * AREA_FACTOR,
        led: 0.0,
    };

    /// Unit cost for one part kind.
    #[must_use]
    pub const fn unit(&self, kind: PartKind) -> f64 {
        match kind {
            PartKind::Nmos => self.nmos,
            PartKind::Pmos => self.pmos,
            PartKind::Resistor => self.resistor,
            PartKind::Led => self.led,
        }
    }

    /// Total cost of a bag of parts.
    pub fn total<I>(&self, counts: I) -> f64
    where
        I: IntoIterator<Item = (PartKind, usize)>,
    {
        counts
            .into_iter()
            .map(|(kind, count)| self.unit(kind) * count as f64)
            .sum()
    }
}

impl Default for CostTable {
    fn default() -> Self {
        Self::JLCPCB
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverter_cost() {
        // one NMOS + one pull-up
        let cost = CostTable::JLCPCB.total([(PartKind::Nmos, 1), (PartKind::Resistor, 1)]);
        assert!((cost - 0.0134).abs() < 1e-12);
    }

    #[test]
    fn unpriced_parts_are_free() {
        assert_eq!(CostTable::default().unit(PartKind::Pmos), 0.0);
    }
}
