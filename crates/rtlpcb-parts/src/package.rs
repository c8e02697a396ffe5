//! Package footprints considered for the transistor and passive parts.
//!
//! ## Candidates
//!
//! | Package | Body (mm) | Typical use |
//! |---------|-----------|-------------|
//! | SOT-23 | 2.9 × 1.3 | NMOS, cheapest and easiest to hand-rework |
//! | SC-70 | 2.0 × 1.25 | NMOS, smaller |
//! | SOT-563 | 1.6 × 1.2 | dual NMOS |
//! | DFN0603 | 0.6 × 0.3 | NMOS, densest, hardest to assemble |
//! | 0402 | 1.0 × 0.5 | resistors |
//!
//! Body area is only a lower bound for the board area a part needs; pads and
//! courtyard clearance come on top.

/// A physical component package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Package {
    /// SOT-23 three-lead package.
    Sot23,
    /// SC-70 (SOT-323) three-lead package.
    Sc70,
    /// SOT-563 six-lead package.
    Sot563,
    /// DFN0603 leadless package.
    Dfn0603,
    /// Imperial 0402 chip passive (metric 1005).
    R0402,
}

impl Package {
    /// All packages.
    pub const ALL: [Self; 5] = [Self::Sot23, Self::Sc70, Self::Sot563, Self::Dfn0603, Self::R0402];

    /// Nominal body length and width in millimetres.
    #[must_use]
    pub const fn body_mm(self) -> (f64, f64) {
        match self {
            Self::Sot23 => (2.9, 1.3),
            Self::Sc70 => (2.0, 1.25),
            Self::Sot563 => (1.6, 1.2),
            Self::Dfn0603 => (0.6, 0.3),
            Self::R0402 => (1.0, 0.5),
        }
    }

    /// Nominal body area in mm².
    #[must_use]
    pub fn body_area_mm2(self) -> f64 {
        let (l, w) = self.body_mm();
        l * w
    }

    /// KiCad footprint library id.
    #[must_use]
    pub const fn footprint(self) -> &'static str {
        match self {
            Self::Sot23 => "Package_TO_SOT_SMD:SOT-23",
            Self::Sc70 => "Package_TO_SOT_SMD:SOT-323_SC-70",
            Self::Sot563 => "Package_TO_SOT_SMD:SOT-563",
            Self::Dfn0603 => "Package_DFN_QFN:DFN-3_0.6x0.3mm",
            Self::R0402 => "Resistor_SMD:R_0402_1005Metric",
        }
    }

    /// Name as written in part listings.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sot23 => "SOT-23",
            Self::Sc70 => "SC-70",
            Self::Sot563 => "SOT-563",
            Self::Dfn0603 => "DFN0603",
            Self::R0402 => "0402",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dfn_is_smallest() {
        let smallest = Package::ALL
            .iter()
            .min_by(|a, b| a.body_area_mm2().total_cmp(&b.body_area_mm2()))
            .copied();
        assert_eq!(smallest, Some(Package::Dfn0603));
    }

    #[test]
    fn sot23_area() {
        assert!((Package::Sot23.body_area_mm2() - 3.77).abs() < 1e-9);
    }
}
