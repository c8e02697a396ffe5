//! KiCad schematic symbol geometry.
//!
//! Pin offsets are in millimetres relative to the symbol origin with y
//! pointing down, as on the schematic sheet. Angles are in degrees as KiCad
//! stores them, pointing from the connection point towards the body. The
//! schematic writer attaches one global label per pin, so only
//! pin placement matters here; body graphics are a plain rectangle.

use crate::package::Package;
use crate::part::PartKind;

/// One pin of a schematic symbol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinDef {
    /// Pin name (`G`, `D`, `S`) or `~` for unnamed passive pins.
    pub name: &'static str,
    /// Pin number as printed on the footprint.
    pub number: &'static str,
    /// X offset from the symbol origin.
    pub x: f64,
    /// Y offset from the symbol origin.
    pub y: f64,
    /// Pin angle in degrees.
    pub angle: f64,
}

impl PinDef {
    /// Key used to attach a net to this pin: the name, or the number for
    /// unnamed pins.
    #[must_use]
    pub fn key(&self) -> &'static str {
        if self.name == "~" {
            self.number
        } else {
            self.name
        }
    }
}

/// A schematic symbol and its board footprint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymbolDef {
    /// Library nickname, e.g. `Device`.
    pub lib: &'static str,
    /// Entry name inside the library, e.g. `R_Small`.
    pub name: &'static str,
    /// Part placed for this symbol.
    pub kind: PartKind,
    /// Half extents of the body rectangle (x, y).
    pub body_half: (f64, f64),
    /// Pins.
    pub pins: &'static [PinDef],
}

impl SymbolDef {
    /// Enhancement-mode NMOS, gate on the left, drain up, source down.
    pub const NMOS: Self = Self {
        lib: "Custom",
        name: "NMOS",
        kind: PartKind::Nmos,
        body_half: (2.54, 2.54),
        pins: &[
            PinDef { name: "G", number: "1", x: -5.08, y: 0.0, angle: 0.0 },
            PinDef { name: "S", number: "2", x: 2.54, y: 5.08, angle: 90.0 },
            PinDef { name: "D", number: "3", x: 2.54, y: -5.08, angle: 270.0 },
        ],
    };

    /// Enhancement-mode PMOS, same pinout as [`SymbolDef::NMOS`].
    pub const PMOS: Self = Self {
        lib: "Custom",
        name: "PMOS",
        kind: PartKind::Pmos,
        body_half: (2.54, 2.54),
        pins: &[
            PinDef { name: "G", number: "1", x: -5.08, y: 0.0, angle: 0.0 },
            PinDef { name: "S", number: "2", x: 2.54, y: -5.08, angle: 270.0 },
            PinDef { name: "D", number: "3", x: 2.54, y: 5.08, angle: 90.0 },
        ],
    };

    /// Small two-terminal resistor.
    pub const R_SMALL: Self = Self {
        lib: "Device",
        name: "R_Small",
        kind: PartKind::Resistor,
        body_half: (0.762, 1.778),
        pins: &[
            PinDef { name: "~", number: "1", x: 0.0, y: -2.54, angle: 270.0 },
            PinDef { name: "~", number: "2", x: 0.0, y: 2.54, angle: 90.0 },
        ],
    };

    /// Small LED, anode on pin 2.
    pub const LED_SMALL: Self = Self {
        lib: "Device",
        name: "LED_Small",
        kind: PartKind::Led,
        body_half: (0.762, 1.778),
        pins: &[
            PinDef { name: "K", number: "1", x: 0.0, y: 2.54, angle: 90.0 },
            PinDef { name: "A", number: "2", x: 0.0, y: -2.54, angle: 270.0 },
        ],
    };

    /// Symbol used for a part kind.
    #[must_use]
    pub const fn for_part(kind: PartKind) -> &'static Self {
        match kind {
            PartKind::Nmos => &Self::NMOS,
            PartKind::Pmos => &Self::PMOS,
            PartKind::Resistor => &Self::R_SMALL,
            PartKind::Led => &Self::LED_SMALL,
        }
    }

    /// Reference designator prefix of the part.
    #[must_use]
    pub const fn ref_prefix(&self) -> &'static str {
        self.kind.ref_prefix()
    }

    /// Footprint package of the part.
    #[must_use]
    pub const fn package(&self) -> Package {
        self.kind.default_package()
    }

    /// `lib:name` identifier.
    #[must_use]
    pub fn lib_id(&self) -> String {
        format!("{}:{}", self.lib, self.name)
    }

    /// Find a pin by its [`PinDef::key`].
    #[must_use]
    pub fn pin(&self, key: &str) -> Option<&PinDef> {
        self.pins.iter().find(|p| p.key() == key)
    }
}
