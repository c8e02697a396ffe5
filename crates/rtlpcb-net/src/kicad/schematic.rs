//! KiCad 7 schematic writer.
//!
//! Components are laid out on a regular grid and never wired graphically:
//! every pin gets a global label named after its wire, and KiCad joins
//! equal labels into one net.

use super::sexpr::SExpr;
use crate::config::SchematicConfig;
use crate::error::{NetError, Result};
use crate::netlist::{Component, NetList, WireId};
use crate::place::Grid;
use rtlpcb_parts::{PartKind, SymbolDef};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

const FORMAT_VERSION: &str = "20230121";
const FONT_SIZE: f64 = 1.27;
const PIN_LENGTH: f64 = 2.54;

/// Unique label text per wire: the special name, else the first debug
/// name, else `wire_<id>`. Later wires that collide get `_<id>` appended.
pub fn wire_labels(net: &NetList) -> BTreeMap<WireId, String> {
    let mut used = BTreeSet::new();
    let mut labels = BTreeMap::new();
    for wire in net.wires() {
        let mut text = wire
            .special_name
            .clone()
            .or_else(|| wire.debug_names.iter().next().cloned())
            .unwrap_or_else(|| format!("wire_{}", wire.id.index()));
        while used.contains(&text) {
            text = format!("{text}_{}", wire.id.index());
        }
        used.insert(text.clone());
        labels.insert(wire.id, text);
    }
    labels
}

/// A global label as placed on the sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLabel {
    /// Net name.
    pub text: String,
    /// X in mm.
    pub x: f64,
    /// Y in mm.
    pub y: f64,
    /// Angle in degrees.
    pub angle: f64,
}

/// A symbol instance as placed on the sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedSymbol {
    /// Reference designator, e.g. `N3`.
    pub reference: String,
    /// `lib:name`.
    pub lib_id: String,
    /// X in mm.
    pub x: f64,
    /// Y in mm.
    pub y: f64,
}

fn effects(justify: Option<&str>, hide: bool) -> SExpr {
    let mut items = vec![SExpr::list(
        "font",
        [SExpr::list("size", [SExpr::num(FONT_SIZE), SExpr::num(FONT_SIZE)])],
    )];
    if let Some(j) = justify {
        items.push(SExpr::named_atom("justify", j));
    }
    if hide {
        items.push(SExpr::atom("hide"));
    }
    SExpr::list("effects", items)
}

fn property(key: &str, value: &str, x: f64, y: f64, hide: bool) -> SExpr {
    SExpr::list(
        "property",
        [
            SExpr::string(key),
            SExpr::string(value),
            SExpr::at(x, y, 0.0),
            effects(None, hide),
        ],
    )
}

fn yes(head: &str) -> SExpr {
    SExpr::named_atom(head, "yes")
}

/// `lib_symbols` entry for one symbol. Library symbols use y up.
fn lib_symbol(def: &SymbolDef) -> SExpr {
    let (bx, by) = def.body_half;
    let body = SExpr::list(
        "symbol",
        [
            SExpr::string(format!("{}_0_1", def.name)),
            SExpr::list(
                "rectangle",
                [
                    SExpr::list("start", [SExpr::num(-bx), SExpr::num(by)]),
                    SExpr::list("end", [SExpr::num(bx), SExpr::num(-by)]),
                    SExpr::list(
                        "stroke",
                        [
                            SExpr::list("width", [SExpr::num(0.254)]),
                            SExpr::named_atom("type", "default"),
                        ],
                    ),
                    SExpr::list("fill", [SExpr::named_atom("type", "background")]),
                ],
            ),
        ],
    );

    let pins = def.pins.iter().map(|pin| {
        SExpr::list(
            "pin",
            [
                SExpr::atom("passive"),
                SExpr::atom("line"),
                SExpr::at(pin.x, -pin.y, pin.angle),
                SExpr::list("length", [SExpr::num(PIN_LENGTH)]),
                SExpr::list("name", [SExpr::string(pin.name), effects(None, false)]),
                SExpr::list("number", [SExpr::string(pin.number), effects(None, false)]),
            ],
        )
    });
    let mut unit = vec![SExpr::string(format!("{}_1_1", def.name))];
    unit.extend(pins);

    SExpr::list(
        "symbol",
        [
            SExpr::string(def.lib_id()),
            yes("in_bom"),
            yes("on_board"),
            property("Reference", def.ref_prefix(), 0.0, by + 1.27, false),
            property("Value", def.name, 0.0, -by - 1.27, false),
            property("Footprint", def.package().footprint(), 0.0, 0.0, true),
            body,
            SExpr::list("symbol", unit),
        ],
    )
}

/// Incrementally builds one schematic sheet.
#[derive(Debug)]
pub struct SchematicBuilder {
    root_uuid: Uuid,
    margin: f64,
    items: Vec<SExpr>,
    next_ref: BTreeMap<&'static str, usize>,
    labels: Vec<PlacedLabel>,
    symbols: Vec<PlacedSymbol>,
}

impl SchematicBuilder {
    /// Empty sheet. `margin` (mm) is added on both sides of the paper.
    pub fn new(margin: f64) -> Self {
        Self {
            root_uuid: Uuid::new_v4(),
            margin,
            items: Vec::new(),
            next_ref: BTreeMap::new(),
            labels: Vec::new(),
            symbols: Vec::new(),
        }
    }

    /// Place a global label. Text extends left of the anchor for angles
    /// below 180 degrees and right of it otherwise.
    pub fn add_label(&mut self, x: f64, y: f64, angle: f64, text: &str) {
        let justify = if angle.rem_euclid(360.0) < 180.0 { "left" } else { "right" };
        self.items.push(SExpr::list(
            "global_label",
            [
                SExpr::string(text),
                SExpr::named_atom("shape", "input"),
                SExpr::at(x, y, angle),
                SExpr::list("fields_autoplaced", Vec::new()),
                effects(Some(justify), false),
                SExpr::uuid(Uuid::new_v4()),
            ],
        ));
        self.labels.push(PlacedLabel {
            text: text.to_string(),
            x,
            y,
            angle,
        });
    }

    /// Place a symbol with one label per pin. `pins` maps pin keys to label
    /// text and must name every pin of `def` exactly once.
    ///
    /// Returns the reference designator.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Schematic`] if `pins` does not match the symbol.
    pub fn add_symbol(
        &mut self,
        def: &SymbolDef,
        x: f64,
        y: f64,
        pins: &[(&str, &str)],
    ) -> Result<String> {
        let expected: BTreeSet<&str> = def.pins.iter().map(|p| p.key()).collect();
        let given: BTreeSet<&str> = pins.iter().map(|&(k, _)| k).collect();
        if expected != given || given.len() != pins.len() {
            return Err(NetError::schematic(format!(
                "pins {given:?} do not match symbol {} pins {expected:?}",
                def.lib_id()
            )));
        }

        let index = self.next_ref.entry(def.ref_prefix()).or_insert(0);
        let reference = format!("{}{index}", def.ref_prefix());
        *index += 1;

        let id = Uuid::new_v4();
        let (_, by) = def.body_half;
        self.items.push(SExpr::list(
            "symbol",
            [
                SExpr::named_str("lib_id", def.lib_id()),
                SExpr::at(x, y, 0.0),
                SExpr::named_atom("unit", "1"),
                yes("in_bom"),
                yes("on_board"),
                SExpr::list("fields_autoplaced", Vec::new()),
                SExpr::uuid(id),
                property("Reference", &reference, x + 3.81, y - by, false),
                property("Value", def.name, x + 3.81, y + by, false),
                property("Footprint", def.package().footprint(), x, y, true),
                SExpr::list(
                    "instances",
                    [SExpr::list(
                        "project",
                        [
                            SExpr::string("rtlpcb"),
                            SExpr::list(
                                "path",
                                [
                                    SExpr::string(format!("/{}", self.root_uuid)),
                                    SExpr::named_str("reference", reference.clone()),
                                    SExpr::named_atom("unit", "1"),
                                ],
                            ),
                        ],
                    )],
                ),
            ],
        ));
        self.symbols.push(PlacedSymbol {
            reference: reference.clone(),
            lib_id: def.lib_id(),
            x,
            y,
        });

        for &(key, text) in pins {
            let Some(pin) = def.pin(key) else { continue };
            let angle = if pin.angle.abs() < f64::EPSILON { 180.0 } else { pin.angle };
            self.add_label(x + pin.x, y + pin.y, angle, text);
        }

        Ok(reference)
    }

    /// Place `component` at `(x, y)`, labelling pins through `labels`.
    /// A bridge becomes two back-to-back labels.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::UnknownWire`] if a terminal has no label.
    pub fn add_component(
        &mut self,
        component: &Component,
        x: f64,
        y: f64,
        labels: &BTreeMap<WireId, String>,
    ) -> Result<()> {
        let text = |w: WireId| -> Result<&str> {
            labels
                .get(&w)
                .map(String::as_str)
                .ok_or_else(|| NetError::unknown_wire(w))
        };

        match *component {
            Component::Bridge { a, b } => {
                let (ta, tb) = (text(a)?.to_string(), text(b)?.to_string());
                self.add_label(x, y, 0.0, &ta);
                self.add_label(x, y, 180.0, &tb);
                return Ok(());
            }
            Component::Nmos { gate, up, down } => {
                let pins = [("G", text(gate)?), ("D", text(up)?), ("S", text(down)?)];
                self.add_symbol(&SymbolDef::NMOS, x, y, &pins)?;
            }
            Component::Pmos { gate, up, down } => {
                let pins = [("G", text(gate)?), ("S", text(up)?), ("D", text(down)?)];
                self.add_symbol(&SymbolDef::PMOS, x, y, &pins)?;
            }
            Component::Resistor { a, b } => {
                let pins = [("1", text(a)?), ("2", text(b)?)];
                self.add_symbol(&SymbolDef::R_SMALL, x, y, &pins)?;
            }
            Component::Led { high, low } => {
                let pins = [("A", text(high)?), ("K", text(low)?)];
                self.add_symbol(&SymbolDef::LED_SMALL, x, y, &pins)?;
            }
        }
        Ok(())
    }

    /// Close the sheet. The paper is sized to the furthest symbol plus the
    /// margin on each side.
    pub fn finish(self) -> Schematic {
        let max_x = self.symbols.iter().map(|s| s.x).fold(0.0, f64::max);
        let max_y = self.symbols.iter().map(|s| s.y).fold(0.0, f64::max);
        let width = max_x + 2.0 * self.margin;
        let height = max_y + 2.0 * self.margin;

        let lib_symbols = SExpr::list(
            "lib_symbols",
            PartKind::ALL.iter().map(|&k| lib_symbol(SymbolDef::for_part(k))),
        );

        let mut items = vec![
            SExpr::named_atom("version", FORMAT_VERSION),
            SExpr::named_atom("generator", "rtlpcb"),
            SExpr::uuid(self.root_uuid),
            SExpr::list(
                "paper",
                [SExpr::string("User"), SExpr::num(width), SExpr::num(height)],
            ),
            lib_symbols,
        ];
        items.extend(self.items);
        items.push(SExpr::list(
            "sheet_instances",
            [SExpr::list(
                "path",
                [SExpr::string("/"), SExpr::named_str("page", "1")],
            )],
        ));

        info!(
            symbols = self.symbols.len(),
            labels = self.labels.len(),
            width,
            height,
            "schematic built"
        );
        Schematic {
            root: SExpr::list("kicad_sch", items),
            labels: self.labels,
            symbols: self.symbols,
            paper: (width, height),
        }
    }
}

/// A finished schematic sheet.
#[derive(Debug, Clone)]
pub struct Schematic {
    root: SExpr,
    labels: Vec<PlacedLabel>,
    symbols: Vec<PlacedSymbol>,
    paper: (f64, f64),
}

impl Schematic {
    /// Root `kicad_sch` expression.
    pub fn root(&self) -> &SExpr {
        &self.root
    }

    /// Labels in placement order.
    pub fn labels(&self) -> &[PlacedLabel] {
        &self.labels
    }

    /// Symbols in placement order.
    pub fn symbols(&self) -> &[PlacedSymbol] {
        &self.symbols
    }

    /// Paper width and height in mm.
    pub const fn paper(&self) -> (f64, f64) {
        self.paper
    }

    /// Write as a `.kicad_sch` file.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Io`] if the file cannot be written.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, format!("{self}\n")).map_err(|e| NetError::io(path, e))?;
        debug!(path = %path.display(), "schematic written");
        Ok(())
    }
}

impl fmt::Display for Schematic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.root.fmt(f)
    }
}

/// Schematic with components in netlist order, filling a square grid row
/// by row.
///
/// # Errors
///
/// Fails if a component references a wire the netlist does not hold.
pub fn net_to_schematic(net: &NetList, layout: &SchematicConfig) -> Result<Schematic> {
    let labels = wire_labels(net);
    let mut builder = SchematicBuilder::new(layout.margin);

    let n = net.components().len();
    let mut width = 1;
    while width * width < n {
        width += 1;
    }
    for (i, component) in net.components().iter().enumerate() {
        let (x, y) = layout.position(i % width, i / width);
        builder.add_component(component, x, y, &labels)?;
    }
    Ok(builder.finish())
}

/// Schematic with components where `grid` placed them.
///
/// # Errors
///
/// Returns [`NetError::Schematic`] if `grid` was built for a different
/// netlist.
pub fn grid_to_schematic(net: &NetList, grid: &Grid, layout: &SchematicConfig) -> Result<Schematic> {
    if grid.component_count() != net.components().len() {
        return Err(NetError::schematic(format!(
            "grid holds {} components, netlist has {}",
            grid.component_count(),
            net.components().len()
        )));
    }

    let labels = wire_labels(net);
    let mut builder = SchematicBuilder::new(layout.margin);
    for cell in 0..grid.cell_count() {
        let Some(ci) = grid.component_at(cell) else { continue };
        let (gx, gy) = grid.xy(cell);
        let (x, y) = layout.position(gx, gy);
        builder.add_component(&net.components()[ci], x, y, &labels)?;
    }
    Ok(builder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn inverter() -> (NetList, WireId, WireId) {
        let mut net = NetList::new();
        let input = net.new_wire(Some("in"));
        let out = net.new_wire(Some("out"));
        let (vdd, gnd) = (net.vdd(), net.gnd());
        net.push(Component::Nmos { gate: input, up: out, down: gnd }).unwrap();
        net.push(Component::Resistor { a: vdd, b: out }).unwrap();
        (net, input, out)
    }

    #[test]
    fn labels_prefer_special_then_debug_and_are_unique() {
        let mut net = NetList::new();
        let a = net.new_wire(Some("x"));
        let b = net.new_wire(Some("x"));
        let c = net.new_wire(None);
        let d = net.new_wire(Some("vdd"));
        let labels = wire_labels(&net);
        assert_eq!(labels[&net.vdd()], "vdd");
        assert_eq!(labels[&a], "x");
        assert_eq!(labels[&b], format!("x_{}", b.index()));
        assert_eq!(labels[&c], format!("wire_{}", c.index()));
        assert_eq!(labels[&d], format!("vdd_{}", d.index()));
    }

    #[test]
    fn nmos_pins_follow_drain_up() {
        let (net, _, _) = inverter();
        let sch = net_to_schematic(&net, &SchematicConfig::default()).unwrap();
        let origin = 1.27 * 40.0;

        let drain = sch
            .labels()
            .iter()
            .find(|l| (l.y - (origin - 5.08)).abs() < 1e-9 && (l.x - (origin + 2.54)).abs() < 1e-9)
            .unwrap();
        assert_eq!(drain.text, "out");
        assert!((drain.angle - 270.0).abs() < 1e-9);

        let gate = sch.labels().iter().find(|l| l.text == "in").unwrap();
        assert!((gate.angle - 180.0).abs() < 1e-9);
        assert!((gate.x - (origin - 5.08)).abs() < 1e-9);
    }

    #[test]
    fn references_count_per_prefix() {
        let (mut net, input, out) = inverter();
        let gnd = net.gnd();
        net.push(Component::Nmos { gate: out, up: input, down: gnd }).unwrap();
        let sch = net_to_schematic(&net, &SchematicConfig::default()).unwrap();
        let refs: Vec<&str> = sch.symbols().iter().map(|s| s.reference.as_str()).collect();
        assert_eq!(refs, vec!["N0", "R0", "N1"]);
        assert_eq!(sch.labels().len(), 3 + 2 + 3);
    }

    #[test]
    fn bridge_is_two_labels() {
        let mut net = NetList::new();
        let a = net.new_wire(Some("a"));
        let gnd = net.gnd();
        net.connect(a, gnd).unwrap();
        let sch = net_to_schematic(&net, &SchematicConfig::default()).unwrap();
        assert!(sch.symbols().is_empty());
        let angles: Vec<(String, f64)> = sch.labels().iter().map(|l| (l.text.clone(), l.angle)).collect();
        assert_eq!(angles, vec![("a".to_string(), 0.0), ("gnd".to_string(), 180.0)]);
    }

    #[test]
    fn pin_mismatch_is_an_error() {
        let mut builder = SchematicBuilder::new(40.0);
        let err = builder
            .add_symbol(&SymbolDef::NMOS, 0.0, 0.0, &[("G", "a"), ("D", "b")])
            .unwrap_err();
        assert!(matches!(err, NetError::Schematic { .. }));
    }

    #[test]
    fn paper_covers_furthest_symbol() {
        let (net, _, _) = inverter();
        let layout = SchematicConfig::default();
        let sch = net_to_schematic(&net, &layout).unwrap();
        let (w, h) = sch.paper();
        // two components on a 2x2 grid: both in the first row
        let (max_x, max_y) = layout.position(1, 0);
        assert!((w - (max_x + 80.0)).abs() < 1e-9);
        assert!((h - (max_y + 80.0)).abs() < 1e-9);
    }

    #[test]
    fn output_has_expected_sections() {
        let (net, _, _) = inverter();
        let text = net_to_schematic(&net, &SchematicConfig::default()).unwrap().to_string();
        assert!(text.starts_with("(kicad_sch"));
        for needle in ["(lib_symbols", "(symbol \"Custom:NMOS\"", "(lib_id \"Device:R_Small\")", "(global_label \"out\"", "(sheet_instances", "Resistor_SMD:R_0402_1005Metric"] {
            assert!(text.contains(needle), "missing {needle}");
        }
    }
}
