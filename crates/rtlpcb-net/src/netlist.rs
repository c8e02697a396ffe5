//! Transistor-level netlist: wires and discrete components.

use crate::error::{NetError, Result};
use rtlpcb_parts::{CostTable, PartKind};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Opaque wire identifier, unique within one [`NetList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WireId(u32);

impl WireId {
    /// Raw index.
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for WireId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// An electrical node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wire {
    /// Identifier.
    pub id: WireId,
    /// Names inherited from logic signals and merged wires.
    pub debug_names: BTreeSet<String>,
    /// Reserved name for global wires.
    pub special_name: Option<String>,
}

impl fmt::Display for Wire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Wire({}", self.id.0)?;
        if let Some(special) = &self.special_name {
            write!(f, ", {special}")?;
        }
        if !self.debug_names.is_empty() {
            let names: Vec<&str> = self.debug_names.iter().map(String::as_str).collect();
            write!(f, ", debug={{{}}}", names.join(", "))?;
        }
        write!(f, ")")
    }
}

/// Compass side a port sits on, used for drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Top.
    North,
    /// Bottom.
    South,
    /// Left.
    West,
}

impl Side {
    /// Graphviz compass point.
    pub const fn compass(self) -> &'static str {
        match self {
            Self::North => "n",
            Self::South => "s",
            Self::West => "w",
        }
    }
}

/// One terminal of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Port {
    /// Terminal name.
    pub name: &'static str,
    /// Side for drawing, if the terminal has a preferred one.
    pub side: Option<Side>,
    /// Connected wire.
    pub wire: WireId,
}

/// A discrete component, or a zero-ohm bridge between two wires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    /// Two wires are the same node. Removed by net optimisation.
    Bridge {
        /// First wire.
        a: WireId,
        /// Second wire.
        b: WireId,
    },
    /// Pull-up or load resistor.
    Resistor {
        /// Terminal 1.
        a: WireId,
        /// Terminal 2.
        b: WireId,
    },
    /// Indicator LED.
    Led {
        /// Anode.
        high: WireId,
        /// Cathode.
        low: WireId,
    },
    /// N-channel MOSFET.
    Nmos {
        /// Gate.
        gate: WireId,
        /// Drain.
        up: WireId,
        /// Source.
        down: WireId,
    },
    /// P-channel MOSFET.
    Pmos {
        /// Gate.
        gate: WireId,
        /// Source.
        up: WireId,
        /// Drain.
        down: WireId,
    },
}

impl Component {
    /// Terminals in a fixed order.
    pub fn ports(&self) -> Vec<Port> {
        let port = |name, side, wire| Port { name, side, wire };
        match *self {
            Self::Bridge { a, b } | Self::Resistor { a, b } => {
                vec![port("a", None, a), port("b", None, b)]
            }
            Self::Led { high, low } => vec![
                port("high", Some(Side::North), high),
                port("low", Some(Side::South), low),
            ],
            Self::Nmos { gate, up, down } | Self::Pmos { gate, up, down } => vec![
                port("gate", Some(Side::West), gate),
                port("up", Some(Side::North), up),
                port("down", Some(Side::South), down),
            ],
        }
    }

    /// Physical part, or `None` for a bridge.
    pub const fn part_kind(&self) -> Option<PartKind> {
        match self {
            Self::Bridge { .. } => None,
            Self::Resistor { .. } => Some(PartKind::Resistor),
            Self::Led { .. } => Some(PartKind::Led),
            Self::Nmos { .. } => Some(PartKind::Nmos),
            Self::Pmos { .. } => Some(PartKind::Pmos),
        }
    }

    /// Short kind name used in counts.
    pub const fn kind_name(&self) -> &'static str {
        match self.part_kind() {
            None => "Bridge",
            Some(kind) => kind.name(),
        }
    }

    /// Rewrite every terminal through `f`.
    pub fn replace_wire(&mut self, mut f: impl FnMut(WireId) -> WireId) {
        match self {
            Self::Bridge { a, b } | Self::Resistor { a, b } => {
                *a = f(*a);
                *b = f(*b);
            }
            Self::Led { high, low } => {
                *high = f(*high);
                *low = f(*low);
            }
            Self::Nmos { gate, up, down } | Self::Pmos { gate, up, down } => {
                *gate = f(*gate);
                *up = f(*up);
                *down = f(*down);
            }
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bridge { a, b } => write!(f, "Bridge({a}, {b})"),
            Self::Resistor { a, b } => write!(f, "Resistor({a}, {b})"),
            Self::Led { high, low } => write!(f, "Led(high={high}, low={low})"),
            Self::Nmos { gate, up, down } => write!(f, "NMOS(gate={gate}, up={up}, down={down})"),
            Self::Pmos { gate, up, down } => write!(f, "PMOS(gate={gate}, up={up}, down={down})"),
        }
    }
}

/// Part counts and their cost.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CostReport {
    /// `(kind, count, subtotal)` per part kind present.
    pub lines: Vec<(PartKind, usize, f64)>,
    /// Bridges still present; they cost nothing.
    pub bridges: usize,
    /// Sum of all subtotals in USD.
    pub total: f64,
    /// Summed body area of every part in its default package, in mm².
    pub body_area_mm2: f64,
}

impl fmt::Display for CostReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "NetList component counts:")?;
        for (kind, count, subtotal) in &self.lines {
            writeln!(f, "    {kind}: {count} (${subtotal:.4})")?;
        }
        if self.bridges > 0 {
            writeln!(f, "    Bridge: {}", self.bridges)?;
        }
        writeln!(f, "Part body area: {:.2} mm²", self.body_area_mm2)?;
        write!(f, "Total cost: ${:.4}", self.total)
    }
}

/// Wires and components, plus the global `vdd`, `gnd` and `clk` wires.
#[derive(Debug, Clone)]
pub struct NetList {
    wires: BTreeMap<WireId, Wire>,
    next_id: u32,
    pub(crate) components: Vec<Component>,
    vdd: WireId,
    gnd: WireId,
    clk: WireId,
    pub(crate) clk_inv: Option<(WireId, WireId)>,
}

impl Default for NetList {
    fn default() -> Self {
        Self::new()
    }
}

impl NetList {
    /// Create a netlist holding only the global wires.
    pub fn new() -> Self {
        let mut net = Self {
            wires: BTreeMap::new(),
            next_id: 0,
            components: Vec::new(),
            vdd: WireId(0),
            gnd: WireId(0),
            clk: WireId(0),
            clk_inv: None,
        };
        net.vdd = net.new_global("vdd");
        net.gnd = net.new_global("gnd");
        net.clk = net.new_global("clk");
        net
    }

    fn new_global(&mut self, name: &str) -> WireId {
        let id = self.new_wire(Some(name));
        if let Some(wire) = self.wires.get_mut(&id) {
            wire.special_name = Some(name.to_string());
        }
        id
    }

    /// Supply rail.
    pub const fn vdd(&self) -> WireId {
        self.vdd
    }

    /// Ground rail.
    pub const fn gnd(&self) -> WireId {
        self.gnd
    }

    /// Global clock.
    pub const fn clk(&self) -> WireId {
        self.clk
    }

    /// `[vdd, gnd, clk]`.
    pub const fn global_wires(&self) -> [WireId; 3] {
        [self.vdd, self.gnd, self.clk]
    }

    /// True for `vdd`, `gnd` and `clk`.
    pub fn is_global(&self, wire: WireId) -> bool {
        self.global_wires().contains(&wire)
    }

    /// Allocate a new wire.
    pub fn new_wire(&mut self, debug_name: Option<&str>) -> WireId {
        let id = WireId(self.next_id);
        self.next_id += 1;
        let mut debug_names = BTreeSet::new();
        if let Some(name) = debug_name {
            debug_names.insert(name.to_string());
        }
        self.wires.insert(
            id,
            Wire {
                id,
                debug_names,
                special_name: None,
            },
        );
        id
    }

    /// Allocate a wire carrying the names of a logic signal.
    pub fn new_named_wire(
        &mut self,
        debug_names: BTreeSet<String>,
        special_name: Option<String>,
    ) -> WireId {
        let id = self.new_wire(None);
        if let Some(wire) = self.wires.get_mut(&id) {
            wire.debug_names = debug_names;
            wire.special_name = special_name;
        }
        id
    }

    /// Look up a wire.
    pub fn wire(&self, id: WireId) -> Option<&Wire> {
        self.wires.get(&id)
    }

    /// All wires in id order.
    pub fn wires(&self) -> impl Iterator<Item = &Wire> {
        self.wires.values()
    }

    /// Number of live wires.
    pub fn wire_count(&self) -> usize {
        self.wires.len()
    }

    /// All components.
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    fn check_wire(&self, wire: WireId) -> Result<()> {
        if self.wires.contains_key(&wire) {
            Ok(())
        } else {
            Err(NetError::unknown_wire(wire))
        }
    }

    /// Add a component.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::UnknownWire`] for foreign wires.
    pub fn push(&mut self, component: Component) -> Result<()> {
        for port in component.ports() {
            self.check_wire(port.wire)?;
        }
        self.components.push(component);
        Ok(())
    }

    /// Bridge two wires.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::UnknownWire`] for foreign wires.
    pub fn connect(&mut self, a: WireId, b: WireId) -> Result<()> {
        self.push(Component::Bridge { a, b })
    }

    /// Rewrite every use of `old` as `new` and drop `old`. Returns the number
    /// of rewritten terminals.
    pub fn replace_wire(&mut self, old: WireId, new: WireId) -> usize {
        if old == new {
            return 0;
        }

        let mut count = 0;
        for component in &mut self.components {
            component.replace_wire(|w| {
                if w == old {
                    count += 1;
                    new
                } else {
                    w
                }
            });
        }

        for global in [&mut self.vdd, &mut self.gnd, &mut self.clk] {
            if *global == old {
                *global = new;
            }
        }
        if let Some((clk, inv)) = &mut self.clk_inv {
            if *clk == old {
                *clk = new;
            }
            if *inv == old {
                *inv = new;
            }
        }

        if let Some(old_wire) = self.wires.remove(&old) {
            if let Some(target) = self.wires.get_mut(&new) {
                target.debug_names.extend(old_wire.debug_names);
                if target.special_name.is_none() {
                    target.special_name = old_wire.special_name;
                }
            }
        }

        count
    }

    /// Drop wires no component touches. Global wires are kept. Returns the
    /// number of wires removed.
    pub fn remove_orphan_wires(&mut self) -> usize {
        let used: BTreeSet<WireId> = self
            .components
            .iter()
            .flat_map(Component::ports)
            .map(|p| p.wire)
            .chain(self.global_wires())
            .collect();
        let before = self.wires.len();
        self.wires.retain(|id, _| used.contains(id));
        if let Some((_, inv)) = self.clk_inv {
            if !self.wires.contains_key(&inv) {
                self.clk_inv = None;
            }
        }
        before - self.wires.len()
    }

    /// Component count per kind name.
    pub fn counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for c in &self.components {
            *counts.entry(c.kind_name()).or_insert(0) += 1;
        }
        counts
    }

    /// Part counts priced with `table`.
    #[allow(clippy::cast_precision_loss)]
    pub fn cost(&self, table: &CostTable) -> CostReport {
        let mut per_kind: BTreeMap<PartKind, usize> = BTreeMap::new();
        let mut bridges = 0;
        for c in &self.components {
            match c.part_kind() {
                Some(kind) => *per_kind.entry(kind).or_insert(0) += 1,
                None => bridges += 1,
            }
        }
        let lines: Vec<(PartKind, usize, f64)> = per_kind
            .iter()
            .map(|(&kind, &count)| (kind, count, table.total([(kind, count)])))
            .collect();
        let body_area_mm2 = per_kind
            .iter()
            .map(|(kind, &count)| kind.default_package().body_area_mm2() * count as f64)
            .sum();
        let total = table.total(per_kind);
        CostReport {
            lines,
            bridges,
            total,
            body_area_mm2,
        }
    }

    /// Graphviz rendering. Global wires become one small symbol per
    /// terminal instead of a shared node.
    pub fn to_dot(&self) -> String {
        Dot(self).to_string()
    }
}

struct Dot<'a>(&'a NetList);

impl fmt::Display for Dot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let net = self.0;
        writeln!(f, "digraph netlist {{")?;
        let mut dummies = 0usize;

        for wire in net.wires.values() {
            if net.is_global(wire.id) {
                continue;
            }
            writeln!(
                f,
                "    wire_{} [label=\"{}\"];",
                wire.id.0,
                escape_dot(&wire.to_string())
            )?;
        }

        for (i, component) in net.components.iter().enumerate() {
            writeln!(
                f,
                "    component_{i} [label=\"{}\", shape=box];",
                escape_dot(&component.to_string())
            )?;
            for port in component.ports() {
                let tail = match port.side {
                    Some(side) => format!("component_{i}:{}", side.compass()),
                    None => format!("component_{i}"),
                };
                let head = if net.is_global(port.wire) {
                    let shape = if port.wire == net.vdd {
                        "triangle"
                    } else if port.wire == net.gnd {
                        "invtriangle"
                    } else {
                        "square"
                    };
                    let name = format!("dummy_{dummies}");
                    dummies += 1;
                    writeln!(f, "    {name} [label=\"\", shape={shape}];")?;
                    name
                } else {
                    format!("wire_{}", port.wire.0)
                };
                writeln!(f, "    {tail} -> {head} [arrowhead=none];")?;
            }
        }

        writeln!(f, "}}")
    }
}

fn escape_dot(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

impl fmt::Display for NetList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "NetList(")?;
        writeln!(f, "  wires=[")?;
        for wire in self.wires.values() {
            writeln!(f, "    {wire},")?;
        }
        writeln!(f, "  ],")?;
        writeln!(f, "  components=[")?;
        for component in &self.components {
            writeln!(f, "    {component},")?;
        }
        writeln!(f, "  ],")?;
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn globals_come_first() {
        let net = NetList::new();
        assert_eq!(net.vdd().index(), 0);
        assert_eq!(net.gnd().index(), 1);
        assert_eq!(net.clk().index(), 2);
        assert_eq!(net.wire(net.gnd()).unwrap().special_name.as_deref(), Some("gnd"));
        assert!(net.is_global(net.clk()));
    }

    #[test]
    fn foreign_wire_is_rejected() {
        let mut net = NetList::new();
        let mut other = NetList::new();
        for _ in 0..10 {
            other.new_wire(None);
        }
        let foreign = other.new_wire(None);
        let a = net.new_wire(None);
        assert!(matches!(
            net.connect(a, foreign),
            Err(NetError::UnknownWire { .. })
        ));
    }

    #[test]
    fn replace_wire_counts_terminals() {
        let mut net = NetList::new();
        let a = net.new_wire(Some("a"));
        let b = net.new_wire(Some("b"));
        let (vdd, gnd) = (net.vdd(), net.gnd());
        net.push(Component::Nmos { gate: b, up: b, down: gnd }).unwrap();
        net.push(Component::Resistor { a: vdd, b }).unwrap();

        assert_eq!(net.replace_wire(b, a), 3);
        assert!(net.wire(b).is_none());
        let names: Vec<_> = net.wire(a).unwrap().debug_names.iter().cloned().collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(net.replace_wire(a, a), 0);
    }

    #[test]
    fn orphans_are_removed_but_globals_kept() {
        let mut net = NetList::new();
        let used = net.new_wire(None);
        net.new_wire(None);
        let vdd = net.vdd();
        net.push(Component::Resistor { a: vdd, b: used }).unwrap();
        assert_eq!(net.remove_orphan_wires(), 1);
        assert_eq!(net.wire_count(), 4);
    }

    #[test]
    fn inverter_cost() {
        let mut net = NetList::new();
        let input = net.new_wire(None);
        let out = net.new_wire(None);
        let (vdd, gnd) = (net.vdd(), net.gnd());
        net.push(Component::Nmos { gate: input, up: out, down: gnd }).unwrap();
        net.push(Component::Resistor { a: vdd, b: out }).unwrap();
        net.connect(out, input).unwrap();

        let report = net.cost(&CostTable::JLCPCB);
        assert!((report.total - 0.0134).abs() < 1e-9);
        // SOT-23 plus 0402
        assert!((report.body_area_mm2 - (3.77 + 0.5)).abs() < 1e-9);
        assert_eq!(report.bridges, 1);
        assert_eq!(net.counts().get("NMos"), Some(&1));
        assert!(report.to_string().contains("Total cost"));
        assert!(report.to_string().contains("Part body area: 4.27 mm²"));
    }

    #[test]
    fn dot_uses_dummies_for_globals() {
        let mut net = NetList::new();
        let out = net.new_wire(Some("out"));
        let (vdd, gnd, clk) = (net.vdd(), net.gnd(), net.clk());
        net.push(Component::Nmos { gate: clk, up: out, down: gnd }).unwrap();
        net.push(Component::Resistor { a: vdd, b: out }).unwrap();

        let dot = net.to_dot();
        assert!(dot.starts_with("digraph netlist {"));
        assert!(dot.contains("shape=triangle"));
        assert!(dot.contains("shape=invtriangle"));
        assert!(dot.contains("shape=square"));
        assert!(dot.contains("component_0:n -> wire_3"));
        assert!(!dot.contains("wire_0 ["));
        assert!(dot.ends_with("[arrowhead=none];\n}\n"));
        assert_eq!(dot.lines().count(), 1 + 1 + 2 + 5 + 3 + 1);
    }
}
