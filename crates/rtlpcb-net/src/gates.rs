// SPDX-License-Identifier: AGPL-3.0-only

//! Resistor-transistor gate library.
//!
//! Every gate is an NMOS pull-down network against a resistor pull-up to
//! `vdd`. A low output row becomes one series chain of transistors from the
//! output to `gnd`; a high row costs nothing beyond the shared pull-up.
//!
//! Storage is built from "pull latches": cross-coupled inverters whose
//! write transistors only take effect while their `pull` wire is held low.

use crate::error::{NetError, Result};
use crate::netlist::{Component, NetList, WireId};
use std::collections::BTreeMap;

/// A wire and its complement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvPair {
    /// True polarity.
    pub val: WireId,
    /// Inverted polarity.
    pub inv: WireId,
}

/// Inverters created so far, shared between gates of one netlist.
#[derive(Debug, Clone, Default)]
pub struct InverterCache {
    inverted: BTreeMap<WireId, WireId>,
}

impl InverterCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing inverse of `wire`, if one was built.
    pub fn get(&self, wire: WireId) -> Option<WireId> {
        self.inverted.get(&wire).copied()
    }

    /// Inverse of `wire`, building an inverter on first use.
    ///
    /// # Errors
    ///
    /// Fails for foreign wires.
    pub fn get_or_insert(&mut self, net: &mut NetList, wire: WireId) -> Result<WireId> {
        if let Some(inv) = self.get(wire) {
            return Ok(inv);
        }
        let inv = gate_not(net, wire)?;
        self.inverted.insert(wire, inv);
        Ok(inv)
    }

    /// Number of inverters built.
    pub fn len(&self) -> usize {
        self.inverted.len()
    }

    /// True if no inverter was built.
    pub fn is_empty(&self) -> bool {
        self.inverted.is_empty()
    }
}

fn nmos(net: &mut NetList, gate: WireId, up: WireId, down: WireId) -> Result<()> {
    net.push(Component::Nmos { gate, up, down })
}

fn pull_up(net: &mut NetList, wire: WireId) -> Result<()> {
    let vdd = net.vdd();
    net.push(Component::Resistor { a: vdd, b: wire })
}

/// Inverter: one NMOS to `gnd` plus a pull-up.
///
/// # Errors
///
/// Fails for foreign wires.
pub fn gate_not(net: &mut NetList, input: WireId) -> Result<WireId> {
    let output = net.new_wire(None);
    let gnd = net.gnd();
    nmos(net, input, output, gnd)?;
    pull_up(net, output)?;
    Ok(output)
}

/// Parallel NMOS devices to `gnd` with a pull-up.
///
/// # Errors
///
/// Fails for foreign wires.
pub fn gate_nor(net: &mut NetList, inputs: &[WireId]) -> Result<WireId> {
    let output = net.new_wire(None);
    let gnd = net.gnd();
    for &input in inputs {
        nmos(net, input, output, gnd)?;
    }
    pull_up(net, output)?;
    Ok(output)
}

/// Series NMOS chain to `gnd` without a pull-up. The returned wire is
/// open-drain and needs a pull-up from whoever consumes it.
///
/// # Errors
///
/// Fails for foreign wires.
pub fn gate_nand(net: &mut NetList, inputs: &[WireId]) -> Result<WireId> {
    let mut curr = net.gnd();
    for &input in inputs {
        let next = net.new_wire(None);
        nmos(net, input, next, curr)?;
        curr = next;
    }
    Ok(curr)
}

/// Inverted NAND. The open-drain NAND wire gets its own pull-up before it
/// drives the inverter gate.
///
/// # Errors
///
/// Fails for foreign wires.
pub fn gate_and(net: &mut NetList, inputs: &[WireId]) -> Result<WireId> {
    let nand = gate_nand(net, inputs)?;
    pull_up(net, nand)?;
    gate_not(net, nand)
}

/// Inverted NOR.
///
/// # Errors
///
/// Fails for foreign wires.
pub fn gate_or(net: &mut NetList, inputs: &[WireId]) -> Result<WireId> {
    let nor = gate_nor(net, inputs)?;
    gate_not(net, nor)
}

/// Arbitrary truth table, `inputs[0]` least significant.
///
/// One pull-up sits on the output. Each `false` row gets its own series
/// chain to `gnd` whose transistors are gated by the input (bit set) or its
/// inverse (bit clear). Inverses come from `inverted` and are built on
/// demand.
///
/// # Errors
///
/// Returns [`NetError::TableSize`] if `table.len() != 2^inputs.len()`.
pub fn gate_table(
    net: &mut NetList,
    table: &[bool],
    inputs: &[WireId],
    inverted: &mut InverterCache,
) -> Result<WireId> {
    let expected = u32::try_from(inputs.len())
        .ok()
        .and_then(|n| 1usize.checked_shl(n));
    if expected != Some(table.len()) {
        return Err(NetError::TableSize {
            inputs: inputs.len(),
            len: table.len(),
        });
    }

    let output = net.new_wire(None);
    let gnd = net.gnd();

    for (row, &value) in table.iter().enumerate() {
        if value {
            continue;
        }
        let mut curr = output;
        for (j, &input) in inputs.iter().enumerate() {
            let gate = if (row >> j) & 1 != 0 {
                input
            } else {
                inverted.get_or_insert(net, input)?
            };
            let next = net.new_wire(None);
            nmos(net, gate, curr, next)?;
            curr = next;
        }
        net.connect(curr, gnd)?;
    }

    pull_up(net, output)?;
    Ok(output)
}

/// Set/reset latch, active while `pull` is low and holding while it floats.
/// `set` and `reset` must not both be high.
///
/// # Errors
///
/// Fails for foreign wires.
pub fn new_pull_latch_sr(
    net: &mut NetList,
    pull: WireId,
    set: WireId,
    reset: WireId,
) -> Result<InvPair> {
    let val = net.new_wire(None);
    let inv = net.new_wire(None);
    let gnd = net.gnd();

    // cross-coupled inverters
    pull_up(net, inv)?;
    pull_up(net, val)?;
    nmos(net, val, inv, gnd)?;
    nmos(net, inv, val, gnd)?;

    // writers
    nmos(net, set, inv, pull)?;
    nmos(net, reset, val, pull)?;

    Ok(InvPair { val, inv })
}

/// D latch on top of [`new_pull_latch_sr`]. Builds an inverter for `d` when
/// `d_inv` is not supplied.
///
/// # Errors
///
/// Fails for foreign wires.
pub fn new_pull_latch(
    net: &mut NetList,
    pull: WireId,
    d: WireId,
    d_inv: Option<WireId>,
) -> Result<InvPair> {
    let d_inv = match d_inv {
        Some(inv) => inv,
        None => gate_not(net, d)?,
    };
    new_pull_latch_sr(net, pull, d, d_inv)
}

/// Inverse of `clk`, built once per netlist and clock wire.
fn clock_inverse(net: &mut NetList, clk: WireId) -> Result<WireId> {
    if let Some((cached_clk, inv)) = net.clk_inv {
        if cached_clk == clk {
            return Ok(inv);
        }
    }
    let inv = gate_not(net, clk)?;
    if net.clk_inv.is_none() {
        net.clk_inv = Some((clk, inv));
    }
    Ok(inv)
}

/// Master-slave D flip-flop. The master latch follows `d` while `clk` is
/// high, the slave copies the master while `clk` is low.
///
/// # Errors
///
/// Fails for foreign wires.
pub fn new_ff(
    net: &mut NetList,
    clk: WireId,
    d: WireId,
    d_inv: Option<WireId>,
) -> Result<InvPair> {
    let clk_inv = clock_inverse(net, clk)?;
    let gnd = net.gnd();

    let pull = net.new_wire(None);
    let pull_inv = net.new_wire(None);
    nmos(net, clk, pull, gnd)?;
    nmos(net, clk_inv, pull_inv, gnd)?;

    let master = new_pull_latch(net, pull, d, d_inv)?;
    new_pull_latch(net, pull_inv, master.val, Some(master.inv))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn nmos_count(net: &NetList) -> usize {
        net.counts().get("NMos").copied().unwrap_or(0)
    }

    #[test]
    fn not_is_one_transistor_one_resistor() {
        let mut net = NetList::new();
        let a = net.new_wire(Some("a"));
        let out = gate_not(&mut net, a).unwrap();
        assert_eq!(
            net.components(),
            &[
                Component::Nmos { gate: a, up: out, down: net.gnd() },
                Component::Resistor { a: net.vdd(), b: out },
            ]
        );
    }

    #[test]
    fn nand_is_open_drain_chain() {
        let mut net = NetList::new();
        let a = net.new_wire(None);
        let b = net.new_wire(None);
        let out = gate_nand(&mut net, &[a, b]).unwrap();
        assert_eq!(nmos_count(&net), 2);
        assert!(net.counts().get("Resistor").is_none());
        assert_ne!(out, net.gnd());
    }

    #[test]
    fn nor_is_parallel_devices_with_one_pull_up() {
        let mut net = NetList::new();
        let a = net.new_wire(None);
        let b = net.new_wire(None);
        let c = net.new_wire(None);
        let out = gate_nor(&mut net, &[a, b, c]).unwrap();
        let gnd = net.gnd();
        assert_eq!(
            net.components(),
            &[
                Component::Nmos { gate: a, up: out, down: gnd },
                Component::Nmos { gate: b, up: out, down: gnd },
                Component::Nmos { gate: c, up: out, down: gnd },
                Component::Resistor { a: net.vdd(), b: out },
            ]
        );
    }

    /// Gate wire of the NMOS whose drain is `wire`.
    fn gate_driving(net: &NetList, wire: WireId) -> Option<WireId> {
        net.components().iter().find_map(|c| match *c {
            Component::Nmos { gate, up, .. } if up == wire => Some(gate),
            _ => None,
        })
    }

    #[test]
    fn and_pulls_up_the_nand_wire() {
        let mut net = NetList::new();
        let a = net.new_wire(None);
        let b = net.new_wire(None);
        let out = gate_and(&mut net, &[a, b]).unwrap();
        let vdd = net.vdd();

        let nand = gate_driving(&net, out).unwrap();
        assert_eq!(gate_driving(&net, nand), Some(b));
        assert_eq!(nmos_count(&net), 3);
        assert_eq!(net.counts().get("Resistor"), Some(&2));
        assert!(net
            .components()
            .contains(&Component::Resistor { a: vdd, b: nand }));
        assert!(net
            .components()
            .contains(&Component::Resistor { a: vdd, b: out }));
    }

    #[test]
    fn or_is_nor_then_not() {
        let mut net = NetList::new();
        let a = net.new_wire(None);
        let b = net.new_wire(None);
        let out = gate_or(&mut net, &[a, b]).unwrap();
        let gnd = net.gnd();

        let nor = gate_driving(&net, out).unwrap();
        assert_eq!(nmos_count(&net), 3);
        assert_eq!(net.counts().get("Resistor"), Some(&2));
        for input in [a, b] {
            assert!(net
                .components()
                .contains(&Component::Nmos { gate: input, up: nor, down: gnd }));
        }
        assert!(net
            .components()
            .contains(&Component::Resistor { a: net.vdd(), b: nor }));
    }

    #[test]
    fn sr_latch_is_cross_coupled_with_writers() {
        let mut net = NetList::new();
        let pull = net.new_wire(Some("pull"));
        let set = net.new_wire(Some("set"));
        let reset = net.new_wire(Some("reset"));
        let InvPair { val, inv } = new_pull_latch_sr(&mut net, pull, set, reset).unwrap();
        let (vdd, gnd) = (net.vdd(), net.gnd());
        assert_eq!(
            net.components(),
            &[
                Component::Resistor { a: vdd, b: inv },
                Component::Resistor { a: vdd, b: val },
                Component::Nmos { gate: val, up: inv, down: gnd },
                Component::Nmos { gate: inv, up: val, down: gnd },
                Component::Nmos { gate: set, up: inv, down: pull },
                Component::Nmos { gate: reset, up: val, down: pull },
            ]
        );
    }

    #[test]
    fn d_latch_inverts_only_when_needed() {
        let mut net = NetList::new();
        let pull = net.new_wire(None);
        let d = net.new_wire(None);
        let d_inv = net.new_wire(None);
        let latch = new_pull_latch(&mut net, pull, d, Some(d_inv)).unwrap();
        assert_eq!(nmos_count(&net), 4);
        assert!(net
            .components()
            .contains(&Component::Nmos { gate: d, up: latch.inv, down: pull }));
        assert!(net
            .components()
            .contains(&Component::Nmos { gate: d_inv, up: latch.val, down: pull }));

        let mut net = NetList::new();
        let pull = net.new_wire(None);
        let d = net.new_wire(None);
        let latch = new_pull_latch(&mut net, pull, d, None).unwrap();
        assert_eq!(nmos_count(&net), 5);
        assert_eq!(net.counts().get("Resistor"), Some(&3));
        let built_inv = match net.components()[0] {
            Component::Nmos { gate, up, .. } if gate == d => up,
            ref other => panic!("expected the inverter first, got {other}"),
        };
        assert!(net
            .components()
            .contains(&Component::Nmos { gate: built_inv, up: latch.val, down: pull }));
    }

    #[test]
    fn table_builds_one_chain_per_low_row() {
        let mut net = NetList::new();
        let a = net.new_wire(None);
        let b = net.new_wire(None);
        let mut cache = InverterCache::new();
        // NAND: only row 3 is low
        gate_table(&mut net, &[true, true, true, false], &[a, b], &mut cache).unwrap();
        assert_eq!(nmos_count(&net), 2);
        assert!(cache.is_empty());

        // XOR: rows 0 and 3 are low, row 0 needs both inverses
        gate_table(&mut net, &[false, true, true, false], &[a, b], &mut cache).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(nmos_count(&net), 2 + 4 + 2);
    }

    #[test]
    fn constant_low_ties_to_ground() {
        let mut net = NetList::new();
        let mut cache = InverterCache::new();
        let out = gate_table(&mut net, &[false], &[], &mut cache).unwrap();
        assert!(net
            .components()
            .contains(&Component::Bridge { a: out, b: net.gnd() }));
    }

    #[test]
    fn table_size_is_checked() {
        let mut net = NetList::new();
        let a = net.new_wire(None);
        let mut cache = InverterCache::new();
        assert!(matches!(
            gate_table(&mut net, &[true], &[a], &mut cache),
            Err(NetError::TableSize { inputs: 1, len: 1 })
        ));
    }

    #[test]
    fn clock_inverter_is_shared() {
        let mut net = NetList::new();
        let d0 = net.new_wire(None);
        let d1 = net.new_wire(None);
        let clk = net.clk();
        new_ff(&mut net, clk, d0, None).unwrap();
        let first = nmos_count(&net);
        new_ff(&mut net, clk, d1, None).unwrap();
        // second flip-flop skips the clock inverter
        assert_eq!(nmos_count(&net), 2 * first - 1);
    }
}
