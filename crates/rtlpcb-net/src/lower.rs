//! Lowering from LUTs and flip-flops to transistors.

use crate::error::Result;
use crate::gates::{gate_table, new_ff, InverterCache};
use crate::netlist::{NetList, WireId};
use rtlpcb_logic::{LogicList, SignalId};
use std::collections::BTreeMap;
use tracing::info;

/// Build a transistor netlist for `logic`.
///
/// Each signal gets one wire carrying its names. LUT and flip-flop outputs
/// are bridged onto those wires, so the result should be run through
/// [`optimize_net`](crate::optimize::optimize_net) before placement.
///
/// # Errors
///
/// Fails if a LUT table is malformed.
pub fn lower_logic_to_net(logic: &LogicList) -> Result<NetList> {
    let mut net = NetList::new();

    let wires: BTreeMap<SignalId, WireId> = logic
        .signals()
        .map(|s| {
            let wire = net.new_named_wire(s.debug_names.clone(), s.special_name.clone());
            (s.id, wire)
        })
        .collect();
    let wire = |s: SignalId| -> Result<WireId> {
        wires
            .get(&s)
            .copied()
            .ok_or_else(|| rtlpcb_logic::LogicError::unknown_signal(s).into())
    };

    let mut inverters = InverterCache::new();

    for lut in logic.luts() {
        let inputs = lut
            .inputs
            .iter()
            .map(|&s| wire(s))
            .collect::<Result<Vec<_>>>()?;
        let out = gate_table(&mut net, &lut.table, &inputs, &mut inverters)?;
        net.connect(wire(lut.output)?, out)?;
    }

    for ff in logic.ffs() {
        let d = wire(ff.input)?;
        let clk = net.clk();
        let q = new_ff(&mut net, clk, d, inverters.get(d))?;
        net.connect(wire(ff.output)?, q.val)?;
    }

    for &(a, b) in logic.connections() {
        net.connect(wire(a)?, wire(b)?)?;
    }

    info!(
        luts = logic.luts().len(),
        ffs = logic.ffs().len(),
        components = net.components().len(),
        "logic lowered"
    );
    Ok(net)
}
