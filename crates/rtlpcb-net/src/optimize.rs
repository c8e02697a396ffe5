//! Netlist clean-up after lowering.

use crate::netlist::{Component, NetList, WireId};
use rtlpcb_logic::canonicalize;
use tracing::{debug, info};

/// Summary of an [`optimize_net`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetOptimizeStats {
    /// Rounds until the fixpoint, including the final no-op round.
    pub rounds: usize,
    /// Terminals rewritten while merging bridged wires.
    pub terminals_rewritten: usize,
    /// Bridges removed.
    pub bridges_removed: usize,
    /// Wires dropped because nothing touched them.
    pub orphans_removed: usize,
}

/// Remove every bridge and merge the wires it joined. The lowest wire id
/// of each group survives, so global wires are never merged away.
///
/// Returns `(bridges removed, terminals rewritten)`.
pub fn combine_connections(net: &mut NetList) -> (usize, usize) {
    let mut pairs: Vec<(WireId, WireId)> = Vec::new();
    net.components.retain(|c| match *c {
        Component::Bridge { a, b } => {
            pairs.push((a, b));
            false
        }
        _ => true,
    });

    let best = canonicalize(pairs.iter().copied(), |a, b| a < b);
    let mut rewritten = 0;
    for (&old, &new) in &best {
        rewritten += net.replace_wire(old, new);
    }

    debug!(bridges = pairs.len(), rewritten, "combined wires");
    (pairs.len(), rewritten)
}

/// Run net passes until nothing changes.
pub fn optimize_net(net: &mut NetList) -> NetOptimizeStats {
    let mut stats = NetOptimizeStats::default();
    loop {
        stats.rounds += 1;
        let (bridges, rewritten) = combine_connections(net);
        let orphans = net.remove_orphan_wires();

        stats.bridges_removed += bridges;
        stats.terminals_rewritten += rewritten;
        stats.orphans_removed += orphans;

        if bridges + rewritten + orphans == 0 {
            break;
        }
    }

    info!(
        rounds = stats.rounds,
        bridges = stats.bridges_removed,
        orphans = stats.orphans_removed,
        wires = net.wire_count(),
        components = net.components().len(),
        "netlist optimised"
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn bridge_chains_collapse_into_globals() {
        let mut net = NetList::new();
        let a = net.new_wire(Some("a"));
        let b = net.new_wire(Some("b"));
        let c = net.new_wire(Some("c"));
        let gnd = net.gnd();
        let vdd = net.vdd();
        net.connect(a, b).unwrap();
        net.connect(c, b).unwrap();
        net.connect(c, gnd).unwrap();
        net.push(Component::Resistor { a: vdd, b: a }).unwrap();

        let stats = optimize_net(&mut net);
        assert_eq!(stats.bridges_removed, 3);
        assert_eq!(net.components(), &[Component::Resistor { a: vdd, b: gnd }]);
        assert_eq!(net.wire_count(), 3);
        let names: Vec<_> = net.wire(gnd).unwrap().debug_names.iter().cloned().collect();
        assert_eq!(names, vec!["a", "b", "c", "gnd"]);
    }

    #[test]
    fn no_bridges_is_a_fixpoint() {
        let mut net = NetList::new();
        let stats = optimize_net(&mut net);
        assert_eq!(stats, NetOptimizeStats { rounds: 1, ..NetOptimizeStats::default() });
    }
}
