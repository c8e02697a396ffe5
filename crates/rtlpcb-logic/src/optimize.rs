// SPDX-License-Identifier: AGPL-3.0-only

//! Logic-level optimisation passes.
//!
//! [`optimize_logic`] runs every pass until a full round changes nothing:
//!
//! 1. [`merge_connections`] collapses connected signals.
//! 2. [`const_propagation`] folds constants through LUTs and flip-flops.
//! 3. [`remove_dead`] drops blocks not observable from an external output.
//! 4. [`deduplicate`] merges identical blocks.

use crate::canonicalize::canonicalize;
use crate::error::Result;
use crate::lattice::Lattice;
use crate::logic_list::{LogicCounts, LogicList, Lut, SignalId, ValidateOptions};
use crate::use_def::{Def, UseDef, User};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use tracing::{debug, info, warn};

/// Summary of an [`optimize_logic`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptimizeStats {
    /// Rounds until the fixpoint, including the final no-op round.
    pub rounds: usize,
    /// Signals merged away by connections.
    pub merged_signals: usize,
    /// LUTs or flip-flops rewritten by constant propagation.
    pub constants_folded: usize,
    /// Blocks removed as dead.
    pub dead_removed: usize,
    /// Blocks or LUT inputs removed as duplicates.
    pub duplicates_removed: usize,
    /// Counts before optimisation.
    pub before: LogicCounts,
    /// Counts after optimisation.
    pub after: LogicCounts,
}

/// Run all passes to a fixpoint.
///
/// # Errors
///
/// Fails if the logic list is structurally invalid.
pub fn optimize_logic(logic: &mut LogicList) -> Result<OptimizeStats> {
    logic.validate(ValidateOptions::default())?;

    let mut stats = OptimizeStats {
        before: logic.counts(),
        ..OptimizeStats::default()
    };

    loop {
        stats.rounds += 1;

        let merged = merge_connections(logic);
        let folded = const_propagation(logic)?;
        let dead = remove_dead(logic);
        let dups = deduplicate(logic);

        debug!(
            round = stats.rounds,
            merged, folded, dead, dups, "optimisation round"
        );

        stats.merged_signals += merged;
        stats.constants_folded += folded;
        stats.dead_removed += dead;
        stats.duplicates_removed += dups;

        if merged + folded + dead + dups == 0 {
            break;
        }
    }

    stats.after = logic.counts();
    info!(
        rounds = stats.rounds,
        luts_before = stats.before.luts,
        luts_after = stats.after.luts,
        ffs_before = stats.before.ffs,
        ffs_after = stats.after.ffs,
        "logic optimised"
    );
    Ok(stats)
}

/// Replace every connected signal with the lowest id in its class and clear
/// the connection list. Returns the number of signals merged away.
pub fn merge_connections(logic: &mut LogicList) -> usize {
    if logic.connections.is_empty() {
        return 0;
    }

    let best = canonicalize(logic.connections.iter().copied(), |a, b| a < b);
    for (&old, &new) in &best {
        logic.replace_signal(old, new);
    }
    logic.connections.clear();

    debug!(merged = best.len(), "connections merged");
    best.len()
}

fn eval_lut(lut: &Lut, value: impl Fn(SignalId) -> Lattice<bool>) -> Lattice<bool> {
    let inputs: Vec<Lattice<bool>> = lut.inputs.iter().map(|&s| value(s)).collect();
    let mut result = Lattice::Undef;
    for (row, out) in lut.lines() {
        if row.iter().zip(&inputs).all(|(&v, l)| l.can_be(v)) {
            result = result.merge(Lattice::Def(out));
            if result == Lattice::Overdef {
                break;
            }
        }
    }
    result
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Node {
    Lut(usize),
    Ff(usize),
}

/// Run the worklist until no lattice value rises any more.
fn propagate(
    logic: &LogicList,
    use_def: &UseDef,
    lattice: &mut HashMap<SignalId, Lattice<bool>>,
    mut todo: VecDeque<Node>,
) {
    let mut queued: BTreeSet<Node> = todo.iter().copied().collect();

    while let Some(node) = todo.pop_front() {
        queued.remove(&node);
        let get = |s: SignalId| lattice.get(&s).copied().unwrap_or_default();
        let (signal, new) = match node {
            Node::Ff(i) => {
                let ff = &logic.ffs[i];
                (ff.output, get(ff.input))
            }
            Node::Lut(i) => {
                let lut = &logic.luts[i];
                (lut.output, eval_lut(lut, get))
            }
        };

        let prev = get(signal);
        let merged = prev.merge(new);
        if merged != prev {
            lattice.insert(signal, merged);
            for user in use_def.users(signal) {
                let next = match *user {
                    User::Lut(j) => Node::Lut(j),
                    User::Ff(j) => Node::Ff(j),
                    User::ExternalOutput => continue,
                };
                if queued.insert(next) {
                    todo.push_back(next);
                }
            }
        }
    }
}

/// Sparse constant propagation over the `{Undef, Def, Overdef}` lattice.
///
/// A flip-flop starts at `Def(init)`. If its input is still `Undef` once the
/// worklist drains, the register holds an unknown value from the second
/// cycle on, so its output is raised to `Overdef` and propagation resumes.
///
/// Returns the number of LUTs and flip-flops rewritten.
///
/// # Errors
///
/// Fails only if a LUT table is inconsistent with its inputs.
pub fn const_propagation(logic: &mut LogicList) -> Result<usize> {
    let use_def = UseDef::new(logic);

    let mut lattice: HashMap<SignalId, Lattice<bool>> = HashMap::new();
    for &s in &logic.external_inputs {
        lattice.insert(s, Lattice::Overdef);
    }
    for ff in &logic.ffs {
        let prev = lattice.get(&ff.output).copied().unwrap_or_default();
        lattice.insert(ff.output, prev.merge(Lattice::Def(ff.init)));
    }

    let mut todo: VecDeque<Node> = (0..logic.ffs.len())
        .map(Node::Ff)
        .chain((0..logic.luts.len()).map(Node::Lut))
        .collect();
    loop {
        propagate(logic, &use_def, &mut lattice, todo);

        let floating: Vec<SignalId> = logic
            .ffs
            .iter()
            .filter(|ff| lattice.get(&ff.input).copied().unwrap_or_default() == Lattice::Undef)
            .map(|ff| ff.output)
            .filter(|out| lattice.get(out) != Some(&Lattice::Overdef))
            .collect();
        if floating.is_empty() {
            break;
        }
        todo = VecDeque::new();
        for out in floating {
            debug!(signal = %out, "flip-flop input undriven");
            lattice.insert(out, Lattice::Overdef);
            for user in use_def.users(out) {
                match *user {
                    User::Lut(j) => todo.push_back(Node::Lut(j)),
                    User::Ff(j) => todo.push_back(Node::Ff(j)),
                    User::ExternalOutput => {}
                }
            }
        }
    }

    let get = |s: SignalId| lattice.get(&s).copied().unwrap_or_default();

    for &s in logic.signals.keys() {
        if get(s) == Lattice::Undef && !use_def.users(s).is_empty() {
            warn!("signal {} is undefined", logic.display_name(s));
        }
    }

    let mut changed = 0;

    for lut in &mut logic.luts {
        if let Some(v) = get(lut.output).as_def() {
            if lut.as_constant() != Some(v) {
                debug!(signal = %lut.output, value = v, "LUT folded to constant");
                *lut = Lut::constant(lut.output, v);
                changed += 1;
            }
            continue;
        }
        let consts: Vec<Option<bool>> = lut.inputs.iter().map(|&s| get(s).as_def()).collect();
        if lut.replace_consts(&consts)? {
            changed += 1;
        }
    }

    let const_ffs: Vec<(usize, bool)> = logic
        .ffs
        .iter()
        .enumerate()
        .filter_map(|(i, ff)| get(ff.output).as_def().map(|v| (i, v)))
        .collect();
    for (i, v) in const_ffs {
        let output = logic.ffs[i].output;
        let dummy = logic.new_signal(Some("dummy"));
        logic.ffs[i].output = dummy;
        logic.luts.push(Lut::constant(output, v));
        debug!(signal = %output, value = v, "flip-flop folded to constant");
        changed += 1;
    }

    Ok(changed)
}

/// Delete LUTs and flip-flops that cannot reach an external output, and
/// signals nothing refers to any more. Returns the number of blocks removed.
pub fn remove_dead(logic: &mut LogicList) -> usize {
    let use_def = UseDef::new(logic);

    let mut live: BTreeSet<SignalId> = BTreeSet::new();
    let mut todo: Vec<SignalId> = logic.external_outputs.iter().copied().collect();
    while let Some(signal) = todo.pop() {
        if !live.insert(signal) {
            continue;
        }
        for def in use_def.defs(signal) {
            match *def {
                Def::Lut(i) => todo.extend(logic.luts[i].inputs.iter().copied()),
                Def::Ff(i) => todo.push(logic.ffs[i].input),
                Def::ExternalInput => {}
            }
        }
    }

    let before = logic.luts.len() + logic.ffs.len();
    logic.luts.retain(|lut| live.contains(&lut.output));
    logic.ffs.retain(|ff| live.contains(&ff.output));
    let removed = before - logic.luts.len() - logic.ffs.len();

    let mut referenced: BTreeSet<SignalId> = live;
    referenced.extend(logic.external_inputs.iter().copied());
    referenced.extend(logic.connections.iter().flat_map(|&(a, b)| [a, b]));
    logic.signals.retain(|id, _| referenced.contains(id));

    if removed > 0 {
        debug!(removed, "dead blocks removed");
    }
    removed
}

/// Collapse repeated LUT inputs and merge LUTs or flip-flops computing the
/// same function of the same signals. Returns the number of removals.
pub fn deduplicate(logic: &mut LogicList) -> usize {
    let mut removed = 0;

    for lut in &mut logic.luts {
        let before = lut.inputs.len();
        if lut.dedup_inputs() {
            removed += before - lut.inputs.len();
        }
    }

    let mut replacements: Vec<(SignalId, SignalId)> = Vec::new();

    // Two distinct external outputs stay distinct ports even when they
    // compute the same function.
    let outputs = &logic.external_outputs;
    let both_outputs = |a: SignalId, b: SignalId| outputs.contains(&a) && outputs.contains(&b);

    let mut seen_luts: BTreeMap<(Vec<SignalId>, Vec<bool>), SignalId> = BTreeMap::new();
    logic.luts.retain(|lut| {
        let key = (lut.inputs.clone(), lut.table.clone());
        match seen_luts.get(&key) {
            Some(&keep) if keep != lut.output && !both_outputs(keep, lut.output) => {
                replacements.push((lut.output, keep));
                false
            }
            Some(_) => true,
            None => {
                seen_luts.insert(key, lut.output);
                true
            }
        }
    });

    let mut seen_ffs: BTreeMap<(SignalId, bool), SignalId> = BTreeMap::new();
    logic.ffs.retain(|ff| match seen_ffs.get(&(ff.input, ff.init)) {
        Some(&keep) if keep != ff.output && !both_outputs(keep, ff.output) => {
            replacements.push((ff.output, keep));
            false
        }
        Some(_) => true,
        None => {
            seen_ffs.insert((ff.input, ff.init), ff.output);
            true
        }
    });

    removed += replacements.len();
    for (old, new) in replacements {
        logic.replace_signal(old, new);
    }

    if removed > 0 {
        debug!(removed, "duplicates removed");
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::LogicBuilder;
    use pretty_assertions::assert_eq;

    #[test]
    fn and_with_false_folds_away() {
        let mut b = LogicBuilder::new();
        let x = b.new_bit(Some("x"));
        let zero = b.new_const(false).unwrap();
        let y = b.and(x, zero).unwrap();
        let out = b.new_bit(Some("out"));
        b.connect(out, y).unwrap();
        b.logic_mut().mark_external_input([x.0]).unwrap();
        b.logic_mut().mark_external_output([out.0]).unwrap();

        let mut logic = b.finish();
        optimize_logic(&mut logic).unwrap();

        let observed = logic.external_outputs().iter().copied().collect::<Vec<_>>();
        assert_eq!(logic.luts().len(), 1);
        assert_eq!(logic.luts()[0].as_constant(), Some(false));
        assert_eq!(vec![logic.luts()[0].output], observed);
        assert!(logic.signal(observed[0]).unwrap().debug_names.contains("out"));
    }

    #[test]
    fn dead_logic_is_removed() {
        let mut b = LogicBuilder::new();
        let x = b.new_bit(Some("x"));
        let unused = b.not(x).unwrap();
        let kept = b.delay(x, 1).unwrap();
        b.logic_mut().mark_external_input([x.0]).unwrap();
        b.logic_mut().mark_external_output([kept.0]).unwrap();

        let mut logic = b.finish();
        let removed = remove_dead(&mut logic);
        assert_eq!(removed, 1);
        assert!(logic.signal(unused.0).is_none());
        assert_eq!(logic.ffs().len(), 1);
    }

    #[test]
    fn ff_with_matching_constant_input_is_folded() {
        let mut b = LogicBuilder::new();
        let zero = b.new_const(false).unwrap();
        let q = b.delay(zero, 1).unwrap();
        b.logic_mut().mark_external_output([q.0]).unwrap();

        let mut logic = b.finish();
        optimize_logic(&mut logic).unwrap();
        assert!(logic.ffs().is_empty());
        assert_eq!(logic.luts().len(), 1);
        assert_eq!(logic.luts()[0].output, q.0);
    }

    #[test]
    fn ff_with_differing_init_is_kept() {
        let mut logic = LogicList::new();
        let one = logic.new_lut(Vec::new(), vec![true]).unwrap();
        let q = logic.new_ff(one, false).unwrap();
        logic.mark_external_output([q]).unwrap();

        optimize_logic(&mut logic).unwrap();
        assert_eq!(logic.ffs().len(), 1);
        assert!(!logic.ffs()[0].init);
    }

    #[test]
    fn identical_luts_and_ffs_merge() {
        let mut b = LogicBuilder::new();
        let x = b.new_bit(Some("x"));
        let y = b.new_bit(Some("y"));
        let a1 = b.and(x, y).unwrap();
        let a2 = b.and(x, y).unwrap();
        let q1 = b.delay(x, 1).unwrap();
        let q2 = b.delay(x, 1).unwrap();
        let out = b.xor_all(&[a1, a2, q1, q2]).unwrap();
        b.logic_mut().mark_external_input([x.0, y.0]).unwrap();
        b.logic_mut().mark_external_output([out.0]).unwrap();

        let mut logic = b.finish();
        optimize_logic(&mut logic).unwrap();

        // a ^ a ^ q ^ q == 0
        assert!(logic.ffs().is_empty());
        assert_eq!(logic.luts().len(), 1);
        assert_eq!(logic.luts()[0].as_constant(), Some(false));
    }

    #[test]
    fn identical_external_outputs_are_not_merged() {
        let mut b = LogicBuilder::new();
        let x = b.new_bit(Some("x"));
        let y = b.new_bit(Some("y"));
        let o1 = b.and(x, y).unwrap();
        let o2 = b.and(x, y).unwrap();
        let q1 = b.delay(x, 1).unwrap();
        let q2 = b.delay(x, 1).unwrap();
        b.logic_mut().mark_external_input([x.0, y.0]).unwrap();
        b.logic_mut().mark_external_output([o1.0, o2.0, q1.0, q2.0]).unwrap();

        let mut logic = b.finish();
        assert_eq!(deduplicate(&mut logic), 0);
        optimize_logic(&mut logic).unwrap();
        assert_eq!(logic.external_outputs().len(), 4);
        assert_eq!(logic.luts().len(), 2);
        assert_eq!(logic.ffs().len(), 2);
    }

    #[test]
    fn ff_with_undriven_input_is_kept() {
        let mut b = LogicBuilder::new();
        let floating = b.new_bit(Some("floating"));
        let q = b.delay(floating, 1).unwrap();
        let nq = b.not(q).unwrap();
        b.logic_mut().mark_external_output([nq.0]).unwrap();

        let mut logic = b.finish();
        assert_eq!(const_propagation(&mut logic).unwrap(), 0);
        optimize_logic(&mut logic).unwrap();
        assert_eq!(logic.ffs().len(), 1);
        assert!(logic.luts().iter().all(|l| l.as_constant().is_none()));
    }

    #[test]
    fn chained_connections_merge_to_lowest() {
        let mut logic = LogicList::new();
        let a = logic.new_signal(Some("a"));
        let b = logic.new_signal(Some("b"));
        let c = logic.new_signal(Some("c"));
        logic.connect(b, c).unwrap();
        logic.connect(c, a).unwrap();
        assert_eq!(merge_connections(&mut logic), 2);
        assert_eq!(logic.signal_count(), 1);
        let names: Vec<_> = logic.signal(a).unwrap().debug_names.iter().cloned().collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }
}
