//! Cycle-based two-valued simulation.

use crate::error::{LogicError, Result};
use crate::logic_list::{LogicList, SignalId};
use crate::optimize::merge_connections;
use crate::use_def::{Def, UseDef};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Write as _};
use tracing::debug;

/// Per-cycle values of every signal.
#[derive(Debug, Clone)]
pub struct History {
    signals: Vec<SignalId>,
    labels: Vec<String>,
    roles: Vec<[char; 4]>,
    outputs: Vec<SignalId>,
    index: BTreeMap<SignalId, usize>,
    rows: Vec<Vec<Option<bool>>>,
}

impl History {
    /// Number of simulated cycles.
    pub fn cycles(&self) -> usize {
        self.rows.len()
    }

    /// Value of `signal` in `cycle`; `None` if undriven or unknown.
    pub fn value(&self, cycle: usize, signal: SignalId) -> Option<bool> {
        let i = *self.index.get(&signal)?;
        self.rows.get(cycle)?.get(i).copied().flatten()
    }

    /// Simulated signals in row order of [`History::render`].
    pub fn signals(&self) -> &[SignalId] {
        &self.signals
    }

    /// External output signals, in column order of [`History::outputs`].
    pub fn output_signals(&self) -> &[SignalId] {
        &self.outputs
    }

    /// External output values per cycle.
    pub fn outputs(&self) -> Vec<Vec<Option<bool>>> {
        (0..self.cycles())
            .map(|c| self.outputs.iter().map(|&s| self.value(c, s)).collect())
            .collect()
    }

    /// External outputs read as an unsigned number, least significant first.
    /// `None` for cycles with an undriven output.
    pub fn output_words(&self) -> Vec<Option<u64>> {
        self.outputs()
            .into_iter()
            .map(|row| {
                row.iter().enumerate().try_fold(0u64, |acc, (i, v)| {
                    let bit = (*v)?;
                    Some(if bit && i < 64 { acc | (1 << i) } else { acc })
                })
            })
            .collect()
    }

    /// Waveform table: one row per signal, one column per cycle.
    ///
    /// Role flags are `L` (LUT output), `F` (flip-flop output), `I` (external
    /// input) and `O` (external output). Undriven cycles print `z`.
    pub fn render(&self, skip_unchanged: bool) -> String {
        Waveform {
            history: self,
            skip_unchanged,
        }
        .to_string()
    }
}

struct Waveform<'a> {
    history: &'a History,
    skip_unchanged: bool,
}

impl fmt::Display for Waveform<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let h = self.history;
        let width = h.labels.iter().map(String::len).max().unwrap_or(0);

        write!(f, "{:width$}       ", "")?;
        for c in (0..h.cycles()).step_by(8) {
            write!(f, "|{c:<7}")?;
        }
        writeln!(f)?;

        for (i, label) in h.labels.iter().enumerate() {
            let roles: String = h.roles[i].iter().collect();
            write!(f, "{label:width$} {roles}: ")?;
            let mut prev = None;
            for row in &h.rows {
                let v = match row[i] {
                    Some(true) => '1',
                    Some(false) => '0',
                    None => 'z',
                };
                if self.skip_unchanged && prev == Some(v) {
                    f.write_char(' ')?;
                } else {
                    f.write_char(v)?;
                }
                prev = Some(v);
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

struct Evaluator<'a> {
    logic: &'a LogicList,
    use_def: &'a UseDef,
    cycle: usize,
    inputs: &'a BTreeMap<SignalId, bool>,
    ff_values: &'a [Option<bool>],
    state: BTreeMap<SignalId, Option<bool>>,
    visiting: BTreeSet<SignalId>,
}

impl Evaluator<'_> {
    fn eval(&mut self, signal: SignalId) -> Result<Option<bool>> {
        if let Some(&v) = self.state.get(&signal) {
            return Ok(v);
        }
        if !self.visiting.insert(signal) {
            return Err(LogicError::CombinationalLoop { signal });
        }

        let mut result: Option<bool> = None;
        for def in self.use_def.defs(signal) {
            let value = match *def {
                Def::ExternalInput => self.inputs.get(&signal).copied(),
                Def::Ff(i) => self.ff_values.get(i).copied().flatten(),
                Def::Lut(i) => {
                    let lut = &self.logic.luts[i];
                    let mut values = Vec::with_capacity(lut.inputs.len());
                    for &input in &lut.inputs {
                        values.push(self.eval(input)?);
                    }
                    match values.into_iter().collect::<Option<Vec<bool>>>() {
                        Some(values) => Some(lut.eval(&values)?),
                        None => None,
                    }
                }
            };
            match (result, value) {
                (Some(a), Some(b)) if a != b => {
                    return Err(LogicError::ConflictingDrivers {
                        signal,
                        cycle: self.cycle,
                    });
                }
                (None, v) => result = v,
                _ => {}
            }
        }

        self.visiting.remove(&signal);
        self.state.insert(signal, result);
        Ok(result)
    }
}

/// Simulate `steps` clock cycles.
///
/// Pending connections are merged on a private copy. `stimulus(cycle,
/// signal)` supplies each external input every cycle.
///
/// # Errors
///
/// Fails on a combinational loop, on drivers that disagree, or if the logic
/// list is structurally invalid.
pub fn simulate<F>(logic: &LogicList, steps: usize, mut stimulus: F) -> Result<History>
where
    F: FnMut(usize, SignalId) -> bool,
{
    let mut logic = logic.clone();
    merge_connections(&mut logic);
    logic.validate(crate::logic_list::ValidateOptions::default())?;
    let use_def = UseDef::new(&logic);

    let signals: Vec<SignalId> = logic.signals.keys().copied().collect();
    let index: BTreeMap<SignalId, usize> = signals.iter().enumerate().map(|(i, &s)| (s, i)).collect();
    let labels = logic.signals.values().map(ToString::to_string).collect();
    let roles = signals
        .iter()
        .map(|&s| {
            let mut r = [' '; 4];
            for def in use_def.defs(s) {
                match def {
                    Def::Lut(_) => r[0] = 'L',
                    Def::Ff(_) => r[1] = 'F',
                    Def::ExternalInput => r[2] = 'I',
                }
            }
            if logic.external_outputs.contains(&s) {
                r[3] = 'O';
            }
            r
        })
        .collect();

    let mut rows: Vec<Vec<Option<bool>>> = Vec::with_capacity(steps);
    for cycle in 0..steps {
        let ff_values: Vec<Option<bool>> = match rows.last() {
            None => logic.ffs.iter().map(|ff| Some(ff.init)).collect(),
            Some(prev) => logic
                .ffs
                .iter()
                .map(|ff| index.get(&ff.input).and_then(|&i| prev[i]))
                .collect(),
        };
        let inputs: BTreeMap<SignalId, bool> = logic
            .external_inputs
            .iter()
            .map(|&s| (s, stimulus(cycle, s)))
            .collect();

        let mut evaluator = Evaluator {
            logic: &logic,
            use_def: &use_def,
            cycle,
            inputs: &inputs,
            ff_values: &ff_values,
            state: BTreeMap::new(),
            visiting: BTreeSet::new(),
        };
        let row = signals
            .iter()
            .map(|&s| evaluator.eval(s))
            .collect::<Result<Vec<_>>>()?;
        rows.push(row);
    }

    debug!(steps, signals = signals.len(), "simulation finished");

    Ok(History {
        signals,
        labels,
        roles,
        outputs: logic.external_outputs.iter().copied().collect(),
        index,
        rows,
    })
}

/// Simulate with every external input held low.
///
/// # Errors
///
/// See [`simulate`].
pub fn simulate_idle(logic: &LogicList, steps: usize) -> Result<History> {
    simulate(logic, steps, |_, _| false)
}
