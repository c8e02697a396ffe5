//! Technology-independent logic: look-up tables, flip-flops and the
//! connections between them.

use crate::canonicalize::canonicalize;
use crate::error::{LogicError, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::warn;

/// Opaque signal identifier, unique within one [`LogicList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SignalId(u32);

impl SignalId {
    /// Raw index.
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// A single-bit net in the logic list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    /// Identifier.
    pub id: SignalId,
    /// Names given by the designer. Merging signals merges their names.
    pub debug_names: BTreeSet<String>,
    /// Reserved name for global nets.
    pub special_name: Option<String>,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signal({}", self.id.0)?;
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

/// Widest LUT a [`LogicList`] accepts. Wider functions are built as trees.
pub const MAX_LUT_INPUTS: usize = 16;

/// Number of table rows for `inputs` inputs.
pub(crate) fn table_len(inputs: usize) -> Result<usize> {
    if inputs > MAX_LUT_INPUTS {
        return Err(LogicError::TableSize { inputs, len: 0 });
    }
    Ok(1 << inputs)
}

/// Look-up table: an arbitrary boolean function.
///
/// Row `i` of `table` gives the output when input `j` has value
/// `(i >> j) & 1`, so `inputs[0]` is the least significant bit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Lut {
    /// Driven signal.
    pub output: SignalId,
    /// Input signals, least significant first.
    pub inputs: Vec<SignalId>,
    /// Output per input combination.
    pub table: Vec<bool>,
}

impl Lut {
    /// Create a LUT, checking the table size.
    ///
    /// # Errors
    ///
    /// Returns [`LogicError::TableSize`] if `table.len() != 2^inputs.len()`.
    pub fn new(output: SignalId, inputs: Vec<SignalId>, table: Vec<bool>) -> Result<Self> {
        let expected = table_len(inputs.len())?;
        if table.len() != expected {
            return Err(LogicError::TableSize {
                inputs: inputs.len(),
                len: table.len(),
            });
        }
        Ok(Self { output, inputs, table })
    }

    /// Zero-input LUT producing a constant.
    pub fn constant(output: SignalId, value: bool) -> Self {
        Self {
            output,
            inputs: Vec::new(),
            table: vec![value],
        }
    }

    /// Constant value if this LUT has no inputs.
    pub fn as_constant(&self) -> Option<bool> {
        match (self.inputs.is_empty(), self.table.as_slice()) {
            (true, [v]) => Some(*v),
            _ => None,
        }
    }

    /// Iterate `(input values, output)` rows.
    pub fn lines(&self) -> impl Iterator<Item = (Vec<bool>, bool)> + '_ {
        let n = self.inputs.len();
        self.table
            .iter()
            .enumerate()
            .map(move |(i, &out)| ((0..n).map(|j| (i >> j) & 1 != 0).collect(), out))
    }

    /// Evaluate for concrete input values.
    ///
    /// # Errors
    ///
    /// Returns [`LogicError::ArityMismatch`] if the value count is wrong.
    pub fn eval(&self, values: &[bool]) -> Result<bool> {
        if values.len() != self.inputs.len() {
            return Err(LogicError::ArityMismatch {
                expected: self.inputs.len(),
                actual: values.len(),
            });
        }
        let index = values
            .iter()
            .enumerate()
            .fold(0usize, |acc, (j, &v)| acc | (usize::from(v) << j));
        Ok(self.table[index])
    }

    /// Specialise the table for inputs known to be constant and drop those
    /// inputs. Returns whether anything changed.
    ///
    /// # Errors
    ///
    /// Returns [`LogicError::ArityMismatch`] if `consts` has the wrong length.
    pub fn replace_consts(&mut self, consts: &[Option<bool>]) -> Result<bool> {
        if consts.len() != self.inputs.len() {
            return Err(LogicError::ArityMismatch {
                expected: self.inputs.len(),
                actual: consts.len(),
            });
        }

        let free: Vec<usize> = (0..consts.len()).filter(|&j| consts[j].is_none()).collect();
        if free.len() == consts.len() {
            return Ok(false);
        }

        let base = consts
            .iter()
            .enumerate()
            .fold(0usize, |acc, (j, c)| if *c == Some(true) { acc | (1 << j) } else { acc });

        let table = (0..1usize << free.len())
            .map(|r| {
                let index = free
                    .iter()
                    .enumerate()
                    .fold(base, |acc, (k, &j)| if (r >> k) & 1 != 0 { acc | (1 << j) } else { acc });
                self.table[index]
            })
            .collect();

        self.inputs = free.iter().map(|&j| self.inputs[j]).collect();
        self.table = table;
        Ok(true)
    }

    /// Collapse inputs that appear more than once. Returns whether anything
    /// changed.
    pub fn dedup_inputs(&mut self) -> bool {
        let mut changed = false;
        while let Some((i, j)) = self.first_repeat() {
            let n = self.inputs.len();
            let table = (0..1usize << (n - 1))
                .map(|r| {
                    let low = r & ((1 << j) - 1);
                    let high = (r >> j) << (j + 1);
                    let bit_i = (r >> i) & 1;
                    self.table[low | high | (bit_i << j)]
                })
                .collect();
            self.inputs.remove(j);
            self.table = table;
            changed = true;
        }
        changed
    }

    fn first_repeat(&self) -> Option<(usize, usize)> {
        for j in 1..self.inputs.len() {
            if let Some(i) = self.inputs[..j].iter().position(|&s| s == self.inputs[j]) {
                return Some((i, j));
            }
        }
        None
    }

    fn replace(&mut self, mut f: impl FnMut(SignalId) -> SignalId) {
        self.output = f(self.output);
        for s in &mut self.inputs {
            *s = f(*s);
        }
    }
}

/// D flip-flop on the global clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ff {
    /// Registered output.
    pub output: SignalId,
    /// Data input.
    pub input: SignalId,
    /// Power-on value.
    pub init: bool,
}

impl Ff {
    fn replace(&mut self, mut f: impl FnMut(SignalId) -> SignalId) {
        self.input = f(self.input);
        self.output = f(self.output);
    }
}

/// Which warnings [`LogicList::validate`] should log.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidateOptions {
    /// Signals driven but never read.
    pub warn_unused: bool,
    /// Signals read but never driven.
    pub warn_undriven: bool,
    /// Signals touching nothing at all.
    pub warn_unconnected: bool,
}

impl ValidateOptions {
    /// Every warning enabled.
    pub const ALL: Self = Self {
        warn_unused: true,
        warn_undriven: true,
        warn_unconnected: true,
    };
}

/// Soft problems found by [`LogicList::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Driven, but nothing connected to them reads them.
    pub unused: Vec<SignalId>,
    /// Read, but nothing connected to them drives them.
    pub undriven: Vec<SignalId>,
    /// Neither driven, read nor connected.
    pub unconnected: Vec<SignalId>,
}

impl ValidationReport {
    /// True when no warnings were found.
    pub fn is_clean(&self) -> bool {
        self.unused.is_empty() && self.undriven.is_empty() && self.unconnected.is_empty()
    }
}

/// Block counts of a logic list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogicCounts {
    /// Number of LUTs.
    pub luts: usize,
    /// Number of flip-flops.
    pub ffs: usize,
    /// Number of pending connections.
    pub connections: usize,
    /// LUT count keyed by input count.
    pub luts_per_input_count: BTreeMap<usize, usize>,
}

impl fmt::Display for LogicCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "    luts: {},", self.luts)?;
        writeln!(f, "    ffs: {},", self.ffs)?;
        writeln!(f, "    cons: {},", self.connections)?;
        let per: Vec<String> = self
            .luts_per_input_count
            .iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect();
        write!(f, "    luts_per_input_count: {{{}}},", per.join(", "))
    }
}

/// A netlist of LUTs and flip-flops.
#[derive(Debug, Clone, Default)]
pub struct LogicList {
    pub(crate) signals: BTreeMap<SignalId, Signal>,
    next_id: u32,
    pub(crate) luts: Vec<Lut>,
    pub(crate) ffs: Vec<Ff>,
    pub(crate) connections: Vec<(SignalId, SignalId)>,
    pub(crate) external_inputs: BTreeSet<SignalId>,
    pub(crate) external_outputs: BTreeSet<SignalId>,
}

impl LogicList {
    /// Create an empty logic list.
    pub fn new() -> Self {
        Self::default()
    }

    /// All signals in id order.
    pub fn signals(&self) -> impl Iterator<Item = &Signal> {
        self.signals.values()
    }

    /// Look up a signal.
    pub fn signal(&self, id: SignalId) -> Option<&Signal> {
        self.signals.get(&id)
    }

    /// Number of live signals.
    pub fn signal_count(&self) -> usize {
        self.signals.len()
    }

    /// All LUTs.
    pub fn luts(&self) -> &[Lut] {
        &self.luts
    }

    /// All flip-flops.
    pub fn ffs(&self) -> &[Ff] {
        &self.ffs
    }

    /// Pending connections.
    pub fn connections(&self) -> &[(SignalId, SignalId)] {
        &self.connections
    }

    /// Signals driven from outside.
    pub fn external_inputs(&self) -> &BTreeSet<SignalId> {
        &self.external_inputs
    }

    /// Signals observed from outside.
    pub fn external_outputs(&self) -> &BTreeSet<SignalId> {
        &self.external_outputs
    }

    /// Name used in reports: the first debug name or the raw id.
    pub fn display_name(&self, id: SignalId) -> String {
        self.signal(id)
            .and_then(|s| s.special_name.clone().or_else(|| s.debug_names.iter().next().cloned()))
            .unwrap_or_else(|| id.to_string())
    }

    fn check_signal(&self, signal: SignalId) -> Result<()> {
        if self.signals.contains_key(&signal) {
            Ok(())
        } else {
            Err(LogicError::unknown_signal(signal))
        }
    }

    /// Allocate a new signal.
    pub fn new_signal(&mut self, debug_name: Option<&str>) -> SignalId {
        let id = SignalId(self.next_id);
        self.next_id += 1;
        let mut debug_names = BTreeSet::new();
        if let Some(name) = debug_name {
            debug_names.insert(name.to_string());
        }
        self.signals.insert(
            id,
            Signal {
                id,
                debug_names,
                special_name: None,
            },
        );
        id
    }

    /// Add a debug name to an existing signal.
    ///
    /// # Errors
    ///
    /// Returns [`LogicError::UnknownSignal`] for foreign signals.
    pub fn add_name(&mut self, signal: SignalId, name: &str) -> Result<()> {
        let s = self
            .signals
            .get_mut(&signal)
            .ok_or(LogicError::unknown_signal(signal))?;
        s.debug_names.insert(name.to_string());
        Ok(())
    }

    /// Record that `a` and `b` are the same net.
    ///
    /// # Errors
    ///
    /// Returns [`LogicError::UnknownSignal`] for foreign signals.
    pub fn connect(&mut self, a: SignalId, b: SignalId) -> Result<()> {
        self.check_signal(a)?;
        self.check_signal(b)?;
        self.connections.push((a, b));
        Ok(())
    }

    /// Mark signals as driven from outside.
    ///
    /// # Errors
    ///
    /// Returns [`LogicError::UnknownSignal`] for foreign signals.
    pub fn mark_external_input(&mut self, signals: impl IntoIterator<Item = SignalId>) -> Result<()> {
        for s in signals {
            self.check_signal(s)?;
            self.external_inputs.insert(s);
        }
        Ok(())
    }

    /// Mark signals as observed from outside.
    ///
    /// # Errors
    ///
    /// Returns [`LogicError::UnknownSignal`] for foreign signals.
    pub fn mark_external_output(&mut self, signals: impl IntoIterator<Item = SignalId>) -> Result<()> {
        for s in signals {
            self.check_signal(s)?;
            self.external_outputs.insert(s);
        }
        Ok(())
    }

    /// Add an existing LUT.
    ///
    /// # Errors
    ///
    /// Returns an error for foreign signals or a malformed table.
    pub fn push_lut(&mut self, lut: Lut) -> Result<()> {
        for &s in &lut.inputs {
            self.check_signal(s)?;
        }
        self.check_signal(lut.output)?;
        if lut.table.len() != table_len(lut.inputs.len())? {
            return Err(LogicError::TableSize {
                inputs: lut.inputs.len(),
                len: lut.table.len(),
            });
        }
        self.luts.push(lut);
        Ok(())
    }

    /// Add a LUT driving a fresh signal.
    ///
    /// # Errors
    ///
    /// Returns an error for foreign signals or a malformed table.
    pub fn new_lut(&mut self, inputs: Vec<SignalId>, table: Vec<bool>) -> Result<SignalId> {
        for &s in &inputs {
            self.check_signal(s)?;
        }
        let expected = table_len(inputs.len())?;
        if table.len() != expected {
            return Err(LogicError::TableSize {
                inputs: inputs.len(),
                len: table.len(),
            });
        }
        let output = self.new_signal(None);
        self.luts.push(Lut { output, inputs, table });
        Ok(output)
    }

    /// Add an existing flip-flop.
    ///
    /// # Errors
    ///
    /// Returns [`LogicError::UnknownSignal`] for foreign signals.
    pub fn push_ff(&mut self, ff: Ff) -> Result<()> {
        self.check_signal(ff.input)?;
        self.check_signal(ff.output)?;
        self.ffs.push(ff);
        Ok(())
    }

    /// Add a flip-flop driving a fresh signal.
    ///
    /// # Errors
    ///
    /// Returns [`LogicError::UnknownSignal`] for foreign signals.
    pub fn new_ff(&mut self, input: SignalId, init: bool) -> Result<SignalId> {
        self.check_signal(input)?;
        let output = self.new_signal(None);
        self.ffs.push(Ff { output, input, init });
        Ok(output)
    }

    /// Rewrite every use of `old` as `new` and drop `old`. Returns the number
    /// of rewritten references.
    pub fn replace_signal(&mut self, old: SignalId, new: SignalId) -> usize {
        if old == new {
            return 0;
        }

        let mut count = 0;
        let mut f = |s: SignalId| {
            if s == old {
                count += 1;
                new
            } else {
                s
            }
        };

        for (a, b) in &mut self.connections {
            *a = f(*a);
            *b = f(*b);
        }
        for lut in &mut self.luts {
            lut.replace(&mut f);
        }
        for ff in &mut self.ffs {
            ff.replace(&mut f);
        }
        for set in [&mut self.external_inputs, &mut self.external_outputs] {
            if set.remove(&old) {
                set.insert(new);
                count += 1;
            }
        }

        if let Some(old_signal) = self.signals.remove(&old) {
            if let Some(target) = self.signals.get_mut(&new) {
                target.debug_names.extend(old_signal.debug_names);
                if target.special_name.is_none() {
                    target.special_name = old_signal.special_name;
                }
            }
        }

        count
    }

    /// Check structural consistency and collect soft warnings.
    ///
    /// Warnings are logged for the categories enabled in `options`; the
    /// returned report always contains all of them.
    ///
    /// # Errors
    ///
    /// Returns an error if a block references a signal that does not exist
    /// or a LUT table is malformed.
    pub fn validate(&self, options: ValidateOptions) -> Result<ValidationReport> {
        for (id, signal) in &self.signals {
            if signal.id != *id {
                return Err(LogicError::DuplicateSignal { signal: signal.id });
            }
        }

        let mut driven: BTreeSet<SignalId> = self.external_inputs.clone();
        let mut used: BTreeSet<SignalId> = self.external_outputs.clone();
        for lut in &self.luts {
            if lut.table.len() != table_len(lut.inputs.len())? {
                return Err(LogicError::TableSize {
                    inputs: lut.inputs.len(),
                    len: lut.table.len(),
                });
            }
            driven.insert(lut.output);
            used.extend(lut.inputs.iter().copied());
        }
        for ff in &self.ffs {
            driven.insert(ff.output);
            used.insert(ff.input);
        }
        for &s in driven.iter().chain(used.iter()) {
            self.check_signal(s)?;
        }
        for &(a, b) in &self.connections {
            self.check_signal(a)?;
            self.check_signal(b)?;
        }

        let best = canonicalize(self.connections.iter().copied(), |a, b| a < b);
        let class = |s: SignalId| best.get(&s).copied().unwrap_or(s);
        let driven_classes: BTreeSet<SignalId> = driven.iter().map(|&s| class(s)).collect();
        let used_classes: BTreeSet<SignalId> = used.iter().map(|&s| class(s)).collect();
        let connected: BTreeSet<SignalId> = self
            .connections
            .iter()
            .flat_map(|&(a, b)| [a, b])
            .collect();

        let mut report = ValidationReport::default();
        for &s in &used {
            if !driven_classes.contains(&class(s)) {
                report.undriven.push(s);
            }
        }
        for &s in &driven {
            if !used_classes.contains(&class(s)) {
                report.unused.push(s);
            }
        }
        for &s in self.signals.keys() {
            if !driven.contains(&s) && !used.contains(&s) && !connected.contains(&s) {
                report.unconnected.push(s);
            }
        }

        if options.warn_undriven {
            for &s in &report.undriven {
                warn!("signal {} is used but never driven", self.describe(s));
            }
        }
        if options.warn_unused {
            for &s in &report.unused {
                warn!("signal {} is driven but never used", self.describe(s));
            }
        }
        if options.warn_unconnected {
            for &s in &report.unconnected {
                warn!("signal {} is not connected to anything", self.describe(s));
            }
        }

        Ok(report)
    }

    fn describe(&self, id: SignalId) -> String {
        self.signal(id).map_or_else(|| id.to_string(), ToString::to_string)
    }

    /// Block counts.
    pub fn counts(&self) -> LogicCounts {
        let mut luts_per_input_count = BTreeMap::new();
        for lut in &self.luts {
            *luts_per_input_count.entry(lut.inputs.len()).or_insert(0) += 1;
        }
        LogicCounts {
            luts: self.luts.len(),
            ffs: self.ffs.len(),
            connections: self.connections.len(),
            luts_per_input_count,
        }
    }
}

impl fmt::Display for LogicList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "LogicList(")?;

        writeln!(f, "  signals: [")?;
        for signal in self.signals.values() {
            write!(f, "    {signal}")?;
            if self.external_inputs.contains(&signal.id) {
                write!(f, " in")?;
            }
            if self.external_outputs.contains(&signal.id) {
                write!(f, " out")?;
            }
            writeln!(f)?;
        }
        writeln!(f, "  ],")?;

        writeln!(f, "  connections: [")?;
        for (a, b) in &self.connections {
            writeln!(f, "    {a} <-> {b}")?;
        }
        writeln!(f, "  ],")?;

        writeln!(f, "  luts: [")?;
        for lut in &self.luts {
            let table: String = lut.table.iter().map(|&x| if x { '1' } else { '0' }).collect();
            let inputs: Vec<String> = lut.inputs.iter().map(ToString::to_string).collect();
            writeln!(f, "    {} = LUT([{}], {table})", lut.output, inputs.join(", "))?;
        }
        writeln!(f, "  ],")?;

        writeln!(f, "  ffs: [")?;
        for ff in &self.ffs {
            writeln!(f, "    {} = FF({}, {})", ff.output, ff.input, u8::from(ff.init))?;
        }
        writeln!(f, "  ],")?;

        writeln!(f, "  counts: [")?;
        writeln!(f, "{}", self.counts())?;
        writeln!(f, "  ],")?;
        write!(f, ")")
    }
}
