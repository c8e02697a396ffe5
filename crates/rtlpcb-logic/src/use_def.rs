//! Users and definitions of every signal.

use crate::logic_list::{LogicList, SignalId};
use std::collections::BTreeMap;

/// Something that reads a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum User {
    /// LUT at this index reads it.
    Lut(usize),
    /// Flip-flop at this index reads it.
    Ff(usize),
    /// It is an external output.
    ExternalOutput,
}

/// Something that drives a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Def {
    /// LUT at this index drives it.
    Lut(usize),
    /// Flip-flop at this index drives it.
    Ff(usize),
    /// It is an external input.
    ExternalInput,
}

/// Users and definitions indexed by signal. Indices refer to the
/// [`LogicList`] snapshot this was built from.
#[derive(Debug, Clone, Default)]
pub struct UseDef {
    users: BTreeMap<SignalId, Vec<User>>,
    defs: BTreeMap<SignalId, Vec<Def>>,
}

impl UseDef {
    /// Index `logic`. Connections are not followed.
    pub fn new(logic: &LogicList) -> Self {
        let mut users: BTreeMap<SignalId, Vec<User>> = BTreeMap::new();
        let mut defs: BTreeMap<SignalId, Vec<Def>> = BTreeMap::new();

        for (i, lut) in logic.luts().iter().enumerate() {
            for &input in &lut.inputs {
                let entry = users.entry(input).or_default();
                if !entry.contains(&User::Lut(i)) {
                    entry.push(User::Lut(i));
                }
            }
            defs.entry(lut.output).or_default().push(Def::Lut(i));
        }
        for (i, ff) in logic.ffs().iter().enumerate() {
            users.entry(ff.input).or_default().push(User::Ff(i));
            defs.entry(ff.output).or_default().push(Def::Ff(i));
        }
        for &s in logic.external_outputs() {
            users.entry(s).or_default().push(User::ExternalOutput);
        }
        for &s in logic.external_inputs() {
            defs.entry(s).or_default().push(Def::ExternalInput);
        }

        Self { users, defs }
    }

    /// Blocks reading `signal`.
    pub fn users(&self, signal: SignalId) -> &[User] {
        self.users.get(&signal).map_or(&[], Vec::as_slice)
    }

    /// Blocks driving `signal`.
    pub fn defs(&self, signal: SignalId) -> &[Def] {
        self.defs.get(&signal).map_or(&[], Vec::as_slice)
    }
}
