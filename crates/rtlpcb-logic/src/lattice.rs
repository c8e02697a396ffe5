//! Three-level lattice used by constant propagation.

/// `Undef` ⊑ `Def(v)` ⊑ `Overdef`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lattice<T> {
    /// No value observed yet.
    #[default]
    Undef,
    /// Exactly one value observed.
    Def(T),
    /// More than one value is possible.
    Overdef,
}

impl<T: PartialEq + Copy> Lattice<T> {
    /// Least upper bound.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        match (self, other) {
            (Self::Undef, x) | (x, Self::Undef) => x,
            (Self::Def(a), Self::Def(b)) if a == b => Self::Def(a),
            _ => Self::Overdef,
        }
    }

    /// Could the signal take value `v`?
    pub fn can_be(&self, v: T) -> bool {
        match self {
            Self::Undef => false,
            Self::Def(x) => *x == v,
            Self::Overdef => true,
        }
    }

    /// The known value, if any.
    pub fn as_def(&self) -> Option<T> {
        match self {
            Self::Def(x) => Some(*x),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn lattice() -> impl Strategy<Value = Lattice<bool>> {
        prop_oneof![
            Just(Lattice::Undef),
            any::<bool>().prop_map(Lattice::Def),
            Just(Lattice::Overdef),
        ]
    }

    #[test]
    fn def_conflict_goes_overdef() {
        assert_eq!(Lattice::Def(true).merge(Lattice::Def(false)), Lattice::Overdef);
        assert_eq!(Lattice::Def(true).merge(Lattice::Def(true)), Lattice::Def(true));
        assert!(!Lattice::<bool>::Undef.can_be(false));
        assert!(Lattice::<bool>::Overdef.can_be(false));
    }

    proptest! {
        #[test]
        fn merge_is_commutative(a in lattice(), b in lattice()) {
            prop_assert_eq!(a.merge(b), b.merge(a));
        }

        #[test]
        fn merge_is_associative(a in lattice(), b in lattice(), c in lattice()) {
            prop_assert_eq!(a.merge(b).merge(c), a.merge(b.merge(c)));
        }

        #[test]
        fn merge_is_idempotent_with_identity(a in lattice()) {
            prop_assert_eq!(a.merge(a), a);
            prop_assert_eq!(a.merge(Lattice::Undef), a);
            prop_assert_eq!(a.merge(Lattice::Overdef), Lattice::Overdef);
        }
    }
}
