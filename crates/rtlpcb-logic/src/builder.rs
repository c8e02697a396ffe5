//! Register-transfer level builder.
//!
//! Every operation allocates LUTs or flip-flops in the owned [`LogicList`]
//! and hands back lightweight handles. Feedback is expressed by creating a
//! placeholder with [`LogicBuilder::new_bit`] and later tying it to its
//! driver with [`LogicBuilder::connect`].

use crate::error::{LogicError, Result};
use crate::logic_list::{table_len, LogicList, SignalId, MAX_LUT_INPUTS};

/// Handle to a single signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bit(pub SignalId);

impl Bit {
    /// Underlying signal.
    #[must_use]
    pub const fn signal(self) -> SignalId {
        self.0
    }
}

/// Ordered bits, least significant first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BitVec(pub Vec<Bit>);

impl BitVec {
    /// Number of bits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for a zero-width vector.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Bit `i`, if in range.
    #[must_use]
    pub fn get(&self, i: usize) -> Option<Bit> {
        self.0.get(i).copied()
    }

    /// Iterate bits, least significant first.
    pub fn iter(&self) -> impl Iterator<Item = Bit> + '_ {
        self.0.iter().copied()
    }

    /// Underlying signals.
    #[must_use]
    pub fn signals(&self) -> Vec<SignalId> {
        self.0.iter().map(|b| b.0).collect()
    }

    /// First `n` bits.
    #[must_use]
    pub fn truncate(mut self, n: usize) -> Self {
        self.0.truncate(n);
        self
    }
}

impl FromIterator<Bit> for BitVec {
    fn from_iter<I: IntoIterator<Item = Bit>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Unsigned integer, least significant bit first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Unsigned(pub BitVec);

impl Unsigned {
    /// Bit width.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for a zero-width number.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Bits as a vector.
    #[must_use]
    pub fn as_vec(&self) -> &BitVec {
        &self.0
    }

    /// Underlying signals.
    #[must_use]
    pub fn signals(&self) -> Vec<SignalId> {
        self.0.signals()
    }
}

fn check_width(left: usize, right: usize) -> Result<()> {
    if left == right {
        Ok(())
    } else {
        Err(LogicError::width_mismatch(left, right))
    }
}

/// Builds a [`LogicList`] from bit-level operations.
#[derive(Debug, Default)]
pub struct LogicBuilder {
    logic: LogicList,
}

impl LogicBuilder {
    /// Start with an empty logic list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Logic built so far.
    #[must_use]
    pub fn logic(&self) -> &LogicList {
        &self.logic
    }

    /// Mutable access, e.g. for marking externals.
    pub fn logic_mut(&mut self) -> &mut LogicList {
        &mut self.logic
    }

    /// Take the finished logic list.
    #[must_use]
    pub fn finish(self) -> LogicList {
        self.logic
    }

    // construction

    /// Constant bit.
    ///
    /// # Errors
    ///
    /// Infallible in practice; kept fallible for uniformity.
    pub fn new_const(&mut self, value: bool) -> Result<Bit> {
        self.logic.new_lut(Vec::new(), vec![value]).map(Bit)
    }

    /// Fresh undriven bit.
    pub fn new_bit(&mut self, name: Option<&str>) -> Bit {
        Bit(self.logic.new_signal(name))
    }

    /// Fresh undriven vector; bits are named `name[i]`.
    pub fn new_bitvec(&mut self, n: usize, name: Option<&str>) -> BitVec {
        (0..n)
            .map(|i| {
                let bit_name = name.map(|name| format!("{name}[{i}]"));
                Bit(self.logic.new_signal(bit_name.as_deref()))
            })
            .collect()
    }

    /// Fresh undriven unsigned number.
    pub fn new_unsigned(&mut self, n: usize, name: Option<&str>) -> Unsigned {
        Unsigned(self.new_bitvec(n, name))
    }

    /// Constant unsigned number, truncated to `width` bits.
    ///
    /// # Errors
    ///
    /// Infallible in practice; kept fallible for uniformity.
    pub fn const_unsigned(&mut self, value: u64, width: usize) -> Result<Unsigned> {
        let bits = (0..width)
            .map(|i| {
                let set = i < 64 && (value >> i) & 1 != 0;
                self.new_const(set)
            })
            .collect::<Result<BitVec>>()?;
        Ok(Unsigned(bits))
    }

    // gates

    fn lut(&mut self, inputs: &[Bit], table: Vec<bool>) -> Result<Bit> {
        self.logic
            .new_lut(inputs.iter().map(|b| b.0).collect(), table)
            .map(Bit)
    }

    /// `!a`
    ///
    /// # Errors
    ///
    /// Fails if `a` belongs to another logic list.
    pub fn not(&mut self, a: Bit) -> Result<Bit> {
        self.lut(&[a], vec![true, false])
    }

    /// `a & b`
    ///
    /// # Errors
    ///
    /// Fails for foreign bits.
    pub fn and(&mut self, a: Bit, b: Bit) -> Result<Bit> {
        self.and_all(&[a, b])
    }

    /// `a | b`
    ///
    /// # Errors
    ///
    /// Fails for foreign bits.
    pub fn or(&mut self, a: Bit, b: Bit) -> Result<Bit> {
        self.or_all(&[a, b])
    }

    /// `a ^ b`
    ///
    /// # Errors
    ///
    /// Fails for foreign bits.
    pub fn xor(&mut self, a: Bit, b: Bit) -> Result<Bit> {
        self.xor_all(&[a, b])
    }

    /// Reduce `inputs` with an associative operator given as a truth table
    /// generator. More than [`MAX_LUT_INPUTS`] inputs become a tree of LUTs.
    fn reduce(&mut self, inputs: &[Bit], row: fn(usize, usize) -> bool) -> Result<Bit> {
        if inputs.len() <= MAX_LUT_INPUTS {
            let len = table_len(inputs.len())?;
            let table = (0..len).map(|i| row(i, len)).collect();
            return self.lut(inputs, table);
        }
        let partial = inputs
            .chunks(MAX_LUT_INPUTS)
            .map(|chunk| self.reduce(chunk, row))
            .collect::<Result<Vec<Bit>>>()?;
        self.reduce(&partial, row)
    }

    /// AND of all inputs; true for none.
    ///
    /// # Errors
    ///
    /// Fails for foreign bits.
    pub fn and_all(&mut self, inputs: &[Bit]) -> Result<Bit> {
        self.reduce(inputs, |i, len| i == len - 1)
    }

    /// OR of all inputs; false for none.
    ///
    /// # Errors
    ///
    /// Fails for foreign bits.
    pub fn or_all(&mut self, inputs: &[Bit]) -> Result<Bit> {
        self.reduce(inputs, |i, _| i != 0)
    }

    /// Parity of all inputs.
    ///
    /// # Errors
    ///
    /// Fails for foreign bits.
    pub fn xor_all(&mut self, inputs: &[Bit]) -> Result<Bit> {
        self.reduce(inputs, |i, _| i.count_ones() % 2 == 1)
    }

    /// `if sel { if_true } else { if_false }` as one three-input LUT.
    ///
    /// # Errors
    ///
    /// Fails for foreign bits.
    pub fn mux(&mut self, sel: Bit, if_false: Bit, if_true: Bit) -> Result<Bit> {
        let table = (0..8)
            .map(|i| if i & 1 != 0 { i & 4 != 0 } else { i & 2 != 0 })
            .collect();
        self.lut(&[sel, if_false, if_true], table)
    }

    // arithmetic

    /// One-bit full adder, returning `(carry, sum)`.
    ///
    /// # Errors
    ///
    /// Fails for foreign bits.
    pub fn full_add(&mut self, a: Bit, b: Bit, c: Bit) -> Result<(Bit, Bit)> {
        let sum = self.xor_all(&[a, b, c])?;
        let majority = (0..8).map(|i: u32| i.count_ones() >= 2).collect();
        let carry = self.lut(&[a, b, c], majority)?;
        Ok((carry, sum))
    }

    /// `x + y + cin`, one bit wider than the operands. A missing carry-in
    /// is a constant zero.
    ///
    /// # Errors
    ///
    /// Fails with [`LogicError::WidthMismatch`] for unequal widths.
    pub fn add_full(&mut self, x: &Unsigned, y: &Unsigned, cin: Option<Bit>) -> Result<Unsigned> {
        check_width(x.len(), y.len())?;
        let mut carry = match cin {
            Some(c) => c,
            None => self.new_const(false)?,
        };
        let mut bits = Vec::with_capacity(x.len() + 1);
        for (a, b) in x.0.iter().zip(y.0.iter()) {
            let (next, sum) = self.full_add(a, b, carry)?;
            bits.push(sum);
            carry = next;
        }
        bits.push(carry);
        Ok(Unsigned(BitVec(bits)))
    }

    /// `x + y` without carry-in, one bit wider than the operands.
    ///
    /// # Errors
    ///
    /// Fails with [`LogicError::WidthMismatch`] for unequal widths.
    pub fn add(&mut self, x: &Unsigned, y: &Unsigned) -> Result<Unsigned> {
        self.add_full(x, y, None)
    }

    /// `x + k` wrapped to the width of `x`.
    ///
    /// # Errors
    ///
    /// Fails for foreign bits.
    pub fn add_trunc_const(&mut self, x: &Unsigned, k: u64) -> Result<Unsigned> {
        let y = self.const_unsigned(k, x.len())?;
        let sum = self.add(x, &y)?;
        Ok(Unsigned(sum.0.truncate(x.len())))
    }

    // vectors

    /// Bitwise NOT.
    ///
    /// # Errors
    ///
    /// Fails for foreign bits.
    pub fn not_vec(&mut self, a: &BitVec) -> Result<BitVec> {
        a.iter().map(|b| self.not(b)).collect()
    }

    /// Bitwise AND.
    ///
    /// # Errors
    ///
    /// Fails with [`LogicError::WidthMismatch`] for unequal widths.
    pub fn and_vec(&mut self, a: &BitVec, b: &BitVec) -> Result<BitVec> {
        self.zip_vec(a, b, Self::and)
    }

    /// Bitwise OR.
    ///
    /// # Errors
    ///
    /// Fails with [`LogicError::WidthMismatch`] for unequal widths.
    pub fn or_vec(&mut self, a: &BitVec, b: &BitVec) -> Result<BitVec> {
        self.zip_vec(a, b, Self::or)
    }

    /// Bitwise XOR.
    ///
    /// # Errors
    ///
    /// Fails with [`LogicError::WidthMismatch`] for unequal widths.
    pub fn xor_vec(&mut self, a: &BitVec, b: &BitVec) -> Result<BitVec> {
        self.zip_vec(a, b, Self::xor)
    }

    fn zip_vec(
        &mut self,
        a: &BitVec,
        b: &BitVec,
        mut op: impl FnMut(&mut Self, Bit, Bit) -> Result<Bit>,
    ) -> Result<BitVec> {
        check_width(a.len(), b.len())?;
        a.iter().zip(b.iter()).map(|(x, y)| op(self, x, y)).collect()
    }

    // time

    /// Insert `n` flip-flops with initial value `false`.
    ///
    /// # Errors
    ///
    /// Fails if `bit` belongs to another logic list.
    pub fn delay(&mut self, bit: Bit, n: usize) -> Result<Bit> {
        let mut curr = bit.0;
        for _ in 0..n {
            curr = self.logic.new_ff(curr, false)?;
        }
        Ok(Bit(curr))
    }

    /// Delay every bit of a vector.
    ///
    /// # Errors
    ///
    /// Fails for foreign bits.
    pub fn delay_vec(&mut self, v: &BitVec, n: usize) -> Result<BitVec> {
        v.iter().map(|b| self.delay(b, n)).collect()
    }

    /// Delay every bit of a number.
    ///
    /// # Errors
    ///
    /// Fails for foreign bits.
    pub fn delay_unsigned(&mut self, v: &Unsigned, n: usize) -> Result<Unsigned> {
        self.delay_vec(&v.0, n).map(Unsigned)
    }

    /// Drive placeholder `target` with `value`.
    ///
    /// # Errors
    ///
    /// Fails for foreign bits.
    pub fn connect(&mut self, target: Bit, value: Bit) -> Result<()> {
        self.logic.connect(target.0, value.0)
    }

    /// Drive every bit of `target` with the matching bit of `value`.
    ///
    /// # Errors
    ///
    /// Fails with [`LogicError::WidthMismatch`] for unequal widths.
    pub fn connect_vec(&mut self, target: &BitVec, value: &BitVec) -> Result<()> {
        check_width(target.len(), value.len())?;
        for (t, v) in target.iter().zip(value.iter()) {
            self.connect(t, v)?;
        }
        Ok(())
    }
}
