//! Bundled example designs.

use crate::builder::{Bit, LogicBuilder, Unsigned};
use crate::error::Result;
use crate::logic_list::LogicList;
use std::fmt;

/// Free-running counter: `curr <- curr + 1` every cycle, starting at 0.
///
/// # Errors
///
/// Propagates builder errors.
pub fn build_counter(build: &mut LogicBuilder, bits: usize) -> Result<Unsigned> {
    let curr = build.new_unsigned(bits, Some("curr"));
    let next = build.add_trunc_const(&curr, 1)?;
    let next = build.delay_unsigned(&next, 1)?;
    build.connect_vec(curr.as_vec(), next.as_vec())?;
    Ok(curr)
}

/// Ports of [`build_serv_alu`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServAluPorts {
    /// Inputs in declaration order.
    pub inputs: Vec<Bit>,
    /// `o_cmp`, `o_rd`.
    pub outputs: Vec<Bit>,
}

// Bit-serial ALU of the SERV RISC-V core (https://github.com/olofk/serv,
// rtl/serv_alu.v, ISC licence), fixed at W=1.

/// Build the SERV ALU and return its ports.
///
/// # Errors
///
/// Propagates builder errors.
pub fn build_serv_alu(build: &mut LogicBuilder) -> Result<ServAluPorts> {
    // state
    let i_en = build.new_bit(Some("i_en"));
    let i_cnt0 = build.new_bit(Some("i_cnt0"));
    // control
    let i_sub = build.new_bit(Some("i_sub"));
    let i_bool_op = [build.new_bit(Some("i_bool_op0")), build.new_bit(Some("i_bool_op1"))];
    let i_cmp_eq = build.new_bit(Some("i_cmp_eq"));
    let i_cmp_sig = build.new_bit(Some("i_cmp_sig"));
    let i_rd_sel = [
        build.new_bit(Some("i_rd_sel0")),
        build.new_bit(Some("i_rd_sel1")),
        build.new_bit(Some("i_rd_sel2")),
    ];
    // data
    let i_rs1 = build.new_bit(Some("i_rs1"));
    let i_op_b = build.new_bit(Some("i_op_b"));
    let i_buf = build.new_bit(Some("i_buf"));

    let o_cmp = build.new_bit(Some("o_cmp"));
    let o_rd = build.new_bit(Some("o_rd"));

    let cmp_r = build.new_bit(Some("cmp_r"));
    let add_cy_r = build.new_bit(Some("add_cy_r"));

    // sign-extended operands
    let rs1_sx = build.and(i_rs1, i_cmp_sig)?;
    let op_b_sx = build.and(i_op_b, i_cmp_sig)?;

    let add_b = build.xor(i_op_b, i_sub)?;
    let (add_cy, result_add) = build.full_add(i_rs1, add_b, add_cy_r)?;
    build.logic_mut().add_name(add_cy.0, "add_cy")?;
    build.logic_mut().add_name(result_add.0, "result_add")?;

    let not_op_b_sx = build.not(op_b_sx)?;
    let (_, result_lt) = build.full_add(rs1_sx, not_op_b_sx, add_cy)?;

    let not_result_add = build.not(result_add)?;
    let cmp_or_first = build.or(cmp_r, i_cnt0)?;
    let result_eq = build.and(not_result_add, cmp_or_first)?;

    let cmp = build.mux(i_cmp_eq, result_lt, result_eq)?;
    build.connect(o_cmp, cmp)?;

    let xor_rs1_op_b = build.xor(i_rs1, i_op_b)?;
    let not_bool_op0 = build.not(i_bool_op[0])?;
    let bool_xor = build.and(xor_rs1_op_b, not_bool_op0)?;
    let bool_and = build.and_all(&[i_bool_op[1], i_op_b, i_rs1])?;
    let result_bool = build.or(bool_xor, bool_and)?;

    let result_slt = build.and(cmp_r, i_cnt0)?;
    build.logic_mut().add_name(result_slt.0, "result_slt")?;

    let sel_add = build.and(i_rd_sel[0], result_add)?;
    let sel_slt = build.and(i_rd_sel[1], result_slt)?;
    let sel_bool = build.and(i_rd_sel[2], result_bool)?;
    let rd = build.or_all(&[i_buf, sel_add, sel_slt, sel_bool])?;
    build.connect(o_rd, rd)?;

    let add_cy_next = build.mux(i_en, i_sub, add_cy)?;
    let add_cy_next = build.delay(add_cy_next, 1)?;
    build.connect(add_cy_r, add_cy_next)?;

    let cmp_next = build.mux(i_en, cmp_r, o_cmp)?;
    let cmp_next = build.delay(cmp_next, 1)?;
    build.connect(cmp_r, cmp_next)?;

    Ok(ServAluPorts {
        inputs: vec![
            i_en,
            i_cnt0,
            i_sub,
            i_bool_op[0],
            i_bool_op[1],
            i_cmp_eq,
            i_cmp_sig,
            i_rd_sel[0],
            i_rd_sel[1],
            i_rd_sel[2],
            i_rs1,
            i_op_b,
            i_buf,
        ],
        outputs: vec![o_cmp, o_rd],
    })
}

/// A bundled design selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Design {
    /// Free-running counter.
    Counter {
        /// Counter width.
        bits: usize,
    },
    /// SERV bit-serial ALU.
    ServAlu,
}

impl Design {
    /// Build the design with its externals marked.
    ///
    /// # Errors
    ///
    /// Propagates builder errors.
    pub fn build(self) -> Result<LogicList> {
        let mut build = LogicBuilder::new();
        match self {
            Self::Counter { bits } => {
                let curr = build_counter(&mut build, bits)?;
                build.logic_mut().mark_external_output(curr.signals())?;
            }
            Self::ServAlu => {
                let ports = build_serv_alu(&mut build)?;
                build
                    .logic_mut()
                    .mark_external_input(ports.inputs.iter().map(|b| b.0))?;
                build
                    .logic_mut()
                    .mark_external_output(ports.outputs.iter().map(|b| b.0))?;
            }
        }
        Ok(build.finish())
    }
}

impl fmt::Display for Design {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Counter { bits } => write!(f, "counter({bits})"),
            Self::ServAlu => write!(f, "serv-alu"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic_list::ValidateOptions;

    #[test]
    fn counter_is_clean() {
        let logic = Design::Counter { bits: 4 }.build().unwrap();
        assert_eq!(logic.external_outputs().len(), 4);
        assert_eq!(logic.ffs().len(), 4);
        let report = logic.validate(ValidateOptions::ALL).unwrap();
        assert!(report.undriven.is_empty());
    }

    #[test]
    fn serv_alu_ports() {
        let logic = Design::ServAlu.build().unwrap();
        assert_eq!(logic.external_inputs().len(), 13);
        assert_eq!(logic.external_outputs().len(), 2);
        assert_eq!(logic.ffs().len(), 2);
        let report = logic.validate(ValidateOptions::default()).unwrap();
        assert!(report.undriven.is_empty());
    }
}
