//! Simulation tests for the bundled designs
//!
//! Each design is simulated before and after optimisation; both runs must
//! agree cycle by cycle.

use pretty_assertions::assert_eq;
use rtlpcb_logic::prelude::*;
use rtlpcb_logic::build_serv_alu;

/// Drive inputs by name; anything not listed for a cycle is low.
fn by_name<'a>(
    pattern: &'a [&'a [(&'a str, bool)]],
    logic: &'a LogicList,
) -> impl FnMut(usize, SignalId) -> bool + 'a {
    move |cycle, signal| {
        let name = logic.display_name(signal);
        pattern
            .get(cycle)
            .and_then(|row| row.iter().find(|(n, _)| *n == name))
            .is_some_and(|(_, v)| *v)
    }
}

#[test]
fn test_counter_counts_and_wraps() -> anyhow::Result<()> {
    let logic = Design::Counter { bits: 8 }.build()?;
    let history = simulate_idle(&logic, 300)?;

    let words = history.output_words();
    for (cycle, word) in words.iter().enumerate() {
        assert_eq!(*word, Some((cycle % 256) as u64), "cycle {cycle}");
    }
    Ok(())
}

#[test]
fn test_counter_optimised_matches() -> anyhow::Result<()> {
    let logic = Design::Counter { bits: 6 }.build()?;
    let mut optimised = logic.clone();
    let stats = optimize_logic(&mut optimised)?;

    println!("before: {:?}", stats.before);
    println!("after:  {:?}", stats.after);
    assert!(stats.after.luts < stats.before.luts);
    assert_eq!(stats.after.ffs, 6);
    assert!(optimised.connections().is_empty());

    let a = simulate_idle(&logic, 70)?;
    let b = simulate_idle(&optimised, 70)?;
    assert_eq!(a.output_words(), b.output_words());
    Ok(())
}

#[test]
fn test_serv_alu_serial_add() -> anyhow::Result<()> {
    let mut build = LogicBuilder::new();
    let ports = build_serv_alu(&mut build)?;
    build
        .logic_mut()
        .mark_external_input(ports.inputs.iter().map(|b| b.signal()))?;
    build
        .logic_mut()
        .mark_external_output(ports.outputs.iter().map(|b| b.signal()))?;
    let logic = build.finish();

    // 5 + 3, least significant bit first
    let rs1 = [true, false, true, false];
    let op_b = [true, true, false, false];
    let rows: Vec<Vec<(&str, bool)>> = (0..4)
        .map(|i| {
            vec![
                ("i_en", true),
                ("i_rd_sel0", true),
                ("i_rs1", rs1[i]),
                ("i_op_b", op_b[i]),
            ]
        })
        .collect();
    let pattern: Vec<&[(&str, bool)]> = rows.iter().map(Vec::as_slice).collect();

    let history = simulate(&logic, 4, by_name(&pattern, &logic))?;
    let o_rd = ports.outputs[1].signal();
    let rd: Vec<_> = (0..4).map(|c| history.value(c, o_rd)).collect();
    // 8 = 0b1000
    assert_eq!(rd, vec![Some(false), Some(false), Some(false), Some(true)]);
    Ok(())
}

#[test]
fn test_serv_alu_serial_sub() -> anyhow::Result<()> {
    let mut build = LogicBuilder::new();
    let ports = build_serv_alu(&mut build)?;
    build
        .logic_mut()
        .mark_external_input(ports.inputs.iter().map(|b| b.signal()))?;
    build
        .logic_mut()
        .mark_external_output(ports.outputs.iter().map(|b| b.signal()))?;
    let logic = build.finish();

    // cycle 0 loads the carry with i_sub, then 5 - 3 serially
    let rs1 = [true, false, true, false];
    let op_b = [true, true, false, false];
    let mut rows: Vec<Vec<(&str, bool)>> = vec![vec![("i_sub", true)]];
    for i in 0..4 {
        rows.push(vec![
            ("i_en", true),
            ("i_sub", true),
            ("i_rd_sel0", true),
            ("i_rs1", rs1[i]),
            ("i_op_b", op_b[i]),
        ]);
    }
    let pattern: Vec<&[(&str, bool)]> = rows.iter().map(Vec::as_slice).collect();

    let history = simulate(&logic, 5, by_name(&pattern, &logic))?;
    let o_rd = ports.outputs[1].signal();
    let rd: Vec<_> = (1..5).map(|c| history.value(c, o_rd)).collect();
    // 2 = 0b0010
    assert_eq!(rd, vec![Some(false), Some(true), Some(false), Some(false)]);
    Ok(())
}

#[test]
fn test_serv_alu_optimised_matches() -> anyhow::Result<()> {
    let logic = Design::ServAlu.build()?;
    let mut optimised = logic.clone();
    optimize_logic(&mut optimised)?;

    // fixed pseudo-random stimulus
    let stimulus = |cycle: usize, s: SignalId| {
        let x = (cycle as u32).wrapping_mul(2_654_435_761) ^ s.index().wrapping_mul(40_503);
        (x >> 7) & 1 == 1
    };
    let a = simulate(&logic, 64, stimulus)?;
    let b = simulate(&optimised, 64, stimulus)?;
    assert_eq!(a.outputs(), b.outputs());
    Ok(())
}

#[test]
fn test_identical_outputs_survive_optimisation() -> anyhow::Result<()> {
    let mut build = LogicBuilder::new();
    let x = build.new_bit(Some("x"));
    let y = build.new_bit(Some("y"));
    let o1 = build.and(x, y)?;
    let o2 = build.and(x, y)?;
    build.logic_mut().mark_external_input([x.signal(), y.signal()])?;
    build.logic_mut().mark_external_output([o1.signal(), o2.signal()])?;
    let logic = build.finish();

    let mut optimised = logic.clone();
    optimize_logic(&mut optimised)?;

    let a = simulate(&logic, 2, |_, _| true)?;
    let b = simulate(&optimised, 2, |_, _| true)?;
    println!("before: {:?}", a.outputs());
    println!("after:  {:?}", b.outputs());
    assert_eq!(b.output_signals(), &[o1.signal(), o2.signal()]);
    assert_eq!(a.outputs(), vec![vec![Some(true), Some(true)]; 2]);
    assert_eq!(a.outputs(), b.outputs());
    Ok(())
}

#[test]
fn test_register_of_undriven_signal_stays_unknown() -> anyhow::Result<()> {
    let mut build = LogicBuilder::new();
    let floating = build.new_bit(Some("floating"));
    let q = build.delay(floating, 1)?;
    build.logic_mut().mark_external_output([q.signal()])?;
    let logic = build.finish();

    let mut optimised = logic.clone();
    optimize_logic(&mut optimised)?;

    let a = simulate_idle(&logic, 3)?;
    let b = simulate_idle(&optimised, 3)?;
    assert_eq!(a.outputs(), vec![vec![Some(false)], vec![None], vec![None]]);
    assert_eq!(a.outputs(), b.outputs());
    Ok(())
}
