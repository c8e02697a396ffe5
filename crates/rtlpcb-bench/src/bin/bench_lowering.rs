//! Lowering cost versus counter width.
//!
//! For each width: LUTs and flip-flops after logic optimisation, then
//! transistor and resistor counts, part body area and board cost after net
//! optimisation.
//!
//! Usage: bench_lowering [max_bits]

use anyhow::Result;
use rtlpcb_logic::{optimize_logic, Design};
use rtlpcb_net::{lower_logic_to_net, optimize_net};
use rtlpcb_parts::{CostTable, PartKind};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .init();

    let max_bits: usize = std::env::args().nth(1).and_then(|s| s.parse().ok()).unwrap_or(32);

    println!("Lowering cost per counter width");
    println!("===============================");
    println!();
    println!(
        "  {:>4}  {:>6}  {:>4}  {:>7}  {:>7}  {:>9}  {:>8}  {:>9}",
        "bits", "luts", "ffs", "nmos", "res", "area mm²", "cost $", "time"
    );

    let mut bits = 1;
    while bits <= max_bits {
        let start = Instant::now();
        let mut logic = Design::Counter { bits }.build()?;
        let stats = optimize_logic(&mut logic)?;
        let mut net = lower_logic_to_net(&logic)?;
        optimize_net(&mut net);
        let elapsed = start.elapsed();

        let report = net.cost(&CostTable::JLCPCB);
        let count = |kind: PartKind| {
            report
                .lines
                .iter()
                .find(|(k, _, _)| *k == kind)
                .map_or(0, |&(_, n, _)| n)
        };
        println!(
            "  {:>4}  {:>6}  {:>4}  {:>7}  {:>7}  {:>9.1}  {:>8.3}  {:>9.2?}",
            bits,
            stats.after.luts,
            stats.after.ffs,
            count(PartKind::Nmos),
            count(PartKind::Resistor),
            report.body_area_mm2,
            report.total,
            elapsed
        );
        bits *= 2;
    }

    println!();
    println!("Design: serv-alu");
    let mut logic = Design::ServAlu.build()?;
    optimize_logic(&mut logic)?;
    let mut net = lower_logic_to_net(&logic)?;
    optimize_net(&mut net);
    println!("{}", net.cost(&CostTable::JLCPCB));

    Ok(())
}
