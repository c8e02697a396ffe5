//! Annealing strategy comparison.
//!
//! Places the same netlist with every swap strategy and a few seeds, and
//! reports the final HPWL and wall time of each run.
//!
//! Usage: bench_anneal [bits] [steps]

use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rtlpcb_logic::{optimize_logic, Design};
use rtlpcb_net::{anneal, lower_logic_to_net, optimize_net, AnnealConfig, Grid, SwapStrategy};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const SEEDS: [u64; 3] = [1, 2, 3];

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .init();

    let mut args = std::env::args().skip(1);
    let bits = args.next().and_then(|s| s.parse().ok()).unwrap_or(8);
    let steps = args.next().and_then(|s| s.parse().ok()).unwrap_or(50_000);

    let mut logic = Design::Counter { bits }.build()?;
    optimize_logic(&mut logic)?;
    let mut net = lower_logic_to_net(&logic)?;
    optimize_net(&mut net);

    println!("Annealing strategies: counter({bits}), {} components, {steps} steps", net.components().len());
    println!("==========================================================================");
    println!();
    println!("  {:<12}  {:>10}  {:>10}  {:>10}  {:>10}", "strategy", "initial", "final", "kept", "time");
    println!("  {:-<12}  {:->10}  {:->10}  {:->10}  {:->10}", "", "", "", "", "");

    for strategy in SwapStrategy::ALL {
        let mut finals = Vec::new();
        let mut total_time = Duration::ZERO;
        for seed in SEEDS {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut grid = Grid::new(&net, &mut rng)?;
            let config = AnnealConfig {
                steps,
                seed,
                strategy,
                report_every: 0,
                ..AnnealConfig::default()
            };
            let report = anneal(&mut grid, &config, &mut rng);
            grid.check_consistency()?;
            println!(
                "  {:<12}  {:>10}  {:>10}  {:>10}  {:>10.2?}",
                strategy.name(),
                report.initial_cost,
                report.final_cost,
                report.accepted,
                report.elapsed
            );
            finals.push(report.final_cost);
            total_time += report.elapsed;
        }
        let best = finals.iter().min().copied().unwrap_or(0);
        println!("  {:<12}  best {best}, total {total_time:.2?}", "");
        println!();
    }

    Ok(())
}
