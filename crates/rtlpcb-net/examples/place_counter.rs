//! Example: lower a counter to transistors, place it and write a schematic
//!
//! Usage: cargo run --example place_counter -- [bits] [steps] [out.kicad_sch]

use rand::rngs::StdRng;
use rand::SeedableRng;
use rtlpcb_logic::{optimize_logic, Design};
use rtlpcb_net::prelude::*;
use rtlpcb_net::AnnealConfig;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("rtlpcb_net=info")
        .init();

    let mut args = std::env::args().skip(1);
    let bits = args.next().and_then(|s| s.parse().ok()).unwrap_or(4);
    let steps = args.next().and_then(|s| s.parse().ok()).unwrap_or(20_000);
    let out = args.next();

    let mut logic = Design::Counter { bits }.build()?;
    optimize_logic(&mut logic)?;

    let mut net = lower_logic_to_net(&logic)?;
    let stats = optimize_net(&mut net);
    println!("Net optimisation: {} rounds, {} bridges merged", stats.rounds, stats.bridges_removed);
    println!("{}", net.cost(&rtlpcb_parts::CostTable::JLCPCB));

    let mut rng = StdRng::seed_from_u64(0);
    let mut grid = Grid::new(&net, &mut rng)?;
    let config = AnnealConfig {
        steps,
        strategy: SwapStrategy::Directional,
        report_every: (steps / 10).max(1),
        ..AnnealConfig::default()
    };
    let report = anneal(&mut grid, &config, &mut rng);

    println!("\nGrid {}x{}", grid.side(), grid.side());
    for sample in &report.samples {
        println!(
            "  step {:>7}: cost {:>6}  success {:.3}",
            sample.step, sample.cost, sample.success_rate
        );
    }
    println!(
        "Cost {} -> {} in {:.2?}",
        report.initial_cost, report.final_cost, report.elapsed
    );

    if let Some(path) = out {
        grid_to_schematic(&net, &grid, &FlowConfig::default().schematic)?.write(&path)?;
        println!("Schematic written to {path}");
    }
    Ok(())
}
