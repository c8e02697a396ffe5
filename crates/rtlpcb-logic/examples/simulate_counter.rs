//! Example: build, optimise and simulate a small counter
//!
//! Usage: cargo run --example simulate_counter -- [bits] [steps]

use rtlpcb_logic::prelude::*;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("rtlpcb_logic=info")
        .init();

    let mut args = std::env::args().skip(1);
    let bits = args.next().and_then(|s| s.parse().ok()).unwrap_or(4);
    let steps = args.next().and_then(|s| s.parse().ok()).unwrap_or(20);

    let mut logic = Design::Counter { bits }.build()?;
    println!("Logic before optimisation:\n{}", logic.counts());

    let stats = optimize_logic(&mut logic)?;
    println!("Logic after optimisation ({} rounds):\n{}\n", stats.rounds, stats.after);

    let history = simulate_idle(&logic, steps)?;
    print!("{}", history.render(true));

    println!();
    for (cycle, word) in history.output_words().iter().enumerate() {
        match word {
            Some(w) => println!("  {cycle:>4}: {w}"),
            None => println!("  {cycle:>4}: undriven"),
        }
    }
    Ok(())
}
