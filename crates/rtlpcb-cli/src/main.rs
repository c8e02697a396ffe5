//! `rtlpcb`: command-line driver for the synthesis flow.
//!
//! ```text
//! USAGE:
//!   rtlpcb report                    Logic and netlist counts, board cost and area
//!   rtlpcb simulate --steps N        Waveform and output words
//!   rtlpcb place [--svg F]           Anneal a placement, optionally export it
//!   rtlpcb schematic --out F         Unplaced KiCad schematic
//!   rtlpcb dot --out F               Graphviz netlist
//! ```
//!
//! Every subcommand accepts `--design counter|serv-alu`, `--bits N` and
//! `--config flow.toml`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rtlpcb_logic::{optimize_logic, simulate_idle, Design, LogicList};
use rtlpcb_net::{
    anneal, grid_to_schematic, lower_logic_to_net, net_to_schematic, optimize_net, FlowConfig,
    Grid, NetList, SwapStrategy,
};
use rtlpcb_parts::FabCapabilities;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rtlpcb", about = "Logic to discrete NMOS boards", version)]
struct Cli {
    /// Design to build.
    #[arg(long, value_enum, default_value_t = DesignArg::Counter, global = true)]
    design: DesignArg,
    /// Counter width in bits.
    #[arg(long, default_value_t = 16, global = true)]
    bits: usize,
    /// Flow configuration (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Clone, Copy, ValueEnum)]
enum DesignArg {
    /// Free-running counter.
    Counter,
    /// SERV bit-serial ALU.
    ServAlu,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print logic counts before and after optimisation, then netlist counts and cost.
    Report,
    /// Simulate with all inputs low and print the waveform.
    Simulate {
        /// Cycles to simulate.
        #[arg(long, default_value_t = 32)]
        steps: usize,
        /// Only print columns where something changed.
        #[arg(long)]
        skip_unchanged: bool,
        /// Simulate the unoptimised logic.
        #[arg(long)]
        raw: bool,
    },
    /// Place the netlist by simulated annealing.
    Place {
        /// Annealing steps (overrides the config).
        #[arg(long)]
        steps: Option<usize>,
        /// RNG seed (overrides the config).
        #[arg(long)]
        seed: Option<u64>,
        /// Move picker: random, long-wire or directional (overrides the config).
        #[arg(long)]
        strategy: Option<SwapStrategy>,
        /// Write an SVG of the final placement.
        #[arg(long)]
        svg: Option<PathBuf>,
        /// Write a KiCad schematic in placed order.
        #[arg(long)]
        schematic: Option<PathBuf>,
    },
    /// Write an unplaced KiCad schematic.
    Schematic {
        /// Output `.kicad_sch` file.
        #[arg(long)]
        out: PathBuf,
    },
    /// Write the netlist as Graphviz.
    Dot {
        /// Output `.dot` file.
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let design = match cli.design {
        DesignArg::Counter => Design::Counter { bits: cli.bits },
        DesignArg::ServAlu => Design::ServAlu,
    };
    let config = match &cli.config {
        Some(path) => FlowConfig::from_file(path)?,
        None => FlowConfig::default(),
    };

    match cli.command {
        Cmd::Report => cmd_report(design, &config)?,
        Cmd::Simulate {
            steps,
            skip_unchanged,
            raw,
        } => cmd_simulate(design, steps, skip_unchanged, raw)?,
        Cmd::Place {
            steps,
            seed,
            strategy,
            svg,
            schematic,
        } => {
            let mut config = config;
            if let Some(steps) = steps {
                config.anneal.steps = steps;
            }
            if let Some(seed) = seed {
                config.anneal.seed = seed;
            }
            if let Some(strategy) = strategy {
                config.anneal.strategy = strategy;
            }
            cmd_place(design, &config, svg.as_deref(), schematic.as_deref())?;
        }
        Cmd::Schematic { out } => cmd_schematic(design, &config, &out)?,
        Cmd::Dot { out } => cmd_dot(design, &out)?,
    }

    Ok(())
}

fn optimised_logic(design: Design) -> Result<LogicList> {
    let mut logic = design.build()?;
    optimize_logic(&mut logic)?;
    Ok(logic)
}

fn build_net(design: Design) -> Result<NetList> {
    let logic = optimised_logic(design)?;
    let mut net = lower_logic_to_net(&logic)?;
    optimize_net(&mut net);
    info!(%design, wires = net.wire_count(), "netlist ready");
    Ok(net)
}

fn write_file(path: &Path, text: &str) -> Result<()> {
    std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}

fn cmd_report(design: Design, config: &FlowConfig) -> Result<()> {
    let mut logic = design.build()?;
    let stats = optimize_logic(&mut logic)?;

    println!("Design: {design}");
    println!();
    println!("Logic before optimisation:\n{}", stats.before);
    println!();
    println!("Logic after optimisation ({} rounds):\n{}", stats.rounds, stats.after);
    println!(
        "  merged {}  folded {}  dead {}  duplicates {}",
        stats.merged_signals, stats.constants_folded, stats.dead_removed, stats.duplicates_removed
    );
    println!();

    let mut net = lower_logic_to_net(&logic)?;
    let before = net.counts();
    let net_stats = optimize_net(&mut net);
    println!("Netlist before optimisation: {before:?}");
    println!(
        "Netlist after optimisation ({} rounds, {} bridges merged, {} orphans):",
        net_stats.rounds, net_stats.bridges_removed, net_stats.orphans_removed
    );
    println!("  wires {}  components {}", net.wire_count(), net.components().len());
    println!();
    println!("{}", net.cost(&config.costs.to_table()));

    let fab = FabCapabilities::JLCPCB;
    println!();
    println!(
        "Fab: {:.2} mm trace pitch, {} tracks per mm of channel ({} / {})",
        fab.min_pitch(),
        fab.tracks_through(1.0),
        fab.layer_vertical,
        fab.layer_horizontal
    );

    Ok(())
}

fn cmd_simulate(design: Design, steps: usize, skip_unchanged: bool, raw: bool) -> Result<()> {
    let logic = if raw {
        design.build()?
    } else {
        optimised_logic(design)?
    };
    let history = simulate_idle(&logic, steps)?;

    print!("{}", history.render(skip_unchanged));
    println!();
    let names: Vec<String> = history
        .output_signals()
        .iter()
        .map(|&s| logic.display_name(s))
        .collect();
    println!("Outputs, least significant first: {}", names.join(" "));
    for (cycle, word) in history.output_words().iter().enumerate() {
        match word {
            Some(w) => println!("  {cycle:>5}: {w}"),
            None => println!("  {cycle:>5}: undriven"),
        }
    }

    Ok(())
}

fn cmd_place(
    design: Design,
    config: &FlowConfig,
    svg: Option<&Path>,
    schematic: Option<&Path>,
) -> Result<()> {
    let net = build_net(design)?;
    let mut rng = StdRng::seed_from_u64(config.anneal.seed);
    let mut grid = Grid::new(&net, &mut rng)?;

    println!(
        "Placing {} components on a {}x{} grid ({} steps, {})",
        grid.component_count(),
        grid.side(),
        grid.side(),
        config.anneal.steps,
        config.anneal.strategy
    );
    let report = anneal(&mut grid, &config.anneal, &mut rng);
    for sample in &report.samples {
        println!(
            "  step {:>8}  cost {:>8}  success {:.4}",
            sample.step, sample.cost, sample.success_rate
        );
    }
    println!(
        "Cost {} -> {}  ({} of {} swaps kept, {:.2?})",
        report.initial_cost, report.final_cost, report.accepted, report.steps, report.elapsed
    );
    grid.check_consistency()?;

    if let Some(path) = svg {
        write_file(path, &grid.to_svg())?;
        println!("SVG written to {}", path.display());
    }
    if let Some(path) = schematic {
        grid_to_schematic(&net, &grid, &config.schematic)?.write(path)?;
        println!("Schematic written to {}", path.display());
    }

    Ok(())
}

fn cmd_schematic(design: Design, config: &FlowConfig, out: &Path) -> Result<()> {
    let net = build_net(design)?;
    let sch = net_to_schematic(&net, &config.schematic)?;
    sch.write(out)?;
    println!(
        "{} symbols, {} labels written to {}",
        sch.symbols().len(),
        sch.labels().len(),
        out.display()
    );
    Ok(())
}

fn cmd_dot(design: Design, out: &Path) -> Result<()> {
    let net = build_net(design)?;
    write_file(out, &net.to_dot())?;
    println!("Graphviz netlist written to {}", out.display());
    Ok(())
}
