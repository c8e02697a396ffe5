// SPDX-License-Identifier: AGPL-3.0-only

//! Grid placement by simulated annealing.
//!
//! Every component occupies one cell of a square grid. The cost of a wire
//! is the half-perimeter of the bounding box of the cells it touches
//! (HPWL, Manhattan metric), and the placement cost is the sum over all
//! non-global wires. Global wires (`vdd`, `gnd`, `clk`) are routed as
//! planes and do not pull components together.
//!
//! Annealing repeatedly proposes a swap of two cells and keeps it when the
//! cost strictly drops, or with probability equal to the current
//! temperature.

use crate::config::{AnnealConfig, SwapStrategy};
use crate::error::{NetError, Result};
use crate::netlist::{NetList, WireId};
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Pixel size of one cell in [`Grid::to_svg`].
const SVG_CELL: usize = 20;

/// Components placed on a square grid, with cached wire costs.
#[derive(Debug, Clone)]
pub struct Grid {
    side: usize,
    /// Component index per cell.
    cells: Vec<Option<usize>>,
    /// Cell per component index.
    positions: Vec<usize>,
    wire_ids: Vec<WireId>,
    wire_components: Vec<Vec<usize>>,
    component_wires: Vec<Vec<usize>>,
    wire_costs: Vec<usize>,
    cost: usize,
}

impl Grid {
    /// Place the components of `net` on shuffled cells.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::UnknownWire`] if a component references a wire
    /// the netlist does not hold.
    pub fn new<R: Rng + ?Sized>(net: &NetList, rng: &mut R) -> Result<Self> {
        let wire_ids: Vec<WireId> = net
            .wires()
            .map(|w| w.id)
            .filter(|&id| !net.is_global(id))
            .collect();
        let wire_index: BTreeMap<WireId, usize> =
            wire_ids.iter().enumerate().map(|(i, &w)| (w, i)).collect();

        let n = net.components().len();
        let mut wire_components = vec![Vec::new(); wire_ids.len()];
        let mut component_wires = vec![Vec::new(); n];
        for (ci, component) in net.components().iter().enumerate() {
            for port in component.ports() {
                if net.is_global(port.wire) {
                    continue;
                }
                let wi = *wire_index
                    .get(&port.wire)
                    .ok_or_else(|| NetError::unknown_wire(port.wire))?;
                if !component_wires[ci].contains(&wi) {
                    component_wires[ci].push(wi);
                    wire_components[wi].push(ci);
                }
            }
        }

        let mut fanout: BTreeMap<usize, usize> = BTreeMap::new();
        for cs in &wire_components {
            *fanout.entry(cs.len()).or_insert(0) += 1;
        }
        debug!(?fanout, "wire fanout histogram");

        let mut side = 0;
        while side * side < n {
            side += 1;
        }

        let mut order: Vec<usize> = (0..side * side).collect();
        order.shuffle(rng);
        let mut cells = vec![None; side * side];
        let mut positions = vec![0; n];
        for (ci, &cell) in order.iter().take(n).enumerate() {
            cells[cell] = Some(ci);
            positions[ci] = cell;
        }

        let mut grid = Self {
            side,
            cells,
            positions,
            wire_ids,
            wire_components,
            component_wires,
            wire_costs: Vec::new(),
            cost: 0,
        };
        grid.wire_costs = (0..grid.wire_ids.len()).map(|wi| grid.wire_cost(wi)).collect();
        grid.cost = grid.wire_costs.iter().sum();
        info!(side, components = n, cost = grid.cost, "grid placed");
        Ok(grid)
    }

    /// Cells per row and column.
    pub const fn side(&self) -> usize {
        self.side
    }

    /// Number of cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Number of placed components.
    pub fn component_count(&self) -> usize {
        self.positions.len()
    }

    /// Component in `cell`, if any.
    pub fn component_at(&self, cell: usize) -> Option<usize> {
        self.cells.get(cell).copied().flatten()
    }

    /// Cell holding component `component`.
    pub fn cell_of(&self, component: usize) -> Option<usize> {
        self.positions.get(component).copied()
    }

    /// Cached total cost.
    pub const fn cost(&self) -> usize {
        self.cost
    }

    /// Cached cost per non-global wire.
    pub fn wire_costs(&self) -> &[usize] {
        &self.wire_costs
    }

    /// Wire ids in the order of [`Grid::wire_costs`].
    pub fn wire_ids(&self) -> &[WireId] {
        &self.wire_ids
    }

    /// Column and row of `cell`.
    pub const fn xy(&self, cell: usize) -> (usize, usize) {
        (cell % self.side, cell / self.side)
    }

    fn distance(&self, a: usize, b: usize) -> usize {
        let (x0, y0) = self.xy(a);
        let (x1, y1) = self.xy(b);
        x0.abs_diff(x1) + y0.abs_diff(y1)
    }

    /// HPWL of wire index `wi`, recomputed from positions.
    pub fn wire_cost(&self, wi: usize) -> usize {
        let Some(components) = self.wire_components.get(wi) else {
            return 0;
        };
        if components.len() < 2 {
            return 0;
        }
        let (mut min_x, mut min_y) = (usize::MAX, usize::MAX);
        let (mut max_x, mut max_y) = (0, 0);
        for &ci in components {
            let (x, y) = self.xy(self.positions[ci]);
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
        (max_x - min_x) + (max_y - min_y)
    }

    /// Prim minimum spanning tree over the components of wire index `wi`.
    /// Returns the total Manhattan length and the edges as component pairs.
    pub fn wire_spanning_tree(&self, wi: usize) -> (usize, Vec<(usize, usize)>) {
        let Some(components) = self.wire_components.get(wi) else {
            return (0, Vec::new());
        };
        if components.len() < 2 {
            return (0, Vec::new());
        }

        let mut done = vec![components[0]];
        let mut todo: Vec<usize> = components[1..].to_vec();
        let mut edges = Vec::with_capacity(todo.len());
        let mut total = 0;

        while !todo.is_empty() {
            let mut best: Option<(usize, usize, usize)> = None;
            for (ti, &ci) in todo.iter().enumerate() {
                for &di in &done {
                    let d = self.distance(self.positions[ci], self.positions[di]);
                    if best.map_or(true, |(bd, _, _)| d < bd) {
                        best = Some((d, ti, di));
                    }
                }
            }
            let Some((d, ti, di)) = best else { break };
            let ci = todo.swap_remove(ti);
            total += d;
            done.push(ci);
            edges.push((ci, di));
        }

        (total, edges)
    }

    fn swap_cells(&mut self, a: usize, b: usize) {
        self.cells.swap(a, b);
        if let Some(ci) = self.cells[a] {
            self.positions[ci] = a;
        }
        if let Some(ci) = self.cells[b] {
            self.positions[ci] = b;
        }
    }

    /// Propose swapping the contents of cells `a` and `b`. The swap is kept
    /// when the cost strictly drops, or with probability `temperature`.
    /// Returns whether it was kept.
    ///
    /// Swapping a cell with itself, two empty cells, or cells outside the
    /// grid does nothing and returns `false`.
    pub fn try_swap<R: Rng + ?Sized>(
        &mut self,
        a: usize,
        b: usize,
        temperature: f64,
        rng: &mut R,
    ) -> bool {
        if a == b || a >= self.cells.len() || b >= self.cells.len() {
            return false;
        }
        let (ca, cb) = (self.cells[a], self.cells[b]);
        if ca.is_none() && cb.is_none() {
            return false;
        }

        let mut affected: Vec<usize> = ca
            .into_iter()
            .chain(cb)
            .flat_map(|ci| self.component_wires[ci].iter().copied())
            .collect();
        affected.sort_unstable();
        affected.dedup();

        let old: usize = affected.iter().map(|&wi| self.wire_costs[wi]).sum();
        self.swap_cells(a, b);
        let new_costs: Vec<usize> = affected.iter().map(|&wi| self.wire_cost(wi)).collect();
        let new: usize = new_costs.iter().sum();

        if new < old || (temperature > 0.0 && rng.gen::<f64>() < temperature) {
            for (&wi, &c) in affected.iter().zip(&new_costs) {
                self.wire_costs[wi] = c;
            }
            self.cost = self.cost - old + new;
            true
        } else {
            self.swap_cells(a, b);
            false
        }
    }

    fn pick_random<R: Rng + ?Sized>(&self, rng: &mut R) -> (usize, usize) {
        let n = self.cells.len();
        (rng.gen_range(0..n), rng.gen_range(0..n))
    }

    fn pick_long_wire<R: Rng + ?Sized>(&self, rng: &mut R) -> (usize, usize) {
        let Ok(dist) = WeightedIndex::new(&self.wire_costs) else {
            return self.pick_random(rng);
        };
        let wi = dist.sample(rng);
        let Some(&ci) = self.wire_components[wi].choose(rng) else {
            return self.pick_random(rng);
        };
        (self.positions[ci], rng.gen_range(0..self.cells.len()))
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn pick_directional<R: Rng + ?Sized>(&self, rng: &mut R) -> (usize, usize) {
        if self.positions.is_empty() {
            return self.pick_random(rng);
        }
        let ci = rng.gen_range(0..self.positions.len());

        let (mut sx, mut sy, mut count) = (0.0, 0.0, 0usize);
        for &wi in &self.component_wires[ci] {
            for &other in &self.wire_components[wi] {
                if other == ci {
                    continue;
                }
                let (x, y) = self.xy(self.positions[other]);
                sx += x as f64;
                sy += y as f64;
                count += 1;
            }
        }
        if count == 0 {
            return self.pick_random(rng);
        }

        // Box-Muller
        let u1 = 1.0 - rng.gen::<f64>();
        let u2 = rng.gen::<f64>();
        let r = (-2.0 * u1.ln()).sqrt();
        let theta = std::f64::consts::TAU * u2;
        let sigma = self.side as f64 / 10.0;

        let max = (self.side - 1) as f64;
        let tx = (sx / count as f64 + sigma * r * theta.cos()).round().clamp(0.0, max) as usize;
        let ty = (sy / count as f64 + sigma * r * theta.sin()).round().clamp(0.0, max) as usize;
        (self.positions[ci], ty * self.side + tx)
    }

    /// Pick two cells to swap.
    pub fn pick<R: Rng + ?Sized>(&self, strategy: SwapStrategy, rng: &mut R) -> (usize, usize) {
        match strategy {
            SwapStrategy::Random => self.pick_random(rng),
            SwapStrategy::LongWire => self.pick_long_wire(rng),
            SwapStrategy::Directional => self.pick_directional(rng),
        }
    }

    /// Verify that cells and positions agree and that the cached costs
    /// match a recomputation.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Placement`] describing the first mismatch.
    pub fn check_consistency(&self) -> Result<()> {
        for (ci, &cell) in self.positions.iter().enumerate() {
            if self.cells.get(cell).copied().flatten() != Some(ci) {
                return Err(NetError::placement(format!(
                    "component {ci} thinks it is in cell {cell}"
                )));
            }
        }
        let occupied = self.cells.iter().filter(|c| c.is_some()).count();
        if occupied != self.positions.len() {
            return Err(NetError::placement(format!(
                "{occupied} occupied cells for {} components",
                self.positions.len()
            )));
        }
        for (wi, &cached) in self.wire_costs.iter().enumerate() {
            let actual = self.wire_cost(wi);
            if cached != actual {
                return Err(NetError::placement(format!(
                    "wire {} cached cost {cached}, actual {actual}",
                    self.wire_ids[wi]
                )));
            }
        }
        let total: usize = self.wire_costs.iter().sum();
        if total != self.cost {
            return Err(NetError::placement(format!(
                "cached total {}, actual {total}",
                self.cost
            )));
        }
        Ok(())
    }

    /// SVG picture: one square per component and the spanning tree of each
    /// wire, coloured from green to red by cost per component.
    pub fn to_svg(&self) -> String {
        Svg(self).to_string()
    }
}

struct Svg<'a>(&'a Grid);

impl fmt::Display for Svg<'_> {
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let grid = self.0;
        let size = grid.side * SVG_CELL;
        writeln!(
            f,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{size}\" height=\"{size}\" viewBox=\"0 0 {size} {size}\">"
        )?;
        writeln!(f, "  <rect width=\"{size}\" height=\"{size}\" fill=\"white\"/>")?;

        for &cell in &grid.positions {
            let (x, y) = grid.xy(cell);
            writeln!(
                f,
                "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"blue\"/>",
                x * SVG_CELL + SVG_CELL / 5,
                y * SVG_CELL + SVG_CELL / 5,
                SVG_CELL * 3 / 5,
                SVG_CELL * 3 / 5,
            )?;
        }

        let trees: Vec<(f64, Vec<(usize, usize)>)> = (0..grid.wire_ids.len())
            .map(|wi| {
                let (len, edges) = grid.wire_spanning_tree(wi);
                let per = len as f64 / grid.wire_components[wi].len().max(1) as f64;
                (per, edges)
            })
            .collect();
        let max = trees.iter().map(|(per, _)| *per).fold(0.0, f64::max);

        let center = |cell: usize| {
            let (x, y) = grid.xy(cell);
            (x * SVG_CELL + SVG_CELL / 2, y * SVG_CELL + SVG_CELL / 2)
        };
        for (per, edges) in &trees {
            let c = if max > 0.0 { per / max } else { 0.0 };
            let red = (c * 255.0).round() as u8;
            let green = ((1.0 - c) * 255.0).round() as u8;
            for &(a, b) in edges {
                let (x0, y0) = center(grid.positions[a]);
                let (x1, y1) = center(grid.positions[b]);
                writeln!(
                    f,
                    "  <line x1=\"{x0}\" y1=\"{y0}\" x2=\"{x1}\" y2=\"{y1}\" stroke=\"rgb({red},{green},0)\"/>"
                )?;
            }
        }

        writeln!(f, "</svg>")
    }
}

/// Cost and acceptance rate at one point of an annealing run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnealSample {
    /// Steps done so far.
    pub step: usize,
    /// Placement cost after `step` steps.
    pub cost: usize,
    /// Fraction of swaps kept since the previous sample.
    pub success_rate: f64,
}

/// Outcome of [`anneal`].
#[derive(Debug, Clone, PartialEq)]
pub struct AnnealReport {
    /// Steps run.
    pub steps: usize,
    /// Swaps kept.
    pub accepted: usize,
    /// Cost before the first step.
    pub initial_cost: usize,
    /// Cost after the last step.
    pub final_cost: usize,
    /// Progress samples, one every `report_every` steps.
    pub samples: Vec<AnnealSample>,
    /// Wall-clock time.
    pub elapsed: Duration,
}

/// Improve `grid` by simulated annealing.
///
/// The temperature moves linearly from `temperature_start` at the first
/// step to `temperature_end` at the last.
#[allow(clippy::cast_precision_loss)]
pub fn anneal<R: Rng + ?Sized>(grid: &mut Grid, config: &AnnealConfig, rng: &mut R) -> AnnealReport {
    let start = Instant::now();
    let initial_cost = grid.cost();
    let mut report = AnnealReport {
        steps: 0,
        accepted: 0,
        initial_cost,
        final_cost: initial_cost,
        samples: Vec::new(),
        elapsed: Duration::ZERO,
    };

    if grid.cell_count() < 2 {
        report.elapsed = start.elapsed();
        return report;
    }

    let span = config.steps.saturating_sub(1).max(1) as f64;
    let mut window_accepted = 0usize;
    for step in 0..config.steps {
        let t = step as f64 / span;
        let temperature = config.temperature_start + (config.temperature_end - config.temperature_start) * t;

        let (a, b) = grid.pick(config.strategy, rng);
        if grid.try_swap(a, b, temperature, rng) {
            report.accepted += 1;
            window_accepted += 1;
        }

        let done = step + 1;
        if config.report_every > 0 && done % config.report_every == 0 {
            let sample = AnnealSample {
                step: done,
                cost: grid.cost(),
                success_rate: window_accepted as f64 / config.report_every as f64,
            };
            debug!(step = done, cost = sample.cost, rate = sample.success_rate, "anneal");
            report.samples.push(sample);
            window_accepted = 0;
        }
    }

    report.steps = config.steps;
    report.final_cost = grid.cost();
    report.elapsed = start.elapsed();
    info!(
        strategy = %config.strategy,
        steps = report.steps,
        accepted = report.accepted,
        initial_cost = report.initial_cost,
        final_cost = report.final_cost,
        "annealing finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist::Component;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// `n` resistors in a chain, each sharing a wire with the next.
    fn chain(n: usize) -> NetList {
        let mut net = NetList::new();
        let wires: Vec<WireId> = (0..=n).map(|_| net.new_wire(None)).collect();
        for pair in wires.windows(2) {
            net.push(Component::Resistor { a: pair[0], b: pair[1] }).unwrap();
        }
        net
    }

    #[test]
    fn side_is_ceil_sqrt() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(Grid::new(&chain(9), &mut rng).unwrap().side(), 3);
        assert_eq!(Grid::new(&chain(10), &mut rng).unwrap().side(), 4);
        let empty = Grid::new(&NetList::new(), &mut rng).unwrap();
        assert_eq!(empty.side(), 0);
        assert_eq!(empty.cost(), 0);
        empty.check_consistency().unwrap();
    }

    #[test]
    fn globals_do_not_count() {
        let mut net = NetList::new();
        let (vdd, gnd) = (net.vdd(), net.gnd());
        for _ in 0..4 {
            net.push(Component::Resistor { a: vdd, b: gnd }).unwrap();
        }
        let grid = Grid::new(&net, &mut StdRng::seed_from_u64(2)).unwrap();
        assert!(grid.wire_ids().is_empty());
        assert_eq!(grid.cost(), 0);
    }

    #[test]
    fn spanning_tree_is_at_least_hpwl() {
        let mut net = chain(12);
        let hub = net.new_wire(Some("hub"));
        let gnd = net.gnd();
        for _ in 0..5 {
            net.push(Component::Resistor { a: hub, b: gnd }).unwrap();
        }
        let grid = Grid::new(&net, &mut StdRng::seed_from_u64(3)).unwrap();
        for wi in 0..grid.wire_ids().len() {
            let (len, edges) = grid.wire_spanning_tree(wi);
            assert!(len >= grid.wire_cost(wi));
            let fanout = grid.wire_components[wi].len();
            assert_eq!(edges.len(), fanout.saturating_sub(1));
        }
    }

    #[test]
    fn degenerate_swaps_are_rejected() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut grid = Grid::new(&chain(2), &mut rng).unwrap();
        // 2 components on a 2x2 grid leaves two empty cells
        let empty: Vec<usize> = (0..4).filter(|&c| grid.component_at(c).is_none()).collect();
        assert_eq!(empty.len(), 2);
        assert!(!grid.try_swap(empty[0], empty[1], 1.0, &mut rng));
        assert!(!grid.try_swap(0, 0, 1.0, &mut rng));
        assert!(!grid.try_swap(0, 99, 1.0, &mut rng));
    }

    #[test]
    fn cold_anneal_never_gets_worse() {
        for strategy in SwapStrategy::ALL {
            let mut rng = StdRng::seed_from_u64(5);
            let mut grid = Grid::new(&chain(30), &mut rng).unwrap();
            let config = AnnealConfig {
                steps: 2_000,
                strategy,
                report_every: 500,
                ..AnnealConfig::default()
            };
            let report = anneal(&mut grid, &config, &mut rng);
            assert!(report.final_cost <= report.initial_cost, "{strategy}");
            assert_eq!(report.samples.len(), 4);
            assert!(report.samples.windows(2).all(|w| w[1].cost <= w[0].cost));
            grid.check_consistency().unwrap();
        }
    }

    #[test]
    fn same_seed_same_placement() {
        let run = || {
            let mut rng = StdRng::seed_from_u64(6);
            let mut grid = Grid::new(&chain(20), &mut rng).unwrap();
            let config = AnnealConfig {
                steps: 500,
                temperature_start: 0.2,
                strategy: SwapStrategy::Directional,
                ..AnnealConfig::default()
            };
            anneal(&mut grid, &config, &mut rng);
            (0..grid.component_count()).map(|c| grid.cell_of(c)).collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn svg_has_one_square_per_component() {
        let grid = Grid::new(&chain(5), &mut StdRng::seed_from_u64(7)).unwrap();
        let svg = grid.to_svg();
        assert!(svg.starts_with("<svg"));
        assert_eq!(svg.matches("fill=\"blue\"").count(), 5);
        assert_eq!(svg.matches("<line").count(), 4);
        assert!(svg.ends_with("/>\n</svg>\n"));
        assert_eq!(svg.lines().count(), 1 + 1 + 5 + 4 + 1);
    }

    proptest! {
        #[test]
        fn hot_swaps_stay_consistent(
            seed in any::<u64>(),
            moves in prop::collection::vec((0usize..16, 0usize..16), 1..60),
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut grid = Grid::new(&chain(14), &mut rng).unwrap();
            for (a, b) in moves {
                grid.try_swap(a, b, 0.5, &mut rng);
            }
            prop_assert!(grid.check_consistency().is_ok());
        }
    }
}
