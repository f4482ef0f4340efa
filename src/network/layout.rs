//! Force-directed node placement (Fruchterman-Reingold).

use crate::network::graph::BipartiteGraph;
use petgraph::visit::EdgeRef;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Node position in layout space, roughly within `[-1, 1]` on both axes.
pub type Position = (f64, f64);

const MIN_DISTANCE: f64 = 0.01;

/// Spring layout parameters. Identical graphs and parameters always give
/// identical positions.
#[derive(Debug, Clone, PartialEq)]
pub struct SpringLayout {
    /// Optimal distance between nodes.
    pub k: f64,
    pub iterations: usize,
    pub seed: u64,
    /// Stop early once the mean node movement of an iteration falls below this.
    pub threshold: f64,
}

impl Default for SpringLayout {
    fn default() -> Self {
        Self {
            k: 0.5,
            iterations: 50,
            seed: 42,
            threshold: 1e-4,
        }
    }
}

impl SpringLayout {
    /// Positions for every node of `graph`, indexed by `NodeIndex::index()`.
    pub fn compute(&self, graph: &BipartiteGraph) -> Vec<Position> {
        let n = graph.node_count();
        match n {
            0 => return Vec::new(),
            1 => return vec![(0.0, 0.0)],
            _ => {}
        }

        let mut adjacency = vec![vec![0.0f64; n]; n];
        for edge in graph.graph().edge_references() {
            let (a, b) = (edge.source().index(), edge.target().index());
            let weight = *edge.weight() as f64;
            adjacency[a][b] += weight;
            adjacency[b][a] += weight;
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut pos: Vec<[f64; 2]> = (0..n).map(|_| [rng.gen::<f64>(), rng.gen::<f64>()]).collect();

        let extent = |axis: usize, pos: &[[f64; 2]]| {
            let (lo, hi) = pos
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                    (lo.min(p[axis]), hi.max(p[axis]))
                });
            hi - lo
        };
        let mut temperature = extent(0, &pos).max(extent(1, &pos)) * 0.1;
        let cooling = temperature / (self.iterations as f64 + 1.0);
        let k2 = self.k * self.k;

        for _ in 0..self.iterations {
            let mut displacement = vec![[0.0f64; 2]; n];
            for i in 0..n {
                for j in 0..n {
                    if i == j {
                        continue;
                    }
                    let dx = pos[i][0] - pos[j][0];
                    let dy = pos[i][1] - pos[j][1];
                    let distance = (dx * dx + dy * dy).sqrt().max(MIN_DISTANCE);
                    let force = k2 / (distance * distance) - adjacency[i][j] * distance / self.k;
                    displacement[i][0] += dx * force;
                    displacement[i][1] += dy * force;
                }
            }

            let mut moved = 0.0;
            for (p, d) in pos.iter_mut().zip(&displacement) {
                let mut length = (d[0] * d[0] + d[1] * d[1]).sqrt();
                if length < MIN_DISTANCE {
                    length = 0.1;
                }
                let step = [d[0] * temperature / length, d[1] * temperature / length];
                p[0] += step[0];
                p[1] += step[1];
                moved += step[0] * step[0] + step[1] * step[1];
            }
            temperature -= cooling;

            if moved.sqrt() / (n as f64) < self.threshold {
                break;
            }
        }

        Self::rescale(&mut pos);
        pos.into_iter().map(|p| (p[0], p[1])).collect()
    }

    /// Centre on the mean and scale so the largest coordinate magnitude is 1.
    fn rescale(pos: &mut [[f64; 2]]) {
        let n = pos.len() as f64;
        for axis in 0..2 {
            let mean = pos.iter().map(|p| p[axis]).sum::<f64>() / n;
            for p in pos.iter_mut() {
                p[axis] -= mean;
            }
        }

        let limit = pos
            .iter()
            .flat_map(|p| [p[0].abs(), p[1].abs()])
            .fold(0.0f64, f64::max);
        if limit > 0.0 {
            for p in pos.iter_mut() {
                p[0] /= limit;
                p[1] /= limit;
            }
        }
    }
}
