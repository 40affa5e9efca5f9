//! Fruchterman-Reingold spring layout in three dimensions.
//!
//! Nodes start at seeded uniform positions in the unit cube. Every step, each
//! pair of nodes repels with force `k² / d` and each connected pair attracts
//! with force `d² / k`, where `k = sqrt(1 / n)` is the optimal distance. Each
//! node moves along its net displacement by a step size `t` that cools
//! linearly from a tenth of the initial extent. The simulation stops after the
//! iteration budget or once the mean movement falls below the threshold, and
//! the result is centred on the origin and scaled so the largest coordinate
//! magnitude is 1.
//!
//! Edges are treated as undirected for layout.

// Allow cast_precision_loss for node counts used as floats.
#![allow(clippy::cast_precision_loss)]
// Allow many_single_char_names for the conventional k, t, n, d.
#![allow(clippy::many_single_char_names)]
// Allow needless_range_loop - pairwise and per-axis indexing reads clearer than zipped iterators.
#![allow(clippy::needless_range_loop)]

use super::{Layout, LayoutAlgorithm, LayoutGraph, Point3, XorShift64Star};
use crate::config::LayoutSettings;
use tracing::instrument;

/// Smallest distance used in force computations.
const MIN_DISTANCE: f64 = 0.01;
/// Length substituted for displacements shorter than [`MIN_DISTANCE`].
const SHORT_DISPLACEMENT_LENGTH: f64 = 0.1;

/// Deterministic force-directed layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringLayout {
    /// Seed for the initial positions.
    pub seed: u64,
    /// Maximum number of simulation steps.
    pub iterations: usize,
    /// Mean per-node movement below which the simulation stops.
    pub threshold: f64,
}

impl Default for SpringLayout {
    fn default() -> Self {
        LayoutSettings::default().into()
    }
}

impl From<LayoutSettings> for SpringLayout {
    fn from(settings: LayoutSettings) -> Self {
        Self {
            seed: settings.seed,
            iterations: settings.iterations,
            threshold: settings.threshold,
        }
    }
}

impl SpringLayout {
    /// Creates a layout with the default budget and the given seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    /// Initial positions, uniform in `[0, 1)³`.
    fn initial_positions(&self, n: usize) -> Vec<[f64; 3]> {
        let mut rng = XorShift64Star::new(self.seed);
        (0..n)
            .map(|_| [rng.next_unit(), rng.next_unit(), rng.next_unit()])
            .collect()
    }

    /// Runs the simulation in place and returns the number of steps taken.
    fn simulate(&self, pos: &mut [[f64; 3]], adjacency: &[Vec<bool>]) -> usize {
        let n = pos.len();
        let k = (1.0 / n as f64).sqrt();

        let mut t = (0..3)
            .map(|axis| {
                let (lo, hi) = pos.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                    (lo.min(p[axis]), hi.max(p[axis]))
                });
                hi - lo
            })
            .fold(0.0_f64, f64::max)
            * 0.1;
        let dt = t / (self.iterations as f64 + 1.0);

        let mut displacement = vec![[0.0_f64; 3]; n];
        for step in 0..self.iterations {
            for (i, disp) in displacement.iter_mut().enumerate() {
                *disp = [0.0; 3];
                for j in 0..n {
                    if i == j {
                        continue;
                    }
                    let delta = [
                        pos[i][0] - pos[j][0],
                        pos[i][1] - pos[j][1],
                        pos[i][2] - pos[j][2],
                    ];
                    let d = norm(delta).max(MIN_DISTANCE);
                    let attraction = if adjacency[i][j] { d / k } else { 0.0 };
                    let force = k * k / (d * d) - attraction;
                    for axis in 0..3 {
                        disp[axis] += delta[axis] * force;
                    }
                }
            }

            let mut moved_sq = 0.0;
            for (p, disp) in pos.iter_mut().zip(&displacement) {
                let length = step_length(*disp);
                for axis in 0..3 {
                    let delta = disp[axis] * t / length;
                    p[axis] += delta;
                    moved_sq += delta * delta;
                }
            }

            t -= dt;
            if moved_sq.sqrt() / (n as f64) < self.threshold {
                return step + 1;
            }
        }
        self.iterations
    }
}

impl LayoutAlgorithm for SpringLayout {
    #[instrument(skip(self, graph), fields(nodes = graph.node_count(), edges = graph.edge_count()))]
    fn layout(&self, graph: &LayoutGraph) -> Layout {
        let n = graph.node_count();
        let names = graph.nodes().to_vec();
        match n {
            0 => return Layout::default(),
            1 => return Layout::from_parts(names, vec![Point3::ORIGIN]),
            _ => {},
        }

        let mut adjacency = vec![vec![false; n]; n];
        for (from, to, _) in graph.edges() {
            adjacency[from][to] = true;
            adjacency[to][from] = true;
        }

        let mut pos = self.initial_positions(n);
        let steps = self.simulate(&mut pos, &adjacency);
        rescale(&mut pos);
        tracing::debug!(steps, "Spring layout converged");

        let points = pos
            .into_iter()
            .map(|[x, y, z]| Point3::new(x, y, z))
            .collect();
        Layout::from_parts(names, points)
    }
}

fn norm(v: [f64; 3]) -> f64 {
    v[2].mul_add(v[2], v[0].mul_add(v[0], v[1] * v[1])).sqrt()
}

/// Length a displacement is divided by when scaling it to the step size.
///
/// Near-zero displacements use a fixed length, so a nearly balanced node
/// moves a small fraction of the step instead of the full step.
fn step_length(displacement: [f64; 3]) -> f64 {
    let length = norm(displacement);
    if length < MIN_DISTANCE {
        SHORT_DISPLACEMENT_LENGTH
    } else {
        length
    }
}

/// Centres positions on the origin and scales the largest magnitude to 1.
fn rescale(pos: &mut [[f64; 3]]) {
    let n = pos.len() as f64;
    for axis in 0..3 {
        let mean = pos.iter().map(|p| p[axis]).sum::<f64>() / n;
        for p in pos.iter_mut() {
            p[axis] -= mean;
        }
    }

    let lim = pos
        .iter()
        .flat_map(|p| p.iter().map(|c| c.abs()))
        .fold(0.0_f64, f64::max);
    if lim > 0.0 {
        for p in pos.iter_mut() {
            for c in p.iter_mut() {
                *c /= lim;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EdgeType;

    fn star(leaves: usize) -> LayoutGraph {
        let mut graph = LayoutGraph::new();
        for i in 0..leaves {
            graph.add_edge("hub", &format!("leaf{i}"), EdgeType::HasCondition);
        }
        graph
    }

    fn distance(a: Point3, b: Point3) -> f64 {
        norm([a.x - b.x, a.y - b.y, a.z - b.z])
    }

    #[test]
    fn test_empty_graph() {
        let layout = SpringLayout::default().layout(&LayoutGraph::new());
        assert!(layout.is_empty());
    }

    #[test]
    fn test_single_node_at_origin() {
        let mut graph = LayoutGraph::new();
        graph.add_node("alone");
        let layout = SpringLayout::default().layout(&graph);
        assert_eq!(layout.get("alone"), Some(Point3::ORIGIN));
    }

    #[test]
    fn test_deterministic_for_seed() {
        let graph = star(6);
        let a = SpringLayout::with_seed(42).layout(&graph);
        let b = SpringLayout::with_seed(42).layout(&graph);
        assert_eq!(a, b);
    }

    #[test]
    fn test_seed_changes_layout() {
        let graph = star(6);
        let a = SpringLayout::with_seed(1).layout(&graph);
        let b = SpringLayout::with_seed(2).layout(&graph);
        assert_ne!(a, b);
    }

    #[test]
    fn test_output_is_centred_and_bounded() {
        let layout = SpringLayout::default().layout(&star(8));
        let points: Vec<Point3> = layout.iter().map(|(_, p)| p).collect();
        let n = points.len() as f64;

        let mean_x = points.iter().map(|p| p.x).sum::<f64>() / n;
        let mean_y = points.iter().map(|p| p.y).sum::<f64>() / n;
        let mean_z = points.iter().map(|p| p.z).sum::<f64>() / n;
        assert!(mean_x.abs() < 1e-9 && mean_y.abs() < 1e-9 && mean_z.abs() < 1e-9);

        let max = points
            .iter()
            .flat_map(|p| [p.x.abs(), p.y.abs(), p.z.abs()])
            .fold(0.0_f64, f64::max);
        assert!((max - 1.0).abs() < 1e-9);
        assert!(points.iter().all(|p| p.x.is_finite() && p.y.is_finite() && p.z.is_finite()));
    }

    #[test]
    fn test_two_nodes_are_separated() {
        let mut graph = LayoutGraph::new();
        graph.add_edge("a", "b", EdgeType::HasCondition);
        let layout = SpringLayout::default().layout(&graph);

        let a = layout.get("a").unwrap();
        let b = layout.get("b").unwrap();
        assert!(distance(a, b) > 0.5);
    }

    #[test]
    fn test_connected_nodes_sit_closer_than_disconnected() {
        let mut graph = LayoutGraph::new();
        let triangles = [
            ("a1", "a2"),
            ("a2", "a3"),
            ("a3", "a1"),
            ("b1", "b2"),
            ("b2", "b3"),
            ("b3", "b1"),
        ];
        for (from, to) in triangles {
            graph.add_edge(from, to, EdgeType::HasCondition);
        }
        let layout = SpringLayout {
            iterations: 200,
            ..SpringLayout::default()
        }
        .layout(&graph);
        let at = |name: &str| layout.get(name).unwrap();

        let within: f64 = triangles.iter().map(|(f, t)| distance(at(f), at(t))).sum::<f64>() / 6.0;
        let across: f64 = ["a1", "a2", "a3"]
            .iter()
            .flat_map(|a| ["b1", "b2", "b3"].map(|b| distance(at(a), at(b))))
            .sum::<f64>()
            / 9.0;
        assert!(within < across, "within {within} across {across}");
    }

    #[test]
    fn test_short_displacements_use_fixed_length() {
        assert!((step_length([0.0; 3]) - SHORT_DISPLACEMENT_LENGTH).abs() < f64::EPSILON);
        assert!((step_length([0.005, 0.0, 0.0]) - SHORT_DISPLACEMENT_LENGTH).abs() < f64::EPSILON);
        assert!((step_length([0.3, 0.4, 0.0]) - 0.5).abs() < 1e-12);
        assert!((step_length([0.01, 0.0, 0.0]) - 0.01).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_iterations_keeps_rescaled_initial_positions() {
        let layout = SpringLayout {
            iterations: 0,
            ..SpringLayout::default()
        }
        .layout(&star(3));
        assert_eq!(layout.len(), 4);
    }
}
