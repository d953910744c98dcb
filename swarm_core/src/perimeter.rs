//! Perimeter classifier.
//!
//! An agent is on the perimeter when its cohesion neighbours do not
//! angularly enclose it:
//! 1. it has fewer than [`MIN_ENCLOSING_NEIGHBORS`] neighbours, or
//! 2. walking its neighbours in angular order, two consecutive neighbours
//!    are not neighbours of each other, or
//! 3. two consecutive neighbours span a reflex angle (> π) as seen from it.
//!
//! Perimeter agents may also receive a gap vector pulling them toward the
//! midpoint of the offending neighbour pair.

use crate::geometry::GeometryCache;
use crate::vector::{midpoint, Vec2};
use nalgebra::DMatrix;
use std::f64::consts::{PI, TAU};

/// Fewer cohesion neighbours than this always means perimeter.
pub const MIN_ENCLOSING_NEIGHBORS: usize = 3;

/// Cohesion-neighbour relation.
///
/// `is_neighbor(i, j)` holds when `j != i` and `j` lies within the cohesion
/// radius of `i`. With per-agent radii the relation can be asymmetric.
#[derive(Debug, Clone)]
pub struct NeighborGraph {
    adjacency: DMatrix<bool>,
    counts: Vec<usize>,
}

impl NeighborGraph {
    pub fn new(n: usize) -> Self {
        Self {
            adjacency: DMatrix::from_element(n, n, false),
            counts: vec![0; n],
        }
    }

    /// Builds the relation from a geometry cache and per-agent radii.
    pub fn from_geometry(geometry: &GeometryCache, radii: &[f64]) -> Self {
        let mut graph = Self::new(geometry.len());
        graph.update(geometry, radii);
        graph
    }

    /// Recomputes the relation. `radii[i]` is the cohesion radius of agent `i`.
    pub fn update(&mut self, geometry: &GeometryCache, radii: &[f64]) {
        let n = geometry.len();
        debug_assert_eq!(radii.len(), n);
        if self.len() != n {
            *self = Self::new(n);
        }

        for i in 0..n {
            let mut count = 0;
            for j in 0..n {
                let linked = j != i && geometry.distance(i, j) <= radii[i];
                self.adjacency[(i, j)] = linked;
                if linked {
                    count += 1;
                }
            }
            self.counts[i] = count;
        }
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn is_neighbor(&self, i: usize, j: usize) -> bool {
        self.adjacency[(i, j)]
    }

    /// Number of cohesion neighbours of `i`.
    pub fn count(&self, i: usize) -> usize {
        self.counts[i]
    }

    /// Cohesion neighbours of `i` in index order.
    pub fn neighbors(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
        (0..self.len()).filter(move |&j| self.adjacency[(i, j)])
    }
}

/// Classification result for one agent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerimeterInfo {
    pub on_perimeter: bool,
    pub gap: Vec2,
}

impl PerimeterInfo {
    pub fn interior() -> Self {
        Self {
            on_perimeter: false,
            gap: Vec2::zeros(),
        }
    }

    fn perimeter(gap: Vec2) -> Self {
        Self {
            on_perimeter: true,
            gap,
        }
    }
}

impl Default for PerimeterInfo {
    fn default() -> Self {
        Self::interior()
    }
}

/// How gap vectors are produced for perimeter agents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GapPolicy {
    pub weight: f64,
    /// Produce a gap vector for reflex-angle classifications too, not only
    /// for unlinked neighbour pairs
    pub fill_on_reflex: bool,
}

impl GapPolicy {
    /// `weight × (midpoint(a, b) − pos[i])`
    fn gap_toward(&self, positions: &[Vec2], i: usize, a: usize, b: usize) -> Vec2 {
        (midpoint(&positions[a], &positions[b]) - positions[i]) * self.weight
    }
}

/// Angle swept counter-clockwise from `from` to `to`, in `[0, 2π)`.
pub fn angular_gap(from: f64, to: f64) -> f64 {
    let delta = to - from;
    if delta < 0.0 {
        delta + TAU
    } else {
        delta
    }
}

/// Cohesion neighbours of `i` ordered by the angle at which `i` sees them.
///
/// Equal angles are ordered by ascending agent index.
pub fn angular_ring(i: usize, geometry: &GeometryCache, graph: &NeighborGraph) -> Vec<usize> {
    let mut ring: Vec<usize> = graph.neighbors(i).collect();
    ring.sort_by(|&a, &b| {
        geometry
            .angle(i, a)
            .total_cmp(&geometry.angle(i, b))
            .then(a.cmp(&b))
    });
    ring
}

/// Classifies a single agent.
pub fn classify_agent(
    i: usize,
    geometry: &GeometryCache,
    graph: &NeighborGraph,
    positions: &[Vec2],
    policy: &GapPolicy,
) -> PerimeterInfo {
    if graph.count(i) < MIN_ENCLOSING_NEIGHBORS {
        return PerimeterInfo::perimeter(Vec2::zeros());
    }

    let ring = angular_ring(i, geometry, graph);
    for (k, &a) in ring.iter().enumerate() {
        let b = ring[(k + 1) % ring.len()];

        if !graph.is_neighbor(a, b) {
            return PerimeterInfo::perimeter(policy.gap_toward(positions, i, a, b));
        }

        if angular_gap(geometry.angle(i, a), geometry.angle(i, b)) > PI {
            let gap = if policy.fill_on_reflex {
                policy.gap_toward(positions, i, a, b)
            } else {
                Vec2::zeros()
            };
            return PerimeterInfo::perimeter(gap);
        }
    }

    PerimeterInfo::interior()
}

/// Classifies every agent.
pub fn classify(
    geometry: &GeometryCache,
    graph: &NeighborGraph,
    positions: &[Vec2],
    policy: &GapPolicy,
) -> Vec<PerimeterInfo> {
    (0..graph.len())
        .map(|i| classify_agent(i, geometry, graph, positions, policy))
        .collect()
}
