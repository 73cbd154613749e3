//! Summary statistics for a compressed adjacency graph.
//!
//! # Statistics Provided
//!
//! - **vertex_count** / **edge_count**: `V` and `E` as stored (parallel
//!   edges count individually).
//! - **density**: `E / (V * (V - 1))`. Zero for graphs with fewer than two
//!   vertices; may exceed 1.0 for multigraphs.
//! - **self_loop_count**: edges whose endpoints coincide.
//! - **dangling_count**: vertices with no outgoing edges. These are the
//!   vertices whose PageRank mass must be redistributed.
//! - **isolated_count**: vertices with neither incoming nor outgoing edges.
//! - **max_in_degree** / **max_out_degree**: read with the graph's
//!   orientation, so the numbers are the same for a graph and its
//!   transpose.
//! - **weakly_connected_component_count**: components when edge direction
//!   is ignored.
//! - **total_weight**: sum of edge weights (`E` when unweighted).

use petgraph::algo::connected_components;

use crate::graph::csr::{Graph, Orientation};

/// Summary statistics for a [`Graph`].
#[derive(Debug, Clone, PartialEq)]
pub struct GraphStats {
    pub vertex_count: usize,
    pub edge_count: usize,
    /// `edge_count / (vertex_count * (vertex_count - 1))`.
    pub density: f64,
    pub self_loop_count: usize,
    /// Vertices with out-degree zero.
    pub dangling_count: usize,
    /// Vertices with in-degree and out-degree zero.
    pub isolated_count: usize,
    pub max_in_degree: usize,
    pub max_out_degree: usize,
    pub weakly_connected_component_count: usize,
    pub total_weight: f64,
}

impl GraphStats {
    /// Compute statistics for `graph`.
    #[must_use]
    pub fn from_graph(graph: &Graph) -> Self {
        let vertex_count = graph.vertex_count();
        let edge_count = graph.edge_count();

        // Row lengths are one direction, column counts the other.
        let row_degree: Vec<usize> = (0..vertex_count).map(|v| graph.degree(v)).collect();
        let mut col_degree = vec![0_usize; vertex_count];
        for &c in graph.indices() {
            col_degree[c as usize] += 1;
        }
        let (out_degree, in_degree) = match graph.orientation() {
            Orientation::Forward => (row_degree, col_degree),
            Orientation::Transposed => (col_degree, row_degree),
        };

        let self_loop_count = graph.entries().filter(|(r, c, _)| r == c).count();
        let dangling_count = out_degree.iter().filter(|&&d| d == 0).count();
        let isolated_count = out_degree
            .iter()
            .zip(&in_degree)
            .filter(|&(&o, &i)| o == 0 && i == 0)
            .count();

        let total_weight = graph
            .weights()
            .map_or(edge_count as f64, |w| w.iter().sum());

        Self {
            vertex_count,
            edge_count,
            density: compute_density(vertex_count, edge_count),
            self_loop_count,
            dangling_count,
            isolated_count,
            max_in_degree: in_degree.iter().copied().max().unwrap_or(0),
            max_out_degree: out_degree.iter().copied().max().unwrap_or(0),
            weakly_connected_component_count: connected_components(&graph.to_petgraph()),
            total_weight,
        }
    }

    /// Return `true` if the graph has no edges.
    #[must_use]
    pub const fn is_flat(&self) -> bool {
        self.edge_count == 0
    }

    /// Return `true` if any edge starts and ends at the same vertex.
    #[must_use]
    pub const fn has_self_loops(&self) -> bool {
        self.self_loop_count > 0
    }
}

fn compute_density(vertex_count: usize, edge_count: usize) -> f64 {
    if vertex_count < 2 {
        return 0.0_f64;
    }
    let max_edges = (vertex_count * (vertex_count - 1)) as f64;
    edge_count as f64 / max_edges
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
