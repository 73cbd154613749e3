//! Conversions between [`Graph`] and petgraph's `DiGraph`.
//!
//! petgraph is convenient for building small graphs by hand and for its
//! algorithm library; strata's kernels only read CSR arrays. Node weights
//! are dropped on the way in, and node indices become vertex ids.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::error::GraphError;
use crate::graph::csr::{Edge, Graph, Orientation, VertexId};

impl Graph {
    /// Build a weighted CSR graph from a petgraph `DiGraph`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::TooManyVertices`] if the node count does not
    /// fit [`VertexId`].
    pub fn from_petgraph<N>(
        graph: &DiGraph<N, f64>,
        orientation: Orientation,
    ) -> Result<Self, GraphError> {
        let to_id = |n: NodeIndex| {
            VertexId::try_from(n.index()).map_err(|_| GraphError::TooManyVertices(n.index()))
        };
        let edges = graph
            .edge_references()
            .map(|e| Ok(Edge::new(to_id(e.source())?, to_id(e.target())?, *e.weight())))
            .collect::<Result<Vec<_>, GraphError>>()?;
        Self::from_edges(graph.node_count(), &edges, true, orientation)
    }

    /// Export as a petgraph `DiGraph` with forward edges.
    ///
    /// Unweighted graphs export unit weights.
    #[must_use]
    pub fn to_petgraph(&self) -> DiGraph<(), f64> {
        let mut out = DiGraph::with_capacity(self.vertex_count(), self.edge_count());
        for _ in 0..self.vertex_count() {
            out.add_node(());
        }
        for e in self.edges() {
            out.add_edge(
                NodeIndex::new(e.source as usize),
                NodeIndex::new(e.destination as usize),
                e.weight,
            );
        }
        out
    }
}
