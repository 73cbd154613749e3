//! Immutable compressed adjacency (CSR) graph.
//!
//! # Layout
//!
//! A [`Graph`] over `V` vertices and `E` edges stores three flat arrays:
//!
//! ```text
//! offsets: [usize; V + 1]   row v occupies offsets[v]..offsets[v + 1]
//! indices: [VertexId; E]    the vertex at the other end of each edge
//! weights: [f64; E]?        present iff the graph is weighted
//! ```
//!
//! The [`Orientation`] flag says how to read a row: in a `Forward` graph
//! row `v` lists `v`'s outgoing edges, in a `Transposed` graph it lists the
//! edges flowing into `v`. Multi-edges and self-loops are legal.
//!
//! Construction validates every invariant once; readers trust the arrays
//! afterwards and never re-check them.

use std::fmt::Write as _;
use std::ops::Range;

use tracing::instrument;

use crate::error::GraphError;
use crate::graph::interchange::GraphRecord;

/// Dense vertex identifier in `[0, V)`.
pub type VertexId = u32;

/// How each adjacency row is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Row `v` holds the edges leaving `v`.
    Forward,
    /// Row `v` holds the edges entering `v`.
    Transposed,
}

impl Orientation {
    /// The opposite reading of the same edge set.
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Forward => Self::Transposed,
            Self::Transposed => Self::Forward,
        }
    }
}

/// A directed `(source, destination, weight)` triple.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub source: VertexId,
    pub destination: VertexId,
    pub weight: f64,
}

impl Edge {
    #[must_use]
    pub const fn new(source: VertexId, destination: VertexId, weight: f64) -> Self {
        Self {
            source,
            destination,
            weight,
        }
    }

    /// Unit-weight edge.
    #[must_use]
    pub const fn unit(source: VertexId, destination: VertexId) -> Self {
        Self::new(source, destination, 1.0)
    }
}

/// Validated, read-only compressed adjacency graph.
///
/// Cheap to share across threads: all accessors take `&self` and the
/// arrays are never mutated after [`Graph::new`] returns.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "GraphRecord", into = "GraphRecord")]
pub struct Graph {
    offsets: Vec<usize>,
    indices: Vec<VertexId>,
    weights: Option<Vec<f64>>,
    orientation: Orientation,
}

impl Graph {
    /// Build a graph from raw CSR arrays, validating every invariant.
    ///
    /// # Errors
    ///
    /// Returns a [`GraphError`] when `offsets` is empty, does not start at
    /// zero, decreases, or does not end at `indices.len()`; when an index
    /// is outside `[0, V)`; or when `weights` is not one-per-edge or holds
    /// a negative or non-finite value.
    pub fn new(
        offsets: Vec<usize>,
        indices: Vec<VertexId>,
        weights: Option<Vec<f64>>,
        orientation: Orientation,
    ) -> Result<Self, GraphError> {
        validate(&offsets, &indices, weights.as_deref())?;
        Ok(Self {
            offsets,
            indices,
            weights,
            orientation,
        })
    }

    /// An empty graph with `vertex_count` isolated vertices.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::TooManyVertices`] when the count does not fit
    /// [`VertexId`].
    pub fn empty(
        vertex_count: usize,
        weighted: bool,
        orientation: Orientation,
    ) -> Result<Self, GraphError> {
        check_vertex_count(vertex_count)?;
        Ok(Self {
            offsets: vec![0; vertex_count + 1],
            indices: Vec::new(),
            weights: weighted.then(Vec::new),
            orientation,
        })
    }

    /// Build a graph from an edge list.
    ///
    /// Edges are bucketed by their row key (source for `Forward`,
    /// destination for `Transposed`) with a stable counting sort, so edges
    /// inside one row keep their input order. When `weighted` is false the
    /// edge weights are discarded.
    ///
    /// # Errors
    ///
    /// Returns a [`GraphError`] if an endpoint is outside
    /// `[0, vertex_count)`, or if `weighted` and a weight is negative or not
    /// finite.
    #[instrument(skip(edges), fields(edges = edges.len()))]
    pub fn from_edges(
        vertex_count: usize,
        edges: &[Edge],
        weighted: bool,
        orientation: Orientation,
    ) -> Result<Self, GraphError> {
        check_vertex_count(vertex_count)?;

        for (i, e) in edges.iter().enumerate() {
            for endpoint in [e.source, e.destination] {
                if endpoint as usize >= vertex_count {
                    return Err(GraphError::IndexOutOfRange {
                        edge: i,
                        vertex: u64::from(endpoint),
                        vertex_count,
                    });
                }
            }
            if weighted {
                check_weight(i, e.weight)?;
            }
        }

        let key = |e: &Edge| match orientation {
            Orientation::Forward => (e.source, e.destination),
            Orientation::Transposed => (e.destination, e.source),
        };

        let mut offsets = vec![0_usize; vertex_count + 1];
        for e in edges {
            offsets[key(e).0 as usize + 1] += 1;
        }
        for v in 0..vertex_count {
            offsets[v + 1] += offsets[v];
        }

        let mut cursor = offsets.clone();
        let mut indices = vec![0; edges.len()];
        let mut weights = weighted.then(|| vec![0.0; edges.len()]);
        for e in edges {
            let (row, col) = key(e);
            let slot = cursor[row as usize];
            cursor[row as usize] += 1;
            indices[slot] = col;
            if let Some(w) = weights.as_mut() {
                w[slot] = e.weight;
            }
        }

        Ok(Self {
            offsets,
            indices,
            weights,
            orientation,
        })
    }

    /// Number of vertices `V`.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Number of stored directed edges `E`.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.indices.len()
    }

    #[must_use]
    pub const fn is_weighted(&self) -> bool {
        self.weights.is_some()
    }

    #[must_use]
    pub const fn orientation(&self) -> Orientation {
        self.orientation
    }

    #[must_use]
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    #[must_use]
    pub fn indices(&self) -> &[VertexId] {
        &self.indices
    }

    #[must_use]
    pub fn weights(&self) -> Option<&[f64]> {
        self.weights.as_deref()
    }

    /// Positions of row `v` inside `indices` / `weights`.
    ///
    /// # Panics
    ///
    /// Panics if `v >= vertex_count()`.
    #[must_use]
    pub fn edge_range(&self, v: usize) -> Range<usize> {
        self.offsets[v]..self.offsets[v + 1]
    }

    /// The neighbors stored in row `v`.
    #[must_use]
    pub fn row(&self, v: usize) -> &[VertexId] {
        &self.indices[self.edge_range(v)]
    }

    /// Weights for row `v`, or `None` when unweighted.
    #[must_use]
    pub fn row_weights(&self, v: usize) -> Option<&[f64]> {
        let range = self.edge_range(v);
        self.weights.as_deref().map(|w| &w[range])
    }

    /// Length of row `v`.
    #[must_use]
    pub fn degree(&self, v: usize) -> usize {
        self.offsets[v + 1] - self.offsets[v]
    }

    /// Weight of edge slot `e`, `1.0` when the graph is unweighted.
    #[must_use]
    pub fn weight(&self, e: usize) -> f64 {
        self.weights.as_deref().map_or(1.0, |w| w[e])
    }

    /// Iterate `(row, column, weight)` over every stored edge in row order.
    pub fn entries(&self) -> impl Iterator<Item = (VertexId, VertexId, f64)> + '_ {
        (0..self.vertex_count()).flat_map(move |v| {
            self.edge_range(v).map(move |e| {
                // vertex_count() is checked against VertexId::MAX on construction.
                #[allow(clippy::cast_possible_truncation)]
                let row = v as VertexId;
                (row, self.indices[e], self.weight(e))
            })
        })
    }

    /// Iterate every stored edge as a directed [`Edge`], honoring
    /// orientation.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        let orientation = self.orientation;
        self.entries().map(move |(row, col, weight)| match orientation {
            Orientation::Forward => Edge::new(row, col, weight),
            Orientation::Transposed => Edge::new(col, row, weight),
        })
    }

    /// The same edge set stored with the opposite orientation.
    #[must_use]
    #[instrument(skip(self), fields(vertices = self.vertex_count(), edges = self.edge_count()))]
    pub fn transpose(&self) -> Self {
        let v = self.vertex_count();
        let mut offsets = vec![0_usize; v + 1];
        for &col in &self.indices {
            offsets[col as usize + 1] += 1;
        }
        for i in 0..v {
            offsets[i + 1] += offsets[i];
        }

        let mut cursor = offsets.clone();
        let mut indices = vec![0; self.indices.len()];
        let mut weights = self.weights.as_ref().map(|w| vec![0.0; w.len()]);
        for (row, col, weight) in self.entries() {
            let slot = cursor[col as usize];
            cursor[col as usize] += 1;
            indices[slot] = row;
            if let Some(w) = weights.as_mut() {
                w[slot] = weight;
            }
        }

        Self {
            offsets,
            indices,
            weights,
            orientation: self.orientation.flipped(),
        }
    }

    /// Same structure with the weight array replaced.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::WeightsLength`] if `weights` is not one-per-edge
    /// and [`GraphError::InvalidWeight`] for a negative or non-finite entry.
    pub fn with_weights(&self, weights: Vec<f64>) -> Result<Self, GraphError> {
        check_weights(&weights, self.indices.len())?;
        Ok(Self {
            offsets: self.offsets.clone(),
            indices: self.indices.clone(),
            weights: Some(weights),
            orientation: self.orientation,
        })
    }

    /// BLAKE3 digest of the graph arrays, formatted as `blake3:<hex>`.
    ///
    /// Two graphs with the same orientation, offsets, indices and weight
    /// bits hash identically. Used to invalidate cached results.
    #[must_use]
    pub fn content_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(match self.orientation {
            Orientation::Forward => b"F",
            Orientation::Transposed => b"T",
        });
        for &o in &self.offsets {
            hasher.update(&(o as u64).to_le_bytes());
        }
        for &i in &self.indices {
            hasher.update(&i.to_le_bytes());
        }
        match &self.weights {
            Some(weights) => {
                hasher.update(b"W");
                for w in weights {
                    hasher.update(&w.to_bits().to_le_bytes());
                }
            }
            None => {
                hasher.update(b"U");
            }
        }

        let mut out = String::from("blake3:");
        for byte in hasher.finalize().as_bytes() {
            let _ = write!(out, "{byte:02x}");
        }
        out
    }

    /// Consume the graph, returning `(offsets, indices, weights)`.
    #[must_use]
    pub fn into_parts(self) -> (Vec<usize>, Vec<VertexId>, Option<Vec<f64>>, Orientation) {
        (self.offsets, self.indices, self.weights, self.orientation)
    }
}

fn check_vertex_count(vertex_count: usize) -> Result<(), GraphError> {
    if vertex_count > VertexId::MAX as usize {
        return Err(GraphError::TooManyVertices(vertex_count));
    }
    Ok(())
}

fn validate(
    offsets: &[usize],
    indices: &[VertexId],
    weights: Option<&[f64]>,
) -> Result<(), GraphError> {
    let Some((&first, _)) = offsets.split_first() else {
        return Err(GraphError::EmptyOffsets);
    };
    if first != 0 {
        return Err(GraphError::OffsetsStart(first));
    }

    let vertex_count = offsets.len() - 1;
    check_vertex_count(vertex_count)?;

    if let Some(vertex) = offsets.windows(2).position(|w| w[0] > w[1]) {
        return Err(GraphError::NonMonotonicOffsets {
            vertex,
            start: offsets[vertex],
            end: offsets[vertex + 1],
        });
    }

    let last = offsets[vertex_count];
    if last != indices.len() {
        return Err(GraphError::OffsetsEnd {
            last,
            edges: indices.len(),
        });
    }

    if let Some(edge) = indices.iter().position(|&i| i as usize >= vertex_count) {
        return Err(GraphError::IndexOutOfRange {
            edge,
            vertex: u64::from(indices[edge]),
            vertex_count,
        });
    }

    if let Some(w) = weights {
        check_weights(w, indices.len())?;
    }

    Ok(())
}

fn check_weights(weights: &[f64], edges: usize) -> Result<(), GraphError> {
    if weights.len() != edges {
        return Err(GraphError::WeightsLength {
            weights: weights.len(),
            edges,
        });
    }
    weights
        .iter()
        .enumerate()
        .try_for_each(|(edge, &weight)| check_weight(edge, weight))
}

/// Weights must be finite and `>= 0`. Zero is allowed.
fn check_weight(edge: usize, weight: f64) -> Result<(), GraphError> {
    if weight.is_finite() && weight >= 0.0 {
        Ok(())
    } else {
        Err(GraphError::InvalidWeight { edge, weight })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Graph {
        // 0 → 1 → 2 → 0
        Graph::new(vec![0, 1, 2, 3], vec![1, 2, 0], None, Orientation::Forward).unwrap()
    }

    #[test]
    fn accessors_report_shape() {
        let g = triangle();
        assert_eq!(g.vertex_count(), 3);
        assert_eq!(g.edge_count(), 3);
        assert!(!g.is_weighted());
        assert_eq!(g.row(1), &[2]);
        assert_eq!(g.degree(2), 1);
        assert!((g.weight(0) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_empty_offsets() {
        let err = Graph::new(vec![], vec![], None, Orientation::Forward).unwrap_err();
        assert_eq!(err, GraphError::EmptyOffsets);
    }

    #[test]
    fn rejects_nonzero_start() {
        let err = Graph::new(vec![1, 1], vec![0], None, Orientation::Forward).unwrap_err();
        assert_eq!(err, GraphError::OffsetsStart(1));
    }

    #[test]
    fn rejects_decreasing_offsets() {
        let err =
            Graph::new(vec![0, 2, 1, 2], vec![0, 1], None, Orientation::Forward).unwrap_err();
        assert_eq!(
            err,
            GraphError::NonMonotonicOffsets {
                vertex: 1,
                start: 2,
                end: 1
            }
        );
    }

    #[test]
    fn rejects_wrong_final_offset() {
        let err = Graph::new(vec![0, 1, 1], vec![1, 0], None, Orientation::Forward).unwrap_err();
        assert_eq!(err, GraphError::OffsetsEnd { last: 1, edges: 2 });
    }

    #[test]
    fn rejects_out_of_range_index() {
        let err = Graph::new(vec![0, 1, 2], vec![1, 2], None, Orientation::Forward).unwrap_err();
        assert!(matches!(
            err,
            GraphError::IndexOutOfRange {
                edge: 1,
                vertex: 2,
                vertex_count: 2
            }
        ));
    }

    #[test]
    fn rejects_weight_length_mismatch() {
        let err = Graph::new(vec![0, 1, 1], vec![1], Some(vec![]), Orientation::Forward)
            .unwrap_err();
        assert_eq!(err, GraphError::WeightsLength { weights: 0, edges: 1 });
    }

    #[test]
    fn rejects_negative_and_non_finite_weights() {
        for bad in [-1.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = Graph::new(
                vec![0, 2, 2],
                vec![1, 0],
                Some(vec![1.0, bad]),
                Orientation::Forward,
            )
            .unwrap_err();
            assert!(
                matches!(err, GraphError::InvalidWeight { edge: 1, .. }),
                "{bad}: {err:?}"
            );
        }
    }

    #[test]
    fn zero_weights_are_valid() {
        let g = Graph::new(vec![0, 1, 1], vec![1], Some(vec![0.0]), Orientation::Forward);
        assert!(g.is_ok());
    }

    #[test]
    fn from_edges_rejects_bad_weight_only_when_weighted() {
        let edges = [Edge::new(0, 1, 2.0), Edge::new(1, 0, -1.0)];
        let err = Graph::from_edges(2, &edges, true, Orientation::Transposed).unwrap_err();
        assert!(matches!(err, GraphError::InvalidWeight { edge: 1, .. }));

        let unweighted = Graph::from_edges(2, &edges, false, Orientation::Transposed).unwrap();
        assert!(!unweighted.is_weighted());
    }

    #[test]
    fn zero_vertex_graph_is_valid() {
        let g = Graph::new(vec![0], vec![], None, Orientation::Forward).unwrap();
        assert_eq!(g.vertex_count(), 0);
        assert_eq!(g.edges().count(), 0);
    }

    #[test]
    fn from_edges_keeps_row_input_order() {
        let edges = [
            Edge::new(1, 0, 3.0),
            Edge::new(0, 2, 1.0),
            Edge::new(1, 2, 4.0),
            Edge::new(0, 1, 2.0),
        ];
        let g = Graph::from_edges(3, &edges, true, Orientation::Forward).unwrap();
        assert_eq!(g.offsets(), &[0, 2, 4, 4]);
        assert_eq!(g.indices(), &[2, 1, 0, 2]);
        assert_eq!(g.weights().unwrap(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn from_edges_transposed_rows_are_destinations() {
        let edges = [Edge::unit(0, 2), Edge::unit(1, 2), Edge::unit(2, 0)];
        let g = Graph::from_edges(3, &edges, false, Orientation::Transposed).unwrap();
        assert_eq!(g.row(2), &[0, 1]);
        assert_eq!(g.row(0), &[2]);
        let mut roundtrip: Vec<_> = g.edges().map(|e| (e.source, e.destination)).collect();
        roundtrip.sort_unstable();
        assert_eq!(roundtrip, vec![(0, 2), (1, 2), (2, 0)]);
    }

    #[test]
    fn from_edges_rejects_bad_endpoint() {
        let err =
            Graph::from_edges(2, &[Edge::unit(0, 5)], false, Orientation::Forward).unwrap_err();
        assert!(matches!(err, GraphError::IndexOutOfRange { vertex: 5, .. }));
    }

    #[test]
    fn transpose_preserves_edges_and_weights() {
        let edges = [
            Edge::new(0, 1, 0.5),
            Edge::new(0, 2, 1.5),
            Edge::new(2, 1, 2.5),
        ];
        let g = Graph::from_edges(3, &edges, true, Orientation::Forward).unwrap();
        let t = g.transpose();
        assert_eq!(t.orientation(), Orientation::Transposed);
        assert_eq!(t.row(1), &[0, 2]);
        assert_eq!(t.row_weights(1).unwrap(), &[0.5, 2.5]);

        let key = |g: &Graph| {
            let mut e: Vec<_> = g
                .edges()
                .map(|e| (e.source, e.destination, e.weight.to_bits()))
                .collect();
            e.sort_unstable();
            e
        };
        assert_eq!(key(&g), key(&t));
        assert_eq!(t.transpose(), g);
    }

    #[test]
    fn with_weights_checks_length() {
        let g = triangle();
        assert!(g.with_weights(vec![1.0; 2]).is_err());
        assert!(matches!(
            g.with_weights(vec![1.0, f64::NAN, 1.0]),
            Err(GraphError::InvalidWeight { edge: 1, .. })
        ));
        assert!(matches!(
            g.with_weights(vec![1.0, 1.0, -3.0]),
            Err(GraphError::InvalidWeight { edge: 2, .. })
        ));
        let w = g.with_weights(vec![2.0; 3]).unwrap();
        assert!(w.is_weighted());
        assert_eq!(w.indices(), g.indices());
    }

    #[test]
    fn content_hash_tracks_changes() {
        let g = triangle();
        assert_eq!(g.content_hash(), triangle().content_hash());
        assert!(g.content_hash().starts_with("blake3:"));
        assert_ne!(g.content_hash(), g.transpose().content_hash());
        assert_ne!(
            g.content_hash(),
            g.with_weights(vec![1.0; 3]).unwrap().content_hash()
        );
    }
}
