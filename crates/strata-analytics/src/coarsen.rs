//! Graph coarsening: contract a vertex partition into a smaller multigraph.
//!
//! # Overview
//!
//! Given a graph and one label per vertex, every distinct label becomes one
//! coarse vertex and every original edge `(u, v, w)` becomes the coarse
//! edge `(id(label[u]), id(label[v]), w)`. Parallel coarse edges are then
//! merged: unweighted graphs keep one edge per `(row, col)` pair, weighted
//! graphs sum the weights.
//!
//! # Algorithm
//!
//! ```text
//! labels ──sort+dedup──▶ distinct labels   (coarse id = rank in sorted order)
//! edges  ──relabel─────▶ slots             (parallel, one slot per edge)
//! slots  ──stable sort by (row, col)───▶ runs of equal keys
//! runs   ──segmented reduce────────────▶ head Active, rest Removed
//! slots  ──compact Active──────────────▶ coarse CSR arrays
//! ```
//!
//! The stable sort fixes the order in which weights inside a run are
//! added (original row order), so the output is bit-identical for any
//! worker count.
//!
//! # Self-loops
//!
//! An edge between two vertices sharing a label becomes a coarse
//! self-loop. [`SelfLoopPolicy::Retain`] (the default) keeps it,
//! [`SelfLoopPolicy::Drop`] filters it during compaction.

use rayon::prelude::*;
use tracing::{debug, instrument};

use strata_core::config::{CoarsenConfig, SelfLoopPolicy};
use strata_core::error::{ErrorCode, GraphError};
use strata_core::graph::{Graph, VertexId};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by [`coarsen`] and [`coarsen_with`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoarsenError {
    /// The label array is not one-per-vertex.
    #[error("label assignment has {actual} entries but the graph has {expected} vertices")]
    LabelCountMismatch { expected: usize, actual: usize },

    /// The coarse arrays failed validation.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl CoarsenError {
    /// Return the machine-readable error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::LabelCountMismatch { .. } => ErrorCode::LabelCountMismatch,
            Self::Graph(e) => e.code(),
        }
    }
}

// ---------------------------------------------------------------------------
// Result type
// ---------------------------------------------------------------------------

/// A coarse graph plus the mapping back to the labels it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct Coarsened<L> {
    /// One vertex per distinct label, same orientation as the input.
    pub graph: Graph,
    /// `coarse_vertex_to_label[c]` is the label coarse vertex `c` stands
    /// for. Sorted ascending and free of duplicates.
    pub coarse_vertex_to_label: Vec<L>,
    /// `member_vertices[member_offsets[c]..member_offsets[c + 1]]` are the
    /// original vertices contracted into `c`, ascending.
    pub member_offsets: Vec<usize>,
    pub member_vertices: Vec<VertexId>,
}

impl<L> Coarsened<L> {
    /// Number of coarse vertices `C`.
    #[must_use]
    pub fn coarse_vertex_count(&self) -> usize {
        self.coarse_vertex_to_label.len()
    }

    /// Original vertices contracted into coarse vertex `c`.
    ///
    /// # Panics
    ///
    /// Panics if `c >= self.coarse_vertex_count()`.
    #[must_use]
    pub fn members(&self, c: usize) -> &[VertexId] {
        &self.member_vertices[self.member_offsets[c]..self.member_offsets[c + 1]]
    }
}

// ---------------------------------------------------------------------------
// Edge slots
// ---------------------------------------------------------------------------

/// One remapped edge during deduplication. Merged duplicates become
/// `Removed` and are skipped by compaction.
#[derive(Debug, Clone, Copy, PartialEq)]
enum EdgeSlot {
    Active {
        row: VertexId,
        col: VertexId,
        weight: f64,
    },
    Removed,
}

impl EdgeSlot {
    fn key(&self) -> (VertexId, VertexId) {
        match *self {
            Self::Active { row, col, .. } => (row, col),
            Self::Removed => (VertexId::MAX, VertexId::MAX),
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Coarsen `graph` by `labels` with the default [`CoarsenConfig`]
/// (self-loops retained).
///
/// # Errors
///
/// Returns [`CoarsenError::LabelCountMismatch`] if `labels.len()` is not
/// the vertex count.
pub fn coarsen<L>(graph: &Graph, labels: &[L]) -> Result<Coarsened<L>, CoarsenError>
where
    L: Ord + Copy + Send + Sync,
{
    coarsen_with(graph, labels, &CoarsenConfig::default())
}

/// Coarsen `graph` by `labels`.
///
/// Labels may be any ordered values; they need not be contiguous, sorted,
/// or non-negative. Coarse vertex ids follow ascending label order. Rows of
/// the result are sorted by column.
///
/// # Errors
///
/// Returns [`CoarsenError::LabelCountMismatch`] if `labels.len()` is not
/// the vertex count.
#[instrument(skip(graph, labels, config), fields(vertices = graph.vertex_count(), edges = graph.edge_count()))]
pub fn coarsen_with<L>(
    graph: &Graph,
    labels: &[L],
    config: &CoarsenConfig,
) -> Result<Coarsened<L>, CoarsenError>
where
    L: Ord + Copy + Send + Sync,
{
    let vertex_count = graph.vertex_count();
    if labels.len() != vertex_count {
        return Err(CoarsenError::LabelCountMismatch {
            expected: vertex_count,
            actual: labels.len(),
        });
    }

    let mut distinct = labels.to_vec();
    distinct.par_sort_unstable();
    distinct.dedup();
    let coarse_count = distinct.len();

    let coarse_of: Vec<VertexId> = labels
        .par_iter()
        .map(|label| coarse_id(&distinct, label))
        .collect();

    let (member_offsets, member_vertices) = partition(&coarse_of, coarse_count);

    let mut slots = relabel(graph, &coarse_of);
    let remapped = slots.len();
    slots.par_sort_by_key(EdgeSlot::key);
    reduce_runs(&mut slots);

    let (offsets, indices, weights, dropped) =
        compact(&slots, coarse_count, graph.is_weighted(), config.self_loops);
    let merged = remapped - indices.len() - dropped;

    let coarse = Graph::new(offsets, indices, weights, graph.orientation())?;

    debug!(
        coarse_vertices = coarse_count,
        coarse_edges = coarse.edge_count(),
        merged,
        dropped_self_loops = dropped,
        "coarsening complete"
    );

    Ok(Coarsened {
        graph: coarse,
        coarse_vertex_to_label: distinct,
        member_offsets,
        member_vertices,
    })
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Rank of `label` among the sorted distinct labels.
fn coarse_id<L: Ord>(distinct: &[L], label: &L) -> VertexId {
    // Every label is present, so the search always hits.
    let idx = distinct.binary_search(label).unwrap_or_else(|i| i);
    // distinct.len() <= vertex_count <= VertexId::MAX
    VertexId::try_from(idx).unwrap_or(VertexId::MAX)
}

/// Group original vertices by coarse id with a counting sort.
fn partition(coarse_of: &[VertexId], coarse_count: usize) -> (Vec<usize>, Vec<VertexId>) {
    let mut offsets = vec![0_usize; coarse_count + 1];
    for &c in coarse_of {
        offsets[c as usize + 1] += 1;
    }
    for c in 0..coarse_count {
        offsets[c + 1] += offsets[c];
    }

    let mut cursor = offsets.clone();
    let mut members = vec![0; coarse_of.len()];
    for (v, &c) in coarse_of.iter().enumerate() {
        members[cursor[c as usize]] = VertexId::try_from(v).unwrap_or(VertexId::MAX);
        cursor[c as usize] += 1;
    }
    (offsets, members)
}

/// Map every stored edge to its coarse endpoints. Independent per edge.
fn relabel(graph: &Graph, coarse_of: &[VertexId]) -> Vec<EdgeSlot> {
    let indices = graph.indices();
    (0..graph.vertex_count())
        .into_par_iter()
        .flat_map_iter(|v| {
            let row = coarse_of[v];
            graph.edge_range(v).map(move |e| EdgeSlot::Active {
                row,
                col: coarse_of[indices[e] as usize],
                weight: graph.weight(e),
            })
        })
        .collect()
}

/// Fold each run of equal keys into its first slot and tombstone the rest.
///
/// `slots` must be sorted by key.
fn reduce_runs(slots: &mut [EdgeSlot]) {
    let mut run_start = 0;
    for i in 1..slots.len() {
        if slots[i].key() != slots[run_start].key() {
            run_start = i;
            continue;
        }
        if let EdgeSlot::Active { weight: extra, .. } = slots[i] {
            if let EdgeSlot::Active { weight, .. } = &mut slots[run_start] {
                *weight += extra;
            }
        }
        slots[i] = EdgeSlot::Removed;
    }
}

/// Build CSR arrays from the surviving slots. Returns the arrays plus the
/// number of self-loops dropped by `policy`.
fn compact(
    slots: &[EdgeSlot],
    coarse_count: usize,
    weighted: bool,
    policy: SelfLoopPolicy,
) -> (Vec<usize>, Vec<VertexId>, Option<Vec<f64>>, usize) {
    let mut offsets = vec![0_usize; coarse_count + 1];
    let mut indices = Vec::new();
    let mut weights = weighted.then(Vec::new);
    let mut dropped = 0;

    for slot in slots {
        let EdgeSlot::Active { row, col, weight } = *slot else {
            continue;
        };
        if row == col && policy == SelfLoopPolicy::Drop {
            dropped += 1;
            continue;
        }
        offsets[row as usize + 1] += 1;
        indices.push(col);
        if let Some(w) = weights.as_mut() {
            w.push(weight);
        }
    }
    for c in 0..coarse_count {
        offsets[c + 1] += offsets[c];
    }

    (offsets, indices, weights, dropped)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
