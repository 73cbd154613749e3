//! K-core verification contract.
//!
//! strata does not ship a k-core algorithm. Any implementation of
//! [`KCoreSolver`] can be plugged in, and [`validate_k_core`] decides whether
//! its output is correct for a graph and threshold `k`.
//!
//! Degrees are counted along rows: a vertex's degree is the number of
//! subgraph edges stored in its row (out-degree for a forward graph,
//! in-degree for a transposed one). On a symmetric graph this is the usual
//! undirected degree.

use tracing::{debug, instrument};

use strata_core::error::ErrorCode;
use strata_core::graph::{Edge, Graph, Orientation, VertexId};

// ---------------------------------------------------------------------------
// Solver trait
// ---------------------------------------------------------------------------

/// An external k-core algorithm.
pub trait KCoreSolver {
    /// Error type for solver failures.
    type Error: std::fmt::Debug + std::fmt::Display;

    /// Core number of every vertex.
    fn core_numbers(&self, graph: &Graph) -> Result<Vec<u32>, Self::Error>;

    /// The k-core as an edge list.
    ///
    /// Defaults to the subgraph induced by `{v : core_numbers[v] >= k}`.
    fn extract(&self, graph: &Graph, k: u32, core_numbers: &[u32]) -> KCoreSubgraph {
        KCoreSubgraph::induced(graph, core_numbers, k)
    }
}

// ---------------------------------------------------------------------------
// Subgraph
// ---------------------------------------------------------------------------

/// Edge-list form of an extracted subgraph. `sources[i] → destinations[i]`
/// is one edge, weighted by `weights[i]` when present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KCoreSubgraph {
    pub sources: Vec<VertexId>,
    pub destinations: Vec<VertexId>,
    pub weights: Option<Vec<f64>>,
}

impl KCoreSubgraph {
    /// Every edge of `graph` whose endpoints both have core number `>= k`.
    /// Vertices without a core number are treated as outside the core.
    #[must_use]
    pub fn induced(graph: &Graph, core_numbers: &[u32], k: u32) -> Self {
        let retained = |v: VertexId| core_numbers.get(v as usize).is_some_and(|&c| c >= k);
        let mut out = Self {
            weights: graph.is_weighted().then(Vec::new),
            ..Self::default()
        };
        for edge in graph
            .edges()
            .filter(|e| retained(e.source) && retained(e.destination))
        {
            out.sources.push(edge.source);
            out.destinations.push(edge.destination);
            if let Some(w) = out.weights.as_mut() {
                w.push(edge.weight);
            }
        }
        out
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.sources.len()
    }

    fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.sources
            .iter()
            .zip(&self.destinations)
            .enumerate()
            .map(|(i, (&s, &d))| {
                let w = self.weights.as_ref().map_or(1.0, |w| w[i]);
                Edge::new(s, d, w)
            })
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Ways a claimed k-core can be wrong.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KCoreViolation {
    #[error("expected {expected} core numbers, got {actual}")]
    CoreNumberCount { expected: usize, actual: usize },

    #[error(
        "subgraph arrays disagree: {sources} sources, {destinations} destinations, {weights:?} weights"
    )]
    ArrayLengths {
        sources: usize,
        destinations: usize,
        weights: Option<usize>,
    },

    #[error("subgraph weights present: {actual}, graph weighted: {expected}")]
    WeightPresence { expected: bool, actual: bool },

    #[error("subgraph edge {edge} references vertex {vertex}, outside the graph")]
    EndpointOutOfRange { edge: usize, vertex: VertexId },

    #[error("subgraph edge {edge} touches vertex {vertex} with core number {core} < k")]
    BelowThreshold {
        edge: usize,
        vertex: VertexId,
        core: u32,
    },

    #[error("subgraph is not the induced subgraph: {actual} edges, expected {expected}")]
    NotInduced { expected: usize, actual: usize },

    #[error("vertex {vertex} has degree {degree} inside the core, need at least {k}")]
    InsufficientDegree { vertex: VertexId, degree: usize, k: u32 },

    #[error("vertex {vertex} survives peeling at k but was left out of the core")]
    NotMaximal { vertex: VertexId },
}

impl KCoreViolation {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::KCoreViolation
    }
}

/// Check a k-core result against `graph`.
///
/// Passes only if `subgraph` is exactly the subgraph induced by
/// `{v : core_numbers[v] >= k}`, every vertex in that set has at least `k`
/// edges in its row inside the set, and no larger set has that property.
///
/// # Errors
///
/// Returns the first [`KCoreViolation`] found.
#[instrument(skip(graph, core_numbers, subgraph), fields(vertices = graph.vertex_count(), sub_edges = subgraph.edge_count()))]
pub fn validate_k_core(
    graph: &Graph,
    core_numbers: &[u32],
    subgraph: &KCoreSubgraph,
    k: u32,
) -> Result<(), KCoreViolation> {
    let n = graph.vertex_count();
    if core_numbers.len() != n {
        return Err(KCoreViolation::CoreNumberCount {
            expected: n,
            actual: core_numbers.len(),
        });
    }
    check_shape(graph, subgraph)?;

    for (edge, (&s, &d)) in subgraph.sources.iter().zip(&subgraph.destinations).enumerate() {
        for vertex in [s, d] {
            let Some(&core) = core_numbers.get(vertex as usize) else {
                return Err(KCoreViolation::EndpointOutOfRange { edge, vertex });
            };
            if core < k {
                return Err(KCoreViolation::BelowThreshold { edge, vertex, core });
            }
        }
    }

    let expected = KCoreSubgraph::induced(graph, core_numbers, k);
    if edge_multiset(&expected) != edge_multiset(subgraph) {
        return Err(KCoreViolation::NotInduced {
            expected: expected.edge_count(),
            actual: subgraph.edge_count(),
        });
    }

    let row_of = |e: &Edge| match graph.orientation() {
        Orientation::Forward => e.source,
        Orientation::Transposed => e.destination,
    };
    let mut degree = vec![0_usize; n];
    for e in subgraph.edges() {
        degree[row_of(&e) as usize] += 1;
    }
    for (v, &core) in core_numbers.iter().enumerate() {
        if core >= k && degree[v] < k as usize {
            return Err(KCoreViolation::InsufficientDegree {
                vertex: as_vertex(v),
                degree: degree[v],
                k,
            });
        }
    }

    // Any set with minimum degree k lies inside the peeled set, so only
    // vertices the claim left out can differ here.
    let survivors = peel(graph, k);
    if let Some(v) = (0..n).find(|&v| survivors[v] && core_numbers[v] < k) {
        return Err(KCoreViolation::NotMaximal {
            vertex: as_vertex(v),
        });
    }

    debug!(
        retained = survivors.iter().filter(|&&s| s).count(),
        "k-core validated"
    );
    Ok(())
}

fn check_shape(graph: &Graph, subgraph: &KCoreSubgraph) -> Result<(), KCoreViolation> {
    let edges = subgraph.sources.len();
    let weights = subgraph.weights.as_ref().map(Vec::len);
    if subgraph.destinations.len() != edges || weights.is_some_and(|w| w != edges) {
        return Err(KCoreViolation::ArrayLengths {
            sources: edges,
            destinations: subgraph.destinations.len(),
            weights,
        });
    }
    if graph.is_weighted() != weights.is_some() {
        return Err(KCoreViolation::WeightPresence {
            expected: graph.is_weighted(),
            actual: weights.is_some(),
        });
    }
    Ok(())
}

fn edge_multiset(subgraph: &KCoreSubgraph) -> Vec<(VertexId, VertexId, u64)> {
    let mut edges: Vec<_> = subgraph
        .edges()
        .map(|e| (e.source, e.destination, e.weight.to_bits()))
        .collect();
    edges.sort_unstable();
    edges
}

/// Repeatedly remove vertices whose row degree among survivors is below
/// `k`. Returns the survivor mask.
fn peel(graph: &Graph, k: u32) -> Vec<bool> {
    let n = graph.vertex_count();
    let k = k as usize;
    // Column view: for each vertex, the rows that reference it.
    let referrers = graph.transpose();
    let mut degree: Vec<usize> = (0..n).map(|v| graph.degree(v)).collect();
    let mut alive = vec![true; n];
    let mut stack: Vec<usize> = (0..n).filter(|&v| degree[v] < k).collect();

    while let Some(v) = stack.pop() {
        if !alive[v] {
            continue;
        }
        alive[v] = false;
        for &u in referrers.row(v) {
            let u = u as usize;
            if alive[u] {
                degree[u] -= 1;
                if degree[u] < k {
                    stack.push(u);
                }
            }
        }
    }
    alive
}

#[allow(clippy::cast_possible_truncation)]
const fn as_vertex(v: usize) -> VertexId {
    // Graph construction caps the vertex count at `VertexId::MAX`.
    v as VertexId
}
