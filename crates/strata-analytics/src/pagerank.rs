//! Personalized PageRank by synchronous power iteration.
//!
//! # Overview
//!
//! PageRank scores a vertex by the stationary probability that a random
//! surfer sits on it. At each step the surfer follows an outgoing edge
//! (chosen proportionally to edge weight) with probability `alpha`, or
//! teleports with probability `1 - alpha`. Teleport targets are uniform,
//! or drawn from a personalization distribution when one is given.
//!
//! # Algorithm
//!
//! The solver reads a **transposed** graph, so row `v` lists the edges
//! flowing into `v`. With `W(u)` the total outgoing weight of `u` and `D`
//! the rank currently parked on dangling vertices (`W(u) == 0`):
//!
//! ```text
//! new[v] = alpha * Σ_{u → v} old[u] * w(u, v) / W(u)
//!        + (alpha * D + (1 - alpha)) * t[v]
//! ```
//!
//! where `t` is `1 / V` everywhere without personalization, or the
//! normalized personalization value for `v` (zero if absent). Dangling mass
//! is redistributed along `t`, so `Σ new == Σ old == 1`.
//!
//! Iteration stops when `Σ_v |new[v] - old[v]| < V * epsilon`. Running out
//! of iterations first is [`PageRankError::NonConvergence`].
//!
//! # Determinism
//!
//! `old` and `new` are separate buffers swapped after each step; a step
//! only ever reads `old`. All reductions add fixed-size chunks in index
//! order, so results do not depend on the rayon thread count.

use std::borrow::Cow;

use rayon::prelude::*;
use tracing::{debug, instrument, trace, warn};

use strata_core::config::{PageRankConfig, ParameterError};
use strata_core::error::{ErrorCode, GraphError};
use strata_core::graph::{Graph, Orientation, VertexId};

/// Elements per partial sum in the ordered reductions.
const SUM_CHUNK: usize = 4096;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a supplied probability distribution was rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DistributionIssue {
    #[error("expected {expected} entries, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("vertex {vertex} is out of range for {vertex_count} vertices")]
    VertexOutOfRange { vertex: VertexId, vertex_count: usize },

    #[error("entry {index} is negative or not finite ({value})")]
    InvalidValue { index: usize, value: f64 },

    #[error("values sum to {0}, expected a positive total")]
    NonPositiveSum(f64),
}

/// Errors returned by [`pagerank`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PageRankError {
    #[error(transparent)]
    Parameter(#[from] ParameterError),

    /// Supplied weights do not fit the graph.
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("invalid personalization: {0}")]
    InvalidPersonalization(DistributionIssue),

    #[error("invalid initial guess: {0}")]
    InvalidInitialGuess(DistributionIssue),

    /// The iteration budget ran out before the residual dropped below
    /// `V * epsilon`.
    #[error(
        "PageRank did not converge after {iterations} iterations (residual {residual:e}, threshold {threshold:e})"
    )]
    NonConvergence {
        iterations: usize,
        residual: f64,
        threshold: f64,
    },
}

impl PageRankError {
    /// Return the machine-readable error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Parameter(e) => e.code(),
            Self::Graph(e) => e.code(),
            Self::InvalidPersonalization(_) => ErrorCode::InvalidPersonalization,
            Self::InvalidInitialGuess(_) => ErrorCode::InvalidInitialGuess,
            Self::NonConvergence { .. } => ErrorCode::NonConvergence,
        }
    }
}

// ---------------------------------------------------------------------------
// Inputs and outputs
// ---------------------------------------------------------------------------

/// Sparse teleport distribution: `values[i]` is the (unnormalized) weight
/// of `vertices[i]`. Repeated vertices accumulate.
#[derive(Debug, Clone, PartialEq)]
pub struct Personalization {
    vertices: Vec<VertexId>,
    values: Vec<f64>,
}

impl Personalization {
    /// Pair up ids and values.
    ///
    /// Range and sum checks need the graph and happen in [`pagerank`].
    ///
    /// # Errors
    ///
    /// Returns [`PageRankError::InvalidPersonalization`] when the two
    /// sequences differ in length.
    pub fn new(vertices: Vec<VertexId>, values: Vec<f64>) -> Result<Self, PageRankError> {
        if vertices.len() != values.len() {
            return Err(PageRankError::InvalidPersonalization(
                DistributionIssue::LengthMismatch {
                    expected: vertices.len(),
                    actual: values.len(),
                },
            ));
        }
        Ok(Self { vertices, values })
    }

    #[must_use]
    pub fn from_pairs(pairs: &[(VertexId, f64)]) -> Self {
        let (vertices, values) = pairs.iter().copied().unzip();
        Self { vertices, values }
    }

    #[must_use]
    pub fn vertices(&self) -> &[VertexId] {
        &self.vertices
    }

    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Normalized dense teleport vector over `vertex_count` vertices.
    fn to_dense(&self, vertex_count: usize) -> Result<Vec<f64>, DistributionIssue> {
        if let Some(&vertex) = self.vertices.iter().find(|&&v| v as usize >= vertex_count) {
            return Err(DistributionIssue::VertexOutOfRange {
                vertex,
                vertex_count,
            });
        }
        let sum = checked_sum(&self.values)?;
        let mut dense = vec![0.0; vertex_count];
        for (&v, &value) in self.vertices.iter().zip(&self.values) {
            dense[v as usize] += value / sum;
        }
        Ok(dense)
    }
}

/// Optional inputs to [`pagerank`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PageRankOptions<'a> {
    /// Per-edge weights aligned with the graph's `indices`; override the
    /// graph's own weights.
    pub weights: Option<&'a [f64]>,
    pub personalization: Option<&'a Personalization>,
    /// Starting rank vector, normalized before use.
    pub initial_guess: Option<&'a [f64]>,
}

/// A converged rank vector.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRankResult {
    /// One score per vertex, summing to 1.
    pub ranks: Vec<f64>,
    /// Iterations performed, including the converging one.
    pub iterations: usize,
    /// `Σ |new - old|` of the final iteration.
    pub residual: f64,
}

// ---------------------------------------------------------------------------
// Solver
// ---------------------------------------------------------------------------

/// Compute PageRank on `graph`.
///
/// `graph` should be transposed (rows = incoming edges). A forward graph is
/// accepted and transposed internally at the cost of a copy.
///
/// # Errors
///
/// - [`PageRankError::Parameter`] for an out-of-range config.
/// - [`PageRankError::Graph`] if `options.weights` is not one-per-edge.
/// - [`PageRankError::InvalidPersonalization`] /
///   [`PageRankError::InvalidInitialGuess`] for bad distributions.
/// - [`PageRankError::NonConvergence`] when `max_iterations` runs out.
#[instrument(skip(graph, options, config), fields(vertices = graph.vertex_count(), edges = graph.edge_count()))]
pub fn pagerank(
    graph: &Graph,
    options: &PageRankOptions<'_>,
    config: &PageRankConfig,
) -> Result<PageRankResult, PageRankError> {
    config.validate()?;
    let view = transposed_view(graph, options.weights)?;
    let n = view.vertex_count();

    if n == 0 {
        return Ok(PageRankResult {
            ranks: Vec::new(),
            iterations: 0,
            residual: 0.0,
        });
    }

    let teleport = options
        .personalization
        .map(|p| p.to_dense(n))
        .transpose()
        .map_err(PageRankError::InvalidPersonalization)?;
    let mut old = initial_ranks(options.initial_guess, n)?;
    let mut new = vec![0.0_f64; n];

    let out_weight = out_weight_sums(&view);
    let dangling: Vec<usize> = (0..n).filter(|&v| out_weight[v] == 0.0).collect();
    debug!(dangling = dangling.len(), personalized = teleport.is_some(), "pagerank setup");

    let alpha = config.alpha;
    let uniform = 1.0 / n as f64;
    let threshold = n as f64 * config.epsilon;
    let indices = view.indices();
    let mut iterations = 0;

    loop {
        iterations += 1;

        let dangling_sum = ordered_sum(dangling.len(), |i| old[dangling[i]]);
        let redistributed = alpha.mul_add(dangling_sum, 1.0 - alpha);

        new.par_iter_mut().enumerate().for_each(|(v, slot)| {
            let mut incoming = 0.0;
            for e in view.edge_range(v) {
                let u = indices[e] as usize;
                let w_out = out_weight[u];
                if w_out > 0.0 {
                    incoming += old[u] * view.weight(e) / w_out;
                }
            }
            let share = teleport.as_ref().map_or(uniform, |t| t[v]);
            *slot = alpha.mul_add(incoming, redistributed * share);
        });

        let residual = ordered_sum(n, |v| (new[v] - old[v]).abs());
        trace!(iteration = iterations, residual, dangling_sum, "pagerank step");

        std::mem::swap(&mut old, &mut new);

        if residual < threshold {
            debug!(iterations, residual, "pagerank converged");
            return Ok(PageRankResult {
                ranks: old,
                iterations,
                residual,
            });
        }
        if iterations >= config.max_iterations {
            warn!(iterations, residual, threshold, "pagerank did not converge");
            return Err(PageRankError::NonConvergence {
                iterations,
                residual,
                threshold,
            });
        }
    }
}

// ---------------------------------------------------------------------------
// Warm-start cache
// ---------------------------------------------------------------------------

/// A rank vector remembered alongside the content hash of the graph it
/// was computed on.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRankCache {
    pub ranks: Vec<f64>,
    pub content_hash: String,
}

impl PageRankCache {
    #[must_use]
    pub const fn new(ranks: Vec<f64>, content_hash: String) -> Self {
        Self {
            ranks,
            content_hash,
        }
    }

    /// Remember `result`, computed on `graph`.
    #[must_use]
    pub fn from_result(result: &PageRankResult, graph: &Graph) -> Self {
        Self::new(result.ranks.clone(), graph.content_hash())
    }

    /// Whether `graph` is byte-for-byte the graph these ranks came from.
    #[must_use]
    pub fn is_valid_for(&self, graph: &Graph) -> bool {
        self.content_hash == graph.content_hash()
    }

    /// Cached ranks usable as an initial guess for `graph`: the vertex
    /// count must match, the edges may have changed.
    #[must_use]
    pub fn warm_start(&self, graph: &Graph) -> Option<&[f64]> {
        (self.ranks.len() == graph.vertex_count()).then_some(self.ranks.as_slice())
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// The graph as a transposed view, with `weights` applied if given.
fn transposed_view<'g>(
    graph: &'g Graph,
    weights: Option<&[f64]>,
) -> Result<Cow<'g, Graph>, GraphError> {
    let base = match weights {
        Some(w) => Cow::Owned(graph.with_weights(w.to_vec())?),
        None => Cow::Borrowed(graph),
    };
    match base.orientation() {
        Orientation::Transposed => Ok(base),
        Orientation::Forward => {
            warn!("pagerank received a forward graph, transposing");
            Ok(Cow::Owned(base.transpose()))
        }
    }
}

/// Normalized starting vector: the caller's guess or uniform.
fn initial_ranks(guess: Option<&[f64]>, n: usize) -> Result<Vec<f64>, PageRankError> {
    let Some(guess) = guess else {
        return Ok(vec![1.0 / n as f64; n]);
    };
    if guess.len() != n {
        return Err(PageRankError::InvalidInitialGuess(
            DistributionIssue::LengthMismatch {
                expected: n,
                actual: guess.len(),
            },
        ));
    }
    let sum = checked_sum(guess).map_err(PageRankError::InvalidInitialGuess)?;
    Ok(guess.iter().map(|&r| r / sum).collect())
}

/// Sum of non-negative finite values, rejecting anything else.
fn checked_sum(values: &[f64]) -> Result<f64, DistributionIssue> {
    if let Some(index) = values.iter().position(|v| !(v.is_finite() && *v >= 0.0)) {
        return Err(DistributionIssue::InvalidValue {
            index,
            value: values[index],
        });
    }
    let sum: f64 = values.iter().sum();
    if sum > 0.0 {
        Ok(sum)
    } else {
        Err(DistributionIssue::NonPositiveSum(sum))
    }
}

/// Total outgoing weight per vertex, read off the transposed rows.
fn out_weight_sums(view: &Graph) -> Vec<f64> {
    let mut sums = vec![0.0; view.vertex_count()];
    for (_, source, weight) in view.entries() {
        sums[source as usize] += weight;
    }
    sums
}

/// `Σ term(i)` for `i in 0..len`, grouped in fixed chunks and combined in
/// index order so the result is independent of scheduling.
fn ordered_sum<F>(len: usize, term: F) -> f64
where
    F: Fn(usize) -> f64 + Sync,
{
    let partials: Vec<f64> = (0..len.div_ceil(SUM_CHUNK))
        .into_par_iter()
        .map(|chunk| {
            let start = chunk * SUM_CHUNK;
            let end = (start + SUM_CHUNK).min(len);
            (start..end).map(&term).sum::<f64>()
        })
        .collect();
    partials.iter().sum()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
