//! Compressed adjacency graph representation.
//!
//! # Overview
//!
//! [`Graph`] is the one data structure every strata kernel reads. It is
//! validated once on construction and immutable afterwards, so it can be
//! shared between any number of concurrent readers without locking.
//!
//! ## Pipeline
//!
//! ```text
//! external loader (offsets, indices, weights?)
//!        ↓  csr::Graph::new()            (validates the CSR invariants)
//! Graph (Forward or Transposed)
//!        ├─ coarsening reads Forward rows
//!        └─ PageRank reads Transposed rows (csr::Graph::transpose())
//! ```
//!
//! ## Interchange
//!
//! [`interchange`] defines the serde layout. Decoding goes through
//! `TryFrom<GraphRecord>`, so persisted graphs are re-validated on load.
//!
//! ## Typical Usage
//!
//! ```rust
//! use strata_core::graph::{Edge, Graph, GraphStats, Orientation};
//!
//! let g = Graph::from_edges(
//!     3,
//!     &[Edge::unit(0, 1), Edge::unit(1, 2), Edge::unit(2, 0)],
//!     false,
//!     Orientation::Forward,
//! )?;
//! let stats = GraphStats::from_graph(&g);
//! assert_eq!(stats.edge_count, 3);
//! # Ok::<(), strata_core::error::GraphError>(())
//! ```

pub mod csr;
pub mod interchange;
pub mod interop;
pub mod stats;

// Re-export primary types at module level for convenience.
pub use csr::{Edge, Graph, Orientation, VertexId};
pub use interchange::{GraphRecord, load_json, save_json};
pub use stats::GraphStats;
