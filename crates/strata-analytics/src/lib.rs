#![forbid(unsafe_code)]
//! strata-analytics library.
//!
//! Parallel kernels over [`strata_core::Graph`]:
//!
//! - [`coarsen`]: contract a vertex labelling into a smaller multigraph,
//!   merging parallel edges by summing their weights.
//! - [`pagerank`]: personalized PageRank by power iteration.
//! - [`kcore`]: the contract an external k-core algorithm must meet.
//!
//! # Conventions
//!
//! - **Parallelism**: `rayon` on the global pool. Results never depend on
//!   the thread count.
//! - **Errors**: one `thiserror` enum per kernel, each with `code()`.
//! - **Logging**: `tracing` spans on kernel entry points; the library never
//!   installs a subscriber.

pub mod coarsen;
pub mod kcore;
pub mod pagerank;

pub use coarsen::{Coarsened, CoarsenError, coarsen, coarsen_with};
pub use kcore::{KCoreSolver, KCoreSubgraph, KCoreViolation, validate_k_core};
pub use pagerank::{
    PageRankCache, PageRankError, PageRankOptions, PageRankResult, Personalization, pagerank,
};
