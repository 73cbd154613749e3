#![forbid(unsafe_code)]
//! strata-core library.
//!
//! Compressed adjacency graphs plus the error taxonomy and configuration
//! shared by the analytics kernels.
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums carrying an [`error::ErrorCode`];
//!   `anyhow::Result` only for file-facing helpers.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod config;
pub mod error;
pub mod graph;

pub use error::{ErrorCode, GraphError};
pub use graph::{Edge, Graph, Orientation, VertexId};
