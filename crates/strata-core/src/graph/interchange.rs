//! Persisted / transport layout for graphs.
//!
//! The interchange layout is the raw triple `(offsets, indices, weights?)`
//! plus the orientation flag. [`Graph`] serializes through [`GraphRecord`]
//! and deserializes with `try_from`, so any decoder (JSON here, or any
//! other serde format) re-validates the CSR invariants before a `Graph`
//! exists.

use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ErrorCode, GraphError};
use crate::graph::csr::{Graph, Orientation, VertexId};

/// Serde shape of a [`Graph`]. Lossless: weights are stored as `f64`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphRecord {
    pub orientation: Orientation,
    pub offsets: Vec<usize>,
    pub indices: Vec<VertexId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<Vec<f64>>,
}

impl TryFrom<GraphRecord> for Graph {
    type Error = GraphError;

    fn try_from(record: GraphRecord) -> Result<Self, Self::Error> {
        Self::new(
            record.offsets,
            record.indices,
            record.weights,
            record.orientation,
        )
    }
}

impl From<Graph> for GraphRecord {
    fn from(graph: Graph) -> Self {
        let (offsets, indices, weights, orientation) = graph.into_parts();
        Self {
            orientation,
            offsets,
            indices,
            weights,
        }
    }
}

/// Write `graph` to `path` as JSON.
///
/// # Errors
///
/// Fails if the file cannot be created, written, or flushed.
pub fn save_json(graph: &Graph, path: &Path) -> Result<()> {
    let code = ErrorCode::InterchangeIo;
    let file = std::fs::File::create(path)
        .with_context(|| format!("{code}: failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, graph)
        .with_context(|| format!("{code}: failed to write graph to {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("{code}: failed to flush {}", path.display()))?;
    debug!(
        path = %path.display(),
        vertices = graph.vertex_count(),
        edges = graph.edge_count(),
        "graph saved"
    );
    Ok(())
}

/// Read a graph previously written by [`save_json`], re-validating it.
///
/// # Errors
///
/// Fails if the file cannot be read, is not valid JSON, or describes a
/// malformed graph.
pub fn load_json(path: &Path) -> Result<Graph> {
    let code = ErrorCode::InterchangeIo;
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("{code}: failed to read {}", path.display()))?;
    let graph: Graph = serde_json::from_str(&content)
        .with_context(|| format!("{code}: failed to parse graph from {}", path.display()))?;
    debug!(
        path = %path.display(),
        vertices = graph.vertex_count(),
        edges = graph.edge_count(),
        "graph loaded"
    );
    Ok(graph)
}
