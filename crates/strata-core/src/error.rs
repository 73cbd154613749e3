use std::fmt;

/// Machine-readable error codes shared by every strata crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    MalformedGraph,
    LabelCountMismatch,
    InvalidParameter,
    InvalidPersonalization,
    InvalidInitialGuess,
    NonConvergence,
    KCoreViolation,
    ConfigParseError,
    InterchangeIo,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::MalformedGraph => "E1001",
            Self::LabelCountMismatch => "E1002",
            Self::InvalidParameter => "E2001",
            Self::InvalidPersonalization => "E2002",
            Self::InvalidInitialGuess => "E2003",
            Self::NonConvergence => "E3001",
            Self::KCoreViolation => "E4001",
            Self::ConfigParseError => "E5001",
            Self::InterchangeIo => "E5002",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::MalformedGraph => "Malformed graph arrays",
            Self::LabelCountMismatch => "Label assignment does not cover every vertex",
            Self::InvalidParameter => "Invalid solver parameter",
            Self::InvalidPersonalization => "Invalid personalization distribution",
            Self::InvalidInitialGuess => "Invalid initial guess",
            Self::NonConvergence => "PageRank did not converge",
            Self::KCoreViolation => "K-core result violates the core contract",
            Self::ConfigParseError => "Config file parse error",
            Self::InterchangeIo => "Graph interchange read/write failed",
        }
    }

    /// Optional remediation hint that can be surfaced to callers.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::MalformedGraph => Some(
                "Offsets must start at 0, be non-decreasing, end at the edge count; indices must be < vertex count.",
            ),
            Self::LabelCountMismatch => Some("Supply exactly one label per vertex."),
            Self::InvalidParameter => {
                Some("Use alpha in (0, 1), a positive finite epsilon, and max_iterations >= 1.")
            }
            Self::InvalidPersonalization => {
                Some("Personalization ids must be in range and values must sum to a positive number.")
            }
            Self::InvalidInitialGuess => {
                Some("The initial guess needs one non-negative entry per vertex with a positive sum.")
            }
            Self::NonConvergence => Some("Raise max_iterations or loosen epsilon."),
            Self::KCoreViolation => None,
            Self::ConfigParseError => Some("Fix the TOML syntax in the analytics config and retry."),
            Self::InterchangeIo => Some("Check the file path, permissions, and JSON contents."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Violations of the compressed adjacency invariants, detected at
/// [`Graph`](crate::graph::Graph) construction.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    /// `offsets` must hold at least the leading zero.
    #[error("offsets array is empty: expected vertex_count + 1 entries")]
    EmptyOffsets,

    /// `offsets[0]` was not zero.
    #[error("offsets must start at 0, found {0}")]
    OffsetsStart(usize),

    /// `offsets` decreased between two consecutive vertices.
    #[error("offsets decrease at vertex {vertex}: {start} > {end}")]
    NonMonotonicOffsets { vertex: usize, start: usize, end: usize },

    /// The last offset disagrees with the number of stored edges.
    #[error("offsets end at {last} but {edges} edges are stored")]
    OffsetsEnd { last: usize, edges: usize },

    /// An adjacency entry names a vertex outside `[0, V)`.
    #[error("edge {edge} references vertex {vertex}, but the graph has {vertex_count} vertices")]
    IndexOutOfRange {
        edge: usize,
        vertex: u64,
        vertex_count: usize,
    },

    /// The weight array is not one-per-edge.
    #[error("weights length {weights} does not match edge count {edges}")]
    WeightsLength { weights: usize, edges: usize },

    /// Weights must be finite and non-negative.
    #[error("edge {edge} has weight {weight}, expected a finite non-negative value")]
    InvalidWeight { edge: usize, weight: f64 },

    /// Vertex count does not fit the vertex id type.
    #[error("vertex count {0} exceeds the vertex id range")]
    TooManyVertices(usize),
}

impl GraphError {
    /// Return the machine-readable error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::MalformedGraph
    }
}
