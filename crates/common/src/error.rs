use std::fmt;
use std::path::PathBuf;

/// TvRec error types
#[derive(Debug, thiserror::Error)]
pub enum TvRecError {
    /// Store artifacts absent at every candidate location
    #[error("{}", MissingArtifactDisplay(.tried))]
    MissingArtifact { tried: Vec<PathBuf> },

    /// Metadata length disagrees with vector row count
    #[error("metadata length ({records}) does not match embedding row count ({rows})")]
    CountMismatch { records: usize, rows: usize },

    /// Query dimension disagrees with store dimension
    #[error("dimension mismatch: store has dimension {expected}, query has dimension {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// Non-positive K
    #[error("invalid k: {0} (must be at least 1)")]
    InvalidK(i64),

    /// Row with a different width than the first row
    #[error("row {row} has dimension {found}, expected {expected}")]
    RaggedRows {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// Vector that is not unit length
    #[error("row {row} is not L2-normalized (norm = {norm})")]
    NotNormalized { row: usize, norm: f32 },

    /// Manifest disagrees with the artifacts on disk
    #[error("integrity check failed for {path}: {detail}")]
    IntegrityMismatch { path: PathBuf, detail: String },

    /// Embedding provider error
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Network/HTTP error
    #[error("Network error: {0}")]
    Network(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

struct MissingArtifactDisplay<'a>(&'a [PathBuf]);

impl fmt::Display for MissingArtifactDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vector store artifacts not found. Tried:")?;
        for path in self.0 {
            write!(f, "\n- {}", path.display())?;
        }
        Ok(())
    }
}

impl TvRecError {
    /// Create embedding error
    pub fn embedding<S: Into<String>>(msg: S) -> Self {
        Self::Embedding(msg.into())
    }

    /// Create network error
    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::Network(msg.into())
    }

    /// Create config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create serialization error
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        Self::Serialization(msg.into())
    }

    /// Whether the error only concerns a single query.
    ///
    /// Query errors leave a loaded store usable; everything else is fatal
    /// to the operation that produced it.
    pub fn is_query_error(&self) -> bool {
        matches!(
            self,
            Self::DimensionMismatch { .. } | Self::InvalidK(_) | Self::InvalidInput(_)
        )
    }
}
