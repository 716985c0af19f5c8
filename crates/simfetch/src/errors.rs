use std::path::PathBuf;
use thiserror::Error;

/// The Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

/// Enum encapsulating all the possible errors from this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Indicates an error surfaced verbatim from the HE backend.
    #[error("{0}")]
    Backend(simfetch_he::Error),

    /// Indicates an I/O error, together with the offending path.
    #[error("{path}: {source}")]
    Io {
        /// The file that could not be read or written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Indicates an invalid instance-size argument.
    #[error("Invalid instance size: {0} (expected 0-toy, 1-small, 2-medium or 3-large)")]
    InvalidInstanceSize(usize),

    /// Indicates that a replication-tree degree is below 2.
    #[error("Tree degrees must all be at least 2")]
    DegreeTooSmall,

    /// Indicates that the tree degrees do not multiply to the pattern
    /// length.
    #[error("Tree degrees multiply to {0}, expected the pattern length {1}")]
    DegreeProductMismatch(usize, usize),

    /// Indicates an invalid input replication count.
    #[error("input_replication is {0}, must be at least 1 and divide the slot count {1}")]
    InvalidInputReplication(usize, usize),

    /// Indicates that the replication tree ended before producing the
    /// expected number of replicas.
    #[error("Not enough replicas in the tree")]
    NotEnoughReplicas,

    /// Indicates a stride that does not divide the slot count.
    #[error("Stride {0} does not divide the slot count {1}")]
    InvalidStride(usize, usize),

    /// Indicates a malformed matrix/slot reshape.
    #[error("{0}")]
    InvalidShape(String),

    /// Indicates an unexpected record count in an input file.
    #[error("{path}: expected {expected} records, found {found}")]
    RecordCountMismatch {
        /// The file with the unexpected record count.
        path: PathBuf,
        /// The number of records required by the instance parameters.
        expected: usize,
        /// The number of records found in the file.
        found: usize,
    },

    /// Indicates that a decoded payload window has no marker: a value is
    /// present but the largest slot is below the plausibility bound.
    #[error("marker not found in payload window: {0:?}")]
    MarkerNotFound(Vec<f64>),
}

impl From<simfetch_he::Error> for Error {
    fn from(e: simfetch_he::Error) -> Self {
        Error::Backend(e)
    }
}

impl Error {
    /// Wrap an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
