//! Instance parameters and the on-disk layout of the protocol.

use crate::{Error, Result};
use simfetch_he::ckks::{CkksParameters, CkksParametersBuilder};
use simfetch_util::div_ceil;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The multiplicative depth every instance registers at key generation.
pub const MULTIPLICATIVE_DEPTH: usize = 23;

/// The level budget of the running-sums procedure inside the compaction
/// stage.
pub const RUNNING_SUM_LEVELS: usize = 3;

/// Payload slots contain numbers in the range [0, MAX_PAYLOAD_VAL) with a
/// precision of 1/PAYLOAD_PRECISION.
pub const MAX_PAYLOAD_VAL: i64 = 256;

/// Reciprocal of the payload precision.
pub const PAYLOAD_PRECISION: i64 = 16;

/// The dimension of the payload vectors, marker slot included.
pub const PAYLOAD_DIM: usize = 8;

/// The marker value prepended to every payload record before encryption.
pub const PAYLOAD_MARKER: i64 = 2 * MAX_PAYLOAD_VAL * PAYLOAD_PRECISION;

/// Payload rows are encrypted deep in the level chain so their single
/// multiplication happens after most levels are already consumed. Tied to
/// [`MULTIPLICATIVE_DEPTH`]; revisit one when changing the other.
pub const PAYLOAD_ENCRYPTION_LEVEL: usize = 20;

/// The similarity threshold of the protocol.
pub const MATCH_THRESHOLD: f64 = 0.8;

/// The benchmark instance sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceSize {
    /// 1 000 records of dimension 128, ring dimension 1024.
    Toy,
    /// 50 000 records of dimension 128.
    Small,
    /// 1 000 000 records of dimension 256.
    Medium,
    /// 20 000 000 records of dimension 512.
    Large,
}

impl TryFrom<usize> for InstanceSize {
    type Error = Error;

    fn try_from(value: usize) -> Result<Self> {
        match value {
            0 => Ok(InstanceSize::Toy),
            1 => Ok(InstanceSize::Small),
            2 => Ok(InstanceSize::Medium),
            3 => Ok(InstanceSize::Large),
            _ => Err(Error::InvalidInstanceSize(value)),
        }
    }
}

impl fmt::Display for InstanceSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstanceSize::Toy => "toy",
            InstanceSize::Small => "small",
            InstanceSize::Medium => "medium",
            InstanceSize::Large => "large",
        };
        write!(f, "{name}")
    }
}

/// Parameters that differ between instance sizes, together with the root of
/// the directory structure holding datasets, keys and ciphertexts.
///
/// There are no setters; once constructed the parameters cannot change.
#[derive(Debug, Clone)]
pub struct InstanceParams {
    size: InstanceSize,
    record_dim: usize,
    db_size: usize,
    ring_dim: usize,
    degrees: Vec<usize>,
    root: PathBuf,
}

impl InstanceParams {
    /// Parameters for an instance size, rooted at the current directory.
    pub fn new(size: InstanceSize) -> Self {
        Self::with_root(size, PathBuf::from("."))
    }

    /// Parameters for an instance size, rooted at an explicit directory.
    pub fn with_root(size: InstanceSize, root: impl Into<PathBuf>) -> Self {
        let (record_dim, db_size) = match size {
            InstanceSize::Toy => (128, 1_000),
            InstanceSize::Small => (128, 50_000),
            InstanceSize::Medium => (256, 1_000_000),
            InstanceSize::Large => (512, 20_000_000),
        };
        let ring_dim = match size {
            InstanceSize::Toy => 1 << 10,
            _ => 1 << 16,
        };
        // The degrees fix the shape of the slot-replication tree; they must
        // multiply to the record dimension. The best shape depends on the
        // platform, these are reasonable fixed choices per size.
        let degrees = match size {
            InstanceSize::Large => vec![16, 8, 4],
            InstanceSize::Medium => vec![8, 8, 4],
            _ => vec![8, 4, 4],
        };
        Self {
            size,
            record_dim,
            db_size,
            ring_dim,
            degrees,
            root: root.into(),
        }
    }

    /// The instance size.
    pub fn size(&self) -> InstanceSize {
        self.size
    }

    /// Dimension of one dataset record (and of the query).
    pub fn record_dim(&self) -> usize {
        self.record_dim
    }

    /// Number of records in the dataset.
    pub fn db_size(&self) -> usize {
        self.db_size
    }

    /// Dimension of the FHE ring.
    pub fn ring_dim(&self) -> usize {
        self.ring_dim
    }

    /// The replication-tree degrees, root first.
    pub fn degrees(&self) -> &[usize] {
        &self.degrees
    }

    /// Number of plaintext slots per ciphertext.
    pub fn num_slots(&self) -> usize {
        self.ring_dim / 2
    }

    /// Number of ciphertexts needed to hold one column of the dataset.
    pub fn num_batches(&self) -> usize {
        div_ceil(self.db_size, self.num_slots())
    }

    /// Each ciphertext is viewed as a matrix with 64 rows; this is the
    /// number of its columns.
    pub fn num_cols(&self) -> usize {
        self.ring_dim / 128
    }

    /// Each payload takes [`PAYLOAD_DIM`] slots and a column holds 64
    /// slots, so a column holds at most this many matches.
    pub fn max_matches(&self) -> usize {
        64 / PAYLOAD_DIM
    }

    /// Dataset rows are multiplied by replicated ciphertexts which have
    /// consumed one level per tree degree, so they are encrypted one level
    /// above that to save space.
    pub fn row_encryption_level(&self) -> usize {
        self.degrees.len() - 1
    }

    /// The CKKS parameters of this instance.
    pub fn ckks_parameters(&self) -> Result<Arc<CkksParameters>> {
        Ok(CkksParametersBuilder::new()
            .set_ring_dimension(self.ring_dim)
            .set_multiplicative_depth(MULTIPLICATIVE_DEPTH)
            .build_arc()?)
    }

    /// Root of the directory structure.
    pub fn root_dir(&self) -> &Path {
        &self.root
    }

    /// I/O directory of this instance (keys and ciphertexts).
    pub fn io_dir(&self) -> PathBuf {
        self.root.join("io").join(self.size.to_string())
    }

    /// Directory holding the serialized context and keys.
    pub fn key_dir(&self) -> PathBuf {
        self.io_dir().join("keys")
    }

    /// Directory holding the encrypted query, dataset batches and results.
    pub fn enc_dir(&self) -> PathBuf {
        self.io_dir().join("encrypted")
    }

    /// Directory holding the cleartext dataset files.
    pub fn data_dir(&self) -> PathBuf {
        self.root.join("datasets").join(self.size.to_string())
    }
}
