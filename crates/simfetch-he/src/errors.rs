use thiserror::Error;

/// The Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

/// Enum encapsulating all the possible errors from this library.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Indicates a serialization error.
    #[error("Serialization error")]
    SerializationError,

    /// Indicates that the ring dimension is invalid.
    #[error("Invalid ring dimension: {0} is not a power of 2 larger than 16")]
    InvalidRingDimension(usize),

    /// Indicates that the multiplicative depth is invalid.
    #[error("Invalid multiplicative depth: {0}")]
    InvalidDepth(usize),

    /// Indicates that too many values were provided.
    #[error("Too many values provided: {0} exceeds the slot count {1}")]
    TooManyValues(usize, usize),

    /// Indicates that a level is beyond the multiplicative depth.
    #[error("Level {0} exceeds the multiplicative depth {1}")]
    LevelOutOfBounds(usize, usize),

    /// Indicates that no automorphism key was generated for a rotation.
    #[error("No automorphism key for rotation by {0}")]
    MissingRotationKey(i64),

    /// Indicates that no row-sum key was generated for a row size.
    #[error("No row-sum key for row size {0}")]
    MissingRowSumKey(usize),

    /// Indicates that the evaluation key does not support inner sums.
    #[error("This key does not support the inner sum functionality")]
    InnerSumNotSupported,

    /// Indicates that a ciphertext holds a tensor product awaiting
    /// relinearization.
    #[error("The ciphertext is not linear; relinearize it first")]
    NonLinearCiphertext,

    /// Indicates an unusable interpolation degree.
    #[error("Unsupported Chebyshev degree: {0}")]
    UnsupportedDegree(usize),

    /// Indicates that a rotation amount is invalid for these parameters.
    #[error("Invalid rotation amount: {0}")]
    InvalidRotation(i64),

    /// Indicates that a row size is invalid for these parameters.
    #[error("Invalid row size: {0}")]
    InvalidRowSize(usize),
}
