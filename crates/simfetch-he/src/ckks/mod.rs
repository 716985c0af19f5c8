//! The CKKS-style slot lattice: parameters, plaintexts, ciphertexts, keys
//! and slot-wise operations.

mod chebyshev;
mod ciphertext;
mod ops;
mod parameters;
mod plaintext;

pub mod keys;

pub use chebyshev::{chebyshev_coefficients, chebyshev_depth, eval_chebyshev_function};
pub use ciphertext::Ciphertext;
pub use keys::{
    EvaluationKey, EvaluationKeyBuilder, PublicKey, RelinearizationKey, RotationPrecompute,
    SecretKey,
};
pub use parameters::{CkksParameters, CkksParametersBuilder};
pub use plaintext::Plaintext;
