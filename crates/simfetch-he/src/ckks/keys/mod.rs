//! Keys for the CKKS-style slot evaluator.

mod evaluation_key;
mod public_key;
mod relinearization_key;
mod secret_key;

pub use evaluation_key::{EvaluationKey, EvaluationKeyBuilder, RotationPrecompute};
pub use public_key::PublicKey;
pub use relinearization_key::RelinearizationKey;
pub use secret_key::SecretKey;
