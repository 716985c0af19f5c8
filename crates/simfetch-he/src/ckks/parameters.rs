//! Create parameters for the CKKS-style slot evaluator.

use crate::traits::{Deserialize, Serialize};
use crate::{Error, Result};
use std::sync::Arc;

/// Parameters of the slot evaluator.
///
/// The parameters fix the ring dimension (and hence the number of real
/// slots packed into one ciphertext) and the multiplicative depth that
/// ciphertexts may consume. All objects created under one set of parameters
/// hold a shared `Arc` to it; mixing objects from different parameter sets
/// is a programming error.
#[derive(Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CkksParameters {
    ring_dim: usize,
    max_level: usize,
}

impl CkksParameters {
    /// Returns the ring dimension.
    pub const fn ring_dimension(&self) -> usize {
        self.ring_dim
    }

    /// Returns the number of real slots packed in one ciphertext.
    pub const fn num_slots(&self) -> usize {
        self.ring_dim / 2
    }

    /// Returns the maximum level allowed by these parameters, i.e. the
    /// multiplicative depth.
    pub const fn max_level(&self) -> usize {
        self.max_level
    }
}

impl Serialize for CkksParameters {
    fn to_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).expect("parameters serialization")
    }
}

impl Deserialize for CkksParameters {
    type Error = Error;

    fn try_deserialize(bytes: &[u8]) -> Result<Self> {
        let par: CkksParameters =
            bincode::deserialize(bytes).map_err(|_| Error::SerializationError)?;
        // Re-validate, the bytes may come from an untrusted file.
        CkksParametersBuilder::new()
            .set_ring_dimension(par.ring_dim)
            .set_multiplicative_depth(par.max_level)
            .build()
    }
}

/// Builder for [`CkksParameters`].
#[derive(Debug, Default)]
pub struct CkksParametersBuilder {
    ring_dim: usize,
    max_level: usize,
}

impl CkksParametersBuilder {
    /// Creates a new builder with no parameter specified.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the ring dimension; the number of slots is half of it.
    pub fn set_ring_dimension(mut self, ring_dim: usize) -> Self {
        self.ring_dim = ring_dim;
        self
    }

    /// Sets the multiplicative depth.
    pub fn set_multiplicative_depth(mut self, depth: usize) -> Self {
        self.max_level = depth;
        self
    }

    /// Build the parameters, validating them.
    pub fn build(self) -> Result<CkksParameters> {
        if self.ring_dim < 16 || !self.ring_dim.is_power_of_two() {
            return Err(Error::InvalidRingDimension(self.ring_dim));
        }
        if self.max_level == 0 || self.max_level > 64 {
            return Err(Error::InvalidDepth(self.max_level));
        }
        Ok(CkksParameters {
            ring_dim: self.ring_dim,
            max_level: self.max_level,
        })
    }

    /// Build the parameters inside an `Arc`.
    pub fn build_arc(self) -> Result<Arc<CkksParameters>> {
        self.build().map(Arc::new)
    }
}
