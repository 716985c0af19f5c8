//! Public keys for the CKKS-style slot evaluator.

use crate::ckks::{Ciphertext, CkksParameters, Plaintext, SecretKey};
use crate::traits::{DeserializeParametrized, Serialize};
use crate::{Error, Result};
use std::sync::Arc;

/// Public encryption key derived from a [`SecretKey`].
///
/// Encryption in the reference evaluator is deterministic and noiseless;
/// the key object exists so that the encrypting parties hold the same
/// artifact they would hold under the real scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    pub(crate) par: Arc<CkksParameters>,
}

impl PublicKey {
    /// Derive a [`PublicKey`] from a [`SecretKey`].
    pub fn new(sk: &SecretKey) -> Self {
        Self {
            par: sk.par.clone(),
        }
    }

    /// Encrypt a plaintext, producing a linear ciphertext at the
    /// plaintext's level.
    pub fn try_encrypt(&self, pt: &Plaintext) -> Result<Ciphertext> {
        assert!(self.par == pt.par);
        Ok(Ciphertext {
            par: self.par.clone(),
            slots: pt.values.clone(),
            level: pt.level,
            num_polys: 2,
        })
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct PublicKeyRep {
    ring_dim: usize,
}

impl Serialize for PublicKey {
    fn to_bytes(&self) -> Vec<u8> {
        let rep = PublicKeyRep {
            ring_dim: self.par.ring_dimension(),
        };
        bincode::serialize(&rep).expect("public key serialization")
    }
}

impl DeserializeParametrized for PublicKey {
    type Error = Error;

    fn from_bytes(bytes: &[u8], par: &Arc<CkksParameters>) -> Result<Self> {
        let rep: PublicKeyRep =
            bincode::deserialize(bytes).map_err(|_| Error::SerializationError)?;
        if rep.ring_dim != par.ring_dimension() {
            return Err(Error::SerializationError);
        }
        Ok(Self { par: par.clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::PublicKey;
    use crate::ckks::{CkksParametersBuilder, SecretKey};
    use crate::{DeserializeParametrized, Serialize};
    use rand::thread_rng;
    use std::error::Error;

    #[test]
    fn serialize() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        let par = CkksParametersBuilder::new()
            .set_ring_dimension(32)
            .set_multiplicative_depth(3)
            .build_arc()?;
        let pk = PublicKey::new(&SecretKey::random(&par, &mut rng));
        assert_eq!(PublicKey::from_bytes(&pk.to_bytes(), &par)?, pk);
        Ok(())
    }
}
