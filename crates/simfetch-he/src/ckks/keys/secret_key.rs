//! Secret keys for the CKKS-style slot evaluator.

use crate::ckks::{Ciphertext, CkksParameters, Plaintext};
use crate::traits::{DeserializeParametrized, Serialize};
use crate::{Error, Result};
use rand::{CryptoRng, Rng, RngCore};
use std::sync::Arc;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Secret key: a random ternary polynomial.
///
/// The reference evaluator never mixes the key into the slot values, but
/// the key object is required to decrypt and to derive every other key, so
/// the possession discipline of the real scheme is preserved.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SecretKey {
    pub(crate) par: Arc<CkksParameters>,
    pub(crate) s_coefficients: Box<[i8]>,
}

impl Zeroize for SecretKey {
    fn zeroize(&mut self) {
        self.s_coefficients.zeroize();
    }
}

impl ZeroizeOnDrop for SecretKey {}

impl SecretKey {
    /// Generate a random [`SecretKey`].
    pub fn random<R: RngCore + CryptoRng>(par: &Arc<CkksParameters>, rng: &mut R) -> Self {
        let s_coefficients = (0..par.ring_dimension())
            .map(|_| rng.gen_range(-1i8..=1))
            .collect::<Vec<_>>();
        Self {
            par: par.clone(),
            s_coefficients: s_coefficients.into_boxed_slice(),
        }
    }

    /// Decrypt a ciphertext into a plaintext. The ciphertext must be
    /// linear; a pending tensor product has no decryption under the key
    /// alone.
    pub fn try_decrypt(&self, ct: &Ciphertext) -> Result<Plaintext> {
        assert!(self.par == ct.par);
        if !ct.is_linear() {
            return Err(Error::NonLinearCiphertext);
        }
        Ok(Plaintext {
            par: self.par.clone(),
            values: ct.slots.clone(),
            level: ct.level,
        })
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct SecretKeyRep {
    coeffs: Vec<i8>,
}

impl Serialize for SecretKey {
    fn to_bytes(&self) -> Vec<u8> {
        let rep = SecretKeyRep {
            coeffs: self.s_coefficients.to_vec(),
        };
        bincode::serialize(&rep).expect("secret key serialization")
    }
}

impl DeserializeParametrized for SecretKey {
    type Error = Error;

    fn from_bytes(bytes: &[u8], par: &Arc<CkksParameters>) -> Result<Self> {
        let rep: SecretKeyRep =
            bincode::deserialize(bytes).map_err(|_| Error::SerializationError)?;
        if rep.coeffs.len() != par.ring_dimension() {
            return Err(Error::SerializationError);
        }
        Ok(Self {
            par: par.clone(),
            s_coefficients: rep.coeffs.into_boxed_slice(),
        })
    }
}
