//! Ciphertext type for the CKKS-style slot evaluator.

use crate::ckks::CkksParameters;
use crate::traits::{DeserializeParametrized, Serialize};
use crate::{Error, Result};
use std::sync::Arc;

/// A ciphertext carrying `num_slots` real slots.
///
/// The `level` field counts the multiplicative levels consumed so far; it
/// may never exceed the depth fixed by the parameters. `num_polys` is 2 for
/// a linear ciphertext and 3 after a ciphertext-ciphertext product that has
/// not been relinearized yet.
#[derive(Debug, Clone, PartialEq)]
pub struct Ciphertext {
    pub(crate) par: Arc<CkksParameters>,
    pub(crate) slots: Vec<f64>,
    pub(crate) level: usize,
    pub(crate) num_polys: usize,
}

impl Ciphertext {
    /// Generate the zero ciphertext, usable as the initial value of an
    /// accumulator.
    pub fn zero(par: &Arc<CkksParameters>) -> Self {
        Self {
            par: par.clone(),
            slots: Vec::new(),
            level: 0,
            num_polys: 2,
        }
    }

    /// Whether this is the empty accumulator ciphertext.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The level (number of multiplicative levels consumed).
    pub const fn level(&self) -> usize {
        self.level
    }

    /// Whether the ciphertext is linear (no pending tensor product).
    pub const fn is_linear(&self) -> bool {
        self.num_polys == 2
    }

    /// The parameters this ciphertext was created under.
    pub const fn parameters(&self) -> &Arc<CkksParameters> {
        &self.par
    }
}

/// On-disk representation; the parameters are provided at deserialization.
#[derive(serde::Serialize, serde::Deserialize)]
struct CiphertextRep {
    slots: Vec<f64>,
    level: usize,
    num_polys: usize,
}

impl Serialize for Ciphertext {
    fn to_bytes(&self) -> Vec<u8> {
        let rep = CiphertextRep {
            slots: self.slots.clone(),
            level: self.level,
            num_polys: self.num_polys,
        };
        bincode::serialize(&rep).expect("ciphertext serialization")
    }
}

impl DeserializeParametrized for Ciphertext {
    type Error = Error;

    fn from_bytes(bytes: &[u8], par: &Arc<CkksParameters>) -> Result<Self> {
        let rep: CiphertextRep =
            bincode::deserialize(bytes).map_err(|_| Error::SerializationError)?;
        if rep.slots.len() != par.num_slots() {
            return Err(Error::SerializationError);
        }
        if rep.level > par.max_level() {
            return Err(Error::LevelOutOfBounds(rep.level, par.max_level()));
        }
        if rep.num_polys != 2 && rep.num_polys != 3 {
            return Err(Error::SerializationError);
        }
        Ok(Self {
            par: par.clone(),
            slots: rep.slots,
            level: rep.level,
            num_polys: rep.num_polys,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::ckks::{CkksParametersBuilder, Plaintext, PublicKey, SecretKey};
    use crate::{DeserializeParametrized, Serialize};
    use rand::thread_rng;
    use std::error::Error;

    #[test]
    fn serialize() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        let par = CkksParametersBuilder::new()
            .set_ring_dimension(64)
            .set_multiplicative_depth(5)
            .build_arc()?;
        let sk = SecretKey::random(&par, &mut rng);
        let pk = PublicKey::new(&sk);

        let values = (0..32).map(|i| i as f64 / 7.0).collect::<Vec<_>>();
        let pt = Plaintext::try_encode(&values, 2, &par)?;
        let ct = pk.try_encrypt(&pt)?;

        let bytes = ct.to_bytes();
        assert_eq!(super::Ciphertext::from_bytes(&bytes, &par)?, ct);
        Ok(())
    }

    #[test]
    fn deserialize_checks_slot_count() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        let par = CkksParametersBuilder::new()
            .set_ring_dimension(64)
            .set_multiplicative_depth(5)
            .build_arc()?;
        let other = CkksParametersBuilder::new()
            .set_ring_dimension(128)
            .set_multiplicative_depth(5)
            .build_arc()?;
        let sk = SecretKey::random(&par, &mut rng);
        let pk = PublicKey::new(&sk);
        let pt = Plaintext::try_encode(&[1.0], 0, &par)?;
        let ct = pk.try_encrypt(&pt)?;

        assert!(super::Ciphertext::from_bytes(&ct.to_bytes(), &other).is_err());
        Ok(())
    }
}
