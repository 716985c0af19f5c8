//! Evaluation keys for the CKKS-style slot evaluator.

use crate::ckks::{Ciphertext, CkksParameters, SecretKey};
use crate::traits::{DeserializeParametrized, Serialize};
use crate::{Error, Result};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Evaluation key for the slot evaluator.
///
/// An evaluation key enables one or several of the following operations:
/// - cyclic slot rotation, one automorphism key per registered amount
///   (positive amounts rotate left, negative amounts rotate right);
/// - hoisted rotations, reusing one precomputation of a source ciphertext
///   across several rotation amounts;
/// - inner sum of all slots;
/// - row sums, summing the interleaved blocks of a fixed row size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationKey {
    par: Arc<CkksParameters>,
    rotations: BTreeSet<i64>,
    inner_sum: bool,
    row_sums: BTreeSet<usize>,
}

/// The reusable part of a hoisted rotation: the digit decomposition of one
/// source ciphertext, computed once and shared by all rotation amounts.
#[derive(Debug, Clone)]
pub struct RotationPrecompute {
    slots: Vec<f64>,
}

fn rotate_slots(slots: &[f64], amount: i64) -> Vec<f64> {
    let n = slots.len() as i64;
    (0..n)
        .map(|i| slots[(i + amount).rem_euclid(n) as usize])
        .collect()
}

impl EvaluationKey {
    /// Reports whether the key enables rotation by this amount.
    pub fn supports_rotation_by(&self, amount: i64) -> bool {
        self.rotations.contains(&amount)
    }

    /// Homomorphically rotate the slots: positive amounts rotate left
    /// (slot i receives former slot i + amount), negative amounts rotate
    /// right.
    pub fn rotates_by(&self, ct: &Ciphertext, amount: i64) -> Result<Ciphertext> {
        assert!(self.par == ct.par);
        if !self.supports_rotation_by(amount) {
            return Err(Error::MissingRotationKey(amount));
        }
        Ok(Ciphertext {
            par: ct.par.clone(),
            slots: rotate_slots(&ct.slots, amount),
            level: ct.level,
            num_polys: ct.num_polys,
        })
    }

    /// Precompute the digit decomposition of `ct`, to be reused across
    /// several rotations of the same source.
    pub fn fast_rotation_precompute(&self, ct: &Ciphertext) -> RotationPrecompute {
        assert!(self.par == ct.par);
        RotationPrecompute {
            slots: ct.slots.clone(),
        }
    }

    /// Rotate using a hoisted precomputation of the same source ciphertext.
    pub fn fast_rotates_by(
        &self,
        ct: &Ciphertext,
        amount: i64,
        precomp: &RotationPrecompute,
    ) -> Result<Ciphertext> {
        assert!(self.par == ct.par);
        debug_assert_eq!(precomp.slots, ct.slots);
        if !self.supports_rotation_by(amount) {
            return Err(Error::MissingRotationKey(amount));
        }
        Ok(Ciphertext {
            par: ct.par.clone(),
            slots: rotate_slots(&precomp.slots, amount),
            level: ct.level,
            num_polys: ct.num_polys,
        })
    }

    /// Reports whether the key enables inner sums.
    pub fn supports_inner_sum(&self) -> bool {
        self.inner_sum
    }

    /// Computes the homomorphic inner sum: every slot of the output holds
    /// the sum of all input slots.
    pub fn computes_inner_sum(&self, ct: &Ciphertext) -> Result<Ciphertext> {
        assert!(self.par == ct.par);
        if !self.supports_inner_sum() {
            return Err(Error::InnerSumNotSupported);
        }
        let mut out = ct.clone();
        let mut i = 1;
        while i < self.par.num_slots() {
            let rotated = rotate_slots(&out.slots, i as i64);
            out.slots
                .iter_mut()
                .zip(rotated.iter())
                .for_each(|(a, b)| *a += b);
            i *= 2;
        }
        Ok(out)
    }

    /// Reports whether the key enables row sums for this row size.
    pub fn supports_row_sums(&self, row_size: usize) -> bool {
        self.row_sums.contains(&row_size)
    }

    /// Sums the `num_slots / row_size` interleaved blocks of size
    /// `row_size`: output slot s holds the sum of input slots s, s +
    /// row_size, s + 2·row_size, ... (cyclically).
    pub fn computes_row_sums(&self, ct: &Ciphertext, row_size: usize) -> Result<Ciphertext> {
        assert!(self.par == ct.par);
        if !self.supports_row_sums(row_size) {
            return Err(Error::MissingRowSumKey(row_size));
        }
        let num_blocks = self.par.num_slots() / row_size;
        let mut out = ct.clone();
        for t in (0..num_blocks.ilog2()).rev() {
            let rotated = rotate_slots(&out.slots, (row_size as i64) << t);
            out.slots
                .iter_mut()
                .zip(rotated.iter())
                .for_each(|(a, b)| *a += b);
        }
        Ok(out)
    }
}

/// Builder for an [`EvaluationKey`] from the secret key.
#[derive(Debug)]
pub struct EvaluationKeyBuilder {
    par: Arc<CkksParameters>,
    rotations: BTreeSet<i64>,
    inner_sum: bool,
    row_sums: BTreeSet<usize>,
}

impl EvaluationKeyBuilder {
    /// Creates a new builder from the [`SecretKey`].
    pub fn new(sk: &SecretKey) -> Self {
        Self {
            par: sk.par.clone(),
            rotations: BTreeSet::new(),
            inner_sum: false,
            row_sums: BTreeSet::new(),
        }
    }

    /// Register an automorphism key for one rotation amount.
    pub fn enable_rotation(mut self, amount: i64) -> Result<Self> {
        let n = self.par.num_slots() as i64;
        if amount == 0 || amount <= -n || amount >= n {
            return Err(Error::InvalidRotation(amount));
        }
        self.rotations.insert(amount);
        Ok(self)
    }

    /// Register automorphism keys for several rotation amounts.
    pub fn enable_rotations<I: IntoIterator<Item = i64>>(mut self, amounts: I) -> Result<Self> {
        for amount in amounts {
            self = self.enable_rotation(amount)?;
        }
        Ok(self)
    }

    /// Enable the inner-sum functionality.
    pub fn enable_inner_sum(mut self) -> Self {
        self.inner_sum = true;
        self
    }

    /// Enable row sums for a given row size, which must be a power of two
    /// no larger than the slot count.
    pub fn enable_row_sums(mut self, row_size: usize) -> Result<Self> {
        if !row_size.is_power_of_two() || row_size > self.par.num_slots() {
            return Err(Error::InvalidRowSize(row_size));
        }
        self.row_sums.insert(row_size);
        Ok(self)
    }

    /// Build the evaluation key.
    pub fn build(self) -> EvaluationKey {
        EvaluationKey {
            par: self.par,
            rotations: self.rotations,
            inner_sum: self.inner_sum,
            row_sums: self.row_sums,
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct EvaluationKeyRep {
    ring_dim: usize,
    rotations: Vec<i64>,
    inner_sum: bool,
    row_sums: Vec<usize>,
}

impl Serialize for EvaluationKey {
    fn to_bytes(&self) -> Vec<u8> {
        let rep = EvaluationKeyRep {
            ring_dim: self.par.ring_dimension(),
            rotations: self.rotations.iter().copied().collect(),
            inner_sum: self.inner_sum,
            row_sums: self.row_sums.iter().copied().collect(),
        };
        bincode::serialize(&rep).expect("evaluation key serialization")
    }
}

impl DeserializeParametrized for EvaluationKey {
    type Error = Error;

    fn from_bytes(bytes: &[u8], par: &Arc<CkksParameters>) -> Result<Self> {
        let rep: EvaluationKeyRep =
            bincode::deserialize(bytes).map_err(|_| Error::SerializationError)?;
        if rep.ring_dim != par.ring_dimension() {
            return Err(Error::SerializationError);
        }
        Ok(Self {
            par: par.clone(),
            rotations: rep.rotations.into_iter().collect(),
            inner_sum: rep.inner_sum,
            row_sums: rep.row_sums.into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{EvaluationKey, EvaluationKeyBuilder};
    use crate::ckks::{CkksParameters, CkksParametersBuilder, Plaintext, PublicKey, SecretKey};
    use crate::{DeserializeParametrized, Error, Serialize};
    use rand::thread_rng;
    use std::error::Error as StdError;
    use std::sync::Arc;

    fn setup() -> Result<(Arc<CkksParameters>, SecretKey, PublicKey), Error> {
        let par = CkksParametersBuilder::new()
            .set_ring_dimension(16)
            .set_multiplicative_depth(3)
            .build_arc()?;
        let sk = SecretKey::random(&par, &mut thread_rng());
        let pk = PublicKey::new(&sk);
        Ok((par, sk, pk))
    }

    #[test]
    fn rotations() -> Result<(), Box<dyn StdError>> {
        let (par, sk, pk) = setup()?;
        let ek = EvaluationKeyBuilder::new(&sk)
            .enable_rotation(2)?
            .enable_rotation(-2)?
            .build();

        let values = (0..8).map(|i| i as f64).collect::<Vec<_>>();
        let ct = pk.try_encrypt(&Plaintext::try_encode(&values, 0, &par)?)?;

        // Positive amounts rotate left.
        let left = ek.rotates_by(&ct, 2)?;
        assert_eq!(
            sk.try_decrypt(&left)?.try_decode(),
            [2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 0.0, 1.0]
        );
        let right = ek.rotates_by(&ct, -2)?;
        assert_eq!(
            sk.try_decrypt(&right)?.try_decode(),
            [6.0, 7.0, 0.0, 1.0, 2.0, 3.0, 4.0, 5.0]
        );

        assert_eq!(
            ek.rotates_by(&ct, 3).unwrap_err(),
            Error::MissingRotationKey(3)
        );
        Ok(())
    }

    #[test]
    fn hoisted_rotation_matches_plain_rotation() -> Result<(), Box<dyn StdError>> {
        let (par, sk, pk) = setup()?;
        let ek = EvaluationKeyBuilder::new(&sk).enable_rotations([-1, -2, -3])?.build();

        let values = (0..8).map(|i| (i * i) as f64).collect::<Vec<_>>();
        let ct = pk.try_encrypt(&Plaintext::try_encode(&values, 0, &par)?)?;

        let precomp = ek.fast_rotation_precompute(&ct);
        for amount in [-1, -2, -3] {
            assert_eq!(
                sk.try_decrypt(&ek.fast_rotates_by(&ct, amount, &precomp)?)?,
                sk.try_decrypt(&ek.rotates_by(&ct, amount)?)?
            );
        }
        Ok(())
    }

    #[test]
    fn inner_sum() -> Result<(), Box<dyn StdError>> {
        let (par, sk, pk) = setup()?;
        let ek = EvaluationKeyBuilder::new(&sk).enable_inner_sum().build();

        let values = (0..8).map(|i| i as f64).collect::<Vec<_>>();
        let ct = pk.try_encrypt(&Plaintext::try_encode(&values, 0, &par)?)?;
        let sum = ek.computes_inner_sum(&ct)?;
        assert_eq!(sk.try_decrypt(&sum)?.try_decode(), [28.0; 8]);

        let no_sum = EvaluationKeyBuilder::new(&sk).build();
        assert_eq!(
            no_sum.computes_inner_sum(&ct).unwrap_err(),
            Error::InnerSumNotSupported
        );
        Ok(())
    }

    #[test]
    fn row_sums() -> Result<(), Box<dyn StdError>> {
        let (par, sk, pk) = setup()?;
        let ek = EvaluationKeyBuilder::new(&sk).enable_row_sums(2)?.build();

        let values = (0..8).map(|i| i as f64).collect::<Vec<_>>();
        let ct = pk.try_encrypt(&Plaintext::try_encode(&values, 0, &par)?)?;
        let sums = ek.computes_row_sums(&ct, 2)?;
        // Columns 0 and 1 hold 0+2+4+6 and 1+3+5+7 respectively.
        assert_eq!(
            sk.try_decrypt(&sums)?.try_decode(),
            [12.0, 16.0, 12.0, 16.0, 12.0, 16.0, 12.0, 16.0]
        );

        assert_eq!(
            ek.computes_row_sums(&ct, 4).unwrap_err(),
            Error::MissingRowSumKey(4)
        );
        Ok(())
    }

    #[test]
    fn builder_validation() -> Result<(), Box<dyn StdError>> {
        let (_, sk, _) = setup()?;
        assert_eq!(
            EvaluationKeyBuilder::new(&sk).enable_rotation(0).unwrap_err(),
            Error::InvalidRotation(0)
        );
        assert_eq!(
            EvaluationKeyBuilder::new(&sk).enable_rotation(8).unwrap_err(),
            Error::InvalidRotation(8)
        );
        assert_eq!(
            EvaluationKeyBuilder::new(&sk).enable_row_sums(3).unwrap_err(),
            Error::InvalidRowSize(3)
        );
        Ok(())
    }

    #[test]
    fn serialize() -> Result<(), Box<dyn StdError>> {
        let (par, sk, _) = setup()?;
        let ek = EvaluationKeyBuilder::new(&sk)
            .enable_rotations([-1, -4, 2])?
            .enable_inner_sum()
            .enable_row_sums(2)?
            .build();
        assert_eq!(EvaluationKey::from_bytes(&ek.to_bytes(), &par)?, ek);
        Ok(())
    }
}
