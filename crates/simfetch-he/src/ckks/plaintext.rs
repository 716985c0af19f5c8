//! Plaintext type for the CKKS-style slot evaluator.

use crate::ckks::CkksParameters;
use crate::{Error, Result};
use std::sync::Arc;

/// A plaintext holding one real value per slot, encoded at an explicit
/// level.
///
/// The level records how many multiplicative levels a ciphertext is assumed
/// to have consumed before this plaintext is multiplied into it; encoding
/// masks at the right level mirrors what a leveled scheme does to keep
/// scaling factors aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct Plaintext {
    pub(crate) par: Arc<CkksParameters>,
    pub(crate) values: Vec<f64>,
    pub(crate) level: usize,
}

impl Plaintext {
    /// Encode at most `num_slots` real values at the given level; missing
    /// slots are padded with zeros.
    pub fn try_encode(values: &[f64], level: usize, par: &Arc<CkksParameters>) -> Result<Self> {
        if values.len() > par.num_slots() {
            return Err(Error::TooManyValues(values.len(), par.num_slots()));
        }
        if level > par.max_level() {
            return Err(Error::LevelOutOfBounds(level, par.max_level()));
        }
        let mut slots = values.to_vec();
        slots.resize(par.num_slots(), 0.0);
        Ok(Self {
            par: par.clone(),
            values: slots,
            level,
        })
    }

    /// The all-zero plaintext at the given level.
    pub fn zero(level: usize, par: &Arc<CkksParameters>) -> Result<Self> {
        Self::try_encode(&[], level, par)
    }

    /// Decode the plaintext back into its slot values.
    pub fn try_decode(&self) -> Vec<f64> {
        self.values.clone()
    }

    /// The level this plaintext is encoded at.
    pub const fn level(&self) -> usize {
        self.level
    }
}

#[cfg(test)]
mod tests {
    use super::Plaintext;
    use crate::ckks::CkksParametersBuilder;
    use crate::Error;
    use std::error::Error as StdError;

    #[test]
    fn encode_decode() -> Result<(), Box<dyn StdError>> {
        let par = CkksParametersBuilder::new()
            .set_ring_dimension(16)
            .set_multiplicative_depth(3)
            .build_arc()?;
        let pt = Plaintext::try_encode(&[1.0, -2.0, 0.5], 1, &par)?;
        assert_eq!(pt.level(), 1);
        let mut expected = vec![1.0, -2.0, 0.5];
        expected.resize(8, 0.0);
        assert_eq!(pt.try_decode(), expected);
        Ok(())
    }

    #[test]
    fn encode_rejects_bad_inputs() -> Result<(), Box<dyn StdError>> {
        let par = CkksParametersBuilder::new()
            .set_ring_dimension(16)
            .set_multiplicative_depth(3)
            .build_arc()?;
        assert_eq!(
            Plaintext::try_encode(&[0.0; 9], 0, &par),
            Err(Error::TooManyValues(9, 8))
        );
        assert_eq!(
            Plaintext::try_encode(&[0.0; 8], 4, &par),
            Err(Error::LevelOutOfBounds(4, 3))
        );
        Ok(())
    }
}
