//! The shift-and-add running-sum procedure, extended in a few ways:
//!
//! - it works in strides, viewing each ciphertext as a matrix;
//! - it operates on a vector of ciphertexts rather than just one;
//! - it accepts a bound on the mult-by-constant depth.
//!
//! Example: three ciphertexts with 8 slots and stride 4 are viewed as
//! 2-by-4 matrices, interleaved into a 6-by-4 matrix:
//!
//! ```text
//! Input: [ a1 b1 c1 d1  a4 b4 c4 d4 ]
//!        [ a2 b2 c2 d2  a5 b5 c5 d5 ]
//!        [ a3 b3 c3 d3  a6 b6 c6 d6 ]
//! ```
//!
//! representing the matrix with rows a1..d1, a2..d2, ..., a6..d6. Running
//! sums are computed down each column, so the expected output is
//!
//! ```text
//! [ a1       b1       ...  a1+..+a4 b1+..+b4 ... ]
//! [ a1+a2    b1+b2    ...  a1+..+a5 b1+..+b5 ... ]
//! [ a1+a2+a3 b1+b2+b3 ...  a1+..+a6 b1+..+b6 ... ]
//! ```
//!
//! The interleaving keeps the number of automorphisms essentially
//! independent of the number of ciphertexts. With the default depth
//! D = log2(num_slots/stride) the procedure uses D automorphisms; a
//! smaller bound B uses roughly B * (2^ceil(D/B) - 1).

use crate::{Error, Result};
use simfetch_he::ckks::{Ciphertext, CkksParameters, EvaluationKey, Plaintext};
use simfetch_util::div_ceil;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Encode a mask of the form {0 0 ... 0 1 1 ... 1}, zero below the shift
/// amount.
fn mask_for_shift(par: &Arc<CkksParameters>, amount: usize, level: usize) -> Result<Plaintext> {
    let num_slots = par.num_slots();
    let amount = amount % num_slots;
    let mut mask = vec![0.0; num_slots];
    mask[amount..].fill(1.0);
    Ok(Plaintext::try_encode(&mask, level, par)?)
}

fn checked_intervals(num_slots: usize, stride: usize) -> Result<usize> {
    if stride == 0 || num_slots % stride != 0 || !(num_slots / stride).is_power_of_two() {
        return Err(Error::InvalidStride(stride, num_slots));
    }
    Ok(num_slots / stride)
}

/// Strided running sums over a vector of ciphertexts, under a bound on the
/// mult-by-constant depth.
#[derive(Debug)]
pub struct RunningSums {
    par: Arc<CkksParameters>,
    /// One map per shift-and-add phase, from (negative) rotation amount to
    /// the mask applied after that rotation.
    masks: Vec<BTreeMap<i64, Plaintext>>,
}

impl RunningSums {
    /// Initialize a running-sum structure.
    ///
    /// `stride` is the number of columns when viewing the input as a
    /// matrix; it must divide the slot count with a power-of-two
    /// quotient. `depth_budget` bounds the number of phases; 0 or
    /// anything above log2(num_slots/stride) selects the default
    /// one-interval-per-phase schedule. `top_level` is the level of the
    /// ciphertexts that will be fed to [`RunningSums::eval_in_place`];
    /// each phase encodes its masks one level lower than the previous
    /// one, since each phase consumes a multiplicative level.
    pub fn new(
        par: &Arc<CkksParameters>,
        stride: usize,
        depth_budget: usize,
        top_level: usize,
    ) -> Result<Self> {
        let mut num_intervals = checked_intervals(par.num_slots(), stride)?;
        let log_intervals = num_intervals.ilog2() as usize;

        let depth_budget = if depth_budget == 0 || depth_budget > log_intervals {
            log_intervals.max(1)
        } else {
            depth_budget
        };
        // The shift amounts shrink by this factor at each phase.
        let factor = 1usize << div_ceil(log_intervals, depth_budget);

        let mut masks = Vec::new();
        let mut level = top_level;

        // All phases but the last use factor - 1 shift amounts.
        while num_intervals > factor {
            num_intervals /= factor;
            let mut phase_masks = BTreeMap::new();
            for i in 1..factor {
                let amount = stride * num_intervals * i;
                // Negative amount: the shifted copy moves right.
                phase_masks.insert(-(amount as i64), mask_for_shift(par, amount, level)?);
            }
            masks.push(phase_masks);
            level += 1;
        }
        // The last phase uses whatever is left of the intervals, minus one.
        if num_intervals > 1 {
            let mut phase_masks = BTreeMap::new();
            for i in 1..num_intervals {
                let amount = stride * i;
                phase_masks.insert(-(amount as i64), mask_for_shift(par, amount, level)?);
            }
            masks.push(phase_masks);
        }

        Ok(Self {
            par: par.clone(),
            masks,
        })
    }

    /// The number of mult-by-constant levels [`RunningSums::eval_in_place`]
    /// consumes.
    pub fn depth(&self) -> usize {
        self.masks.len()
    }

    /// All the shift amounts this structure rotates by; they need
    /// registered automorphism keys.
    pub fn shift_amounts(&self) -> Vec<i64> {
        self.masks
            .iter()
            .flat_map(|phase| phase.keys().copied())
            .collect()
    }

    /// The shift amounts for a stride and depth budget, without building
    /// the mask tables; meant for key generation.
    pub fn shift_amounts_for(
        num_slots: usize,
        stride: usize,
        depth_budget: usize,
    ) -> Result<Vec<i64>> {
        let mut num_intervals = checked_intervals(num_slots, stride)?;
        let log_intervals = num_intervals.ilog2() as usize;

        let depth_budget = if depth_budget == 0 || depth_budget > log_intervals {
            log_intervals.max(1)
        } else {
            depth_budget
        };
        let factor = 1usize << div_ceil(log_intervals, depth_budget);

        let mut amounts = Vec::new();
        while num_intervals > factor {
            num_intervals /= factor;
            for i in (1..factor).rev() {
                amounts.push(-((stride * num_intervals * i) as i64));
            }
        }
        if num_intervals > 1 {
            for i in (1..num_intervals).rev() {
                amounts.push(-((stride * i) as i64));
            }
        }
        Ok(amounts)
    }

    /// Compute the running sums in place.
    pub fn eval_in_place(&self, ctxts: &mut [Ciphertext], ek: &EvaluationKey) -> Result<()> {
        // Running sums across the different ciphertexts first; this part
        // is exact and depth-free.
        for i in 1..ctxts.len() {
            let previous = ctxts[i - 1].clone();
            ctxts[i] += &previous;
        }
        let Some(last) = ctxts.last().cloned() else {
            return Ok(());
        };

        // Shift-and-add on the last ciphertext (which now holds the
        // per-interval totals), adding each phase accumulator to all the
        // ciphertexts.
        let mut last = last;
        for phase_masks in &self.masks {
            let mut acc: Option<Ciphertext> = None;
            for (&amount, mask) in phase_masks {
                let shifted = &ek.rotates_by(&last, amount)? * mask;
                match acc.as_mut() {
                    None => acc = Some(shifted),
                    Some(acc) => *acc += &shifted,
                }
            }
            // Each phase map holds at least one entry by construction.
            if let Some(acc) = acc {
                for ct in ctxts.iter_mut() {
                    *ct += &acc;
                }
                last = ctxts
                    .last()
                    .cloned()
                    .unwrap_or_else(|| Ciphertext::zero(&self.par));
            }
        }
        Ok(())
    }

    /// Rearrange matrix rows into the slot layout the running sums expect:
    /// row i of the matrix lands at in-ciphertext row `i % num_ctxts` and
    /// column block `i / num_ctxts`.
    pub fn from_matrix_form(matrix: &[Vec<f64>], num_slots: usize) -> Result<Vec<Vec<f64>>> {
        if matrix.is_empty() || matrix[0].is_empty() {
            return Ok(Vec::new());
        }
        let num_rows = matrix.len();
        let num_cols = matrix[0].len();
        if num_slots < num_cols || num_slots % num_cols != 0 {
            return Err(Error::InvalidShape(format!(
                "{num_slots} slots cannot hold rows of {num_cols} entries evenly"
            )));
        }
        if (num_rows * num_cols) % num_slots != 0 {
            return Err(Error::InvalidShape(format!(
                "{num_rows} rows of {num_cols} entries do not fill whole ciphertexts"
            )));
        }

        let mut slots = vec![vec![0.0; num_slots]; (num_rows * num_cols) / num_slots];
        let num_vectors = slots.len();
        for (i, row) in matrix.iter().enumerate() {
            let vector = i % num_vectors;
            let offset = num_cols * (i / num_vectors);
            slots[vector][offset..offset + num_cols].copy_from_slice(row);
        }
        Ok(slots)
    }

    /// Rearrange slot vectors back into matrix rows; inverse of
    /// [`RunningSums::from_matrix_form`].
    pub fn to_matrix_form(slots: &[Vec<f64>], num_cols: usize) -> Result<Vec<Vec<f64>>> {
        if slots.is_empty() || slots[0].is_empty() {
            return Ok(Vec::new());
        }
        let num_slots = slots[0].len();
        if num_slots < num_cols || num_slots % num_cols != 0 {
            return Err(Error::InvalidShape(format!(
                "{num_slots} slots do not split into rows of {num_cols} entries"
            )));
        }

        let rows_per_vector = num_slots / num_cols;
        let mut matrix = vec![vec![0.0; num_cols]; slots.len() * rows_per_vector];
        for (i, row) in matrix.iter_mut().enumerate() {
            let vector = i % slots.len();
            let offset = num_cols * (i / slots.len());
            row.copy_from_slice(&slots[vector][offset..offset + num_cols]);
        }
        Ok(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::RunningSums;
    use simfetch_he::ckks::{
        CkksParameters, CkksParametersBuilder, EvaluationKey, EvaluationKeyBuilder, Plaintext,
        PublicKey, SecretKey,
    };
    use rand::{thread_rng, Rng};
    use std::error::Error as StdError;
    use std::sync::Arc;

    fn setup(
        ring_dim: usize,
        stride: usize,
        depth_budget: usize,
    ) -> Result<
        (Arc<CkksParameters>, SecretKey, PublicKey, EvaluationKey),
        crate::Error,
    > {
        let par = CkksParametersBuilder::new()
            .set_ring_dimension(ring_dim)
            .set_multiplicative_depth(12)
            .build_arc()?;
        let sk = SecretKey::random(&par, &mut thread_rng());
        let pk = PublicKey::new(&sk);
        let amounts = RunningSums::shift_amounts_for(par.num_slots(), stride, depth_budget)?;
        let ek = EvaluationKeyBuilder::new(&sk).enable_rotations(amounts)?.build();
        Ok((par, sk, pk, ek))
    }

    /// Reference prefix sums over the virtual interleaved matrix.
    fn reference(inputs: &[Vec<f64>], stride: usize) -> Vec<Vec<f64>> {
        let num_ctxts = inputs.len();
        let num_slots = inputs[0].len();
        let rows_per_ctxt = num_slots / stride;
        let total_rows = num_ctxts * rows_per_ctxt;

        // matrix[row][col] with row = k + num_ctxts * (s / stride).
        let mut matrix = vec![vec![0.0; stride]; total_rows];
        for (k, input) in inputs.iter().enumerate() {
            for s in 0..num_slots {
                matrix[k + num_ctxts * (s / stride)][s % stride] = input[s];
            }
        }
        for row in 1..total_rows {
            for col in 0..stride {
                matrix[row][col] += matrix[row - 1][col];
            }
        }

        let mut outputs = vec![vec![0.0; num_slots]; num_ctxts];
        for (k, output) in outputs.iter_mut().enumerate() {
            for s in 0..num_slots {
                output[s] = matrix[k + num_ctxts * (s / stride)][s % stride];
            }
        }
        outputs
    }

    #[test]
    fn worked_example() -> Result<(), Box<dyn StdError>> {
        // Three 8-slot ciphertexts, stride 2: a 12-by-2 virtual matrix.
        let (par, sk, pk, ek) = setup(16, 2, 3)?;

        let inputs = (0..3)
            .map(|k| (0..8).map(|s| (8 * k + s) as f64).collect::<Vec<_>>())
            .collect::<Vec<_>>();
        let mut ctxts = inputs
            .iter()
            .map(|v| pk.try_encrypt(&Plaintext::try_encode(v, 0, &par)?))
            .collect::<Result<Vec<_>, _>>()?;

        let rs = RunningSums::new(&par, 2, 3, 0)?;
        rs.eval_in_place(&mut ctxts, &ek)?;

        let expected = reference(&inputs, 2);
        for (ct, exp) in ctxts.iter().zip(expected.iter()) {
            let decoded = sk.try_decrypt(ct)?.try_decode();
            for (a, b) in decoded.iter().zip(exp.iter()) {
                assert!((a - b).abs() < 1e-4, "{decoded:?} vs {exp:?}");
            }
        }
        Ok(())
    }

    #[test]
    fn matches_the_reference_at_every_depth_budget() -> Result<(), Box<dyn StdError>> {
        let mut rng = thread_rng();
        for stride in [1, 2, 4] {
            // Default budget is log2(32 / stride).
            for budget in [0, 1, 2, 3] {
                let (par, sk, pk, ek) = setup(64, stride, budget)?;
                let inputs = (0..3)
                    .map(|_| (0..32).map(|_| rng.gen_range(-1.0..1.0)).collect::<Vec<f64>>())
                    .collect::<Vec<_>>();
                let mut ctxts = inputs
                    .iter()
                    .map(|v| pk.try_encrypt(&Plaintext::try_encode(v, 0, &par)?))
                    .collect::<Result<Vec<_>, _>>()?;

                let rs = RunningSums::new(&par, stride, budget, 0)?;
                rs.eval_in_place(&mut ctxts, &ek)?;

                let expected = reference(&inputs, stride);
                for (ct, exp) in ctxts.iter().zip(expected.iter()) {
                    let decoded = sk.try_decrypt(ct)?.try_decode();
                    for (a, b) in decoded.iter().zip(exp.iter()) {
                        assert!(
                            (a - b).abs() < 1e-9,
                            "stride {stride} budget {budget}: {a} vs {b}"
                        );
                    }
                }
            }
        }
        Ok(())
    }

    #[test]
    fn depth_respects_the_budget() -> Result<(), crate::Error> {
        let par = CkksParametersBuilder::new()
            .set_ring_dimension(64)
            .set_multiplicative_depth(12)
            .build_arc()?;
        // 32 intervals: default depth 5.
        assert_eq!(RunningSums::new(&par, 1, 0, 0)?.depth(), 5);
        assert_eq!(RunningSums::new(&par, 1, 5, 0)?.depth(), 5);
        assert_eq!(RunningSums::new(&par, 1, 3, 0)?.depth(), 3);
        assert_eq!(RunningSums::new(&par, 1, 2, 0)?.depth(), 2);
        assert_eq!(RunningSums::new(&par, 1, 1, 0)?.depth(), 1);
        // A budget above the default is clamped.
        assert_eq!(RunningSums::new(&par, 8, 7, 0)?.depth(), 2);
        Ok(())
    }

    #[test]
    fn announced_shift_amounts_match_the_masks() -> Result<(), crate::Error> {
        let par = CkksParametersBuilder::new()
            .set_ring_dimension(64)
            .set_multiplicative_depth(12)
            .build_arc()?;
        for (stride, budget) in [(1, 0), (1, 2), (2, 3), (4, 1), (8, 2)] {
            let rs = RunningSums::new(&par, stride, budget, 0)?;
            let mut from_struct = rs.shift_amounts();
            let mut from_helper =
                RunningSums::shift_amounts_for(par.num_slots(), stride, budget)?;
            from_struct.sort_unstable();
            from_helper.sort_unstable();
            assert_eq!(from_struct, from_helper, "stride {stride} budget {budget}");
        }
        Ok(())
    }

    #[test]
    fn small_shift_amounts_table() -> Result<(), crate::Error> {
        // 8 slots, stride 2, budget 3 (clamped to 2): one phase of one
        // shift by two intervals, then one phase of one shift by one.
        assert_eq!(
            RunningSums::shift_amounts_for(8, 2, 3)?,
            vec![-4, -2]
        );
        // 32 slots, stride 1, budget 2: factor 8.
        assert_eq!(
            RunningSums::shift_amounts_for(32, 1, 2)?,
            vec![-28, -24, -20, -16, -12, -8, -4, -3, -2, -1]
        );
        Ok(())
    }

    #[test]
    fn rejects_bad_strides() -> Result<(), crate::Error> {
        let par = CkksParametersBuilder::new()
            .set_ring_dimension(64)
            .set_multiplicative_depth(12)
            .build_arc()?;
        assert!(RunningSums::new(&par, 3, 0, 0).is_err());
        assert!(RunningSums::new(&par, 0, 0, 0).is_err());
        assert!(RunningSums::shift_amounts_for(24, 3, 0).is_err());
        Ok(())
    }

    #[test]
    fn matrix_form_roundtrip() -> Result<(), crate::Error> {
        let matrix = (0..12)
            .map(|i| vec![i as f64, i as f64 + 0.5])
            .collect::<Vec<_>>();
        let slots = RunningSums::from_matrix_form(&matrix, 8)?;
        assert_eq!(slots.len(), 3);
        // Row 0 occupies the first column block of vector 0, row 3 the
        // second column block of vector 0.
        assert_eq!(slots[0][..2], [0.0, 0.5]);
        assert_eq!(slots[0][2..4], [3.0, 3.5]);
        assert_eq!(RunningSums::to_matrix_form(&slots, 2)?, matrix);
        Ok(())
    }
}
