//! Chebyshev approximations of the indicator and impulse functions used
//! by the server pipeline.
//!
//! All the constants here are protocol-normative: changing any of them
//! silently changes the accuracy and the output domain of the pipeline.

use crate::Result;
use simfetch_he::ckks::{eval_chebyshev_function, Ciphertext};

/// Steepness of the sigmoid used as the threshold indicator; determined by
/// experiments.
pub const SIGMOID_STEEPNESS: f64 = 69.0;

/// Output scale of the threshold indicator when payloads are fetched.
///
/// The indicator is scaled to 0/0.504 rather than 0/1: up to eight
/// matches are summed, multiplied by the indicator again, and the result
/// must fit a size-2 interval that can be shifted to [-1, 1].
pub const MATCH_OUTSCALE: f64 = 0.504;

/// Width of the Gaussian impulse used to isolate one match rank.
pub const IMPULSE_SIGMA: f64 = 0.04;

/// Chebyshev degree of the threshold indicator.
pub const THRESHOLD_DEGREE: usize = 59;

/// Chebyshev degree of the threshold indicator in count-only mode, where
/// both matches and non-matches must decode near-exactly and the level
/// budget allows a higher degree.
pub const COUNT_DEGREE: usize = 247;

/// Chebyshev degree of the impulse.
pub const IMPULSE_DEGREE: usize = 119;

/// A sigmoid-like function with the protocol steepness.
pub fn sigmoid(x: f64, outscale: f64) -> f64 {
    outscale / (1.0 + (-x * SIGMOID_STEEPNESS).exp())
}

/// A Gaussian impulse with the protocol width, normalized so that
/// `impulse(0.0) == 1.0`.
pub fn impulse(x: f64) -> f64 {
    (-x * x / (2.0 * IMPULSE_SIGMA * IMPULSE_SIGMA)).exp()
}

/// Compare each slot to the threshold, replacing it by an approximation of
/// the indicator chi(x) = (x >= threshold).
///
/// In count-only mode the output is scaled to 0/1 and uses a higher-degree
/// approximation, since the counts must survive a global summation. In
/// fetch mode the output is scaled to 0/[`MATCH_OUTSCALE`] with a degree
/// that favors accuracy on the (more numerous) non-matches.
pub fn compare_to_threshold(
    ctxts: &mut [Ciphertext],
    threshold: f64,
    count_only: bool,
) -> Result<()> {
    let outscale = if count_only { 1.0 } else { MATCH_OUTSCALE };
    let degree = if count_only {
        COUNT_DEGREE
    } else {
        THRESHOLD_DEGREE
    };
    for ct in ctxts.iter_mut() {
        *ct = eval_chebyshev_function(
            |x| sigmoid(x - threshold, outscale),
            ct,
            -1.0,
            1.0,
            degree,
        )?;
    }
    Ok(())
}

/// Compare each slot to a number, producing an approximation of the
/// indicator chi(x) = (x == number): one slot near 1 where the input
/// equals `number`, near 0 elsewhere.
pub fn compare_to_number(ctxts: &[Ciphertext], number: f64) -> Result<Vec<Ciphertext>> {
    ctxts
        .iter()
        .map(|ct| {
            eval_chebyshev_function(|x| impulse(x - number), ct, -1.0, 1.0, IMPULSE_DEGREE)
                .map_err(crate::Error::from)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::MATCH_THRESHOLD;
    use simfetch_he::ckks::{CkksParametersBuilder, Plaintext, PublicKey, SecretKey};
    use rand::thread_rng;
    use std::error::Error as StdError;

    #[test]
    fn plain_functions() {
        assert!((impulse(0.0) - 1.0).abs() < 1e-12);
        assert!(impulse(0.25) < 1e-8);
        assert!((sigmoid(0.2, 0.504) - 0.504).abs() < 1e-5);
        assert!(sigmoid(-0.2, 0.504) < 1e-5);
        assert!((sigmoid(0.0, 1.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn threshold_indicator() -> std::result::Result<(), Box<dyn StdError>> {
        let par = CkksParametersBuilder::new()
            .set_ring_dimension(32)
            .set_multiplicative_depth(23)
            .build_arc()?;
        let sk = SecretKey::random(&par, &mut thread_rng());
        let pk = PublicKey::new(&sk);

        let values = [0.0, 0.4, 0.79, 0.81, 1.0];
        let pt = Plaintext::try_encode(&values, 0, &par)?;
        let mut ctxts = vec![pk.try_encrypt(&pt)?];
        compare_to_threshold(&mut ctxts, MATCH_THRESHOLD, false)?;

        let decoded = sk.try_decrypt(&ctxts[0])?.try_decode();
        // Far from the threshold the output is essentially 0 or 0.504; at
        // the threshold the sigmoid transitions, so the borderline slots
        // are only checked against the true scaled sigmoid.
        let tolerance = 0.01;
        assert!(decoded[0].abs() < tolerance);
        assert!(decoded[1].abs() < tolerance);
        assert!((decoded[4] - MATCH_OUTSCALE).abs() < tolerance);
        for (x, y) in values.iter().zip(decoded.iter()) {
            let expected = sigmoid(x - MATCH_THRESHOLD, MATCH_OUTSCALE);
            assert!((y - expected).abs() < tolerance, "x = {x}");
        }
        Ok(())
    }

    #[test]
    fn count_indicator_is_near_exact() -> std::result::Result<(), Box<dyn StdError>> {
        let par = CkksParametersBuilder::new()
            .set_ring_dimension(32)
            .set_multiplicative_depth(23)
            .build_arc()?;
        let sk = SecretKey::random(&par, &mut thread_rng());
        let pk = PublicKey::new(&sk);

        let values = [0.0, 0.4, 0.79, 0.81, 1.0];
        let pt = Plaintext::try_encode(&values, 0, &par)?;
        let mut ctxts = vec![pk.try_encrypt(&pt)?];
        compare_to_threshold(&mut ctxts, MATCH_THRESHOLD, true)?;

        let decoded = sk.try_decrypt(&ctxts[0])?.try_decode();
        for (x, y) in values.iter().zip(decoded.iter()) {
            let expected = sigmoid(x - MATCH_THRESHOLD, 1.0);
            assert!((y - expected).abs() < 1e-6, "x = {x}");
        }
        assert!(decoded[0].abs() < 1e-6);
        assert!((decoded[4] - 1.0).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn rank_impulse_isolates_one_value() -> std::result::Result<(), Box<dyn StdError>> {
        let par = CkksParametersBuilder::new()
            .set_ring_dimension(32)
            .set_multiplicative_depth(23)
            .build_arc()?;
        let sk = SecretKey::random(&par, &mut thread_rng());
        let pk = PublicKey::new(&sk);

        // Shifted rank values i/4 - 1 for ranks 0..4; non-matches sit at -1.
        let values = [-1.0, -0.75, -0.5, -0.25, 0.0];
        let pt = Plaintext::try_encode(&values, 0, &par)?;
        let ctxts = vec![pk.try_encrypt(&pt)?];

        let indicator = compare_to_number(&ctxts, -0.5)?;
        let decoded = sk.try_decrypt(&indicator[0])?.try_decode();
        assert!((decoded[2] - 1.0).abs() < 1e-6);
        for (i, y) in decoded.iter().enumerate().take(5) {
            if i != 2 {
                assert!(y.abs() < 1e-6, "slot {i}: {y}");
            }
        }
        Ok(())
    }
}
