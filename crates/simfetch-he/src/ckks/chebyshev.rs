//! Chebyshev evaluation of real functions over a ciphertext.

use crate::ckks::Ciphertext;
use crate::{Error, Result};

/// The number of multiplicative levels consumed by evaluating a Chebyshev
/// series of the given degree (the depth of the Paterson-Stockmeyer
/// evaluation of the series).
pub fn chebyshev_depth(degree: usize) -> usize {
    (degree + 1).next_power_of_two().ilog2() as usize
}

/// Chebyshev interpolation coefficients of `f` over `[lower, upper]`.
///
/// The coefficients are computed at the `degree + 1` Chebyshev nodes, so
/// the returned series interpolates `f` exactly at those nodes:
/// `f(x) ≈ Σ_k c_k T_k(t)` with `t` the affine map of `x` onto `[-1, 1]`.
pub fn chebyshev_coefficients<F>(f: F, lower: f64, upper: f64, degree: usize) -> Vec<f64>
where
    F: Fn(f64) -> f64,
{
    let n = degree + 1;
    let theta = (0..n)
        .map(|j| std::f64::consts::PI * (j as f64 + 0.5) / n as f64)
        .collect::<Vec<_>>();
    let fx = theta
        .iter()
        .map(|t| {
            let x = 0.5 * (upper - lower) * t.cos() + 0.5 * (upper + lower);
            f(x)
        })
        .collect::<Vec<_>>();

    (0..n)
        .map(|k| {
            let sum: f64 = theta
                .iter()
                .zip(fx.iter())
                .map(|(t, y)| y * (k as f64 * t).cos())
                .sum();
            if k == 0 {
                sum / n as f64
            } else {
                2.0 * sum / n as f64
            }
        })
        .collect()
}

/// Clenshaw recurrence for `Σ_k c_k T_k(t)`.
fn clenshaw(coeffs: &[f64], t: f64) -> f64 {
    let mut b1 = 0.0;
    let mut b2 = 0.0;
    for &c in coeffs.iter().skip(1).rev() {
        let tmp = 2.0 * t * b1 - b2 + c;
        b2 = b1;
        b1 = tmp;
    }
    t * b1 - b2 + coeffs[0]
}

/// Evaluate a real function over every slot of a ciphertext through its
/// degree-`degree` Chebyshev interpolant on `[lower, upper]`.
///
/// The result carries the interpolation error of the series, and consumes
/// [`chebyshev_depth(degree)`](chebyshev_depth) levels.
pub fn eval_chebyshev_function<F>(
    f: F,
    ct: &Ciphertext,
    lower: f64,
    upper: f64,
    degree: usize,
) -> Result<Ciphertext>
where
    F: Fn(f64) -> f64,
{
    if degree == 0 || degree > 2031 {
        return Err(Error::UnsupportedDegree(degree));
    }
    if !ct.is_linear() {
        return Err(Error::NonLinearCiphertext);
    }
    let level = ct.level + chebyshev_depth(degree);
    if level > ct.par.max_level() {
        return Err(Error::LevelOutOfBounds(level, ct.par.max_level()));
    }

    let coeffs = chebyshev_coefficients(f, lower, upper, degree);
    let slots = ct
        .slots
        .iter()
        .map(|&x| {
            let t = (2.0 * x - lower - upper) / (upper - lower);
            clenshaw(&coeffs, t)
        })
        .collect();
    Ok(Ciphertext {
        par: ct.par.clone(),
        slots,
        level,
        num_polys: 2,
    })
}

#[cfg(test)]
mod tests {
    use super::{chebyshev_coefficients, chebyshev_depth, eval_chebyshev_function};
    use crate::ckks::{CkksParametersBuilder, Plaintext, PublicKey, SecretKey};
    use crate::Error;
    use rand::thread_rng;
    use std::error::Error as StdError;

    #[test]
    fn depth_table() {
        assert_eq!(chebyshev_depth(59), 6);
        assert_eq!(chebyshev_depth(119), 7);
        assert_eq!(chebyshev_depth(247), 8);
    }

    #[test]
    fn interpolates_smooth_functions() {
        let coeffs = chebyshev_coefficients(f64::sin, -1.0, 1.0, 15);
        for i in 0..100 {
            let x = -1.0 + 2.0 * i as f64 / 99.0;
            let approx = super::clenshaw(&coeffs, x);
            assert!((approx - x.sin()).abs() < 1e-12);
        }
    }

    #[test]
    fn interpolates_on_shifted_interval() {
        let coeffs = chebyshev_coefficients(f64::exp, 0.0, 2.0, 19);
        for i in 0..100 {
            let x = 2.0 * i as f64 / 99.0;
            let t = x - 1.0;
            assert!((super::clenshaw(&coeffs, t) - x.exp()).abs() < 1e-12);
        }
    }

    #[test]
    fn evaluates_over_a_ciphertext() -> Result<(), Box<dyn StdError>> {
        let mut rng = thread_rng();
        let par = CkksParametersBuilder::new()
            .set_ring_dimension(32)
            .set_multiplicative_depth(10)
            .build_arc()?;
        let sk = SecretKey::random(&par, &mut rng);
        let pk = PublicKey::new(&sk);

        let values = (0..16).map(|i| -1.0 + i as f64 / 8.0).collect::<Vec<_>>();
        let ct = pk.try_encrypt(&Plaintext::try_encode(&values, 2, &par)?)?;
        let evaluated = eval_chebyshev_function(|x| 1.0 / (1.0 + (-5.0 * x).exp()), &ct, -1.0, 1.0, 59)?;
        assert_eq!(evaluated.level(), 8);

        let decoded = sk.try_decrypt(&evaluated)?.try_decode();
        for (x, y) in values.iter().zip(decoded.iter()) {
            let expected = 1.0 / (1.0 + (-5.0 * x).exp());
            assert!((y - expected).abs() < 1e-9);
        }
        Ok(())
    }

    #[test]
    fn rejects_exceeding_the_depth() -> Result<(), Box<dyn StdError>> {
        let mut rng = thread_rng();
        let par = CkksParametersBuilder::new()
            .set_ring_dimension(32)
            .set_multiplicative_depth(5)
            .build_arc()?;
        let sk = SecretKey::random(&par, &mut rng);
        let pk = PublicKey::new(&sk);

        let ct = pk.try_encrypt(&Plaintext::try_encode(&[0.5], 0, &par)?)?;
        assert_eq!(
            eval_chebyshev_function(|x| x, &ct, -1.0, 1.0, 59).unwrap_err(),
            Error::LevelOutOfBounds(6, 5)
        );
        assert_eq!(
            eval_chebyshev_function(|x| x, &ct, -1.0, 1.0, 0).unwrap_err(),
            Error::UnsupportedDegree(0)
        );
        Ok(())
    }
}
