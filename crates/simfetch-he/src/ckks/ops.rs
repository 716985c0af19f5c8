//! Operations over ciphertexts.
//!
//! Additions and subtractions are level-free; when the operands sit at
//! different levels the result takes the deeper one, mirroring a scheme
//! with automatic level adjustment. Products (ciphertext-ciphertext and
//! ciphertext-plaintext) consume one level. Exceeding the multiplicative
//! depth or mixing parameter sets is a programming error and panics; the
//! depth required by a computation is fixed when keys are generated.

use super::{Ciphertext, Plaintext};
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};
use std::sync::Arc;

impl Add<&Ciphertext> for &Ciphertext {
    type Output = Ciphertext;

    fn add(self, rhs: &Ciphertext) -> Ciphertext {
        let mut out = self.clone();
        out += rhs;
        out
    }
}

impl AddAssign<&Ciphertext> for Ciphertext {
    fn add_assign(&mut self, rhs: &Ciphertext) {
        assert!(Arc::ptr_eq(&self.par, &rhs.par));

        if self.is_empty() {
            *self = rhs.clone()
        } else if !rhs.is_empty() {
            self.slots
                .iter_mut()
                .zip(rhs.slots.iter())
                .for_each(|(a, b)| *a += b);
            self.level = self.level.max(rhs.level);
            self.num_polys = self.num_polys.max(rhs.num_polys);
        }
    }
}

impl Sub<&Ciphertext> for &Ciphertext {
    type Output = Ciphertext;

    fn sub(self, rhs: &Ciphertext) -> Ciphertext {
        let mut out = self.clone();
        out -= rhs;
        out
    }
}

impl SubAssign<&Ciphertext> for Ciphertext {
    fn sub_assign(&mut self, rhs: &Ciphertext) {
        assert!(Arc::ptr_eq(&self.par, &rhs.par));

        if self.is_empty() {
            *self = -rhs
        } else if !rhs.is_empty() {
            self.slots
                .iter_mut()
                .zip(rhs.slots.iter())
                .for_each(|(a, b)| *a -= b);
            self.level = self.level.max(rhs.level);
            self.num_polys = self.num_polys.max(rhs.num_polys);
        }
    }
}

impl SubAssign<f64> for Ciphertext {
    fn sub_assign(&mut self, rhs: f64) {
        assert!(!self.is_empty());
        self.slots.iter_mut().for_each(|a| *a -= rhs);
    }
}

impl Neg for &Ciphertext {
    type Output = Ciphertext;

    fn neg(self) -> Ciphertext {
        let mut out = self.clone();
        out.slots.iter_mut().for_each(|a| *a = -*a);
        out
    }
}

impl Mul<&Ciphertext> for &Ciphertext {
    type Output = Ciphertext;

    /// The tensor product of two linear ciphertexts. The result carries
    /// three polynomials and must be relinearized before decryption or
    /// further multiplication.
    fn mul(self, rhs: &Ciphertext) -> Ciphertext {
        assert!(Arc::ptr_eq(&self.par, &rhs.par));
        assert!(!self.is_empty() && !rhs.is_empty());
        assert!(self.is_linear() && rhs.is_linear());

        let level = self.level.max(rhs.level) + 1;
        assert!(level <= self.par.max_level());

        let slots = self
            .slots
            .iter()
            .zip(rhs.slots.iter())
            .map(|(a, b)| a * b)
            .collect();
        Ciphertext {
            par: self.par.clone(),
            slots,
            level,
            num_polys: 3,
        }
    }
}

impl Mul<&Plaintext> for &Ciphertext {
    type Output = Ciphertext;

    fn mul(self, rhs: &Plaintext) -> Ciphertext {
        let mut out = self.clone();
        out *= rhs;
        out
    }
}

impl MulAssign<&Plaintext> for Ciphertext {
    fn mul_assign(&mut self, rhs: &Plaintext) {
        assert!(Arc::ptr_eq(&self.par, &rhs.par));
        assert!(!self.is_empty());

        let level = self.level.max(rhs.level) + 1;
        assert!(level <= self.par.max_level());

        self.slots
            .iter_mut()
            .zip(rhs.values.iter())
            .for_each(|(a, b)| *a *= b);
        self.level = level;
    }
}
