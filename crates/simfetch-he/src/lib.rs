#![crate_name = "simfetch_he"]
#![crate_type = "lib"]
#![warn(missing_docs, unused_imports)]

//! A CKKS-style leveled slot evaluator.
//!
//! This crate exposes the homomorphic-evaluation surface consumed by the
//! `simfetch` pipeline: packed real slots, slot-wise arithmetic, rotations
//! with per-amount automorphism keys, hoisted rotations, relinearization,
//! inner sums, row sums, and Chebyshev evaluation of real functions.
//!
//! The implementation is a *reference slot evaluator*: it computes on
//! cleartext slot vectors while enforcing the level accounting, key
//! discipline and rotation-key registration of a production RNS-CKKS
//! library, and it reproduces the approximation error of Chebyshev
//! interpolation. It is intended for developing, testing and benchmarking
//! slot-level algorithms; it provides **no cryptographic protection**.

mod errors;
mod traits;

pub mod ckks;

pub use errors::{Error, Result};
pub use traits::{Deserialize, DeserializeParametrized, Serialize};
