#![crate_name = "simfetch"]
#![crate_type = "lib"]
#![warn(missing_docs, unused_imports)]

//! Fetch-by-similarity over an encrypted vector database.
//!
//! Given an encrypted query vector and an encrypted dataset of unit-norm
//! records, the server returns, without decrypting anything, the payloads of
//! the records whose inner product with the query exceeds 0.8 (up to eight
//! matches per packed column), or only the number of matches in count-only
//! mode.
//!
//! The crate is split along the client/server boundary of the protocol:
//! [`client`] holds key generation, encoding/encryption and result decoding,
//! [`server`] holds the encrypted pipeline, and [`replicate`],
//! [`running_sums`] and [`approx`] hold the homomorphic building blocks the
//! pipeline composes. The executables under `src/bin` drive one protocol
//! step each over the on-disk layout described in [`params`].

mod errors;

pub mod approx;
pub mod cli;
pub mod client;
pub mod dataset;
pub mod params;
pub mod replicate;
pub mod running_sums;
pub mod server;
pub mod storage;

pub use errors::{Error, Result};
