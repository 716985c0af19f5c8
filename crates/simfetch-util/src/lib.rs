#![crate_name = "simfetch_util"]
#![crate_type = "lib"]
#![warn(missing_docs, unused_imports)]

//! Utilities for the simfetch workspace.

use num_traits::PrimInt;
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use std::time::{Duration, Instant};

/// Returns the ceil of a divided by b. Panics when `b` is 0.
pub fn div_ceil<T: PrimInt>(a: T, b: T) -> T {
    assert!(b > T::zero());
    (a + b - T::one()) / b
}

/// A scalar that can be read from and written to a little-endian binary file.
pub trait LeScalar: Copy + Default {
    /// Size of the little-endian encoding, in bytes.
    const BYTES: usize;

    /// Decode from the first `Self::BYTES` bytes of `bytes`.
    fn from_le(bytes: &[u8]) -> Self;

    /// Append the little-endian encoding of `self` to `out`.
    fn write_le(&self, out: &mut Vec<u8>);
}

macro_rules! impl_le_scalar {
    ($($t:ty),*) => {$(
        impl LeScalar for $t {
            const BYTES: usize = std::mem::size_of::<$t>();

            fn from_le(bytes: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$t>()];
                buf.copy_from_slice(&bytes[..Self::BYTES]);
                <$t>::from_le_bytes(buf)
            }

            fn write_le(&self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes())
            }
        }
    )*};
}

impl_le_scalar!(i16, i64, f32, f64);

/// Read a binary file into a vector of records, all of dimension
/// `record_dim`. Trailing bytes that do not fill a whole record are ignored.
pub fn read_records<T: LeScalar>(path: &Path, record_dim: usize) -> io::Result<Vec<Vec<T>>> {
    assert!(record_dim > 0);
    let mut bytes = Vec::new();
    File::open(path)?.read_to_end(&mut bytes)?;

    let record_bytes = record_dim * T::BYTES;
    let num_records = bytes.len() / record_bytes;
    let mut records = Vec::with_capacity(num_records);
    for r in 0..num_records {
        let mut record = Vec::with_capacity(record_dim);
        for i in 0..record_dim {
            record.push(T::from_le(&bytes[r * record_bytes + i * T::BYTES..]));
        }
        records.push(record);
    }
    Ok(records)
}

/// Write a vector of records to a binary file, little-endian, without any
/// framing.
pub fn write_records<T: LeScalar>(path: &Path, records: &[Vec<T>]) -> io::Result<()> {
    let mut bytes = Vec::with_capacity(records.iter().map(|r| r.len() * T::BYTES).sum());
    for record in records {
        for value in record {
            value.write_le(&mut bytes);
        }
    }
    let mut file = File::create(path)?;
    file.write_all(&bytes)
}

/// Encode a record matrix in column order: the input is an n-by-m matrix to
/// be transposed, but the rows of the output cannot be longer than
/// `num_slots`. Inputs with more than `num_slots` rows are split into
/// ceil(n / num_slots) batches, each an m-by-`num_slots` matrix, with the
/// rows of the last batch padded with zeros.
pub fn transpose_batches<T: LeScalar + Into<f64>>(
    records: &[Vec<T>],
    num_slots: usize,
) -> Vec<Vec<Vec<f64>>> {
    assert!(!records.is_empty());
    let record_dim = records[0].len();
    let num_batches = div_ceil(records.len(), num_slots);

    let mut batches = vec![vec![vec![0.0; num_slots]; record_dim]; num_batches];
    for (idx, record) in records.iter().enumerate() {
        let batch = idx / num_slots;
        let slot = idx % num_slots;
        for (j, value) in record.iter().enumerate() {
            batches[batch][j][slot] = (*value).into();
        }
    }
    batches
}

/// Utility struct for displaying human-readable duration of the form
/// "10.5 ms", "350 μs", or "27 ns".
pub struct DisplayDuration(pub Duration);

impl fmt::Display for DisplayDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let duration_ns = self.0.as_nanos();
        if duration_ns < 1_000_u128 {
            write!(f, "{duration_ns} ns")
        } else if duration_ns < 1_000_000_u128 {
            write!(f, "{} μs", (duration_ns + 500) / 1_000)
        } else {
            let duration_ms_times_10 = (duration_ns + 50_000) / (100_000);
            write!(f, "{} ms", (duration_ms_times_10 as f64) / 10.0)
        }
    }
}

/// An explicit clock for per-stage progress reporting. Passed through the
/// pipeline instead of keeping process-wide timing state.
#[derive(Debug)]
pub struct Stopwatch {
    last: Instant,
}

impl Stopwatch {
    /// Start a new stopwatch.
    pub fn start() -> Self {
        Self {
            last: Instant::now(),
        }
    }

    /// Time elapsed since the start or since the previous lap.
    pub fn lap(&mut self) -> Duration {
        let now = Instant::now();
        let elapsed = now - self.last;
        self.last = now;
        elapsed
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::start()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn div_ceil_is_correct() {
        assert_eq!(div_ceil(1000usize, 512), 2);
        assert_eq!(div_ceil(1024usize, 512), 2);
        assert_eq!(div_ceil(1025usize, 512), 3);
        assert_eq!(div_ceil(1usize, 512), 1);
    }

    #[test]
    fn records_roundtrip() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("records.bin");

        let records = vec![vec![1i16, -2, 3], vec![4, 5, -6]];
        write_records(&path, &records)?;
        assert_eq!(read_records::<i16>(&path, 3)?, records);

        let records = vec![vec![0.5f32, -1.25], vec![3.75, 0.0]];
        write_records(&path, &records)?;
        assert_eq!(read_records::<f32>(&path, 2)?, records);
        Ok(())
    }

    #[test]
    fn transpose_pads_last_batch() {
        let records = vec![vec![1.0f64, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]];
        let batches = transpose_batches(&records, 2);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0], vec![vec![1.0, 3.0], vec![2.0, 4.0]]);
        assert_eq!(batches[1], vec![vec![5.0, 0.0], vec![6.0, 0.0]]);
    }

    #[test]
    fn display_duration() {
        assert_eq!(
            DisplayDuration(Duration::from_nanos(27)).to_string(),
            "27 ns"
        );
        assert_eq!(
            DisplayDuration(Duration::from_micros(350)).to_string(),
            "350 μs"
        );
        assert_eq!(
            DisplayDuration(Duration::from_micros(10500)).to_string(),
            "10.5 ms"
        );
    }
}
