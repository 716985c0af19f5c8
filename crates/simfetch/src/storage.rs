//! Reading and writing the serialized protocol objects.
//!
//! Every ciphertext is a separate file on disk; batch directories and the
//! 4-digit zero-padded file names follow the layout of
//! [`crate::params::InstanceParams`]. If ciphertexts are ever streamed
//! from a remote location instead, this is the module to rewrite.

use crate::{Error, Result};
use simfetch_he::ckks::CkksParameters;
use simfetch_he::{Deserialize, DeserializeParametrized, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Write a serializable object to a file.
pub fn write_object<T: Serialize>(path: &Path, object: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    fs::write(path, object.to_bytes()).map_err(|e| Error::io(path, e))
}

/// Read a parametrized object (ciphertext or key) from a file.
pub fn read_object<T>(path: &Path, par: &Arc<CkksParameters>) -> Result<T>
where
    T: DeserializeParametrized<Error = simfetch_he::Error>,
{
    let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
    T::from_bytes(&bytes, par).map_err(Error::from)
}

/// Read the serialized CKKS parameters from a file.
pub fn read_parameters(path: &Path) -> Result<Arc<CkksParameters>> {
    let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
    Ok(Arc::new(CkksParameters::try_deserialize(&bytes)?))
}

/// The directory of the j-th batch of the encrypted dataset.
pub fn batch_dir(enc_dir: &Path, batch: usize) -> PathBuf {
    enc_dir.join(format!("batch{batch:04}"))
}

/// The i-th encrypted row of the j-th batch.
pub fn row_path(enc_dir: &Path, batch: usize, row: usize) -> PathBuf {
    batch_dir(enc_dir, batch).join(format!("row_{row:04}.bin"))
}

/// The i-th encrypted payload coordinate of the j-th batch.
pub fn payload_path(enc_dir: &Path, batch: usize, coord: usize) -> PathBuf {
    batch_dir(enc_dir, batch).join(format!("payload_{coord:04}.bin"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_zero_padded() {
        let enc = Path::new("/io/toy/encrypted");
        assert_eq!(
            row_path(enc, 1, 23),
            PathBuf::from("/io/toy/encrypted/batch0001/row_0023.bin")
        );
        assert_eq!(
            payload_path(enc, 0, 7),
            PathBuf::from("/io/toy/encrypted/batch0000/payload_0007.bin")
        );
    }
}
