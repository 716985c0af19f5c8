// Client dataset encryption: transpose the dataset to column-major order
// and encrypt it, together with the marked payload vectors, into
// per-batch ciphertext files.

use indicatif::HumanBytes;
use std::error::Error;

fn dir_size(path: &std::path::Path) -> std::io::Result<u64> {
    let mut total = 0;
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        total += if metadata.is_dir() {
            dir_size(&entry.path())?
        } else {
            metadata.len()
        };
    }
    Ok(total)
}

fn main() -> Result<(), Box<dyn Error>> {
    let inv = simfetch::cli::parse("encrypt_db", &[]);
    simfetch::client::encrypt_database(&inv.prms)?;

    let enc_dir = inv.prms.enc_dir();
    println!(
        "[encrypt_db] {} batches ({}) under {}",
        inv.prms.num_batches(),
        HumanBytes(dir_size(&enc_dir)?),
        enc_dir.display()
    );
    Ok(())
}
