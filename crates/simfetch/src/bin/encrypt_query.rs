// Client query encryption: tile the query vector across all the slots of
// one top-level ciphertext.

use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let inv = simfetch::cli::parse("encrypt_query", &[]);
    simfetch::client::encrypt_query(&inv.prms)?;
    println!(
        "[encrypt_query] query written to {}",
        inv.prms.enc_dir().join("query.bin").display()
    );
    Ok(())
}
