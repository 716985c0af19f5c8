// Client decryption: decrypt the server's answer and write the raw slot
// values for postprocessing.

use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let inv = simfetch::cli::parse("decrypt", &[]);
    simfetch::client::decrypt_result(&inv.prms)?;
    println!(
        "[decrypt] raw result written to {}",
        inv.prms.io_dir().join("raw-result.bin").display()
    );
    Ok(())
}
