// The encrypted fetch-by-similarity server: reads the evaluation keys,
// the encrypted query and the encrypted dataset, and writes one result
// ciphertext. With --count_only the result holds only the match count.

use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let inv = simfetch::cli::parse("server", &["--count_only"]);
    simfetch::server::run(&inv.prms, inv.has_flag("--count_only"))?;
    Ok(())
}
