// Client key generation: CKKS context, encryption keys, relinearization
// key and the automorphism keys needed by replication, running sums and
// payload compaction.

use rand::rngs::OsRng;
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let inv = simfetch::cli::parse("keygen", &[]);
    simfetch::client::generate_keys(&inv.prms, &mut OsRng)?;
    println!(
        "[keygen] keys written to {}",
        inv.prms.key_dir().display()
    );
    Ok(())
}
