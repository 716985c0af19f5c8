// Generate random centers, database records and payloads for one
// instance of the fetch-by-similarity benchmark.

use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let inv = simfetch::cli::parse("gen_dataset", &["--seed"]);
    let seed = match inv.flag_value("--seed") {
        Some(value) => Some(value.parse::<u64>()?),
        None => None,
    };

    simfetch::dataset::generate(&inv.prms, seed)?;
    println!(
        "[gen_dataset] wrote {} records of dimension {} under {}",
        inv.prms.db_size(),
        inv.prms.record_dim(),
        inv.prms.data_dir().display()
    );
    Ok(())
}
