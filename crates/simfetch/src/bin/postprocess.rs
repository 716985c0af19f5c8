// Client postprocessing: decode the raw result slots into sorted payload
// records (or into the match count with --count_only).

use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let inv = simfetch::cli::parse("postprocess", &["--count_only"]);
    simfetch::client::postprocess(&inv.prms, inv.has_flag("--count_only"))?;
    println!(
        "[postprocess] results written to {}",
        inv.prms.io_dir().join("results.bin").display()
    );
    Ok(())
}
