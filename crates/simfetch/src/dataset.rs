//! Random dataset generation: cluster centers, database records and
//! payload vectors.

use crate::params::{InstanceParams, PAYLOAD_DIM};
use crate::{Error, Result};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rand_distr::StandardNormal;
use simfetch_util::write_records;
use std::fs;

fn unit_vector<R: RngCore>(dim: usize, rng: &mut R) -> Vec<f32> {
    let mut v: Vec<f32> = (0..dim).map(|_| rng.sample(StandardNormal)).collect();
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    v.iter_mut().for_each(|x| *x /= norm);
    v
}

/// Generate database records: half of them random points on the unit
/// sphere, the other half a random center plus scaled noise, re-normalized.
pub fn generate_records<R: RngCore>(
    num_records: usize,
    num_centers: usize,
    dim: usize,
    rng: &mut R,
) -> (Vec<Vec<f32>>, Vec<Vec<f32>>) {
    let centers: Vec<Vec<f32>> = (0..num_centers).map(|_| unit_vector(dim, rng)).collect();

    let records = (0..num_records)
        .map(|_| {
            let noise = unit_vector(dim, rng);
            let mut record = if rng.gen_bool(0.5) {
                noise
            } else {
                let center = &centers[rng.gen_range(0..centers.len())];
                center
                    .iter()
                    .zip(noise.iter())
                    .map(|(c, n)| c + 0.3 * n)
                    .collect()
            };
            let norm = record.iter().map(|x| x * x).sum::<f32>().sqrt();
            record.iter_mut().for_each(|x| *x /= norm);
            record
        })
        .collect();
    (records, centers)
}

/// Generate random payload vectors with values in [0, 4096).
pub fn generate_payloads<R: RngCore>(num_records: usize, rng: &mut R) -> Vec<Vec<i16>> {
    (0..num_records)
        .map(|_| (0..PAYLOAD_DIM - 1).map(|_| rng.gen_range(0..4096)).collect())
        .collect()
}

/// Generate the dataset files of an instance: `db.bin`, `centers.bin` and
/// `payloads.bin` under the instance's dataset directory.
pub fn generate(prms: &InstanceParams, seed: Option<u64>) -> Result<()> {
    let mut rng = match seed {
        Some(seed) => ChaCha20Rng::seed_from_u64(seed),
        None => ChaCha20Rng::from_entropy(),
    };

    let num_records = prms.db_size();
    let num_centers = (num_records / 32).max(1);
    let (records, centers) =
        generate_records(num_records, num_centers, prms.record_dim(), &mut rng);
    let payloads = generate_payloads(num_records, &mut rng);

    let data_dir = prms.data_dir();
    fs::create_dir_all(&data_dir).map_err(|e| Error::io(&data_dir, e))?;
    write_records(&data_dir.join("db.bin"), &records)
        .map_err(|e| Error::io(data_dir.join("db.bin"), e))?;
    write_records(&data_dir.join("centers.bin"), &centers)
        .map_err(|e| Error::io(data_dir.join("centers.bin"), e))?;
    write_records(&data_dir.join("payloads.bin"), &payloads)
        .map_err(|e| Error::io(data_dir.join("payloads.bin"), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{generate_payloads, generate_records};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn records_are_unit_norm() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let (records, centers) = generate_records(64, 2, 16, &mut rng);
        assert_eq!(records.len(), 64);
        assert_eq!(centers.len(), 2);
        for v in records.iter().chain(centers.iter()) {
            let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn payloads_are_in_range() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        for payload in generate_payloads(100, &mut rng) {
            assert_eq!(payload.len(), 7);
            assert!(payload.iter().all(|&x| (0..4096).contains(&x)));
        }
    }

    #[test]
    fn seeded_generation_is_deterministic() {
        let mut rng1 = ChaCha20Rng::seed_from_u64(42);
        let mut rng2 = ChaCha20Rng::seed_from_u64(42);
        assert_eq!(
            generate_records(8, 1, 4, &mut rng1),
            generate_records(8, 1, 4, &mut rng2)
        );
    }
}
