//! Client-side protocol steps: key generation, dataset and query
//! encryption, decryption and decoding of the server's answer.

use crate::params::{
    InstanceParams, MAX_PAYLOAD_VAL, PAYLOAD_DIM, PAYLOAD_ENCRYPTION_LEVEL, PAYLOAD_MARKER,
    PAYLOAD_PRECISION, RUNNING_SUM_LEVELS,
};
use crate::replicate::SlotReplicator;
use crate::running_sums::RunningSums;
use crate::storage;
use crate::{Error, Result};
use itertools::Itertools;
use rand::{CryptoRng, RngCore};
use simfetch_he::ckks::{
    EvaluationKeyBuilder, Plaintext, PublicKey, RelinearizationKey, SecretKey,
};
use simfetch_util::{read_records, transpose_batches, write_records};

/// Generate fresh keys for an instance and store them to disk, including
/// automorphism keys for all the rotations needed by replication, payload
/// compaction and running sums.
pub fn generate_keys<R: RngCore + CryptoRng>(prms: &InstanceParams, rng: &mut R) -> Result<()> {
    let par = prms.ckks_parameters()?;
    let sk = SecretKey::random(&par, rng);
    let pk = PublicKey::new(&sk);
    let rk = RelinearizationKey::new(&sk);

    let replication_shifts = SlotReplicator::rotation_amounts(prms.degrees());
    let compaction_shifts = (1..PAYLOAD_DIM).map(|j| -((j * prms.num_cols()) as i64));
    let running_sum_shifts =
        RunningSums::shift_amounts_for(prms.num_slots(), prms.num_cols(), RUNNING_SUM_LEVELS)?;
    let all_shifts = replication_shifts
        .into_iter()
        .chain(compaction_shifts)
        .chain(running_sum_shifts)
        .unique();

    let ek = EvaluationKeyBuilder::new(&sk)
        .enable_rotations(all_shifts)?
        .enable_inner_sum()
        .enable_row_sums(prms.num_cols() * PAYLOAD_DIM)?
        .build();

    let key_dir = prms.key_dir();
    storage::write_object(&key_dir.join("cc.bin"), par.as_ref())?;
    storage::write_object(&key_dir.join("pk.bin"), &pk)?;
    storage::write_object(&key_dir.join("sk.bin"), &sk)?;
    storage::write_object(&key_dir.join("mk.bin"), &rk)?;
    storage::write_object(&key_dir.join("rk.bin"), &ek)?;
    Ok(())
}

/// Encode and encrypt the dataset and its payloads into per-batch
/// ciphertext files.
pub fn encrypt_database(prms: &InstanceParams) -> Result<()> {
    let key_dir = prms.key_dir();
    let par = storage::read_parameters(&key_dir.join("cc.bin"))?;
    let pk: PublicKey = storage::read_object(&key_dir.join("pk.bin"), &par)?;

    // The dataset matrix, one unit-norm record per row.
    let db_path = prms.data_dir().join("db.bin");
    let db = read_records::<f32>(&db_path, prms.record_dim())
        .map_err(|e| Error::io(&db_path, e))?;
    if db.len() != prms.db_size() {
        return Err(Error::RecordCountMismatch {
            path: db_path,
            expected: prms.db_size(),
            found: db.len(),
        });
    }
    // Transpose to column-major order, one batch of num_slots records at
    // a time.
    let encoded_db = transpose_batches(&db, prms.num_slots());
    debug_assert_eq!(encoded_db.len(), prms.num_batches());

    let payload_path = prms.data_dir().join("payloads.bin");
    let mut payloads = read_records::<i16>(&payload_path, PAYLOAD_DIM - 1)
        .map_err(|e| Error::io(&payload_path, e))?;
    if payloads.len() != db.len() {
        return Err(Error::RecordCountMismatch {
            path: payload_path,
            expected: db.len(),
            found: payloads.len(),
        });
    }
    add_markers(&mut payloads);

    // Payload slots are scaled down to the fixed-point value range
    // [0, MAX_PAYLOAD_VAL).
    let mut encoded_payloads = transpose_batches(&payloads, prms.num_slots());
    for batch in encoded_payloads.iter_mut() {
        for row in batch.iter_mut() {
            for x in row.iter_mut() {
                *x /= PAYLOAD_PRECISION as f64;
            }
        }
    }

    // The dataset rows will be multiplied by replicated ciphertexts that
    // sit at level degrees.len(), so encrypting them one level above the
    // top saves space. Payloads are only touched at the very end of the
    // pipeline and live much deeper.
    let row_level = prms.row_encryption_level();
    let enc_dir = prms.enc_dir();
    for (j, (rows, payload_rows)) in encoded_db.iter().zip(encoded_payloads.iter()).enumerate()
    {
        for (i, row) in rows.iter().enumerate() {
            let pt = Plaintext::try_encode(row, row_level, &par)?;
            storage::write_object(&storage::row_path(&enc_dir, j, i), &pk.try_encrypt(&pt)?)?;
        }
        for (i, row) in payload_rows.iter().enumerate() {
            let pt = Plaintext::try_encode(row, PAYLOAD_ENCRYPTION_LEVEL, &par)?;
            storage::write_object(
                &storage::payload_path(&enc_dir, j, i),
                &pk.try_encrypt(&pt)?,
            )?;
        }
    }
    Ok(())
}

/// Encrypt the query vector, repeated to fill all the slots of one
/// ciphertext.
pub fn encrypt_query(prms: &InstanceParams) -> Result<()> {
    let key_dir = prms.key_dir();
    let par = storage::read_parameters(&key_dir.join("cc.bin"))?;
    let pk: PublicKey = storage::read_object(&key_dir.join("pk.bin"), &par)?;

    let query_path = prms.data_dir().join("query.bin");
    let queries = read_records::<f32>(&query_path, prms.record_dim())
        .map_err(|e| Error::io(&query_path, e))?;
    if queries.len() != 1 {
        return Err(Error::RecordCountMismatch {
            path: query_path,
            expected: 1,
            found: queries.len(),
        });
    }

    let slots = (0..prms.num_slots())
        .map(|i| queries[0][i % prms.record_dim()] as f64)
        .collect::<Vec<_>>();
    let pt = Plaintext::try_encode(&slots, 0, &par)?;
    storage::write_object(&prms.enc_dir().join("query.bin"), &pk.try_encrypt(&pt)?)
}

/// Decrypt the server's answer and write the raw slot values to disk.
pub fn decrypt_result(prms: &InstanceParams) -> Result<()> {
    let key_dir = prms.key_dir();
    let par = storage::read_parameters(&key_dir.join("cc.bin"))?;
    let sk: SecretKey = storage::read_object(&key_dir.join("sk.bin"), &par)?;

    let result = storage::read_object(&prms.enc_dir().join("results.bin"), &par)?;
    let slots = sk.try_decrypt(&result)?.try_decode();

    let raw_path = prms.io_dir().join("raw-result.bin");
    write_records(&raw_path, &[slots]).map_err(|e| Error::io(&raw_path, e))
}

/// Decode the raw result slots into payload records (or the match count)
/// and write them to disk.
pub fn postprocess(prms: &InstanceParams, count_only: bool) -> Result<()> {
    let raw_path = prms.io_dir().join("raw-result.bin");
    let raw = read_records::<f64>(&raw_path, prms.num_slots())
        .map_err(|e| Error::io(&raw_path, e))?;
    if raw.len() != 1 {
        return Err(Error::RecordCountMismatch {
            path: raw_path,
            expected: 1,
            found: raw.len(),
        });
    }

    let out_path = prms.io_dir().join("results.bin");
    if count_only {
        // Every slot carries the total; round the first one.
        let count = raw[0][0].round() as i64;
        write_records(&out_path, &[vec![count]]).map_err(|e| Error::io(&out_path, e))
    } else {
        let records = decode_results(&raw[0], prms.num_cols())?;
        write_records(&out_path, &records).map_err(|e| Error::io(&out_path, e))
    }
}

/// Decode the result slots, returning the matched payload records sorted
/// lexicographically.
///
/// The slots are viewed as a matrix with `num_cols` columns; every
/// [`PAYLOAD_DIM`]-row window of a column may carry one payload record,
/// cyclically rotated so that its largest slot is the marker. Windows
/// whose largest slot stays at the noise floor are empty; a window with a
/// sizable value but no plausible marker indicates a corrupted answer.
pub fn decode_results(slots: &[f64], num_cols: usize) -> Result<Vec<Vec<i16>>> {
    let matrix = RunningSums::to_matrix_form(&[slots.to_vec()], num_cols)?;
    let mut records = Vec::new();
    let num_windows = matrix.len() / PAYLOAD_DIM;
    for col in 0..num_cols {
        for window in (0..num_windows).map(|w| w * PAYLOAD_DIM) {
            let mut marker = 0;
            let mut max_value = 0.0f64;
            for i in 0..PAYLOAD_DIM {
                if matrix[window + i][col] > max_value {
                    max_value = matrix[window + i][col];
                    marker = i;
                }
            }
            if max_value <= MAX_PAYLOAD_VAL as f64 {
                continue; // empty window
            }
            // For a genuine match the marker decodes near 2*MAX_PAYLOAD_VAL;
            // anything sizable below this bound means the answer is
            // corrupted.
            if max_value < 1.4 * MAX_PAYLOAD_VAL as f64 {
                let window_slots = (0..PAYLOAD_DIM)
                    .map(|i| matrix[window + i][col])
                    .collect();
                return Err(Error::MarkerNotFound(window_slots));
            }
            // The indicator attenuation hits the marker and the values by
            // the same factor, so rescaling by the marker restores the
            // payload exactly.
            let scale = PAYLOAD_MARKER as f64 / max_value;
            let mut record = Vec::with_capacity(PAYLOAD_DIM - 1);
            for k in 1..PAYLOAD_DIM {
                let idx = window + (marker + k) % PAYLOAD_DIM;
                record.push((scale * matrix[idx][col]).round() as i16);
            }
            records.push(record);
        }
    }
    records.sort();
    Ok(records)
}

/// Prepend the marker slot to every payload record.
fn add_markers(payloads: &mut [Vec<i16>]) {
    for payload in payloads.iter_mut() {
        payload.insert(0, PAYLOAD_MARKER as i16);
    }
}
