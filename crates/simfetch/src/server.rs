//! The server-side encrypted pipeline: matrix-vector multiply, threshold
//! comparison, compaction and match extraction, all over ciphertexts.

use crate::approx;
use crate::params::{InstanceParams, MATCH_THRESHOLD, PAYLOAD_DIM, RUNNING_SUM_LEVELS};
use crate::replicate::SlotReplicator;
use crate::running_sums::RunningSums;
use crate::storage;
use crate::Result;
use simfetch_he::ckks::{
    Ciphertext, CkksParameters, EvaluationKey, Plaintext, RelinearizationKey,
};
use simfetch_util::{DisplayDuration, Stopwatch};
use std::sync::Arc;

fn log_step(sw: &mut Stopwatch, num: usize, name: &str) {
    println!(
        "[server] {num}: {name} completed ({})",
        DisplayDuration(sw.lap())
    );
}

/// Run the encrypted fetch-by-similarity pipeline over the on-disk
/// instance, writing the single result ciphertext to
/// `encrypted/results.bin`. In count-only mode the result encrypts the
/// number of matches in every slot; otherwise it encrypts the compacted
/// payloads of up to eight matches per column.
///
/// Nothing is written on failure; any missing or malformed file is fatal
/// and surfaces the offending path.
pub fn run(prms: &InstanceParams, count_only: bool) -> Result<()> {
    let mut sw = Stopwatch::start();

    let key_dir = prms.key_dir();
    let par = storage::read_parameters(&key_dir.join("cc.bin"))?;
    let ek: Arc<EvaluationKey> =
        Arc::new(storage::read_object(&key_dir.join("rk.bin"), &par)?);
    let rk: RelinearizationKey = storage::read_object(&key_dir.join("mk.bin"), &par)?;
    let query: Ciphertext = storage::read_object(&prms.enc_dir().join("query.bin"), &par)?;
    log_step(&mut sw, 0, "Loading keys");

    // The matrix-vector product, reading the encrypted matrix one
    // ciphertext at a time.
    let mut result = mat_vec_mult(prms, &par, &ek, &rk, &query)?;
    log_step(&mut sw, 1, "Matrix-vector product");

    // Compare each slot to the threshold. In fetch mode the indicator is
    // scaled to 0/0.504 so that the compaction stage can map rank values
    // into [-1, 1].
    approx::compare_to_threshold(&mut result, MATCH_THRESHOLD, count_only)?;
    log_step(&mut sw, 2, "Compare to threshold");

    let out_path = prms.enc_dir().join("results.bin");
    if count_only {
        // The match count is the total over all slots of all ciphertexts.
        let mut total = Ciphertext::zero(&par);
        for ct in &result {
            total += ct;
        }
        let total = ek.computes_inner_sum(&total)?;
        log_step(&mut sw, 3, "Summation");
        storage::write_object(&out_path, &total)?;
        return Ok(());
    }

    // The compaction views the match vector as a matrix with num_cols
    // columns, expecting at most eight matches per column. Running sums
    // down each column give the first match value ~0.5, the second ~1.0,
    // and so on; multiplying the original indicator back in zeroes the
    // non-matches, and shifting by one maps the rank values into the
    // [-1, 1] domain of the impulse.
    let matches = result.clone();
    let rs = RunningSums::new(
        &par,
        prms.num_cols(),
        RUNNING_SUM_LEVELS,
        result[0].level(),
    )?;
    rs.eval_in_place(&mut result, &ek)?;
    for (ct, m) in result.iter_mut().zip(matches.iter()) {
        let mut ranked = &*ct * m;
        rk.relinearizes(&mut ranked)?;
        *ct = ranked;
    }
    // The snapshot is dead from here on; release it before the extraction
    // loop reaches peak memory.
    drop(matches);
    for ct in result.iter_mut() {
        *ct -= 1.0;
    }
    log_step(&mut sw, 3, "Running sums");

    let accumulator = extract_matches(prms, &par, &ek, &rk, &result)?;
    log_step(&mut sw, 4, "Output compression");

    storage::write_object(&out_path, &accumulator)
}

/// Matrix-vector product between the encrypted dataset rows stored under
/// `encrypted/batchNNNN/` and the replicated query.
///
/// The query ciphertext holds the record-dimension pattern repeated to
/// fill all slots, so the replication tree emits one ciphertext per query
/// coordinate. Products are accumulated without relinearization; only the
/// finished accumulators are relinearized.
fn mat_vec_mult(
    prms: &InstanceParams,
    par: &Arc<CkksParameters>,
    ek: &Arc<EvaluationKey>,
    rk: &RelinearizationKey,
    query: &Ciphertext,
) -> Result<Vec<Ciphertext>> {
    let input_replication = prms.num_slots() / prms.record_dim();
    let mut replicator = SlotReplicator::new(par, ek, prms.degrees(), input_replication)?;

    let enc_dir = prms.enc_dir();
    let mut acc = vec![Ciphertext::zero(par); prms.num_batches()];

    let mut coordinate = 0;
    let mut replica = Some(replicator.init(query)?);
    while let Some(ct_i) = replica {
        // ct_i holds the i-th entry of the query vector in all its slots.
        for (j, acc_j) in acc.iter_mut().enumerate() {
            let row: Ciphertext =
                storage::read_object(&storage::row_path(&enc_dir, j, coordinate), par)?;
            *acc_j += &(&row * &ct_i);
        }
        replica = replicator.next_replica()?;
        coordinate += 1;
    }

    for acc_j in acc.iter_mut() {
        rk.relinearizes(acc_j)?;
    }
    Ok(acc)
}

/// Extract the payloads of the up-to-eight ranked matches per column and
/// pack them into a single ciphertext.
///
/// Iteration i isolates the i-th ranked match of every column with an
/// impulse indicator, multiplies the eight payload rows by it, packs the
/// eight values consecutively in their column, replicates them across the
/// column, and masks everything but rows [(i-1)*8, i*8).
fn extract_matches(
    prms: &InstanceParams,
    par: &Arc<CkksParameters>,
    ek: &Arc<EvaluationKey>,
    rk: &RelinearizationKey,
    result: &[Ciphertext],
) -> Result<Ciphertext> {
    let num_cols = prms.num_cols();
    let enc_dir = prms.enc_dir();
    let mut accumulator = Ciphertext::zero(par);

    for i in 1..=prms.max_matches() {
        // Map rank i from {1..8} to the impulse domain [-1, 1].
        let x_i = i as f64 / 4.0 - 1.0;
        let indicator = approx::compare_to_number(result, x_i)?;
        // indicator is a one-hot vector per column: 1 in the slot whose
        // running sum reached rank i, 0 elsewhere.

        let mut to_replicate = Ciphertext::zero(par);
        for j in 0..PAYLOAD_DIM {
            for (k, ind) in indicator.iter().enumerate() {
                let payload: Ciphertext =
                    storage::read_object(&storage::payload_path(&enc_dir, k, j), par)?;
                let mut part = &payload * ind;
                rk.relinearizes(&mut part)?;
                if j != 0 {
                    // Shift the j-th payload value j rows down its column,
                    // packing the eight values consecutively.
                    part = ek.rotates_by(&part, -((j * num_cols) as i64))?;
                }
                // Each output column has at most one non-zero addend per
                // slot across both loops, so a single accumulator works
                // even though the indicator spans several ciphertexts.
                to_replicate += &part;
            }
        }

        // Replicate the packed values across their column, then keep only
        // the rank-i window of rows.
        let replicated = ek.computes_row_sums(&to_replicate, num_cols * PAYLOAD_DIM)?;

        let mut mask = vec![0.0; prms.num_slots()];
        for (s, slot) in mask.iter_mut().enumerate() {
            let row = s / num_cols;
            if ((i - 1) * PAYLOAD_DIM..i * PAYLOAD_DIM).contains(&row) {
                *slot = 1.0;
            }
        }
        let mask = Plaintext::try_encode(&mask, replicated.level(), par)?;
        accumulator += &(&replicated * &mask);
    }
    Ok(accumulator)
}
