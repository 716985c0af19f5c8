//! A memory-efficient mechanism to replicate slots across ciphertexts,
//! using the recursive method from <https://ia.cr/2014/106> section 4.2,
//! but traversing the recursion tree depth-first so that replicas can be
//! produced one at a time.
//!
//! The simplest use-case takes a packed ciphertext as input and emits a
//! stream of ciphertexts, the i-th having every slot equal to the i-th
//! slot of the input. More generally the input may already be partially
//! replicated, with the same length-x pattern repeated to fill all the
//! slots; the stream then has x outputs, one per pattern position.
//!
//! The streaming shape keeps the number of live ciphertexts proportional
//! to the sum of the tree degrees instead of their product. Nodes with
//! fan-out above 2 amortize their rotations with the hoisting method from
//! <https://ia.cr/2018/244>.

use crate::{Error, Result};
use simfetch_he::ckks::{Ciphertext, CkksParameters, EvaluationKey, Plaintext};
use std::sync::Arc;

/// One level of the replication tree.
///
/// A node of fan-out f and rotation amount r turns each source ciphertext
/// it receives into f outputs. It keeps the f shifted copies of the
/// current source and owns f selection masks for the whole replicator
/// lifetime; `current == fan_out` signals that a fresh source is needed.
#[derive(Debug)]
struct ReplicatorNode {
    fan_out: usize,
    rot_amt: usize,
    current: usize,
    shifts: Vec<Ciphertext>,
    masks: Vec<Plaintext>,
}

impl ReplicatorNode {
    fn new(par: &Arc<CkksParameters>, fan_out: usize, rot_amt: usize) -> Result<Self> {
        let num_slots = par.num_slots();
        let block_size = fan_out * rot_amt;
        debug_assert_eq!(num_slots % block_size, 0);
        let num_blocks = num_slots / block_size;

        // Mask k selects runs of rot_amt slots starting at offset
        // k * rot_amt inside every block. For rot_amt=2 and fan_out=4:
        //     (1 1 0 0 0 0 0 0 1 1 0 0 ...)
        //     (0 0 1 1 0 0 0 0 0 0 1 1 ...)
        //     (0 0 0 0 1 1 0 0 0 0 0 0 ...)
        //     (0 0 0 0 0 0 1 1 0 0 0 0 ...)
        let mut masks = Vec::with_capacity(fan_out);
        for k in 0..fan_out {
            let mut mask = vec![0.0; num_slots];
            for b in 0..num_blocks {
                let run_start = b * block_size + k * rot_amt;
                mask[run_start..run_start + rot_amt].fill(1.0);
            }
            masks.push(Plaintext::try_encode(&mask, 0, par)?);
        }
        Ok(Self {
            fan_out,
            rot_amt,
            current: fan_out,
            shifts: Vec::new(),
            masks,
        })
    }
}

/// Depth-first streaming slot replicator.
///
/// The tree is stored as a vector of nodes, root first; the last node is
/// the leaf whose outputs are the fully replicated ciphertexts.
#[derive(Debug)]
pub struct SlotReplicator {
    par: Arc<CkksParameters>,
    ek: Arc<EvaluationKey>,
    nodes: Vec<ReplicatorNode>,
}

impl SlotReplicator {
    /// Builds a replication tree.
    ///
    /// `degrees` lists the node fan-outs from root to leaf; the entries
    /// must all be at least 2 and their product times `input_replication`
    /// must equal the number of slots. `input_replication` is the number
    /// of times the repeated pattern appears in the input ciphertext (1
    /// for a fully packed input).
    pub fn new(
        par: &Arc<CkksParameters>,
        ek: &Arc<EvaluationKey>,
        degrees: &[usize],
        input_replication: usize,
    ) -> Result<Self> {
        let num_slots = par.num_slots();
        if input_replication == 0 || num_slots % input_replication != 0 {
            return Err(Error::InvalidInputReplication(
                input_replication,
                num_slots,
            ));
        }
        let pattern_len = num_slots / input_replication;
        if degrees.is_empty() || degrees.iter().any(|&d| d < 2) {
            return Err(Error::DegreeTooSmall);
        }
        let product = degrees.iter().product::<usize>();
        if product != pattern_len {
            return Err(Error::DegreeProductMismatch(product, pattern_len));
        }

        let mut nodes = Vec::with_capacity(degrees.len());
        let mut rot_amt = pattern_len;
        for &degree in degrees {
            rot_amt /= degree;
            nodes.push(ReplicatorNode::new(par, degree, rot_amt)?);
        }
        Ok(Self {
            par: par.clone(),
            ek: ek.clone(),
            nodes,
        })
    }

    /// The tree degrees, root first.
    pub fn degrees(&self) -> Vec<usize> {
        self.nodes.iter().map(|n| n.fan_out).collect()
    }

    /// Number of replicas the tree produces per input, i.e. the pattern
    /// length of the input ciphertext.
    pub fn num_replicas(&self) -> usize {
        self.nodes.iter().map(|n| n.fan_out).product()
    }

    /// "Install" a ciphertext and return the first replicated ciphertext,
    /// with all slots equal to the first slot of `ct`.
    pub fn init(&mut self, ct: &Ciphertext) -> Result<Ciphertext> {
        self.install(0, ct.clone())?;
        for idx in 1..self.nodes.len() {
            match self.emit(idx - 1)? {
                Some(source) => self.install(idx, source)?,
                None => return Err(Error::NotEnoughReplicas),
            }
        }
        self.emit(self.nodes.len() - 1)?
            .ok_or(Error::NotEnoughReplicas)
    }

    /// Returns the next replicated ciphertext, or `None` once all pattern
    /// positions have been produced. Pulling after the end keeps
    /// returning `None`.
    pub fn next_replica(&mut self) -> Result<Option<Ciphertext>> {
        self.emit(self.nodes.len() - 1)
    }

    /// Prepare node `idx` with a new source ciphertext, computing all its
    /// shifted copies.
    fn install(&mut self, idx: usize, source: Ciphertext) -> Result<()> {
        let fan_out = self.nodes[idx].fan_out;
        let rot_amt = self.nodes[idx].rot_amt as i64;

        let mut shifts = Vec::with_capacity(fan_out);
        if fan_out == 2 {
            let shifted = self.ek.rotates_by(&source, -rot_amt)?;
            shifts.push(source);
            shifts.push(shifted);
        } else {
            // More than one rotation of the same source: decompose once
            // and reuse the digits across all amounts.
            let precomp = self.ek.fast_rotation_precompute(&source);
            for i in 1..fan_out as i64 {
                shifts.push(self.ek.fast_rotates_by(&source, -i * rot_amt, &precomp)?);
            }
            shifts.insert(0, source);
        }

        let node = &mut self.nodes[idx];
        node.shifts = shifts;
        node.current = 0;
        Ok(())
    }

    /// Produce the next output of node `idx`, pulling a fresh source from
    /// the level above when the node is exhausted.
    fn emit(&mut self, idx: usize) -> Result<Option<Ciphertext>> {
        if self.nodes[idx].current == self.nodes[idx].fan_out {
            if idx == 0 {
                return Ok(None);
            }
            match self.emit(idx - 1)? {
                Some(source) => self.install(idx, source)?,
                None => return Ok(None),
            }
        }

        // Which mask goes with which shifted copy depends on the step:
        // the cyclic (i + current) offset lines the k*rot_amt run of the
        // source up with the slots isolated at this step.
        let node = &self.nodes[idx];
        let mut acc = &node.shifts[0] * &node.masks[node.current];
        for i in 1..node.fan_out {
            acc += &(&node.shifts[i] * &node.masks[(i + node.current) % node.fan_out]);
        }
        self.nodes[idx].current += 1;
        Ok(Some(acc))
    }

    /// Replicates each pattern position of `ct` into a full ciphertext,
    /// collecting the whole stream. Parameters are as for
    /// [`SlotReplicator::new`].
    pub fn batch_replicate(
        par: &Arc<CkksParameters>,
        ek: &Arc<EvaluationKey>,
        ct: &Ciphertext,
        degrees: &[usize],
        input_replication: usize,
    ) -> Result<Vec<Ciphertext>> {
        let mut replicator = Self::new(par, ek, degrees, input_replication)?;
        let num_results = par.num_slots() / input_replication;
        let mut result = Vec::with_capacity(num_results);
        result.push(replicator.init(ct)?);
        while let Some(replica) = replicator.next_replica()? {
            result.push(replica);
        }
        if result.len() < num_results {
            return Err(Error::NotEnoughReplicas);
        }
        Ok(result)
    }

    /// The rotation amounts a tree of this shape will request, for
    /// generating the automorphism keys before building any tree.
    pub fn rotation_amounts(degrees: &[usize]) -> Vec<i64> {
        let mut rot_amt = degrees.iter().product::<usize>();
        let mut amounts = Vec::new();
        for &degree in degrees {
            rot_amt /= degree;
            for i in 1..degree {
                // Negative amounts: the shifts are right-rotations.
                amounts.push(-((i * rot_amt) as i64));
            }
        }
        amounts
    }

    /// A simplistic starting point for choosing a tree shape: a root of
    /// degree at most 8, a second level of degree at most 4, then degree-2
    /// levels. The best shape depends on the platform.
    pub fn suggest_degrees(mut num_outputs: usize) -> Vec<usize> {
        assert!(num_outputs.is_power_of_two());
        if num_outputs <= 8 {
            return vec![num_outputs];
        }
        let mut degrees = vec![8];
        num_outputs /= 8;
        if num_outputs >= 4 {
            degrees.push(4);
            num_outputs /= 4;
        }
        while num_outputs > 1 {
            degrees.push(2);
            num_outputs /= 2;
        }
        degrees
    }
}
