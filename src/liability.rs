//! The liability set: the custodian-facing protocol.
//!
//! Composes the summation tree with the four argument systems into a single
//! membership proof per user — one range proof per path vertex, one opened
//! digest slot per vertex aggregated into a single Pointproofs check, an
//! aggregated sum argument over every vertex commitment, and a batched proof
//! of equality tying each parent slot to its child's sum — plus a standalone
//! proof of the total.

use crate::equality::{AggregatedEqualityProof, Equalities, PoeParams};
use crate::error::SolvencyError;
use crate::math::*;
use crate::path::{PathMapper, TreeType};
use crate::pointproofs::{self, PointproofsParams};
use crate::range::{prove_range, verify_range, RangeParams, RangeProof};
use crate::store::KvStore;
use crate::sum_argument::{self, SumParams, SumProof};
use crate::tree::SummationTree;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rand_core::RngCore;
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::sync::Mutex;

/// Per-instance tree configuration. Parallelism is a property of the
/// instance, not of the process.
#[derive(Debug, Clone, Copy)]
pub struct TreeConfig {
    pub fanout: u16,
    pub tree_type: TreeType,
    pub parallel: bool,
}

/// All public parameters of a liability set.
///
/// The sum-argument and range-proof coordinate bases are grafted from the
/// Pointproofs powers so that a vertex's V commitment is simultaneously a
/// Pointproofs commitment (over values ‖ sum ‖ blinding) and a Pedersen
/// commitment with blinding base `f`.
pub struct PublicParams {
    pub fanout: u16,
    pub poe: PoeParams,
    pub sum: SumParams,
    pub range: RangeParams,
    /// Batch width of the equality argument: the path length minus one,
    /// padded to a power of two.
    pub equality_slots: usize,
}

impl PublicParams {
    /// The Pointproofs instance shared by the tree and the equality proofs.
    pub fn pointproofs(&self) -> &PointproofsParams {
        &self.poe.pp
    }
}

/// The next power of two no smaller than `n`.
fn padded_power_of_two(n: usize) -> usize {
    let mut m = n;
    while !m.is_power_of_two() {
        m += 1;
    }
    m
}

/// Generates the full parameter bundle for a fanout and addressing mode.
#[tracing::instrument(skip_all, fields(fanout))]
pub fn generate_public_params<R: RngCore>(
    fanout: u16,
    tree_type: TreeType,
    rng: &mut R,
) -> Result<PublicParams, SolvencyError> {
    let mapper = PathMapper::new(fanout, tree_type)?;
    if mapper.depth() < 2 {
        return Err(SolvencyError::MalformedInput(
            "identifier space too small: paths must have at least two levels".into(),
        ));
    }
    let equality_slots = padded_power_of_two(mapper.depth() - 1);

    let poe = PoeParams::new(fanout as usize + 2, equality_slots, rng);

    let n = fanout as usize + 1;
    let mut sum = SumParams::new(n);
    sum.gs = poe.pp.g1s[..n].to_vec();
    sum.f = poe.pp.g1s[n];
    sum.recompute_digest();

    let mut range = RangeParams::new(n);
    range.gs = sum.gs.clone();
    range.f = sum.f;
    range.recompute_digest();

    Ok(PublicParams {
        fanout,
        poe,
        sum,
        range,
        equality_slots,
    })
}

/// The aggregated liability proof for one identifier.
#[derive(Clone, CanonicalSerialize, CanonicalDeserialize)]
pub struct LiabilityProof {
    /// ⟨Digests\[..D−1\], t⟩ under the aggregation coefficients.
    pub pointproof_sigma: Zr,
    /// Aggregated opening of the per-vertex W commitments.
    pub pointproof_pi: G1,
    /// Aggregated sum argument over every vertex's V.
    pub sum_argument: SumProof,
    /// V commitment of every vertex on the path, root first.
    pub v: Vec<G1>,
    /// W commitment of every inner vertex (the leaf parent has none).
    pub w: Vec<G1>,
    /// Opened digest slots, one per vertex; the leaf-parent slot is zero.
    pub digests: Vec<Zr>,
    /// One range proof per vertex over values ‖ sum ‖ blinding.
    pub range_proofs: Vec<RangeProof>,
    /// Batched parent-slot-equals-child-sum argument.
    pub equality: AggregatedEqualityProof,
}

/// A standalone proof of the root total: the root's V opened at the sum
/// slot.
#[derive(Clone, Debug, CanonicalSerialize, CanonicalDeserialize)]
pub struct TotalProof {
    pub sum: u64,
    pub opening: G1,
}

impl TotalProof {
    pub fn verify(&self, params: &PublicParams, v_root: &G1) -> Result<(), SolvencyError> {
        pointproofs::verify(
            params.pointproofs(),
            &Zr::from(self.sum),
            &self.opening,
            v_root,
            params.fanout as usize,
        )
    }
}

/// A custodian's committed multiset of per-user liabilities.
pub struct LiabilitySet<S: KvStore> {
    params: PublicParams,
    mapper: PathMapper,
    tree: SummationTree<S>,
    parallel: bool,
}

impl<S: KvStore> LiabilitySet<S> {
    pub fn new(
        params: PublicParams,
        config: TreeConfig,
        store: S,
    ) -> Result<Self, SolvencyError> {
        if config.fanout != params.fanout {
            return Err(SolvencyError::MalformedInput(format!(
                "parameters were generated for fanout {} but the tree uses {}",
                params.fanout, config.fanout
            )));
        }
        let mapper = PathMapper::new(config.fanout, config.tree_type)?;
        if padded_power_of_two(mapper.depth() - 1) != params.equality_slots {
            return Err(SolvencyError::MalformedInput(
                "parameters do not cover this tree's path length".into(),
            ));
        }
        let tree = SummationTree::new(config.fanout, mapper.depth(), store);
        Ok(Self {
            params,
            mapper,
            tree,
            parallel: config.parallel,
        })
    }

    pub fn params(&self) -> &PublicParams {
        &self.params
    }

    pub fn mapper(&self) -> &PathMapper {
        &self.mapper
    }

    /// Records (or overwrites) the liability for an identifier.
    pub fn set<R: RngCore>(
        &mut self,
        id: &str,
        liability: u64,
        rng: &mut R,
    ) -> Result<(), SolvencyError> {
        let path = self.mapper.id_to_path(id)?;
        self.tree
            .put(&self.params.poe.pp, &path, liability, rng)
    }

    /// The recorded liability, or `None`.
    pub fn get(&self, id: &str) -> Result<Option<u64>, SolvencyError> {
        let path = self.mapper.id_to_path(id)?;
        Ok(self.tree.get(&path)?.map(|(liability, _)| liability))
    }

    /// The published root commitments (V, W).
    pub fn root(&self) -> Result<Option<(G1, G1)>, SolvencyError> {
        match self.tree.root()? {
            None => Ok(None),
            Some(root) => {
                let w = root.w.ok_or_else(|| {
                    SolvencyError::StorageMiss("root vertex has no digest commitment".into())
                })?;
                Ok(Some((root.v, w)))
            }
        }
    }

    /// Proves the liability recorded for `id`. The assembled bundle is
    /// re-verified in-process before it is returned.
    #[tracing::instrument(skip_all, name = "prove_liability")]
    pub fn prove_liability<R: RngCore>(
        &self,
        id: &str,
        rng: &mut R,
    ) -> Result<Option<(u64, LiabilityProof)>, SolvencyError> {
        let path = self.mapper.id_to_path(id)?;
        let Some((liability, vertices)) = self.tree.get(&path)? else {
            return Ok(None);
        };

        let depth = path.len();
        let fanout = self.params.fanout;
        let pp = self.params.pointproofs();

        let mut v_commitments = Vec::with_capacity(depth);
        let mut w_commitments = Vec::with_capacity(depth - 1);
        let mut digests = Vec::with_capacity(depth);
        let mut digest_openings = Vec::with_capacity(depth - 1);

        for (k, vertex) in vertices.iter().enumerate() {
            let digest_vector = vertex.digest_vector(fanout);
            let (digest, opening) = pointproofs::open(pp, path[k] as usize, &digest_vector);
            if let Some(w) = vertex.w {
                w_commitments.push(w);
                digest_openings.push(opening);
            }
            v_commitments.push(vertex.v);
            digests.push(digest);
        }

        let range_inputs: Vec<(G1, Vec<Zr>, Zr)> = vertices
            .iter()
            .map(|vertex| (vertex.v, vertex.values_with_sum(fanout), vertex.blinding))
            .collect();
        let range_proofs = self.produce_range_proofs(&range_inputs, rng)?;

        let t: Vec<Zr> = (0..depth - 1)
            .map(|i| pointproofs::ro(pp, &w_commitments, i))
            .collect();
        let pointproof_sigma = inner_product(&digests[..depth - 1], &t);
        let pointproof_pi =
            pointproofs::aggregate(pp, &w_commitments, &digest_openings, pointproofs::ro);

        let sa_vectors: Vec<Vec<Zr>> = vertices
            .iter()
            .map(|vertex| vertex.values_with_sum(fanout))
            .collect();
        let sa_randomness: Vec<Zr> = vertices.iter().map(|vertex| vertex.blinding).collect();
        let sum_argument = sum_argument::prove_aggregated(
            &self.params.sum,
            &v_commitments,
            &sa_vectors,
            &sa_randomness,
            rng,
        );

        let equalities = self.equality_batch(&path, &v_commitments);
        let mut v_eq: Vec<Vec<Zr>> = (0..depth - 1)
            .map(|k| vertices[k].full_vector(fanout))
            .collect();
        let mut w_eq: Vec<Vec<Zr>> = (0..depth - 1)
            .map(|k| vertices[k + 1].full_vector(fanout))
            .collect();
        let zero_vector = zeros(fanout as usize + 2);
        while v_eq.len() < self.params.equality_slots {
            v_eq.push(zero_vector.clone());
            w_eq.push(zero_vector.clone());
        }
        let equality = equalities.prove(&v_eq, &w_eq, rng);

        let proof = LiabilityProof {
            pointproof_sigma,
            pointproof_pi,
            sum_argument,
            v: v_commitments,
            w: w_commitments,
            digests,
            range_proofs,
            equality,
        };

        // A proof the prover cannot re-verify is never released.
        proof.verify(
            &self.params,
            id,
            &proof.v[0],
            &proof.w[0],
            &self.mapper,
            self.parallel,
        )?;

        Ok(Some((liability, proof)))
    }

    /// Opens the root's sum slot: a proof of the custodian's total.
    pub fn prove_total(&self) -> Result<TotalProof, SolvencyError> {
        let root = self
            .tree
            .root()?
            .ok_or_else(|| SolvencyError::StorageMiss("empty tree has no root".into()))?;
        let full_vector = root.full_vector(self.params.fanout);
        let (sum, opening) = pointproofs::open(
            self.params.pointproofs(),
            self.params.fanout as usize,
            &full_vector,
        );
        let sum = scalar_to_u64(&sum).ok_or_else(|| {
            SolvencyError::MalformedInput("root sum does not fit in 64 bits".into())
        })?;
        Ok(TotalProof { sum, opening })
    }

    /// The padded equality batch for a path: pair k claims that vertex k's
    /// slot path\[k\] equals vertex k+1's sum slot.
    fn equality_batch<'a>(&'a self, path: &[u16], v_commitments: &[G1]) -> Equalities<'a> {
        let depth = path.len();
        let mut i: Vec<usize> = path[..depth - 1].iter().map(|p| *p as usize).collect();
        let mut j = vec![self.params.fanout as usize; depth - 1];
        let mut v = v_commitments[..depth - 1].to_vec();
        let mut w = v_commitments[1..].to_vec();

        let zero_commitment = pointproofs::commit(
            self.params.pointproofs(),
            &zeros(self.params.fanout as usize + 2),
        );
        while v.len() < self.params.equality_slots {
            i.push(0);
            j.push(0);
            v.push(zero_commitment);
            w.push(zero_commitment);
        }

        Equalities {
            params: &self.params.poe,
            v,
            w,
            i,
            j,
        }
    }

    fn produce_range_proofs<R: RngCore>(
        &self,
        inputs: &[(G1, Vec<Zr>, Zr)],
        rng: &mut R,
    ) -> Result<Vec<RangeProof>, SolvencyError> {
        if self.parallel {
            let range_params = &self.params.range;
            let seeds: Vec<[u8; 32]> = inputs
                .iter()
                .map(|_| {
                    let mut seed = [0u8; 32];
                    rng.fill_bytes(&mut seed);
                    seed
                })
                .collect();
            inputs
                .par_iter()
                .zip(seeds)
                .map(|((commitment, values, blinding), seed)| {
                    let mut task_rng = ChaCha20Rng::from_seed(seed);
                    prove_range(range_params, commitment, values, blinding, &mut task_rng)
                })
                .collect()
        } else {
            inputs
                .iter()
                .map(|(commitment, values, blinding)| {
                    prove_range(&self.params.range, commitment, values, blinding, rng)
                })
                .collect()
        }
    }
}

impl LiabilityProof {
    /// Verifies the aggregated bundle against the published roots. Range
    /// proofs fan out in parallel when requested; every other check runs on
    /// the calling thread, and already-dispatched range checks are joined
    /// before any verdict is returned.
    #[tracing::instrument(skip_all, name = "liability::verify")]
    pub fn verify(
        &self,
        params: &PublicParams,
        id: &str,
        v_root: &G1,
        w_root: &G1,
        mapper: &PathMapper,
        parallel: bool,
    ) -> Result<(), SolvencyError> {
        let path = mapper.id_to_path(id)?;
        let depth = path.len();

        if self.w.len() != depth - 1 {
            return Err(SolvencyError::SizeMismatch {
                expected: depth - 1,
                actual: self.w.len(),
            });
        }
        if self.digests.len() != depth {
            return Err(SolvencyError::SizeMismatch {
                expected: depth,
                actual: self.digests.len(),
            });
        }
        if self.v.len() != depth {
            return Err(SolvencyError::SizeMismatch {
                expected: depth,
                actual: self.v.len(),
            });
        }
        if self.range_proofs.len() != depth {
            return Err(SolvencyError::SizeMismatch {
                expected: depth,
                actual: self.range_proofs.len(),
            });
        }

        if self.v[0] != *v_root {
            return Err(SolvencyError::RootMismatch("V"));
        }
        if self.w[0] != *w_root {
            return Err(SolvencyError::RootMismatch("W"));
        }

        let range_failure: Mutex<Option<SolvencyError>> = Mutex::new(None);
        let serial_result = rayon::scope(|scope| {
            if parallel {
                for (range_proof, commitment) in self.range_proofs.iter().zip(&self.v) {
                    let range_failure = &range_failure;
                    scope.spawn(move |_| {
                        if let Err(e) = verify_range(&params.range, range_proof, commitment) {
                            let mut slot = range_failure.lock().expect("range failure slot");
                            if slot.is_none() {
                                *slot = Some(e);
                            }
                        }
                    });
                }
            }
            self.verify_serial(params, &path)
        });
        serial_result?;

        if !parallel {
            for (range_proof, commitment) in self.range_proofs.iter().zip(&self.v) {
                verify_range(&params.range, range_proof, commitment)?;
            }
        }
        if let Some(e) = range_failure.into_inner().expect("range failure slot") {
            return Err(e);
        }

        Ok(())
    }

    fn verify_serial(
        &self,
        params: &PublicParams,
        path: &[u16],
    ) -> Result<(), SolvencyError> {
        let depth = path.len();
        let pp = params.pointproofs();

        // Digest hash chain: each vertex's opened slot must equal the hash
        // of its child's commitments.
        for k in 1..depth {
            let mut h = Sha256::new();
            h.update(g1_bytes(&self.v[k]));
            if k < depth - 1 {
                h.update(g1_bytes(&self.w[k]));
            }
            let expected = field_from_digest(&h.finalize().into());
            if self.digests[k - 1] != expected {
                return Err(SolvencyError::HashChainMismatch(k));
            }
        }

        let indices: Vec<usize> = path[..depth - 1].iter().map(|p| *p as usize).collect();
        pointproofs::verify_aggregation(
            pp,
            &indices,
            &self.w,
            &self.pointproof_pi,
            &self.pointproof_sigma,
            pointproofs::ro,
        )?;

        sum_argument::verify_aggregated(&params.sum, &self.sum_argument, &self.v)?;

        let mut i = indices;
        let mut j = vec![params.fanout as usize; depth - 1];
        let mut v = self.v[..depth - 1].to_vec();
        let mut w = self.v[1..].to_vec();
        let zero_commitment =
            pointproofs::commit(pp, &zeros(params.fanout as usize + 2));
        while v.len() < params.equality_slots {
            i.push(0);
            j.push(0);
            v.push(zero_commitment);
            w.push(zero_commitment);
        }
        let equalities = Equalities {
            params: &params.poe,
            v,
            w,
            i,
            j,
        };
        equalities.verify(&self.equality)?;

        Ok(())
    }

    /// Byte size of the serialized proof.
    pub fn size(&self) -> usize {
        self.compressed_size()
    }
}
