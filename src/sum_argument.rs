//! Sum arguments.
//!
//! Proves the last coordinate of a committed vector equals the sum of the
//! remaining coordinates, against the fixed test vector b = (1, …, 1, −1).
//! Many commitments aggregate into a single argument through an HVZK
//! power-series challenge.

use crate::error::SolvencyError;
use crate::ipa::{InnerProductArgument, InnerProductProof, IpaParams};
use crate::math::*;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_std::{One, UniformRand, Zero};
use rand_core::RngCore;
use sha2::{Digest, Sha256};

/// Public parameters for sum arguments over vectors of length `n`.
#[derive(Clone)]
pub struct SumParams {
    /// Claim generator handed to the bundled inner-product argument.
    pub u: G1,
    /// Coordinate bases; grafted from the vertex commitment scheme at
    /// liability-set setup.
    pub gs: Vec<G1>,
    pub g: G1,
    /// Blinding base; grafted alongside `gs`.
    pub f: G1,
    /// b-side bases of the bundled argument.
    pub h: Vec<G1>,
    /// The fixed test vector (1, …, 1, −1).
    pub b: Vec<Zr>,
    /// B = Σ Hᵢ·bᵢ.
    pub big_b: G1,
    pub digest: [u8; 32],
}

impl SumParams {
    pub fn new(n: usize) -> Self {
        let h = derive_generators(n, "sum argument H");
        let mut b = vec![Zr::one(); n];
        b[n - 1] = -Zr::one();
        let big_b = msm(&h, &b);

        let mut params = Self {
            gs: derive_generators(n, "sum argument Gs"),
            u: derive_generator("IPA u", 0),
            g: derive_generator("sum argument G", 0),
            f: derive_generator("sum argument F", 0),
            h,
            b,
            big_b,
            digest: [0u8; 32],
        };
        params.recompute_digest();
        params
    }

    /// Recomputes the parameter digest; must run after any setup-time base
    /// substitution.
    pub fn recompute_digest(&mut self) {
        let mut hasher = Sha256::new();
        for g in &self.h {
            hasher.update(g1_bytes(g));
        }
        hasher.update(g1_bytes(&self.big_b));
        hasher.update(g1_bytes(&self.g));
        hasher.update(g1_bytes(&self.f));
        self.digest = hasher.finalize().into();
    }

    fn ipa_params(&self) -> IpaParams {
        IpaParams::from_parts(self.gs.clone(), self.h.clone(), self.u)
    }
}

/// A sum-argument proof, single or aggregated.
#[derive(Clone, Debug, CanonicalSerialize, CanonicalDeserialize)]
pub struct SumProof {
    /// Mask commitment.
    pub w: G1,
    /// ⟨w, b⟩ for the mask vector.
    pub c: Zr,
    /// ρ = −(r + x·r′).
    pub rho: Zr,
    /// The bundled inner-product argument.
    pub ipa: InnerProductProof,
}

impl SumProof {
    /// Serialized byte size.
    pub fn size(&self) -> usize {
        self.compressed_size()
    }
}

/// V = F·r + Σ Gsᵢ·vᵢ. The last coordinate must already hold the sum of the
/// others; violating that is a programming error.
pub fn commit(params: &SumParams, v: &[Zr], r: &Zr) -> G1 {
    let n = v.len();
    assert_eq!(n, params.gs.len(), "vector length differs from parameters");
    let sum: Zr = v[..n - 1].iter().sum();
    assert_eq!(v[n - 1], sum, "v[n-1] != Σ v[j], j: 0..n-2");
    params.f * r + msm(&params.gs, v)
}

/// x = FE(SHA256(c ‖ V ‖ W)).
fn challenge(c: &Zr, v: &G1, w: &G1) -> Zr {
    hash_to_scalar(&[&zr_bytes(c), &g1_bytes(v), &g1_bytes(w)])
}

/// Proves that the commitment `v_commitment` over `v` (blinding `r`) has its
/// sum in the last slot.
#[tracing::instrument(skip_all, name = "sum_argument::prove")]
pub fn prove<R: RngCore>(
    params: &SumParams,
    v_commitment: &G1,
    v: &[Zr],
    r: &Zr,
    rng: &mut R,
) -> SumProof {
    let n = v.len();
    assert_eq!(n, params.gs.len(), "vector length differs from parameters");

    let w = rand_vec(n, rng);
    let r_prime = Zr::rand(rng);
    let big_w = params.f * r_prime + msm(&params.gs, &w);

    let c = inner_product(&w, &params.b);
    let x = challenge(&c, v_commitment, &big_w);
    let rho = -(*r + x * r_prime);

    let p = params.f * rho + v_commitment + big_w * x + params.big_b;

    let a = vec_add(v, &vec_scale(&w, &x));
    let ipa = InnerProductArgument::new(&params.ipa_params(), a, params.b.clone())
        .with_commitment(p)
        .prove();

    SumProof {
        w: big_w,
        c,
        rho,
        ipa,
    }
}

/// Verifies a sum argument for `v_commitment`.
pub fn verify(
    params: &SumParams,
    proof: &SumProof,
    v_commitment: &G1,
) -> Result<(), SolvencyError> {
    let x = challenge(&proof.c, v_commitment, &proof.w);
    let p = params.f * proof.rho + v_commitment + proof.w * x + params.big_b;

    proof
        .ipa
        .verify_with(&params.ipa_params(), &p, &(proof.c * x))
        .map_err(|_| SolvencyError::SumArgumentInvalid)
}

/// The power series of the aggregation challenge τ = FE(SHA256(V₀ ‖ … )).
fn aggregation_series(commitments: &[G1], m: usize) -> Vec<Zr> {
    let tau = hash_to_scalar(&[&g1_vec_bytes(commitments)]);
    power_series(m, &tau)
}

/// Aggregates many (commitment, vector, blinding) triples into one argument
/// over their power-series combination.
#[tracing::instrument(skip_all, name = "sum_argument::prove_aggregated", fields(k = commitments.len()))]
pub fn prove_aggregated<R: RngCore>(
    params: &SumParams,
    commitments: &[G1],
    vectors: &[Vec<Zr>],
    randomness: &[Zr],
    rng: &mut R,
) -> SumProof {
    assert_eq!(
        commitments.len(),
        vectors.len(),
        "commitments and vectors of unequal length"
    );
    assert_eq!(
        commitments.len(),
        randomness.len(),
        "commitments and randomness of unequal length"
    );

    let t = aggregation_series(commitments, vectors.len());

    let width = vectors[0].len();
    let mut v_aggregated = vec![Zr::zero(); width];
    for (vector, ti) in vectors.iter().zip(&t) {
        for (acc, value) in v_aggregated.iter_mut().zip(vector) {
            *acc += *ti * value;
        }
    }
    let r_aggregated = inner_product(randomness, &t);
    let commitment_aggregated = msm(commitments, &t);

    prove(params, &commitment_aggregated, &v_aggregated, &r_aggregated, rng)
}

/// Verifies an aggregated sum argument against the original commitments.
pub fn verify_aggregated(
    params: &SumParams,
    proof: &SumProof,
    commitments: &[G1],
) -> Result<(), SolvencyError> {
    let t = aggregation_series(commitments, commitments.len());
    let commitment_aggregated = msm(commitments, &t);
    verify(params, proof, &commitment_aggregated)
}
