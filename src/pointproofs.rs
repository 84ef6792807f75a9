//! Pointproofs vector commitments.
//!
//! Commitments of fixed length N with constant-size openings at a position,
//! in-place updates and multi-commitment aggregation verified by a single
//! pairing check. Binding rests on q-SDH; hiding is not claimed — callers
//! reserve a blinding slot in the committed vector.

use crate::error::SolvencyError;
use crate::math::*;
use ark_ec::Group;
use ark_ff::Field;
use ark_std::UniformRand;
use rand_core::RngCore;
use sha2::{Digest, Sha256};

/// Public parameters for commitments of length `n`.
///
/// `g1s` holds 2n entries for the exponents α¹‥α²ⁿ — except index n
/// (0-based), which would be g^{α^{n+1}}: exposing that element would break
/// binding, so the plain generator is placed there instead. Every code path
/// that walks across the gap must preserve this convention.
#[derive(Clone)]
pub struct PointproofsParams {
    /// Commitment vector length.
    pub n: usize,
    /// g₁^{αⁱ} for i ∈ \[1,n\]∪\[n+2,2n\], with the generator at the gap.
    pub g1s: Vec<G1>,
    /// g₂^{αⁱ} for i ∈ \[1,n\].
    pub g2s: Vec<G2>,
    /// gt^{α^{n+1}}.
    pub gt: Gt,
    /// SHA-256 over the canonical bytes of all elements above.
    pub digest: [u8; 32],
}

impl PointproofsParams {
    /// Samples a fresh trapdoor α, derives the parameters and discards it.
    pub fn setup<R: RngCore>(n: usize, rng: &mut R) -> Self {
        let alpha = Zr::rand(rng);
        let g1 = G1::generator();
        let g2 = G2::generator();

        let mut g1s = Vec::with_capacity(2 * n);
        for i in 1..=n {
            g1s.push(g1 * alpha.pow([i as u64]));
        }
        // The generator stands in for g^{α^{n+1}}.
        g1s.push(g1);
        for i in n + 2..=2 * n {
            g1s.push(g1 * alpha.pow([i as u64]));
        }

        let g2s: Vec<G2> = (1..=n).map(|i| g2 * alpha.pow([i as u64])).collect();
        let gt = pairing(&g1, &g2) * alpha.pow([n as u64 + 1]);

        let mut params = Self {
            n,
            g1s,
            g2s,
            gt,
            digest: [0u8; 32],
        };
        params.setup_digest();
        params
    }

    /// Recomputes the parameter digest. Runs at setup; any later field
    /// mutation must call this again before the parameters are used.
    pub fn setup_digest(&mut self) {
        let mut h = Sha256::new();
        for g in &self.g1s {
            h.update(g1_bytes(g));
        }
        for g in &self.g2s {
            h.update(g2_bytes(g));
        }
        h.update(gt_bytes(&self.gt));
        self.digest = h.finalize().into();
    }
}

/// C = Σ_{j=1..n} m\[j−1\]·g₁^{αʲ}.
pub fn commit(params: &PointproofsParams, m: &[Zr]) -> G1 {
    assert_eq!(
        m.len(),
        params.n,
        "message should be of size {} but is of size {}",
        params.n,
        m.len()
    );
    msm(&params.g1s[..params.n], m)
}

/// Opens coordinate `i`, returning (m\[i\], π).
pub fn open(params: &PointproofsParams, i: usize, m: &[Zr]) -> (Zr, G1) {
    assert!(
        i < params.n,
        "can only open an index in [0,{})",
        params.n
    );
    assert_eq!(m.len(), params.n, "message length differs from N");

    let shift = params.n - i;
    let mut elements = Vec::with_capacity(params.n - 1);
    let mut exponents = Vec::with_capacity(params.n - 1);
    for j in 1..=params.n {
        if j == i + 1 {
            continue;
        }
        elements.push(params.g1s[shift + j - 1]);
        exponents.push(m[j - 1]);
    }

    (m[i], msm(&elements, &exponents))
}

/// Checks e(C, g₂^{α^{n−i}}) == e(π, g₂) · gt^{mᵢ}.
pub fn verify(
    params: &PointproofsParams,
    mi: &Zr,
    proof: &G1,
    commitment: &G1,
    i: usize,
) -> Result<(), SolvencyError> {
    let left = pairing(commitment, &params.g2s[params.n - i - 1]);
    let right = pairing(proof, &G2::generator()) + params.gt * *mi;
    if left == right {
        Ok(())
    } else {
        Err(SolvencyError::InvalidOpening(i))
    }
}

/// Replaces coordinate `i` of the committed vector in place:
/// C ← C − m\[i\]·g₁^{α^{i+1}} + mᵢ'·g₁^{α^{i+1}}.
pub fn update(params: &PointproofsParams, commitment: &mut G1, m: &[Zr], new_mi: &Zr, i: usize) {
    *commitment += params.g1s[i] * (*new_mi - m[i]);
}

/// Deterministic aggregation coefficient for the j-th commitment in a batch.
pub fn ro(params: &PointproofsParams, commitments: &[G1], j: usize) -> Zr {
    let mut h = Sha256::new();
    h.update(params.digest);
    h.update([j as u8]);
    for c in commitments {
        h.update(g1_bytes(c));
    }
    field_from_digest(&h.finalize().into())
}

/// Aggregates openings of several commitments into one proof:
/// π* = Σ_j RO(Cs, j)·π_j.
pub fn aggregate<F>(
    params: &PointproofsParams,
    commitments: &[G1],
    proofs: &[G1],
    ro: F,
) -> G1
where
    F: Fn(&PointproofsParams, &[G1], usize) -> Zr,
{
    assert_eq!(
        proofs.len(),
        commitments.len(),
        "cannot aggregate {} proofs corresponding to {} commitments",
        proofs.len(),
        commitments.len()
    );
    let coefficients: Vec<Zr> = (0..proofs.len())
        .map(|j| ro(params, commitments, j))
        .collect();
    msm(proofs, &coefficients)
}

/// One pairing check for a batch of openings at `indices`, against the
/// weighted sum Σ of the opened values.
pub fn verify_aggregation<F>(
    params: &PointproofsParams,
    indices: &[usize],
    commitments: &[G1],
    proof: &G1,
    sigma: &Zr,
    ro: F,
) -> Result<(), SolvencyError>
where
    F: Fn(&PointproofsParams, &[G1], usize) -> Zr,
{
    assert_eq!(
        indices.len(),
        commitments.len(),
        "indices and commitments of unequal length"
    );
    let exponents: Vec<Zr> = (0..indices.len())
        .map(|j| ro(params, commitments, j))
        .collect();
    let g2s: Vec<G2> = indices
        .iter()
        .map(|i| params.g2s[params.n - i - 1])
        .collect();
    let left = multi_pairing(commitments, &g2_mulv(&g2s, &exponents));
    let right = params.gt * *sigma + pairing(proof, &G2::generator());
    if left == right {
        Ok(())
    } else {
        Err(SolvencyError::PointproofAggregationInvalid)
    }
}
