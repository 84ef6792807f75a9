//! Range proofs for committed vectors.
//!
//! Proves every leading coordinate of a committed vector lies in
//! \[0, 2^63). The committed vector is first reduced to a single scalar by
//! the iterated reduction against a blinded combination U = F·γ + V + W·x,
//! then the bit decomposition of the coordinates is tied to that scalar via
//! a two-phase blinded polynomial identity, finishing in one inner-product
//! argument.

use crate::error::SolvencyError;
use crate::ipa::{InnerProductArgument, InnerProductProof, IpaParams};
use crate::math::*;
use crate::reduce::{self, ReductionStep};
use ark_ff::Field;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_std::UniformRand;
use rand_core::RngCore;
use sha2::{Digest, Sha256};

/// Coordinates are proven to fit this many bits.
pub const RANGE_BITS: usize = 63;

/// Generators for range proofs over vectors of `n` coordinates.
#[derive(Clone)]
pub struct RangeParams {
    pub g: G1,
    pub h: G1,
    pub f: G1,
    /// Coordinate bases; shared with the vertex commitment scheme.
    pub gs: Vec<G1>,
    /// Bit bases, n·64 entries.
    pub hs: Vec<G1>,
    /// Complement-bit bases, n·64 entries.
    pub fs: Vec<G1>,
    pub digest: [u8; 32],
}

impl RangeParams {
    pub fn new(n: usize) -> Self {
        let m = RANGE_BITS;
        let mut params = Self {
            g: derive_generator("range proof G", 0),
            h: derive_generator("range proof H", 0),
            f: derive_generator("range proof F", 0),
            fs: derive_generators(n * (m + 1), "range proof Fs"),
            hs: derive_generators(n * (m + 1), "range proof Hs"),
            gs: derive_generators(n, "range proof Gs"),
            digest: [0u8; 32],
        };
        params.recompute_digest();
        params
    }

    /// Recomputes the parameter digest; must run after any setup-time base
    /// substitution.
    pub fn recompute_digest(&mut self) {
        let mut h = Sha256::new();
        h.update(g1_bytes(&self.g));
        h.update(g1_bytes(&self.h));
        h.update(g1_bytes(&self.f));
        h.update(g1_vec_bytes(&self.gs));
        h.update(g1_vec_bytes(&self.hs));
        h.update(g1_vec_bytes(&self.fs));
        self.digest = h.finalize().into();
    }
}

/// A per-vertex range proof.
#[derive(Clone, CanonicalSerialize, CanonicalDeserialize)]
pub struct RangeProof {
    /// Iterated-reduction transcript Δ.
    pub steps: Vec<ReductionStep>,
    /// Final scalar of the reduction.
    pub u: Zr,
    /// Mask commitment for the reduction phase.
    pub w: G1,
    /// Blinding folded into the reduced commitment, γ = −(r + x·r′).
    pub gamma: Zr,
    /// The bundled inner-product argument.
    pub ipa: InnerProductProof,
    /// Claimed inner product of the blinded bit vectors.
    pub c: Zr,
    /// Commitment to the bit vector and its complement.
    pub q: G1,
    /// Commitment to the blinding vectors.
    pub r: G1,
    /// First polynomial-coefficient commitment.
    pub c1: G1,
    /// Second polynomial-coefficient commitment.
    pub c2: G1,
    /// Combined coefficient blinding, τ = τ₁·z + τ₂·z².
    pub tau: Zr,
    /// Combined mask blinding, ρ = −(ν + η·z).
    pub rho: Zr,
}

impl RangeProof {
    /// Serialized byte size.
    pub fn size(&self) -> usize {
        self.compressed_size()
    }
}

fn reduction_params(params: &RangeParams) -> IpaParams {
    IpaParams::from_parts(
        params.gs.clone(),
        Vec::new(),
        derive_generator("U range proof", 0),
    )
}

/// F′ = Fs ⊙ y0^{-powers}, the b-side bases of the bundled argument.
fn shifted_complement_bases(params: &RangeParams, y0_inv: &Zr) -> Vec<G1> {
    g1_mulv(&params.fs, &power_series(params.fs.len(), y0_inv))
}

fn ipa_generators(params: &RangeParams, f_prime: Vec<G1>) -> IpaParams {
    IpaParams::from_parts(params.hs.clone(), f_prime, derive_generator("u", 0))
}

/// x = FE(SHA256(digest ‖ V ‖ W)).
fn mask_challenge(params: &RangeParams, v: &G1, w: &G1) -> Zr {
    hash_to_scalar(&[&params.digest, &g1_bytes(v), &g1_bytes(w)])
}

/// Domain-separated pair of challenges bound to the bit commitments.
fn bit_challenges(params: &RangeParams, q: &G1, r: &G1) -> (Zr, Zr) {
    let y0 = hash_to_scalar(&[&g1_bytes(q), &g1_bytes(r), &[0u8], &params.digest]);
    let y1 = hash_to_scalar(&[&g1_bytes(q), &g1_bytes(r), &[1u8], &params.digest]);
    (y0, y1)
}

/// z = FE(SHA256(Q ‖ R ‖ digest ‖ C1 ‖ C2)).
fn coefficient_challenge(params: &RangeParams, c1: &G1, c2: &G1, q: &G1, r: &G1) -> Zr {
    hash_to_scalar(&[
        &g1_bytes(q),
        &g1_bytes(r),
        &params.digest,
        &g1_bytes(c1),
        &g1_bytes(c2),
    ])
}

/// f\[i\] = Π_k xs\[k\]^{bit_k(i)} for every position i.
fn position_fingerprints(n: usize, xs: &[Zr]) -> Vec<Zr> {
    (0..n as u16)
        .map(|i| bit_selected_product(xs, &bit_decomposition(i, n as u16 - 1)))
        .collect()
}

/// The interleaving \[2^j·f\[i\]\]_{i,j} ‖ f·x of length n·63 + n.
fn compute_d(n: usize, f: &[Zr], x: &Zr) -> Vec<Zr> {
    let mut d = Vec::with_capacity(n * RANGE_BITS + n);
    for fi in f.iter().take(n) {
        for j in 0..RANGE_BITS {
            d.push(pow2(j) * fi);
        }
    }
    d.extend(vec_scale(f, x));
    d
}

/// 63-bit little-endian decomposition of every coordinate; rejects
/// coordinates outside the range.
fn bit_vector(v: &[Zr]) -> Result<Vec<Zr>, SolvencyError> {
    let mut bits = Vec::with_capacity(v.len() * RANGE_BITS);
    for coord in v {
        let value = scalar_to_u64(coord)
            .filter(|x| *x < 1u64 << RANGE_BITS)
            .ok_or_else(|| {
                SolvencyError::MalformedInput(format!(
                    "range proof coordinate exceeds {RANGE_BITS} bits"
                ))
            })?;
        for j in 0..RANGE_BITS {
            bits.push(Zr::from((value >> j) & 1));
        }
    }
    Ok(bits)
}

/// Proves every coordinate of `v` (committed in `v_commitment` with blinding
/// `r` under Gs and F) lies in \[0, 2^63).
#[tracing::instrument(skip_all, name = "range::prove", fields(n = v.len()))]
pub fn prove_range<R: RngCore>(
    params: &RangeParams,
    v_commitment: &G1,
    v: &[Zr],
    r: &Zr,
    rng: &mut R,
) -> Result<RangeProof, SolvencyError> {
    let n = params.gs.len();
    let m = RANGE_BITS;
    assert_eq!(v.len(), n, "vector length differs from parameter size");

    let mut v_bits = bit_vector(v)?;

    let w = rand_vec(n, rng);
    let r_prime = Zr::rand(rng);
    let big_w = params.f * r_prime + msm(&params.gs, &w);

    let x = mask_challenge(params, v_commitment, &big_w);
    let gamma = -(*r + x * r_prime);
    let u_commitment = params.f * gamma + v_commitment + big_w * x;

    let ir_params = reduction_params(params);
    let reduced = vec_add(v, &vec_scale(&w, &x));
    let (steps, xs, u) = reduce::reduce(&ir_params, &reduced, &u_commitment);
    let xs: Vec<Zr> = xs.into_iter().rev().collect();

    let f = position_fingerprints(n, &xs);
    let d = compute_d(n, &f, &x);

    v_bits.extend_from_slice(&w);
    let w_caret = vec_sub(&ones(n * m), &v_bits[..n * m]);

    let nu = Zr::rand(rng);
    let eta = Zr::rand(rng);
    let q = params.f * nu + msm(&params.hs, &v_bits) + msm(&params.fs[..n * m], &w_caret);

    let s = rand_vec(n * m + n, rng);
    let t = rand_vec(n * m, rng);
    let r_commitment = params.f * eta + msm(&params.hs, &s) + msm(&params.fs[..n * m], &t);

    let (y0, y1) = bit_challenges(params, &q, &r_commitment);
    let y0v = power_series(n * m, &y0);
    let y1v = vec_scale(&ones(n * m), &y1);
    let pad = zeros(n);

    let a_prime = vec_add(&v_bits, &concat(&y1v, &pad));
    let b_prime = vec_add(
        &vec_add(
            &vec_scale(&d, &y1.square()),
            &vec_scale(&concat(&y0v, &pad), &y1),
        ),
        &concat(&hadamard(&w_caret, &y0v), &pad),
    );

    let y0t = hadamard(&y0v, &t);
    let c1 = inner_product(&a_prime[..n * m], &y0t) + inner_product(&s, &b_prime);
    let c2 = inner_product(&s[..n * m], &y0t);

    let tau1 = Zr::rand(rng);
    let tau2 = Zr::rand(rng);
    let c1_commitment = params.g * c1 + params.h * tau1;
    let c2_commitment = params.g * c2 + params.h * tau2;

    let z = coefficient_challenge(params, &c1_commitment, &c2_commitment, &q, &r_commitment);
    let rho = -(nu + eta * z);
    let tau = tau1 * z + tau2 * z.square();

    let a = vec_add(&a_prime, &vec_scale(&s, &z));
    let b = vec_add(&b_prime, &vec_scale(&concat(&y0t, &pad), &z));
    let c = inner_product(&a, &b);

    let y0_inv = y0.inverse().expect("challenge must be invertible");
    let ipa_params = ipa_generators(params, shifted_complement_bases(params, &y0_inv));
    let ipa = InnerProductArgument::new(&ipa_params, a, b).prove();
    ipa.verify(&ipa_params)
        .expect("freshly produced inner-product proof must verify");

    Ok(RangeProof {
        steps,
        u,
        w: big_w,
        gamma,
        ipa,
        c,
        q,
        r: r_commitment,
        c1: c1_commitment,
        c2: c2_commitment,
        tau,
        rho,
    })
}

/// P = F·ρ + Q + R·z + Σ Hs·y1v + Σ F′·(d·y1²) + Σ Fs·y1v.
#[allow(clippy::too_many_arguments)]
fn expected_commitment(
    params: &RangeParams,
    proof: &RangeProof,
    z: &Zr,
    y1v: &[Zr],
    f_prime: &[G1],
    d: &[Zr],
    y1: &Zr,
) -> G1 {
    let n = params.gs.len();
    let m = RANGE_BITS;
    params.f * proof.rho
        + proof.q
        + proof.r * z
        + msm(&params.hs[..n * m], y1v)
        + msm(f_prime, &vec_scale(d, &y1.square()))
        + msm(&params.fs[..n * m], y1v)
}

/// Verifies a range proof against the commitment `v_commitment`.
#[tracing::instrument(skip_all, name = "range::verify")]
pub fn verify_range(
    params: &RangeParams,
    proof: &RangeProof,
    v_commitment: &G1,
) -> Result<(), SolvencyError> {
    let n = params.gs.len();
    let m = RANGE_BITS;

    let x = mask_challenge(params, v_commitment, &proof.w);
    let u_commitment = params.f * proof.gamma + v_commitment + proof.w * x;

    let ir_params = reduction_params(params);
    let xs = reduce::verify(&ir_params, &u_commitment, &proof.steps, &proof.u)
        .map_err(|_| SolvencyError::RangeProofInvalid("iterated reduction invalid".into()))?;
    let xs: Vec<Zr> = xs.into_iter().rev().collect();

    let f = position_fingerprints(n, &xs);
    let d = compute_d(n, &f, &x);

    let (y0, y1) = bit_challenges(params, &proof.q, &proof.r);
    let y0v = power_series(n * m, &y0);
    let y1v = vec_scale(&ones(n * m), &y1);
    let z = coefficient_challenge(params, &proof.c1, &proof.c2, &proof.q, &proof.r);

    let y0_inv = y0.inverse().expect("challenge must be invertible");
    let f_prime = shifted_complement_bases(params, &y0_inv);
    let ipa_params = ipa_generators(params, f_prime.clone());

    let p = expected_commitment(params, proof, &z, &y1v, &f_prime, &d, &y1);
    proof
        .ipa
        .verify_with(&ipa_params, &p, &proof.c)
        .map_err(|_| SolvencyError::RangeProofInvalid("inner product proof invalid".into()))?;

    let one_vec = ones(n * m);
    let beta1 = inner_product(&one_vec, &y0v);
    let beta2 = inner_product(&one_vec, &y0v);
    let beta3 = inner_product(&one_vec, &d[..n * m]);

    let c0 = beta3 * y1.square() * y1 + y1.square() * (proof.u + beta2) + y1 * beta1;

    let left = proof.c1 * z + proof.c2 * z.square() + params.g * c0;
    let right = params.g * proof.c + params.h * proof.tau;
    if left == right {
        Ok(())
    } else {
        Err(SolvencyError::RangeProofInvalid(
            "blinded polynomial identity failed".into(),
        ))
    }
}
