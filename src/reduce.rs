//! Iterated reduction: a one-vector specialization of the inner-product
//! argument.
//!
//! Given V = Σ Gᵢ·vᵢ, the prover folds the vector in halves, emitting one
//! (A, B, V') triple per round and a final length-1 scalar. The verifier
//! replays the challenges, rebuilds the folded generator vector and checks
//! the chain ends at G\[0\]·u == V_final.

use crate::error::SolvencyError;
use crate::ipa::IpaParams;
use crate::math::*;
use ark_ff::Field;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};

/// One round of the reduction transcript.
#[derive(Clone, Debug, CanonicalSerialize, CanonicalDeserialize)]
pub struct ReductionStep {
    /// A = Σ G_L·v_R.
    pub a: G1,
    /// B = Σ G_R·v_L.
    pub b: G1,
    /// The folded commitment after this round.
    pub v: G1,
}

/// Round challenge: the (A, B) oracle output is chained with the pre-round
/// commitment.
fn round_challenge(a: &G1, b: &G1, digest: &[u8; 32], prev_v: &G1) -> Zr {
    let inner = sha256_concat(&[&g1_bytes(a), &g1_bytes(b), digest]);
    hash_to_scalar(&[&inner, &g1_bytes(prev_v)])
}

/// Reduces `v` against the parameter generators, producing the transcript,
/// the per-round challenges and the final scalar.
pub fn reduce(params: &IpaParams, v: &[Zr], big_v: &G1) -> (Vec<ReductionStep>, Vec<Zr>, Zr) {
    let n = params.g.len();
    assert!(
        n.is_power_of_two() && n > 1,
        "generator vector length must be a power of two, got {n}"
    );
    assert_eq!(v.len(), n, "vector length differs from generator count");

    let mut g = params.g.clone();
    let mut v = v.to_vec();
    let mut big_v = *big_v;
    let mut steps = Vec::new();
    let mut xs = Vec::new();

    while g.len() > 1 {
        let half = g.len() / 2;
        let (g_l, g_r) = (&g[..half], &g[half..]);
        let (v_l, v_r) = (&v[..half], &v[half..]);

        let a = msm(g_l, v_r);
        let b = msm(g_r, v_l);
        let x = round_challenge(&a, &b, &params.digest, &big_v);
        let x_inv = x.inverse().expect("challenge must be invertible");

        let next_g = g1_add(g_l, &g1_scale(g_r, &x_inv));
        let next_v = vec_add(v_l, &vec_scale(v_r, &x));
        g = next_g;
        v = next_v;
        big_v = msm(&g, &v);

        xs.push(x);
        steps.push(ReductionStep { a, b, v: big_v });
    }

    (steps, xs, v[0])
}

/// Replays the transcript: rederives each challenge, checks every folded
/// commitment and the terminal equation. Returns the challenges in round
/// order.
pub fn verify(
    params: &IpaParams,
    big_v: &G1,
    steps: &[ReductionStep],
    v_final: &Zr,
) -> Result<Vec<Zr>, SolvencyError> {
    let n = params.g.len();
    assert!(
        n.is_power_of_two() && n > 1,
        "generator vector length must be a power of two, got {n}"
    );
    if steps.len() != n.trailing_zeros() as usize {
        return Err(SolvencyError::IpaMismatch);
    }

    let mut g = params.g.clone();
    let mut prev_v = *big_v;
    let mut xs = Vec::with_capacity(steps.len());

    for step in steps {
        let x = round_challenge(&step.a, &step.b, &params.digest, &prev_v);
        let x_inv = x.inverse().expect("challenge must be invertible");

        let should_be_v = step.a * x + step.b * x_inv + prev_v;
        if step.v != should_be_v {
            return Err(SolvencyError::IpaMismatch);
        }
        prev_v = step.v;

        let half = g.len() / 2;
        let next_g = g1_add(&g[..half], &g1_scale(&g[half..], &x_inv));
        g = next_g;
        xs.push(x);
    }

    if g[0] * v_final != prev_v {
        return Err(SolvencyError::IpaMismatch);
    }

    Ok(xs)
}
