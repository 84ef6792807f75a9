//! Inner-product argument.
//!
//! A Bulletproofs-style logarithmic argument of knowledge of vectors a, b
//! with published commitment P = Σ aᵢGᵢ + Σ bᵢHᵢ and claimed inner product
//! c. The claim is first absorbed into an instance-specific generator
//! (protocol 1), then reduced by recursive halving (protocol 2).

use crate::error::SolvencyError;
use crate::math::*;
use ark_ff::Field;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use sha2::{Digest, Sha256};

/// Pedersen-style generator vectors for the argument.
#[derive(Clone)]
pub struct IpaParams {
    /// Generators for the a-side.
    pub g: Vec<G1>,
    /// Generators for the b-side. May be empty when the parameters back the
    /// one-vector iterated reduction instead of a full argument.
    pub h: Vec<G1>,
    /// Generator absorbing the inner-product claim.
    pub u: G1,
    /// SHA-256 over U and the interleaved G/H entries.
    pub digest: [u8; 32],
}

impl IpaParams {
    pub fn new(n: usize) -> Self {
        let mut params = Self {
            g: derive_generators(n, "g"),
            h: derive_generators(n, "h"),
            u: derive_generator("u", 0),
            digest: [0u8; 32],
        };
        params.recompute_digest();
        params
    }

    /// Assembles parameters from existing generator vectors (composing
    /// protocols substitute their own bases) and seals the digest.
    pub fn from_parts(g: Vec<G1>, h: Vec<G1>, u: G1) -> Self {
        let mut params = Self {
            g,
            h,
            u,
            digest: [0u8; 32],
        };
        params.recompute_digest();
        params
    }

    pub fn recompute_digest(&mut self) {
        let mut h = Sha256::new();
        h.update(g1_bytes(&self.u));
        for i in 0..self.g.len() {
            h.update(g1_bytes(&self.g[i]));
            if !self.h.is_empty() {
                h.update(g1_bytes(&self.h[i]));
            }
        }
        self.digest = h.finalize().into();
    }
}

/// An argument instance held by the prover.
pub struct InnerProductArgument<'a> {
    params: &'a IpaParams,
    a: Vec<Zr>,
    b: Vec<Zr>,
    c: Zr,
    p: G1,
}

/// The non-interactive proof.
///
/// `p` and `c` are advisory-from-prover: a verifying caller always overwrites
/// them with locally recomputed values ([`InnerProductProof::verify_with`]).
#[derive(Clone, Debug, CanonicalSerialize, CanonicalDeserialize)]
pub struct InnerProductProof {
    /// (L, R) pair per halving round, in round order.
    pub lrs: Vec<G1>,
    /// Final folded a.
    pub a: Zr,
    /// Final folded b.
    pub b: Zr,
    /// Commitment the argument was produced against.
    pub p: G1,
    /// Claimed inner product.
    pub c: Zr,
}

impl<'a> InnerProductArgument<'a> {
    /// Builds an instance for vectors a, b: c = ⟨a, b⟩ and
    /// P = Σ aᵢGᵢ + Σ bᵢHᵢ.
    pub fn new(params: &'a IpaParams, a: Vec<Zr>, b: Vec<Zr>) -> Self {
        assert_eq!(
            a.len(),
            b.len(),
            "vector a is of length {} but vector b is of length {}",
            a.len(),
            b.len()
        );
        assert_eq!(a.len(), params.g.len(), "vectors do not match parameters");
        assert!(a.len().is_power_of_two(), "length must be a power of two");

        let c = inner_product(&a, &b);
        let p = msm(&params.g, &a) + msm(&params.h, &b);
        Self { params, a, b, c, p }
    }

    /// Replaces the commitment with one supplied by a composing protocol
    /// (which has folded blinding terms into it).
    pub fn with_commitment(mut self, p: G1) -> Self {
        self.p = p;
        self
    }

    /// Runs protocols 1 and 2 and emits the proof.
    #[tracing::instrument(skip_all, name = "ipa::prove", fields(n = self.a.len()))]
    pub fn prove(self) -> InnerProductProof {
        let (u, digest, p) = instance_params(self.params, &self.p, &self.c);

        let mut g = self.params.g.clone();
        let mut h = self.params.h.clone();
        let mut a = self.a;
        let mut b = self.b;
        let mut p = p;
        let mut lrs = Vec::with_capacity(2 * a.len().trailing_zeros() as usize);

        while g.len() > 1 {
            let n = g.len() / 2;
            let (a_l, a_r) = (&a[..n], &a[n..]);
            let (b_l, b_r) = (&b[..n], &b[n..]);
            let (g_l, g_r) = (&g[..n], &g[n..]);
            let (h_l, h_r) = (&h[..n], &h[n..]);

            let c_l = inner_product(a_l, b_r);
            let c_r = inner_product(a_r, b_l);
            let l = msm(g_r, a_l) + msm(h_l, b_r) + u * c_l;
            let r = msm(g_l, a_r) + msm(h_r, b_l) + u * c_r;

            let round = fold_round(&l, &r, &digest, g_l, g_r, h_l, h_r, &p);

            let next_a = vec_add(&vec_scale(a_l, &round.x), &vec_scale(a_r, &round.x_inv));
            let next_b = vec_add(&vec_scale(b_l, &round.x_inv), &vec_scale(b_r, &round.x));
            a = next_a;
            b = next_b;
            g = round.g;
            h = round.h;
            p = round.p;

            lrs.push(l);
            lrs.push(r);
        }

        InnerProductProof {
            lrs,
            a: a[0],
            b: b[0],
            p: self.p,
            c: self.c,
        }
    }
}

impl InnerProductProof {
    /// Serialized byte size.
    pub fn size(&self) -> usize {
        self.compressed_size()
    }

    /// Verifies against the advisory `p`/`c` carried in the proof.
    pub fn verify(&self, params: &IpaParams) -> Result<(), SolvencyError> {
        self.verify_with(params, &self.p, &self.c)
    }

    /// Verifies against a commitment and claim recomputed by the caller.
    #[tracing::instrument(skip_all, name = "ipa::verify", fields(n = params.g.len()))]
    pub fn verify_with(
        &self,
        params: &IpaParams,
        p: &G1,
        c: &Zr,
    ) -> Result<(), SolvencyError> {
        let (u, digest, mut p) = instance_params(params, p, c);

        let rounds = params.g.len().trailing_zeros() as usize;
        if self.lrs.len() != 2 * rounds {
            return Err(SolvencyError::IpaMismatch);
        }

        let mut g = params.g.clone();
        let mut h = params.h.clone();
        for k in 0..rounds {
            let n = g.len() / 2;
            let (l, r) = (self.lrs[2 * k], self.lrs[2 * k + 1]);
            let round = fold_round(&l, &r, &digest, &g[..n], &g[n..], &h[..n], &h[n..], &p);
            g = round.g;
            h = round.h;
            p = round.p;
        }

        let expected = g[0] * self.a + h[0] * self.b + u * (self.a * self.b);
        if expected == p {
            Ok(())
        } else {
            Err(SolvencyError::IpaMismatch)
        }
    }
}

/// Protocol 1: absorbs the claim into an instance-specific generator.
/// Returns (x·U, the digest binding the scaled U, P + U·(x·c)).
fn instance_params(params: &IpaParams, p: &G1, c: &Zr) -> (G1, [u8; 32], G1) {
    let x = hash_to_scalar(&[&g1_bytes(p), &params.digest]);
    let u = params.u * x;

    let mut scaled = params.clone();
    scaled.u = u;
    scaled.recompute_digest();

    (u, scaled.digest, *p + params.u * (x * c))
}

struct FoldedRound {
    x: Zr,
    x_inv: Zr,
    g: Vec<G1>,
    h: Vec<G1>,
    p: G1,
}

/// One halving round shared by prover and verifier: derives the challenge
/// from (L, R), folds the generators and accumulates P.
#[allow(clippy::too_many_arguments)]
fn fold_round(
    l: &G1,
    r: &G1,
    digest: &[u8; 32],
    g_l: &[G1],
    g_r: &[G1],
    h_l: &[G1],
    h_r: &[G1],
    p: &G1,
) -> FoldedRound {
    let x = hash_to_scalar(&[&g1_bytes(l), &g1_bytes(r), digest]);
    let x_inv = x.inverse().expect("challenge must be invertible");

    let g = g1_add(&g1_scale(g_l, &x_inv), &g1_scale(g_r, &x));
    let h = g1_add(&g1_scale(h_l, &x), &g1_scale(h_r, &x_inv));

    let x_sq = x.square();
    let x_sq_inv = x_sq.inverse().expect("challenge must be invertible");
    let p = *l * x_sq + p + *r * x_sq_inv;

    FoldedRound { x, x_inv, g, h, p }
}
