//! Proofs of equality across vector commitments.
//!
//! Certifies that coordinate i of a commitment V equals coordinate j of a
//! commitment W without revealing the value — singly, or batched over m
//! pairs with one inner-product argument replacing the per-pair scalar
//! checks. Batch size must be a power of two; callers pad with zero vectors
//! and zero commitments.

use crate::error::SolvencyError;
use crate::ipa::{InnerProductArgument, InnerProductProof, IpaParams};
use crate::math::*;
use crate::pointproofs::{self, PointproofsParams};
use ark_ec::Group;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_std::UniformRand;
use rand_core::RngCore;
use sha2::{Digest, Sha256};

/// Public parameters: a Pointproofs instance of size `n` plus Pedersen bases
/// of length `m` for the batched argument.
#[derive(Clone)]
pub struct PoeParams {
    pub pp: PointproofsParams,
    /// a-side bases for the batched argument, one per equality pair.
    pub g: Vec<G1>,
    /// b-side bases for the batched argument.
    pub h: Vec<G1>,
    /// Blinding base.
    pub f: G1,
    pub digest: [u8; 32],
}

impl PoeParams {
    pub fn new<R: RngCore>(n: usize, m: usize, rng: &mut R) -> Self {
        let mut params = Self {
            pp: PointproofsParams::setup(n, rng),
            g: derive_generators(m, "POE G"),
            h: derive_generators(m, "POE H"),
            f: derive_generator("POE F", 0),
            digest: [0u8; 32],
        };
        params.setup_digest();
        params
    }

    pub fn setup_digest(&mut self) {
        let mut h = Sha256::new();
        h.update(g1_vec_bytes(&self.g));
        h.update(g1_vec_bytes(&self.h));
        h.update(g1_bytes(&self.f));
        h.update(self.pp.digest);
        self.digest = h.finalize().into();
    }
}

/// Deterministic oracle yielding `count` scalars keyed by the compressed
/// transcript of group elements, index pairs and the parameter digest.
pub fn ro(elements: &[G1], integers: &[u16], params_digest: &[u8; 32], count: usize) -> Vec<Zr> {
    let mut h = Sha256::new();
    for e in elements {
        h.update(g1_bytes(e));
    }
    for i in integers {
        h.update(i.to_be_bytes());
    }
    h.update(params_digest);
    let key: [u8; 32] = h.finalize().into();

    (0..count as u16)
        .map(|i| field_from_digest(&sha256_concat(&[&key, &i.to_be_bytes()])))
        .collect()
}

/// A single equality claim: v\[i\] (under V) equals w\[j\] (under W).
pub struct Equality<'a> {
    pub params: &'a PoeParams,
    pub v: G1,
    pub w: G1,
    pub i: usize,
    pub j: usize,
}

/// Proof of a single equality.
#[derive(Clone, Debug, CanonicalSerialize, CanonicalDeserialize)]
pub struct EqualityProof {
    /// Blinded opened value c = v\[i\] + u·x.
    pub c: Zr,
    /// Mask commitment for V.
    pub v_mask: G1,
    /// Mask commitment for W.
    pub w_mask: G1,
    /// Combined opening Ω.
    pub omega: G1,
}

impl Equality<'_> {
    /// Proves v\[i\] == w\[j\]. The last entries of `v` and `w` are their
    /// blinding factors.
    pub fn prove<R: RngCore>(&self, v: &[Zr], w: &[Zr], rng: &mut R) -> EqualityProof {
        assert_eq!(v[self.i], w[self.j], "v[{}] != w[{}]", self.i, self.j);
        assert_eq!(v.len(), w.len(), "|v| != |w|");

        let n = v.len();
        let pp = &self.params.pp;
        let last = pp.g1s.len() - 1;

        let u = Zr::rand(rng);
        let eta = Zr::rand(rng);
        let nu = Zr::rand(rng);

        let v_mask = pp.g1s[self.i] * u + pp.g1s[n - 1] * nu;
        let omega_v_mask = pp.g1s[last - self.i] * nu;
        let w_mask = pp.g1s[self.j] * u + pp.g1s[n - 1] * eta;
        let omega_w_mask = pp.g1s[last - self.j] * eta;

        let x = ro(
            &[self.v, self.w, v_mask, w_mask],
            &[],
            &self.params.digest,
            1,
        )[0];

        let c = v[self.i] + u * x;
        let ts = ro(
            &[self.v, self.w, v_mask * x, w_mask * x, G1::generator() * c],
            &[self.i as u16, self.j as u16],
            &self.params.digest,
            2,
        );

        let (_, omega_v) = pointproofs::open(pp, self.i, v);
        let (_, omega_w) = pointproofs::open(pp, self.j, w);

        let omega =
            (omega_v_mask * x + omega_v) * ts[0] + (omega_w_mask * x + omega_w) * ts[1];

        EqualityProof {
            c,
            v_mask,
            w_mask,
            omega,
        }
    }

    /// Verifies a single-equality proof with one two-pair pairing check.
    pub fn verify(&self, proof: &EqualityProof) -> Result<(), SolvencyError> {
        let pp = &self.params.pp;
        let n = pp.n;

        let x = ro(
            &[self.v, self.w, proof.v_mask, proof.w_mask],
            &[],
            &self.params.digest,
            1,
        )[0];
        let ts = ro(
            &[
                self.v,
                self.w,
                proof.v_mask * x,
                proof.w_mask * x,
                G1::generator() * proof.c,
            ],
            &[self.i as u16, self.j as u16],
            &self.params.digest,
            2,
        );

        let v_combined = (proof.v_mask * x + self.v) * ts[0];
        let w_combined = (proof.w_mask * x + self.w) * ts[1];
        let left = multi_pairing(
            &[v_combined, w_combined],
            &[pp.g2s[n - 1 - self.i], pp.g2s[n - 1 - self.j]],
        );
        let right = pairing(&proof.omega, &G2::generator())
            + pairing(&pp.g1s[0], &pp.g2s[n - 1]) * (proof.c * (ts[0] + ts[1]));

        if left == right {
            Ok(())
        } else {
            Err(SolvencyError::PoeInvalid("pairing check failed".into()))
        }
    }
}

/// A batch of equality claims v_k\[I\[k\]\] == w_k\[J\[k\]\].
pub struct Equalities<'a> {
    pub params: &'a PoeParams,
    pub v: Vec<G1>,
    pub w: Vec<G1>,
    pub i: Vec<usize>,
    pub j: Vec<usize>,
}

/// Aggregated proof over a batch of equalities.
#[derive(Clone, CanonicalSerialize, CanonicalDeserialize)]
pub struct AggregatedEqualityProof {
    /// The bundled inner-product argument.
    pub ipa: InnerProductProof,
    /// ⟨u·x + v_sel, t_even + t_odd⟩.
    pub c: Zr,
    /// ρ = −(r₁·x + r₂).
    pub rho: Zr,
    /// Commitment to the per-pair mask scalars.
    pub u: G1,
    /// Commitment to the selected coordinates.
    pub v: G1,
    /// Combined opening Ω.
    pub omega: G1,
    /// Per-pair mask commitments for the W side.
    pub w_masks: Vec<G1>,
    /// Per-pair mask commitments for the V side.
    pub v_masks: Vec<G1>,
}

impl AggregatedEqualityProof {
    /// Serialized byte size.
    pub fn size(&self) -> usize {
        self.compressed_size()
    }
}

impl Equalities<'_> {
    fn validate_batch(&self, vectors: usize) {
        let m = self.v.len();
        assert_eq!(self.w.len(), m, "V is of size {m} but W is of size {}", self.w.len());
        assert_eq!(self.i.len(), m, "V is of size {m} but I is of size {}", self.i.len());
        assert_eq!(self.j.len(), m, "V is of size {m} but J is of size {}", self.j.len());
        assert_eq!(vectors, m, "V is of size {m} but {vectors} vectors supplied");
        assert!(
            m.is_power_of_two(),
            "batch size must be a power of two, got {m}"
        );
    }

    /// Proves all equalities in the batch. The last entry of every vector is
    /// its blinding factor.
    #[tracing::instrument(skip_all, name = "equality::prove", fields(m = self.v.len()))]
    pub fn prove<R: RngCore>(
        &self,
        vs: &[Vec<Zr>],
        ws: &[Vec<Zr>],
        rng: &mut R,
    ) -> AggregatedEqualityProof {
        self.validate_batch(vs.len());
        assert_eq!(vs.len(), ws.len(), "|vs| != |ws|");

        let m = self.v.len();
        let n = vs[0].len();
        let pp = &self.params.pp;
        let last = pp.g1s.len() - 1;

        let mut u = Vec::with_capacity(m);
        let mut v_masks = Vec::with_capacity(m);
        let mut w_masks = Vec::with_capacity(m);
        let mut omega_v_masks = Vec::with_capacity(m);
        let mut omega_w_masks = Vec::with_capacity(m);
        let mut omega_v_openings = Vec::with_capacity(m);
        let mut omega_w_openings = Vec::with_capacity(m);

        for k in 0..m {
            let uk = Zr::rand(rng);
            let eta = Zr::rand(rng);
            let nu = Zr::rand(rng);
            u.push(uk);

            v_masks.push(pp.g1s[self.i[k]] * uk + pp.g1s[n - 1] * nu);
            omega_v_masks.push(pp.g1s[last - self.i[k]] * nu);
            w_masks.push(pp.g1s[self.j[k]] * uk + pp.g1s[n - 1] * eta);
            omega_w_masks.push(pp.g1s[last - self.j[k]] * eta);

            omega_v_openings.push(pointproofs::open(pp, self.i[k], &vs[k]).1);
            omega_w_openings.push(pointproofs::open(pp, self.j[k], &ws[k]).1);
        }

        let mut elements: Vec<G1> = Vec::with_capacity(4 * m + 2);
        elements.extend_from_slice(&v_masks);
        elements.extend_from_slice(&w_masks);
        elements.extend_from_slice(&self.v);
        elements.extend_from_slice(&self.w);

        let x = ro(&elements, &[], &self.params.digest, 1)[0];

        let r1 = Zr::rand(rng);
        let r2 = Zr::rand(rng);

        let v_selected: Vec<Zr> = (0..m).map(|k| vs[k][self.i[k]]).collect();
        let u_commitment = self.params.f * r1 + msm(&self.params.g, &u);
        let v_commitment = self.params.f * r2 + msm(&self.params.g, &v_selected);

        elements.push(u_commitment);
        elements.push(v_commitment);
        let ts = ro(&elements, &[], &self.params.digest, 2 * m);
        let t_even = evens(&ts);
        let t_odd = odds(&ts);

        let omega = msm(
            &g1_add(&g1_scale(&omega_v_masks, &x), &omega_v_openings),
            &t_even,
        ) + msm(
            &g1_add(&g1_scale(&omega_w_masks, &x), &omega_w_openings),
            &t_odd,
        );

        let a = vec_add(&vec_scale(&u, &x), &v_selected);
        let b = vec_add(&t_even, &t_odd);

        let rho = -(r1 * x + r2);
        let p = self.params.f * rho
            + u_commitment * x
            + v_commitment
            + msm(&self.params.h, &b);

        let ipa_params = self.ipa_params();
        let ipa = InnerProductArgument::new(&ipa_params, a, b)
            .with_commitment(p)
            .prove();

        AggregatedEqualityProof {
            c: ipa.c,
            rho,
            u: u_commitment,
            v: v_commitment,
            omega,
            w_masks,
            v_masks,
            ipa,
        }
    }

    /// Verifies an aggregated equality proof: one batched pairing identity
    /// plus the bundled inner-product argument.
    #[tracing::instrument(skip_all, name = "equality::verify", fields(m = self.v.len()))]
    pub fn verify(&self, proof: &AggregatedEqualityProof) -> Result<(), SolvencyError> {
        let m = self.v.len();
        let n = self.params.pp.n;
        if proof.v_masks.len() != m || proof.w_masks.len() != m {
            return Err(SolvencyError::PoeInvalid("mask count mismatch".into()));
        }

        let mut elements: Vec<G1> = Vec::with_capacity(4 * m + 2);
        elements.extend_from_slice(&proof.v_masks);
        elements.extend_from_slice(&proof.w_masks);
        elements.extend_from_slice(&self.v);
        elements.extend_from_slice(&self.w);

        let x = ro(&elements, &[], &self.params.digest, 1)[0];

        elements.push(proof.u);
        elements.push(proof.v);
        let ts = ro(&elements, &[], &self.params.digest, 2 * m);
        let t_even = evens(&ts);
        let t_odd = odds(&ts);

        let g2s_v: Vec<G2> = self.i.iter().map(|i| self.params.pp.g2s[n - 1 - i]).collect();
        let g2s_w: Vec<G2> = self.j.iter().map(|j| self.params.pp.g2s[n - 1 - j]).collect();

        let v_combined = g1_mulv(&g1_add(&self.v, &g1_scale(&proof.v_masks, &x)), &t_even);
        let w_combined = g1_mulv(&g1_add(&self.w, &g1_scale(&proof.w_masks, &x)), &t_odd);
        let left = multi_pairing(&v_combined, &g2s_v) + multi_pairing(&w_combined, &g2s_w);

        let right = pairing(&proof.omega, &G2::generator())
            + pairing(&(self.params.pp.g1s[0] * proof.c), &self.params.pp.g2s[n - 1]);

        if left != right {
            return Err(SolvencyError::PoeInvalid(
                "aggregation condition not satisfied".into(),
            ));
        }

        let b = vec_add(&t_even, &t_odd);
        let p = self.params.f * proof.rho
            + proof.u * x
            + proof.v
            + msm(&self.params.h, &b);

        proof
            .ipa
            .verify_with(&self.ipa_params(), &p, &proof.c)
            .map_err(|_| SolvencyError::PoeInvalid("inner product proof invalid".into()))
    }

    fn ipa_params(&self) -> IpaParams {
        IpaParams::from_parts(
            self.params.g.clone(),
            self.params.h.clone(),
            derive_generator("u", 0),
        )
    }
}
