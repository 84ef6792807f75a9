//! Scalar and group vector algebra over BN254.
//!
//! Everything downstream works with these concrete aliases: `Zr` for the
//! scalar field of order q, `G1`/`G2` for the source groups of the type-3
//! pairing and `Gt` for its target group. Vector operations are
//! checked-length free functions; SHA-256 is the universal random oracle and
//! [`field_from_digest`] defines the canonical digest-to-scalar reduction.

use ark_bn254::{Bn254, Fr, G1Projective, G2Projective};
use ark_ec::pairing::{Pairing, PairingOutput};
use ark_ec::{CurveGroup, VariableBaseMSM};
use ark_ff::{BigInt, Field, PrimeField};
use ark_serialize::CanonicalSerialize;
use ark_std::{One, UniformRand, Zero};
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha20Rng;
use sha2::{Digest, Sha256};

/// Element of the prime field of order q.
pub type Zr = Fr;
/// Point in the first source group.
pub type G1 = G1Projective;
/// Point in the second source group.
pub type G2 = G2Projective;
/// Element of the pairing target group.
pub type Gt = PairingOutput<Bn254>;

/// e: G1 × G2 → GT.
pub fn pairing(a: &G1, b: &G2) -> Gt {
    Bn254::pairing(a.into_affine(), b.into_affine())
}

/// Π e(aᵢ, bᵢ) with a single final exponentiation.
pub fn multi_pairing(a: &[G1], b: &[G2]) -> Gt {
    assert_eq!(a.len(), b.len(), "multi-pairing requires equal lengths");
    assert!(!a.is_empty(), "multi-pairing over empty vectors");
    let a: Vec<_> = a.iter().map(|p| p.into_affine()).collect();
    let b: Vec<_> = b.iter().map(|p| p.into_affine()).collect();
    Bn254::multi_pairing(a, b)
}

/// Multi-scalar multiplication Σ scalars\[i\]·bases\[i\].
pub fn msm(bases: &[G1], scalars: &[Zr]) -> G1 {
    assert_eq!(
        bases.len(),
        scalars.len(),
        "MSM requires equal length vectors"
    );
    if bases.is_empty() {
        return G1::zero();
    }
    let bases = G1::normalize_batch(bases);
    G1::msm(&bases, scalars).expect("MSM failed")
}

/// ⟨a, b⟩ over Zr.
pub fn inner_product(a: &[Zr], b: &[Zr]) -> Zr {
    assert_eq!(a.len(), b.len(), "inner product requires equal lengths");
    a.iter().zip(b).map(|(x, y)| *x * y).sum()
}

/// Pointwise product a ⊙ b.
pub fn hadamard(a: &[Zr], b: &[Zr]) -> Vec<Zr> {
    assert_eq!(a.len(), b.len(), "Hadamard product requires equal lengths");
    a.iter().zip(b).map(|(x, y)| *x * y).collect()
}

pub fn vec_add(a: &[Zr], b: &[Zr]) -> Vec<Zr> {
    assert_eq!(a.len(), b.len(), "vector addition requires equal lengths");
    a.iter().zip(b).map(|(x, y)| *x + y).collect()
}

pub fn vec_sub(a: &[Zr], b: &[Zr]) -> Vec<Zr> {
    assert_eq!(a.len(), b.len(), "vector subtraction requires equal lengths");
    a.iter().zip(b).map(|(x, y)| *x - y).collect()
}

pub fn vec_scale(a: &[Zr], x: &Zr) -> Vec<Zr> {
    a.iter().map(|v| *v * x).collect()
}

/// Entries at even positions (0, 2, …) of an even-length vector.
pub fn evens(a: &[Zr]) -> Vec<Zr> {
    assert_eq!(a.len() % 2, 0, "vector is of odd length");
    a.iter().step_by(2).copied().collect()
}

/// Entries at odd positions (1, 3, …) of an even-length vector.
pub fn odds(a: &[Zr]) -> Vec<Zr> {
    assert_eq!(a.len() % 2, 0, "vector is of odd length");
    a.iter().skip(1).step_by(2).copied().collect()
}

/// Pointwise aᵢ + bᵢ over G1.
pub fn g1_add(a: &[G1], b: &[G1]) -> Vec<G1> {
    assert_eq!(a.len(), b.len(), "group addition requires equal lengths");
    a.iter().zip(b).map(|(x, y)| *x + y).collect()
}

/// Every entry scaled by the same scalar.
pub fn g1_scale(a: &[G1], x: &Zr) -> Vec<G1> {
    a.iter().map(|p| *p * x).collect()
}

/// Pointwise vᵢ·aᵢ over G1.
pub fn g1_mulv(a: &[G1], v: &[Zr]) -> Vec<G1> {
    assert_eq!(a.len(), v.len(), "group/scalar vectors of unequal length");
    a.iter().zip(v).map(|(p, x)| *p * x).collect()
}

/// Pointwise vᵢ·aᵢ over G2.
pub fn g2_mulv(a: &[G2], v: &[Zr]) -> Vec<G2> {
    assert_eq!(a.len(), v.len(), "group/scalar vectors of unequal length");
    a.iter().zip(v).map(|(p, x)| *p * x).collect()
}

/// \[1, x, x², …, x^{n−1}\].
pub fn power_series(n: usize, x: &Zr) -> Vec<Zr> {
    let mut res = Vec::with_capacity(n);
    let mut next = Zr::one();
    for _ in 0..n {
        res.push(next);
        next *= x;
    }
    res
}

pub fn ones(n: usize) -> Vec<Zr> {
    vec![Zr::one(); n]
}

pub fn zeros(n: usize) -> Vec<Zr> {
    vec![Zr::zero(); n]
}

/// 2^j as a field element.
pub fn pow2(j: usize) -> Zr {
    Zr::from(2u64).pow([j as u64])
}

/// Little-endian bits of `n`, sized to represent every value up to `max`.
pub fn bit_decomposition(mut n: u16, max: u16) -> Vec<u8> {
    let bit_num = (16 - max.leading_zeros()) as usize;
    let mut res = vec![0u8; bit_num];
    let mut i = 0;
    while n > 0 {
        res[i] = (n & 1) as u8;
        n >>= 1;
        i += 1;
    }
    res
}

/// Π xs\[k\]^{bits\[k\]} — the product of the entries selected by set bits.
pub fn bit_selected_product(xs: &[Zr], bits: &[u8]) -> Zr {
    assert_eq!(xs.len(), bits.len(), "selector and base of unequal length");
    xs.iter()
        .zip(bits)
        .filter(|(_, b)| **b == 1)
        .fold(Zr::one(), |acc, (x, _)| acc * x)
}

/// The value of `x` as a u64, if it fits.
pub fn scalar_to_u64(x: &Zr) -> Option<u64> {
    let limbs = x.into_bigint().0;
    if limbs[1..].iter().any(|l| *l != 0) {
        return None;
    }
    Some(limbs[0])
}

/// a ‖ b.
pub fn concat(a: &[Zr], b: &[Zr]) -> Vec<Zr> {
    let mut res = Vec::with_capacity(a.len() + b.len());
    res.extend_from_slice(a);
    res.extend_from_slice(b);
    res
}

/// `n` uniformly random scalars.
pub fn rand_vec<R: rand_core::RngCore>(n: usize, rng: &mut R) -> Vec<Zr> {
    (0..n).map(|_| Zr::rand(rng)).collect()
}

/// SHA-256 over the concatenation of `parts`.
pub fn sha256_concat(parts: &[&[u8]]) -> [u8; 32] {
    let mut h = Sha256::new();
    for p in parts {
        h.update(p);
    }
    h.finalize().into()
}

/// Canonical reduction of a 32-byte digest to Zr: the bytes are read as a
/// big-endian integer whose top 64-bit limb is reduced modulo the modulus'
/// top limb, leaving a value strictly below q.
pub fn field_from_digest(digest: &[u8; 32]) -> Zr {
    let mut limbs = [
        u64::from_be_bytes(digest[24..32].try_into().expect("8 bytes")),
        u64::from_be_bytes(digest[16..24].try_into().expect("8 bytes")),
        u64::from_be_bytes(digest[8..16].try_into().expect("8 bytes")),
        u64::from_be_bytes(digest[0..8].try_into().expect("8 bytes")),
    ];
    limbs[3] %= Zr::MODULUS.0[3];
    Zr::from_bigint(BigInt::new(limbs)).expect("value below the modulus")
}

/// SHA-256 of the concatenated parts, reduced to Zr.
pub fn hash_to_scalar(parts: &[&[u8]]) -> Zr {
    field_from_digest(&sha256_concat(parts))
}

/// Compressed canonical bytes of a scalar.
pub fn zr_bytes(x: &Zr) -> Vec<u8> {
    let mut b = Vec::new();
    x.serialize_compressed(&mut b).expect("scalar serialization");
    b
}

/// Compressed canonical bytes of a G1 point.
pub fn g1_bytes(p: &G1) -> Vec<u8> {
    let mut b = Vec::new();
    p.serialize_compressed(&mut b).expect("point serialization");
    b
}

/// Compressed canonical bytes of a G2 point.
pub fn g2_bytes(p: &G2) -> Vec<u8> {
    let mut b = Vec::new();
    p.serialize_compressed(&mut b).expect("point serialization");
    b
}

/// Compressed canonical bytes of a GT element.
pub fn gt_bytes(x: &Gt) -> Vec<u8> {
    let mut b = Vec::new();
    x.serialize_compressed(&mut b).expect("GT serialization");
    b
}

/// Concatenated compressed bytes of a G1 vector.
pub fn g1_vec_bytes(ps: &[G1]) -> Vec<u8> {
    let mut b = Vec::new();
    for p in ps {
        b.extend_from_slice(&g1_bytes(p));
    }
    b
}

/// A nothing-up-my-sleeve G1 generator for a context label: the label and
/// index seed a ChaCha20 stream that samples a uniform group element.
pub fn derive_generator(label: &str, index: usize) -> G1 {
    let seed = sha256_concat(&[format!("solvency {label} {index}").as_bytes()]);
    let mut rng = ChaCha20Rng::from_seed(seed);
    G1::rand(&mut rng)
}

/// `n` independent derived generators under one context label.
pub fn derive_generators(n: usize, label: &str) -> Vec<G1> {
    (0..n).map(|i| derive_generator(label, i)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_reduction_is_canonical() {
        let d = sha256_concat(&[b"solvency test vector"]);
        let x = field_from_digest(&d);
        let y = field_from_digest(&d);
        assert_eq!(x, y);
        assert_ne!(x, Zr::zero());
    }

    #[test]
    fn bit_decomposition_round_trips() {
        for n in 0u16..16 {
            let bits = bit_decomposition(n, 15);
            assert_eq!(bits.len(), 4);
            let back: u16 = bits
                .iter()
                .enumerate()
                .map(|(i, b)| (*b as u16) << i)
                .sum();
            assert_eq!(back, n);
        }
    }

    #[test]
    fn derived_generators_are_stable_and_distinct() {
        let g = derive_generators(4, "g");
        let g2 = derive_generators(4, "g");
        assert_eq!(g, g2);
        assert_ne!(g[0], g[1]);
        assert_ne!(g[0], derive_generator("h", 0));
    }

    #[test]
    fn power_series_and_inner_product() {
        let x = Zr::from(3u64);
        let p = power_series(4, &x);
        assert_eq!(p, vec![
            Zr::one(),
            Zr::from(3u64),
            Zr::from(9u64),
            Zr::from(27u64)
        ]);
        let v = vec![Zr::one(); 4];
        assert_eq!(inner_product(&p, &v), Zr::from(40u64));
    }
}
