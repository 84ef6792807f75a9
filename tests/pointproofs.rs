//! Pointproofs commitment tests: commit/open/verify, in-place updates and
//! aggregated openings.

use solvency::math::{inner_product, rand_vec, Zr};
use solvency::pointproofs::{
    aggregate, commit, open, ro, update, verify, verify_aggregation, PointproofsParams,
};

#[test]
fn commit_open_verify_every_index() {
    let mut rng = rand::thread_rng();
    let n = 8;
    let params = PointproofsParams::setup(n, &mut rng);
    let m = rand_vec(n, &mut rng);

    let c = commit(&params, &m);
    for i in 0..n {
        let (mi, proof) = open(&params, i, &m);
        assert_eq!(mi, m[i]);
        verify(&params, &mi, &proof, &c, i).unwrap();
    }
}

#[test]
fn opening_rejects_wrong_value() {
    let mut rng = rand::thread_rng();
    let n = 8;
    let params = PointproofsParams::setup(n, &mut rng);
    let m = rand_vec(n, &mut rng);

    let c = commit(&params, &m);
    let (mi, proof) = open(&params, 3, &m);
    assert!(verify(&params, &(mi + Zr::from(1u64)), &proof, &c, 3).is_err());
    // Proof for one index does not open another.
    assert!(verify(&params, &mi, &proof, &c, 4).is_err());
}

#[test]
fn update_matches_recommitment() {
    let mut rng = rand::thread_rng();
    let n = 8;
    let params = PointproofsParams::setup(n, &mut rng);
    let m = rand_vec(n, &mut rng);

    let mut c = commit(&params, &m);
    let new_value = Zr::from(42u64);
    update(&params, &mut c, &m, &new_value, 5);

    let mut updated = m.clone();
    updated[5] = new_value;
    assert_eq!(c, commit(&params, &updated));

    let (mi, proof) = open(&params, 5, &updated);
    verify(&params, &mi, &proof, &c, 5).unwrap();
}

#[test]
fn aggregated_opening_round_trips() {
    let mut rng = rand::thread_rng();
    let n = 8;
    let params = PointproofsParams::setup(n, &mut rng);

    let m1 = rand_vec(n, &mut rng);
    let m2 = rand_vec(n, &mut rng);
    let c1 = commit(&params, &m1);
    let c2 = commit(&params, &m2);
    let commitments = vec![c1, c2];

    let i = 2;
    let (v1, p1) = open(&params, i, &m1);
    let (v2, p2) = open(&params, i, &m2);

    let pi = aggregate(&params, &commitments, &[p1, p2], ro);
    let weights = vec![ro(&params, &commitments, 0), ro(&params, &commitments, 1)];
    let sigma = inner_product(&[v1, v2], &weights);

    verify_aggregation(&params, &[i, i], &commitments, &pi, &sigma, ro).unwrap();

    // A wrong aggregate sum is rejected.
    assert!(verify_aggregation(
        &params,
        &[i, i],
        &commitments,
        &pi,
        &(sigma + Zr::from(1u64)),
        ro
    )
    .is_err());
}

#[test]
fn aggregation_accepts_iff_individuals_accept() {
    let mut rng = rand::thread_rng();
    let n = 8;
    let params = PointproofsParams::setup(n, &mut rng);

    let m1 = rand_vec(n, &mut rng);
    let m2 = rand_vec(n, &mut rng);
    let c1 = commit(&params, &m1);
    let c2 = commit(&params, &m2);
    let commitments = vec![c1, c2];

    let (v1, p1) = open(&params, 0, &m1);
    let (v2, p2) = open(&params, 1, &m2);
    verify(&params, &v1, &p1, &c1, 0).unwrap();
    verify(&params, &v2, &p2, &c2, 1).unwrap();

    let pi = aggregate(&params, &commitments, &[p1, p2], ro);
    let weights = vec![ro(&params, &commitments, 0), ro(&params, &commitments, 1)];
    let sigma = inner_product(&[v1, v2], &weights);
    verify_aggregation(&params, &[0, 1], &commitments, &pi, &sigma, ro).unwrap();

    // Swapping an individual proof for another index breaks the batch.
    let pi_bad = aggregate(&params, &commitments, &[p2, p1], ro);
    assert!(
        verify_aggregation(&params, &[0, 1], &commitments, &pi_bad, &sigma, ro).is_err()
    );
}
