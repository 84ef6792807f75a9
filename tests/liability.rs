//! End-to-end liability proofs: round trips, overwrites, totals, padding
//! and per-component tamper detection.

use ark_ec::Group;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use solvency::math::{G1, Zr};
use solvency::{
    generate_public_params, LiabilityProof, LiabilitySet, MemStore, SolvencyError, TreeConfig,
    TreeType,
};

fn hex_id<R: rand_core::RngCore>(rng: &mut R) -> String {
    let mut bytes = [0u8; 32];
    rng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn liability_set(
    fanout: u16,
    tree_type: TreeType,
) -> LiabilitySet<MemStore> {
    let mut rng = rand::thread_rng();
    let params = generate_public_params(fanout, tree_type, &mut rng).unwrap();
    let config = TreeConfig {
        fanout,
        tree_type,
        parallel: true,
    };
    LiabilitySet::new(params, config, MemStore::new()).unwrap()
}

const SMALL_DENSE: TreeType = TreeType::Dense { space: 1000 };

#[test]
fn sparse_tree_single_liability_round_trips() {
    let mut rng = rand::thread_rng();
    let mut set = liability_set(7, TreeType::Sparse);

    let id = hex_id(&mut rng);
    set.set(&id, 100, &mut rng).unwrap();

    let (liability, proof) = set.prove_liability(&id, &mut rng).unwrap().unwrap();
    assert_eq!(liability, 100);

    let (v_root, w_root) = set.root().unwrap().unwrap();
    proof
        .verify(set.params(), &id, &v_root, &w_root, set.mapper(), true)
        .unwrap();

    // Any mutation of the root commitment in the proof is caught first.
    let mut tampered = proof.clone();
    tampered.v[0] += G1::generator();
    assert_eq!(
        tampered.verify(set.params(), &id, &v_root, &w_root, set.mapper(), true),
        Err(SolvencyError::RootMismatch("V"))
    );
}

#[test]
fn dense_tree_numeric_identifier_round_trips() {
    let mut rng = rand::thread_rng();
    let tree_type = TreeType::Dense {
        space: 1_000_000_000,
    };
    let mut set = liability_set(7, tree_type);

    let id = "987654321";
    set.set(id, 100, &mut rng).unwrap();
    assert_eq!(set.get(id).unwrap(), Some(100));

    let (liability, proof) = set.prove_liability(id, &mut rng).unwrap().unwrap();
    assert_eq!(liability, 100);

    let (v_root, w_root) = set.root().unwrap().unwrap();
    proof
        .verify(set.params(), id, &v_root, &w_root, set.mapper(), true)
        .unwrap();
}

#[test]
fn overwriting_write_replaces_the_liability() {
    let mut rng = rand::thread_rng();
    let mut set = liability_set(7, SMALL_DENSE);

    set.set("123", 50, &mut rng).unwrap();
    set.set("123", 100, &mut rng).unwrap();

    let (liability, proof) = set.prove_liability("123", &mut rng).unwrap().unwrap();
    assert_eq!(liability, 100);

    let (v_root, w_root) = set.root().unwrap().unwrap();
    proof
        .verify(set.params(), "123", &v_root, &w_root, set.mapper(), true)
        .unwrap();

    // The root total reflects the overwrite, not the sum of both writes.
    let total = set.prove_total().unwrap();
    assert_eq!(total.sum, 100);
}

#[test]
fn total_proof_round_trips() {
    let mut rng = rand::thread_rng();
    let mut set = liability_set(7, SMALL_DENSE);

    set.set("17", 50, &mut rng).unwrap();
    set.set("923", 50, &mut rng).unwrap();

    let total = set.prove_total().unwrap();
    assert_eq!(total.sum, 100);

    let (v_root, _) = set.root().unwrap().unwrap();
    total.verify(set.params(), &v_root).unwrap();

    let mut tampered = total.clone();
    tampered.sum = 99;
    assert!(tampered.verify(set.params(), &v_root).is_err());
}

#[test]
fn unknown_identifier_yields_no_proof() {
    let mut rng = rand::thread_rng();
    let mut set = liability_set(7, SMALL_DENSE);
    set.set("5", 1, &mut rng).unwrap();

    assert_eq!(set.get("6").unwrap(), None);
    assert!(set.prove_liability("6", &mut rng).unwrap().is_none());
}

#[test]
fn tampered_components_report_their_kind() {
    let mut rng = rand::thread_rng();
    let mut set = liability_set(7, SMALL_DENSE);

    set.set("42", 1234, &mut rng).unwrap();
    set.set("43", 5678, &mut rng).unwrap();

    let (_, proof) = set.prove_liability("42", &mut rng).unwrap().unwrap();
    let (v_root, w_root) = set.root().unwrap().unwrap();
    let check = |p: &LiabilityProof| p.verify(set.params(), "42", &v_root, &w_root, set.mapper(), true);
    check(&proof).unwrap();

    let mut tampered = proof.clone();
    tampered.range_proofs[0].c += Zr::from(1u64);
    assert!(matches!(
        check(&tampered),
        Err(SolvencyError::RangeProofInvalid(_))
    ));

    let mut tampered = proof.clone();
    tampered.equality.c += Zr::from(1u64);
    assert!(matches!(check(&tampered), Err(SolvencyError::PoeInvalid(_))));

    let mut tampered = proof.clone();
    tampered.sum_argument.w += G1::generator();
    assert_eq!(check(&tampered), Err(SolvencyError::SumArgumentInvalid));

    let mut tampered = proof.clone();
    tampered.digests[0] += Zr::from(1u64);
    assert_eq!(check(&tampered), Err(SolvencyError::HashChainMismatch(1)));

    let mut tampered = proof.clone();
    tampered.pointproof_pi += G1::generator();
    assert_eq!(
        check(&tampered),
        Err(SolvencyError::PointproofAggregationInvalid)
    );

    let mut tampered = proof.clone();
    tampered.w.pop();
    assert!(matches!(
        check(&tampered),
        Err(SolvencyError::SizeMismatch { .. })
    ));
}

#[test]
fn minimal_depth_tree_uses_a_single_equality_slot() {
    let mut rng = rand::thread_rng();
    // Depth 2: one real equality pair, which is already a power of two and
    // gets no padding.
    let mut set = liability_set(7, TreeType::Dense { space: 10 });
    assert_eq!(set.params().equality_slots, 1);

    set.set("3", 25, &mut rng).unwrap();
    set.set("9", 75, &mut rng).unwrap();

    let (liability, proof) = set.prove_liability("3", &mut rng).unwrap().unwrap();
    assert_eq!(liability, 25);
    assert_eq!(proof.equality.v_masks.len(), 1);

    let (v_root, w_root) = set.root().unwrap().unwrap();
    proof
        .verify(set.params(), "3", &v_root, &w_root, set.mapper(), true)
        .unwrap();

    let total = set.prove_total().unwrap();
    assert_eq!(total.sum, 100);
}

#[test]
fn equality_batch_is_padded_to_a_power_of_two() {
    let mut rng = rand::thread_rng();
    // Depth 4 gives three real equality pairs, padded to four.
    let mut set = liability_set(7, SMALL_DENSE);
    assert_eq!(set.params().equality_slots, 4);

    set.set("999", 7, &mut rng).unwrap();
    let (_, proof) = set.prove_liability("999", &mut rng).unwrap().unwrap();
    assert_eq!(proof.equality.v_masks.len(), 4);

    let (v_root, w_root) = set.root().unwrap().unwrap();
    proof
        .verify(set.params(), "999", &v_root, &w_root, set.mapper(), true)
        .unwrap();
}

#[test]
fn serial_verification_matches_parallel() {
    let mut rng = rand::thread_rng();
    let params = generate_public_params(7, SMALL_DENSE, &mut rng).unwrap();
    let config = TreeConfig {
        fanout: 7,
        tree_type: SMALL_DENSE,
        parallel: false,
    };
    let mut set = LiabilitySet::new(params, config, MemStore::new()).unwrap();

    set.set("321", 11, &mut rng).unwrap();
    let (_, proof) = set.prove_liability("321", &mut rng).unwrap().unwrap();
    let (v_root, w_root) = set.root().unwrap().unwrap();

    proof
        .verify(set.params(), "321", &v_root, &w_root, set.mapper(), false)
        .unwrap();
    proof
        .verify(set.params(), "321", &v_root, &w_root, set.mapper(), true)
        .unwrap();

    let mut tampered = proof.clone();
    tampered.range_proofs[1].tau += Zr::from(1u64);
    assert!(matches!(
        tampered.verify(set.params(), "321", &v_root, &w_root, set.mapper(), false),
        Err(SolvencyError::RangeProofInvalid(_))
    ));
}

#[test]
fn liability_proof_serialization_round_trips() {
    let mut rng = rand::thread_rng();
    let mut set = liability_set(7, SMALL_DENSE);

    set.set("77", 31337, &mut rng).unwrap();
    let (_, proof) = set.prove_liability("77", &mut rng).unwrap().unwrap();

    let mut bytes = Vec::new();
    proof.serialize_compressed(&mut bytes).unwrap();
    assert_eq!(bytes.len(), proof.size());

    let decoded = LiabilityProof::deserialize_compressed(bytes.as_slice()).unwrap();
    let (v_root, w_root) = set.root().unwrap().unwrap();
    decoded
        .verify(set.params(), "77", &v_root, &w_root, set.mapper(), true)
        .unwrap();
}
