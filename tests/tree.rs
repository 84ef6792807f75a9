//! Summation-tree behavior: sum propagation, overwrites, persistence
//! encoding.

use solvency::math::{scalar_to_u64, Zr};
use solvency::pointproofs::{self, PointproofsParams};
use solvency::store::{KvStore, MemStore};
use solvency::tree::{SummationTree, TreeNode, Vertex};

fn tree_with_params(fanout: u16, depth: usize) -> (SummationTree<MemStore>, PointproofsParams) {
    let mut rng = rand::thread_rng();
    let params = PointproofsParams::setup(fanout as usize + 2, &mut rng);
    (SummationTree::new(fanout, depth, MemStore::new()), params)
}

#[test]
fn root_sum_tracks_every_write() {
    let mut rng = rand::thread_rng();
    let (mut tree, params) = tree_with_params(3, 3);

    tree.put(&params, &[0, 1, 2], 10, &mut rng).unwrap();
    tree.put(&params, &[1, 0, 0], 20, &mut rng).unwrap();
    tree.put(&params, &[2, 2, 2], 30, &mut rng).unwrap();

    let root = tree.root().unwrap().unwrap();
    assert_eq!(scalar_to_u64(&root.sum), Some(60));
}

#[test]
fn overwrite_replaces_instead_of_accumulating() {
    let mut rng = rand::thread_rng();
    let (mut tree, params) = tree_with_params(3, 3);

    tree.put(&params, &[0, 1, 2], 50, &mut rng).unwrap();
    tree.put(&params, &[0, 1, 2], 100, &mut rng).unwrap();

    let (liability, _) = tree.get(&[0, 1, 2]).unwrap().unwrap();
    assert_eq!(liability, 100);

    let root = tree.root().unwrap().unwrap();
    assert_eq!(scalar_to_u64(&root.sum), Some(100));
}

#[test]
fn get_returns_none_for_unwritten_paths() {
    let mut rng = rand::thread_rng();
    let (mut tree, params) = tree_with_params(3, 3);

    assert!(tree.get(&[0, 0, 0]).unwrap().is_none());
    tree.put(&params, &[0, 1, 2], 5, &mut rng).unwrap();
    assert!(tree.get(&[0, 1, 1]).unwrap().is_none());
    assert!(tree.get(&[2, 1, 2]).unwrap().is_none());
}

#[test]
fn path_of_wrong_length_is_rejected() {
    let (tree, _) = tree_with_params(3, 3);
    assert!(tree.get(&[0, 1]).is_err());
}

#[test]
fn vertices_along_path_commit_to_their_children() {
    let mut rng = rand::thread_rng();
    let (mut tree, params) = tree_with_params(3, 3);

    tree.put(&params, &[0, 1, 2], 10, &mut rng).unwrap();
    tree.put(&params, &[0, 1, 0], 7, &mut rng).unwrap();

    let (_, vertices) = tree.get(&[0, 1, 2]).unwrap().unwrap();
    assert_eq!(vertices.len(), 3);

    // The leaf parent has no digest commitment; inner vertices do.
    assert!(vertices[0].w.is_some());
    assert!(vertices[1].w.is_some());
    assert!(vertices[2].w.is_none());

    // Each V opens to the child's subtree sum at the child's slot.
    for vertex in &vertices {
        let full = vertex.full_vector(3);
        assert_eq!(vertex.v, pointproofs::commit(&params, &full));
        let (slot, proof) = pointproofs::open(&params, 3, &full);
        assert_eq!(slot, vertex.sum);
        pointproofs::verify(&params, &slot, &proof, &vertex.v, 3).unwrap();
    }

    // The leaf parent's sum slot carries both written leaves.
    assert_eq!(scalar_to_u64(&vertices[2].sum), Some(17));
    assert_eq!(vertices[2].values_with_sum(3)[2], Zr::from(10u64));
    assert_eq!(vertices[2].values_with_sum(3)[0], Zr::from(7u64));
}

#[test]
fn digest_chain_links_parent_to_child() {
    let mut rng = rand::thread_rng();
    let (mut tree, params) = tree_with_params(3, 3);

    tree.put(&params, &[1, 2, 0], 9, &mut rng).unwrap();
    let (_, vertices) = tree.get(&[1, 2, 0]).unwrap().unwrap();

    assert_eq!(
        vertices[0].digests.get(&1).copied(),
        Some(vertices[1].digest())
    );
    assert_eq!(
        vertices[1].digests.get(&2).copied(),
        Some(vertices[2].digest())
    );
}

#[test]
fn node_encoding_round_trips() {
    let mut rng = rand::thread_rng();
    let (mut tree, params) = tree_with_params(3, 2);
    tree.put(&params, &[2, 1], 11, &mut rng).unwrap();

    let leaf = TreeNode::Leaf(11);
    match TreeNode::from_bytes(&leaf.to_bytes()).unwrap() {
        TreeNode::Leaf(value) => assert_eq!(value, 11),
        TreeNode::Inner(_) => panic!("leaf decoded as vertex"),
    }

    let root = tree.root().unwrap().unwrap();
    let encoded = TreeNode::Inner(root.clone()).to_bytes();
    match TreeNode::from_bytes(&encoded).unwrap() {
        TreeNode::Inner(decoded) => {
            assert_eq!(decoded.sum, root.sum);
            assert_eq!(decoded.v, root.v);
            assert_eq!(decoded.w, root.w);
            assert_eq!(decoded.values, root.values);
            assert_eq!(decoded.digests, root.digests);
            assert_eq!(decoded.blinding, root.blinding);
        }
        TreeNode::Leaf(_) => panic!("vertex decoded as leaf"),
    }

    assert!(TreeNode::from_bytes(&[]).is_err());
}

#[test]
fn tree_reopens_from_its_store() {
    let mut rng = rand::thread_rng();
    let params = PointproofsParams::setup(5, &mut rng);
    let mut tree = SummationTree::new(3, 2, MemStore::new());

    tree.put(&params, &[1, 0], 4, &mut rng).unwrap();
    let root: Vertex = tree.root().unwrap().unwrap();

    let store = tree.into_store();
    assert!(store.get(b"").is_some(), "root row under the empty key");

    let reopened = SummationTree::new(3, 2, store);
    let (liability, _) = reopened.get(&[1, 0]).unwrap().unwrap();
    assert_eq!(liability, 4);
    assert_eq!(reopened.root().unwrap().unwrap().v, root.v);
}
