//! The summation Verkle tree.
//!
//! A sparse prefix tree of fixed fanout F and depth. Inner vertices carry
//! two Pointproofs commitments — V over the children's subtree sums (plus
//! the vertex sum and a blinding slot) and W over the children's digests —
//! and leaves carry raw liabilities. Vertices are stored serialized in a
//! key-value store under their textual dotted path; walks go through the
//! store by path, never through pointers, and the root bytes are mirrored in
//! RAM.

use crate::error::SolvencyError;
use crate::math::*;
use crate::pointproofs::{self, PointproofsParams};
use crate::store::KvStore;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_std::{UniformRand, Zero};
use rand_core::RngCore;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// An inner vertex of the tree.
#[derive(Clone, Debug, CanonicalSerialize, CanonicalDeserialize)]
pub struct Vertex {
    /// Fresh per-vertex blinding, committed in the last slot of V.
    pub blinding: Zr,
    /// Child index → subtree sum (raw liability for the leaf-parent layer).
    pub values: BTreeMap<u16, Zr>,
    /// Child index → digest of the child's (V, W).
    pub digests: BTreeMap<u16, Zr>,
    /// Σ values.
    pub sum: Zr,
    /// Commitment to values ‖ sum ‖ blinding.
    pub v: G1,
    /// Commitment to digests, zero-padded; absent for the leaf-parent layer.
    pub w: Option<G1>,
}

impl Vertex {
    fn empty<R: RngCore>(rng: &mut R) -> Self {
        Self {
            blinding: Zr::rand(rng),
            values: BTreeMap::new(),
            digests: BTreeMap::new(),
            sum: Zr::zero(),
            v: G1::zero(),
            w: None,
        }
    }

    /// The vertex digest chaining it into its parent: FE(SHA256(V ‖ W)),
    /// with W omitted when absent.
    pub fn digest(&self) -> Zr {
        let mut h = Sha256::new();
        h.update(g1_bytes(&self.v));
        if let Some(w) = &self.w {
            h.update(g1_bytes(w));
        }
        field_from_digest(&h.finalize().into())
    }

    /// Child values padded to fanout slots, with the sum in the last slot —
    /// length fanout + 1.
    pub fn values_with_sum(&self, fanout: u16) -> Vec<Zr> {
        let n = fanout as usize + 1;
        let mut res: Vec<Zr> = (0..fanout)
            .map(|j| self.values.get(&j).copied().unwrap_or_else(Zr::zero))
            .collect();
        res.push(self.sum);
        debug_assert_eq!(res.len(), n);
        res
    }

    /// The full committed vector values ‖ sum ‖ blinding — length fanout + 2.
    pub fn full_vector(&self, fanout: u16) -> Vec<Zr> {
        let mut res = self.values_with_sum(fanout);
        res.push(self.blinding);
        res
    }

    /// Child digests zero-padded to length fanout + 2.
    pub fn digest_vector(&self, fanout: u16) -> Vec<Zr> {
        (0..fanout as usize + 2)
            .map(|j| {
                self.digests
                    .get(&(j as u16))
                    .copied()
                    .unwrap_or_else(Zr::zero)
            })
            .collect()
    }
}

/// A stored tree node: raw liability at the leaves, rich vertex above.
#[derive(Clone, Debug)]
pub enum TreeNode {
    Leaf(u64),
    Inner(Vertex),
}

impl TreeNode {
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            TreeNode::Leaf(liability) => {
                let mut bytes = vec![0u8];
                bytes.extend_from_slice(&liability.to_be_bytes());
                bytes
            }
            TreeNode::Inner(vertex) => {
                let mut bytes = vec![1u8];
                vertex
                    .serialize_compressed(&mut bytes)
                    .expect("vertex serialization");
                bytes
            }
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SolvencyError> {
        match bytes.first() {
            Some(0) => {
                let liability = bytes[1..]
                    .try_into()
                    .map(u64::from_be_bytes)
                    .map_err(|_| SolvencyError::StorageMiss("truncated leaf encoding".into()))?;
                Ok(TreeNode::Leaf(liability))
            }
            Some(1) => Vertex::deserialize_compressed(&bytes[1..])
                .map(TreeNode::Inner)
                .map_err(|_| SolvencyError::StorageMiss("corrupt vertex encoding".into())),
            _ => Err(SolvencyError::StorageMiss("empty tree node encoding".into())),
        }
    }
}

/// The tree itself: addressing metadata plus the storage handle.
pub struct SummationTree<S: KvStore> {
    fanout: u16,
    depth: usize,
    store: S,
    root_cache: Option<Vec<u8>>,
}

impl<S: KvStore> SummationTree<S> {
    pub fn new(fanout: u16, depth: usize, store: S) -> Self {
        Self {
            fanout,
            depth,
            store,
            root_cache: None,
        }
    }

    pub fn fanout(&self) -> u16 {
        self.fanout
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Hands the storage back, e.g. to reopen the tree later.
    pub fn into_store(self) -> S {
        self.store
    }

    /// The textual dotted key of a path prefix; the root key is empty.
    fn key_of(path: &[u16]) -> Vec<u8> {
        let mut key = String::new();
        for p in path {
            key.push('.');
            key.push_str(&p.to_string());
        }
        key.into_bytes()
    }

    fn load(&self, key: &[u8]) -> Result<Option<TreeNode>, SolvencyError> {
        let bytes = if key.is_empty() {
            self.root_cache.clone().or_else(|| self.store.get(key))
        } else {
            self.store.get(key)
        };
        bytes.as_deref().map(TreeNode::from_bytes).transpose()
    }

    fn load_vertex(&self, key: &[u8]) -> Result<Option<Vertex>, SolvencyError> {
        match self.load(key)? {
            Some(TreeNode::Inner(vertex)) => Ok(Some(vertex)),
            Some(TreeNode::Leaf(_)) => Err(SolvencyError::StorageMiss(format!(
                "leaf stored at inner key {}",
                String::from_utf8_lossy(key)
            ))),
            None => Ok(None),
        }
    }

    fn validate_path(&self, path: &[u16]) -> Result<(), SolvencyError> {
        if path.len() != self.depth {
            return Err(SolvencyError::MalformedInput(format!(
                "path of length {} does not match tree depth {}",
                path.len(),
                self.depth
            )));
        }
        if let Some(p) = path.iter().find(|p| **p >= self.fanout) {
            return Err(SolvencyError::MalformedInput(format!(
                "path entry {p} exceeds fanout {}",
                self.fanout
            )));
        }
        Ok(())
    }

    /// Writes the liability at the path's leaf and propagates sums, digests
    /// and commitments bottom-up to the root. Both commitments are rebuilt
    /// over the full padded vectors on every touched vertex.
    #[tracing::instrument(skip_all, fields(depth = self.depth))]
    pub fn put<R: RngCore>(
        &mut self,
        params: &PointproofsParams,
        path: &[u16],
        liability: u64,
        rng: &mut R,
    ) -> Result<(), SolvencyError> {
        self.validate_path(path)?;

        self.store
            .put(&Self::key_of(path), TreeNode::Leaf(liability).to_bytes());

        for k in (0..self.depth).rev() {
            let key = Self::key_of(&path[..k]);
            let index = path[k];

            let (child_value, child_digest) = if k == self.depth - 1 {
                (Zr::from(liability), None)
            } else {
                let child_key = Self::key_of(&path[..k + 1]);
                let child = self.load_vertex(&child_key)?.ok_or_else(|| {
                    SolvencyError::StorageMiss(format!(
                        "could not find {} in the store",
                        String::from_utf8_lossy(&child_key)
                    ))
                })?;
                (child.sum, Some(child.digest()))
            };

            let mut vertex = match self.load(&key)? {
                Some(TreeNode::Inner(vertex)) => vertex,
                Some(TreeNode::Leaf(_)) => {
                    return Err(SolvencyError::StorageMiss(format!(
                        "leaf stored at inner key {}",
                        String::from_utf8_lossy(&key)
                    )))
                }
                None => Vertex::empty(rng),
            };

            let old = vertex
                .values
                .get(&index)
                .copied()
                .unwrap_or_else(Zr::zero);
            vertex.sum = vertex.sum + child_value - old;
            vertex.values.insert(index, child_value);
            if let Some(digest) = child_digest {
                vertex.digests.insert(index, digest);
            }

            vertex.v = pointproofs::commit(params, &vertex.full_vector(self.fanout));
            if k < self.depth - 1 {
                vertex.w = Some(pointproofs::commit(
                    params,
                    &vertex.digest_vector(self.fanout),
                ));
            }

            let bytes = TreeNode::Inner(vertex).to_bytes();
            if key.is_empty() {
                self.root_cache = Some(bytes.clone());
            }
            self.store.put(&key, bytes);
        }

        tracing::debug!(depth = self.depth, "liability written");
        Ok(())
    }

    /// Returns the liability and the ordered vertices along the path, or
    /// `None` when the identifier was never written.
    pub fn get(&self, path: &[u16]) -> Result<Option<(u64, Vec<Vertex>)>, SolvencyError> {
        self.validate_path(path)?;

        let mut vertices = Vec::with_capacity(self.depth);
        for k in 0..self.depth {
            match self.load(&Self::key_of(&path[..k]))? {
                Some(TreeNode::Inner(vertex)) => vertices.push(vertex),
                Some(TreeNode::Leaf(_)) => {
                    return Err(SolvencyError::StorageMiss(
                        "leaf stored at an inner key".into(),
                    ))
                }
                None => return Ok(None),
            }
        }

        match self.load(&Self::key_of(path))? {
            Some(TreeNode::Leaf(liability)) => Ok(Some((liability, vertices))),
            Some(TreeNode::Inner(_)) => Err(SolvencyError::StorageMiss(
                "vertex stored at a leaf key".into(),
            )),
            None => Ok(None),
        }
    }

    /// The root vertex, if the tree is non-empty.
    pub fn root(&self) -> Result<Option<Vertex>, SolvencyError> {
        self.load_vertex(b"")
    }
}
