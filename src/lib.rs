//! # solvency
//!
//! A zero-knowledge proof-of-liabilities engine over a summation Verkle
//! tree.
//!
//! A custodian commits to the multiset of per-user liabilities it owes and
//! can later produce, for any single user, a short proof that (a) the
//! user's liability is included in the committed set, (b) every summary
//! along the authentication path is a faithful non-negative accumulation of
//! its children, and (c) the published root aggregate is the sum of all
//! liabilities — without revealing any other user's identity or balance.
//!
//! ## Structure
//!
//! - [`math`] - scalar/group vector algebra over BN254 and the canonical
//!   SHA-256 → scalar reduction
//! - [`pointproofs`] - the vector commitment with O(1) openings and
//!   aggregation
//! - [`ipa`] - the Bulletproofs-style inner-product argument
//! - [`reduce`] - the iterated-reduction one-vector argument
//! - [`range`] - per-vertex range proofs for 63-bit coordinates
//! - [`sum_argument`] - the last-slot-equals-sum argument with HVZK
//!   aggregation
//! - [`equality`] - proofs that a parent slot equals a child slot, batched
//! - [`path`] - identifier-to-path derivation (sparse hex / dense decimal)
//! - [`store`] - the key-value storage boundary
//! - [`tree`] - the summation Verkle tree
//! - [`liability`] - the composed prover/verifier and the total proof
//! - [`error`] - error taxonomy
//!
//! ## Usage
//!
//! ```ignore
//! use solvency::{generate_public_params, LiabilitySet, MemStore, TreeConfig, TreeType};
//!
//! let params = generate_public_params(7, TreeType::Sparse, &mut rng)?;
//! let config = TreeConfig { fanout: 7, tree_type: TreeType::Sparse, parallel: true };
//! let mut set = LiabilitySet::new(params, config, MemStore::new())?;
//!
//! set.set(&id, 100, &mut rng)?;
//! let (liability, proof) = set.prove_liability(&id, &mut rng)?.unwrap();
//! let (v_root, w_root) = set.root()?.unwrap();
//! proof.verify(set.params(), &id, &v_root, &w_root, set.mapper(), true)?;
//! ```

pub mod equality;
pub mod error;
pub mod ipa;
pub mod liability;
pub mod math;
pub mod path;
pub mod pointproofs;
pub mod range;
pub mod reduce;
pub mod store;
pub mod sum_argument;
pub mod tree;

pub use error::SolvencyError;
pub use liability::{
    generate_public_params, LiabilityProof, LiabilitySet, PublicParams, TotalProof, TreeConfig,
};
pub use path::{PathMapper, TreeType};
pub use store::{KvStore, MemStore};
