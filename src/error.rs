/// Errors surfaced by proving, verification and tree operations.
///
/// Programmer errors (vector length mismatches at argument entry, commitment
/// length different from the parameter size, aggregation over unequal-sized
/// inputs) are not represented here; they panic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SolvencyError {
    /// The terminal check of an inner-product argument failed.
    #[error("inner product argument mismatch")]
    IpaMismatch,

    /// A per-vertex range proof did not verify.
    #[error("range proof invalid: {0}")]
    RangeProofInvalid(String),

    /// The aggregated sum argument did not verify.
    #[error("sum argument invalid")]
    SumArgumentInvalid,

    /// A proof of equality (single or batched) did not verify.
    #[error("proof of equality invalid: {0}")]
    PoeInvalid(String),

    /// A digest along the authentication path does not hash-chain to its
    /// parent's opened slot.
    #[error("hash chain mismatch {0} from root")]
    HashChainMismatch(usize),

    /// The aggregated pointproofs opening over the digest commitments failed.
    #[error("pointproofs aggregation invalid")]
    PointproofAggregationInvalid,

    /// A single pointproofs opening does not match its commitment.
    #[error("opening does not match commitment at index {0}")]
    InvalidOpening(usize),

    /// The proof's root commitment differs from the published root.
    #[error("root {0} does not match the published root")]
    RootMismatch(&'static str),

    /// A proof component has the wrong number of entries for the path.
    #[error("size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// The caller supplied an input the protocol cannot process.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// The backing store is missing a key the tree expects to be present.
    #[error("storage miss: {0}")]
    StorageMiss(String),
}
