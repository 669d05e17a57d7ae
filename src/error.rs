//! Engine error types.

use crate::store::CipherId;
use thiserror::Error;

/// Everything that can go wrong between "a vote arrives" and "a tally
/// is decrypted".
///
/// Shape and index errors are raised before any cryptographic work
/// runs. A missing ciphertext identifier is a caller bug (the entry was
/// evicted, cleared, or never issued) and is never retried.
#[derive(Debug, Error)]
pub enum TallyError {
    /// Candidate index outside `[0, total)`.
    #[error("candidate index {position} out of range for {total} candidates")]
    InvalidCandidateIndex {
        /// Requested candidate slot.
        position: usize,
        /// Number of candidates in the election.
        total: usize,
    },

    /// Vote vector is not one-hot (entries in {0,1}, summing to 1).
    #[error("vote vector of length {len} is not one-hot")]
    InvalidVoteShape {
        /// Length of the rejected vector.
        len: usize,
    },

    /// Identifier absent from the ciphertext store.
    #[error("unknown ciphertext id {0} (evicted, cleared, or never issued)")]
    UnknownCiphertextId(CipherId),

    /// The BFV context could not be built. Fatal, not retried.
    #[error("scheme setup failed: {0}")]
    SchemeSetupFailure(String),

    /// An encrypt/add/decrypt primitive of the scheme failed.
    #[error("scheme operation failed: {0}")]
    SchemeOperation(#[from] fhe::Error),

    /// A decrypted tally's total disagrees with the number of votes
    /// cast. Raised by harness-level checks, never by the engine itself.
    #[error("tally integrity mismatch: expected {expected} votes, decrypted {actual}")]
    IntegrityMismatch {
        /// Votes known to have been folded in.
        expected: u64,
        /// Sum of the decrypted per-candidate counts.
        actual: u64,
    },

    /// A voter attempted a second vote in the same election.
    #[error("voter {voter} already voted in election {election}")]
    DuplicateVote {
        /// Authenticated voter identity.
        voter: String,
        /// Election identifier.
        election: String,
    },

    /// No election registered under this identifier.
    #[error("unknown election {0}")]
    UnknownElection(String),
}
