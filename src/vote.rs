//! One-hot vote vector construction and validation.

use crate::error::TallyError;

/// True iff `vector` is a well-formed one-hot vote: non-empty, every
/// entry in {0, 1}, and exactly one entry set.
///
/// Pure predicate; gates both encryption and proof generation.
#[must_use]
pub fn validate_one_hot(vector: &[u64]) -> bool {
    !vector.is_empty()
        && vector.iter().all(|&v| v <= 1)
        && vector.iter().sum::<u64>() == 1
}

/// Build the length-`total` one-hot vector with a single 1 at
/// `position`.
///
/// # Errors
/// [`TallyError::InvalidCandidateIndex`] when `position >= total`.
pub fn create_vote_vector(position: usize, total: usize) -> Result<Vec<u64>, TallyError> {
    if position >= total {
        return Err(TallyError::InvalidCandidateIndex { position, total });
    }

    let mut vote = vec![0u64; total];
    vote[position] = 1;

    // Re-validate the constructed vector before handing it out.
    if !validate_one_hot(&vote) {
        return Err(TallyError::InvalidVoteShape { len: vote.len() });
    }

    Ok(vote)
}
