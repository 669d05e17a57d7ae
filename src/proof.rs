//! Placeholder one-hot "proof" tokens.
//!
//! These are NOT zero-knowledge proofs. The token is a deterministic
//! commitment-style marker derived from the shape checks a real proof
//! system would attest to (declared length, binary entries, sum = 1).
//! The interface is the seam: a real ZK scheme can replace this module
//! without touching any call site, which is why generation still gates
//! on the same validation as encryption.

use crate::error::TallyError;
use crate::vote::validate_one_hot;

/// Recognizable token prefix.
const PROOF_PREFIX: &str = "ohv1";
/// Shortest token `generate_proof` can emit (`ohv1:len=1:sum=1:bin=1`).
const MIN_PROOF_LEN: usize = 22;

/// Produce the advisory one-hot token for `vector`.
///
/// Deterministic in the vector's shape facts and independent of any
/// ciphertext.
///
/// # Errors
/// [`TallyError::InvalidVoteShape`] when the vector is not one-hot;
/// no token is ever issued for a malformed vote.
pub fn generate_proof(vector: &[u64]) -> Result<String, TallyError> {
    if !validate_one_hot(vector) {
        return Err(TallyError::InvalidVoteShape { len: vector.len() });
    }
    Ok(format!("{PROOF_PREFIX}:len={}:sum=1:bin=1", vector.len()))
}

/// Shallow structural check of a token against an expected candidate
/// count: prefix, minimum length, and declared length.
///
/// Accepts every untampered token from [`generate_proof`]. Advisory
/// only: a `true` here carries no cryptographic weight.
#[must_use]
pub fn verify_proof(token: &str, total: usize) -> bool {
    if token.len() < MIN_PROOF_LEN {
        return false;
    }
    let Some(rest) = token.strip_prefix(PROOF_PREFIX) else {
        return false;
    };
    rest == format!(":len={total}:sum=1:bin=1")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_verify() {
        for total in [1usize, 2, 3, 17, 100] {
            let mut vote = vec![0u64; total];
            vote[total - 1] = 1;
            let token = generate_proof(&vote).unwrap();
            assert!(verify_proof(&token, total), "token rejected: {token}");
        }
    }

    #[test]
    fn generation_is_deterministic_in_shape() {
        let a = generate_proof(&[1, 0, 0]).unwrap();
        let b = generate_proof(&[0, 0, 1]).unwrap();
        // Same shape facts, same token: the marker commits to the
        // shape, not the choice.
        assert_eq!(a, b);
    }

    #[test]
    fn malformed_votes_get_no_token() {
        assert!(matches!(
            generate_proof(&[1, 1, 0]),
            Err(TallyError::InvalidVoteShape { len: 3 })
        ));
        assert!(matches!(
            generate_proof(&[]),
            Err(TallyError::InvalidVoteShape { len: 0 })
        ));
    }

    #[test]
    fn tampered_tokens_are_rejected() {
        let token = generate_proof(&[0, 1, 0]).unwrap();
        assert!(!verify_proof(&token, 4));
        assert!(!verify_proof(&token.replace("sum=1", "sum=2"), 3));
        assert!(!verify_proof("bogus", 3));
        assert!(!verify_proof("", 3));
    }
}
