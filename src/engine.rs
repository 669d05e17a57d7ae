//! The accumulation engine: encrypt votes, fold them homomorphically
//! into a running tally, and decrypt tallies with modular
//! normalization.
//!
//! There is no process-wide singleton here: construct a `TallyEngine`
//! explicitly, pass it where it is needed, and every test gets its own
//! isolated state.

use std::sync::Arc;

use tracing::{debug, info};

use crate::context::SchemeContext;
use crate::error::TallyError;
use crate::store::{CipherId, CipherStore};
use crate::vote::validate_one_hot;

/// Votes encrypted and folded per streaming batch.
pub const STREAMING_BATCH_SIZE: usize = 50;
/// Batches between two store compactions during streaming.
pub const COMPACTION_INTERVAL: usize = 4;

/// The current identifier of an election's running tally.
///
/// Folding a vote never mutates a stored ciphertext; it produces a new
/// identifier that supersedes the old one in the caller's bookkeeping.
/// The old identifier stays valid until evicted, which is what makes
/// per-candidate sub-tallies over shared vote ciphertexts possible.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TallyVersion(CipherId);

impl TallyVersion {
    /// Wrap a freshly stored tally identifier.
    #[must_use]
    pub fn new(id: CipherId) -> Self {
        Self(id)
    }

    /// Identifier of this version.
    #[must_use]
    pub fn id(&self) -> CipherId {
        self.0
    }
}

/// Accumulator over a [`SchemeContext`] and a bounded [`CipherStore`].
///
/// All mutating operations take `&mut self`; the borrow checker
/// enforces the single-writer discipline the FIFO and id-uniqueness
/// invariants need. Wrap the engine in a `Mutex` to share it.
pub struct TallyEngine {
    ctx: Arc<SchemeContext>,
    store: CipherStore,
}

impl TallyEngine {
    /// Engine over `ctx` with the default store capacity.
    #[must_use]
    pub fn new(ctx: Arc<SchemeContext>) -> Self {
        Self::with_store(ctx, CipherStore::default())
    }

    /// Engine over `ctx` with a caller-provided store.
    #[must_use]
    pub fn with_store(ctx: Arc<SchemeContext>, store: CipherStore) -> Self {
        Self { ctx, store }
    }

    /// Shared scheme context.
    #[must_use]
    pub fn context(&self) -> &Arc<SchemeContext> {
        &self.ctx
    }

    /// The backing ciphertext store.
    #[must_use]
    pub fn store(&self) -> &CipherStore {
        &self.store
    }

    /// Exclusive access to the backing store, for explicit `clear` /
    /// `compact_to_half` calls between runs.
    pub fn store_mut(&mut self) -> &mut CipherStore {
        &mut self.store
    }

    /// Validate, encrypt and store a one-hot vote vector.
    ///
    /// # Errors
    /// [`TallyError::InvalidVoteShape`] before any cryptographic work
    /// when the vector is not one-hot.
    pub fn encrypt_vote(&mut self, vote: &[u64]) -> Result<CipherId, TallyError> {
        if !validate_one_hot(vote) {
            return Err(TallyError::InvalidVoteShape { len: vote.len() });
        }
        let ct = self.ctx.encrypt(vote)?;
        Ok(self.store.put(ct))
    }

    /// Encrypt the all-zero length-`total` vector: the canonical empty
    /// tally. Unlike a vote, it need not be one-hot.
    pub fn create_zero_tally(&mut self, total: usize) -> Result<CipherId, TallyError> {
        let zeros = vec![0u64; total];
        let ct = self.ctx.encrypt(&zeros)?;
        Ok(self.store.put(ct))
    }

    /// Homomorphically add the vote under `vote` to the tally under
    /// `tally`, storing the sum under a fresh identifier.
    ///
    /// Neither input is mutated or evicted; the caller chains versions
    /// by treating the returned identifier as the new tally. Either the
    /// whole operation succeeds or nothing is stored.
    ///
    /// # Errors
    /// [`TallyError::UnknownCiphertextId`] when either identifier is
    /// absent; checked before any homomorphic work runs.
    pub fn add_to_tally(&mut self, tally: CipherId, vote: CipherId) -> Result<CipherId, TallyError> {
        let ct_tally = self.store.get(tally)?;
        let ct_vote = self.store.get(vote)?;
        let sum = self.ctx.add(ct_tally, ct_vote);
        let id = self.store.put(sum);
        debug!(old = %tally, vote = %vote, new = %id, "tally advanced");
        Ok(id)
    }

    /// Fold a list of already-encrypted votes onto `tally`, left to
    /// right, returning the final identifier.
    pub fn batch_add(&mut self, tally: CipherId, votes: &[CipherId]) -> Result<CipherId, TallyError> {
        let mut current = tally;
        for &vote in votes {
            current = self.add_to_tally(current, vote)?;
        }
        Ok(current)
    }

    /// Memory-bounded bulk ingestion: encrypt and fold `votes` in
    /// batches of [`STREAMING_BATCH_SIZE`], compacting the store every
    /// [`COMPACTION_INTERVAL`] batches, then decrypt the final tally.
    ///
    /// Produces exactly the counts that one-at-a-time `encrypt_vote` +
    /// `add_to_tally` calls would: compaction only bounds store
    /// occupancy, it never touches an identifier the in-flight chain
    /// still needs (each step only needs the newest tally, which
    /// compaction always retains).
    pub fn process_streaming(&mut self, votes: &[Vec<u64>], total: usize) -> Result<Vec<u64>, TallyError> {
        let mut tally = self.create_zero_tally(total)?;

        for (batch_index, batch) in votes.chunks(STREAMING_BATCH_SIZE).enumerate() {
            for vote in batch {
                let vote_id = self.encrypt_vote(vote)?;
                tally = self.add_to_tally(tally, vote_id)?;
            }

            if (batch_index + 1) % COMPACTION_INTERVAL == 0 {
                self.store.compact_to_half();
            }

            info!(
                processed = (batch_index * STREAMING_BATCH_SIZE + batch.len()),
                occupancy = self.store.len(),
                "streaming batch folded"
            );
        }

        self.decrypt_tally(tally, total)
    }

    /// Decrypt the tally under `tally`, truncate to the first `total`
    /// slots, and normalize every raw residue into `[0, t)`.
    ///
    /// The scheme's decode is implementation-defined with respect to
    /// sign (a coefficient may come back as a signed residue in
    /// `(-t/2, t/2]`), so the reduction modulo `t` is mandatory, not
    /// cosmetic.
    pub fn decrypt_tally(&self, tally: CipherId, total: usize) -> Result<Vec<u64>, TallyError> {
        let ct = self.store.get(tally)?;
        let raw = self.ctx.decrypt_raw(ct)?;
        let t = self.ctx.plaintext_modulus();
        Ok(raw
            .iter()
            .take(total)
            .map(|&v| normalize_residue(i128::from(v), t))
            .collect())
    }
}

/// Map a raw decoded residue onto its canonical representative in
/// `[0, t)`.
#[must_use]
pub fn normalize_residue(value: i128, t: u64) -> u64 {
    // rem_euclid is ((v % t) + t) % t without the double division.
    value.rem_euclid(i128::from(t)) as u64
}

/// Harness-level integrity check: the decrypted counts must sum to the
/// number of votes known to have been folded in. The engine never calls
/// this on its own; stress tests and the demo binary do, and a mismatch
/// must be surfaced, not shrugged off.
pub fn check_integrity(counts: &[u64], expected_votes: u64) -> Result<(), TallyError> {
    let actual: u64 = counts.iter().sum();
    if actual != expected_votes {
        return Err(TallyError::IntegrityMismatch {
            expected: expected_votes,
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::small_params;
    use crate::store::CipherStore;
    use crate::vote::create_vote_vector;

    fn engine() -> TallyEngine {
        let ctx = SchemeContext::setup(small_params()).unwrap();
        TallyEngine::new(Arc::new(ctx))
    }

    #[test]
    fn single_vote_roundtrip() {
        let mut eng = engine();
        for (position, total) in [(0usize, 3usize), (2, 3), (4, 7)] {
            let vote = create_vote_vector(position, total).unwrap();
            let vote_id = eng.encrypt_vote(&vote).unwrap();
            let tally = eng.create_zero_tally(total).unwrap();
            let tally = eng.add_to_tally(tally, vote_id).unwrap();
            assert_eq!(eng.decrypt_tally(tally, total).unwrap(), vote);
        }
    }

    #[test]
    fn three_candidate_election_scenario() {
        // Five voters, candidate indices [0, 1, 1, 2, 1].
        let mut eng = engine();
        let mut tally = eng.create_zero_tally(3).unwrap();
        for position in [0usize, 1, 1, 2, 1] {
            let vote = create_vote_vector(position, 3).unwrap();
            let vote_id = eng.encrypt_vote(&vote).unwrap();
            tally = eng.add_to_tally(tally, vote_id).unwrap();
        }

        let counts = eng.decrypt_tally(tally, 3).unwrap();
        assert_eq!(counts, vec![1, 3, 1]);
        check_integrity(&counts, 5).unwrap();
    }

    #[test]
    fn additivity_of_two_votes() {
        let mut eng = engine();
        let v1 = eng.encrypt_vote(&[0, 1, 0, 0]).unwrap();
        let v2 = eng.encrypt_vote(&[0, 1, 0, 0]).unwrap();
        let v3 = eng.encrypt_vote(&[0, 0, 0, 1]).unwrap();

        let tally = eng.create_zero_tally(4).unwrap();
        let tally = eng.batch_add(tally, &[v1, v2, v3]).unwrap();
        assert_eq!(eng.decrypt_tally(tally, 4).unwrap(), vec![0, 2, 0, 1]);
    }

    #[test]
    fn old_tally_version_stays_valid() {
        let mut eng = engine();
        let vote = eng.encrypt_vote(&[1, 0]).unwrap();
        let t0 = eng.create_zero_tally(2).unwrap();
        let t1 = eng.add_to_tally(t0, vote).unwrap();
        let t2 = eng.add_to_tally(t1, vote).unwrap();

        // Superseded identifiers still decrypt on their own.
        assert_eq!(eng.decrypt_tally(t0, 2).unwrap(), vec![0, 0]);
        assert_eq!(eng.decrypt_tally(t1, 2).unwrap(), vec![1, 0]);
        assert_eq!(eng.decrypt_tally(t2, 2).unwrap(), vec![2, 0]);
    }

    #[test]
    fn rejects_malformed_votes_before_encrypting() {
        let mut eng = engine();
        let bad_votes: [&[u64]; 4] = [&[1, 1, 0], &[0, 0, 0], &[2, 0, 0], &[]];
        for bad in bad_votes {
            assert!(matches!(
                eng.encrypt_vote(bad),
                Err(TallyError::InvalidVoteShape { .. })
            ));
        }
        assert!(eng.store().is_empty());
    }

    #[test]
    fn unknown_identifier_fails_lookup() {
        let mut eng = engine();
        let tally = eng.create_zero_tally(2).unwrap();
        eng.store_mut().clear();

        assert!(matches!(
            eng.decrypt_tally(tally, 2),
            Err(TallyError::UnknownCiphertextId(_))
        ));
        let vote = eng.encrypt_vote(&[1, 0]).unwrap();
        assert!(matches!(
            eng.add_to_tally(tally, vote),
            Err(TallyError::UnknownCiphertextId(_))
        ));
    }

    #[test]
    fn streaming_matches_one_at_a_time() {
        let ctx = Arc::new(SchemeContext::setup(small_params()).unwrap());
        // 210 votes spans five streaming batches, so the compaction
        // interval actually fires mid-run.
        let votes: Vec<Vec<u64>> = (0..210)
            .map(|i| create_vote_vector(i % 3, 3).unwrap())
            .collect();

        // Reference path: no batching, no compaction.
        let mut reference = TallyEngine::new(ctx.clone());
        let mut tally = reference.create_zero_tally(3).unwrap();
        for vote in &votes {
            let id = reference.encrypt_vote(vote).unwrap();
            tally = reference.add_to_tally(tally, id).unwrap();
        }
        let expected = reference.decrypt_tally(tally, 3).unwrap();

        // Streaming path with a store small enough to force compaction
        // and FIFO eviction mid-run.
        let mut streaming = TallyEngine::with_store(ctx, CipherStore::with_capacity(8));
        let counts = streaming.process_streaming(&votes, 3).unwrap();

        assert_eq!(counts, expected);
        assert_eq!(counts, vec![70, 70, 70]);
        assert!(streaming.store().len() <= 8);
    }

    #[test]
    fn wraparound_at_plaintext_modulus() {
        // 65537 votes for candidate 0, built as a doubling chain:
        // 1 -> 2 -> 4 -> ... -> 65536 votes in 16 doublings, plus one
        // more single vote. The count wraps to 0, not t.
        let mut eng = engine();
        let t = eng.context().plaintext_modulus();
        assert_eq!(t, 65537);

        let one_vote = eng.encrypt_vote(&[1, 0]).unwrap();
        let mut tally = one_vote;
        for _ in 0..16 {
            tally = eng.add_to_tally(tally, tally).unwrap();
        }
        tally = eng.add_to_tally(tally, one_vote).unwrap();

        let counts = eng.decrypt_tally(tally, 2).unwrap();
        assert_eq!(counts, vec![0, 0]);
    }

    #[test]
    fn residue_normalization() {
        assert_eq!(normalize_residue(0, 65537), 0);
        assert_eq!(normalize_residue(5, 65537), 5);
        assert_eq!(normalize_residue(-1, 65537), 65536);
        assert_eq!(normalize_residue(-65537, 65537), 0);
        assert_eq!(normalize_residue(65537, 65537), 0);
        assert_eq!(normalize_residue(65538, 65537), 1);
    }

    #[test]
    fn integrity_mismatch_is_surfaced() {
        check_integrity(&[1, 3, 1], 5).unwrap();
        assert!(matches!(
            check_integrity(&[1, 3, 1], 6),
            Err(TallyError::IntegrityMismatch { expected: 6, actual: 5 })
        ));
    }
}
