//! Vote-casting and results boundaries.
//!
//! This is the layer an HTTP router (or any other transport) calls
//! into: it owns per-election bookkeeping (candidate count, the
//! current tally version, and who has already voted) and drives the
//! engine in the "encode → proof → encrypt → fold" order. Everything
//! it hands back (receipts, results) is serializable; ciphertext bytes
//! never leave the engine's store.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::context::SchemeContext;
use crate::engine::{TallyEngine, TallyVersion};
use crate::error::TallyError;
use crate::proof::generate_proof;
use crate::store::CipherId;
use crate::vote::create_vote_vector;

/// What a voter gets back after a successful cast. Only identifiers
/// and the advisory proof token; nothing here decrypts anything.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VoteReceipt {
    /// Election the vote was folded into.
    pub election_id: String,
    /// Identifier of the voter's encrypted ballot.
    pub receipt_id: CipherId,
    /// Advisory one-hot token for the ballot's shape.
    pub proof: String,
}

/// Decrypted outcome of an election.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ElectionResults {
    /// Election these counts belong to.
    pub election_id: String,
    /// Vote count per candidate slot.
    pub counts: Vec<u64>,
    /// Sum of all per-candidate counts.
    pub total_votes: u64,
}

struct Election {
    candidate_total: usize,
    // Lazily created on the first vote.
    tally: Option<TallyVersion>,
    voters: HashSet<String>,
    votes_cast: u64,
}

/// In-memory election registry driving a [`TallyEngine`].
pub struct ElectionBoard {
    engine: TallyEngine,
    elections: HashMap<String, Election>,
}

impl ElectionBoard {
    /// Board over a fresh engine for `ctx`.
    #[must_use]
    pub fn new(ctx: Arc<SchemeContext>) -> Self {
        Self::with_engine(TallyEngine::new(ctx))
    }

    /// Board over a caller-configured engine.
    #[must_use]
    pub fn with_engine(engine: TallyEngine) -> Self {
        Self {
            engine,
            elections: HashMap::new(),
        }
    }

    /// Register an election with `candidate_total` slots. Re-opening an
    /// existing id resets its bookkeeping.
    pub fn open_election(&mut self, election_id: &str, candidate_total: usize) {
        self.elections.insert(
            election_id.to_owned(),
            Election {
                candidate_total,
                tally: None,
                voters: HashSet::new(),
                votes_cast: 0,
            },
        );
        info!(election = election_id, candidates = candidate_total, "election opened");
    }

    /// Cast an authenticated voter's ballot for `candidate`.
    ///
    /// Rejections (unknown election, repeat voter, bad candidate
    /// index) all happen before any encryption or folding, so a
    /// rejected attempt costs no cryptographic work and leaves the
    /// tally untouched. A successful cast advances the election's tally
    /// to a new version atomically from the caller's point of view.
    pub fn cast_vote(
        &mut self,
        election_id: &str,
        voter_id: &str,
        candidate: usize,
    ) -> Result<VoteReceipt, TallyError> {
        let election = self
            .elections
            .get_mut(election_id)
            .ok_or_else(|| TallyError::UnknownElection(election_id.to_owned()))?;

        if election.voters.contains(voter_id) {
            return Err(TallyError::DuplicateVote {
                voter: voter_id.to_owned(),
                election: election_id.to_owned(),
            });
        }

        let vote = create_vote_vector(candidate, election.candidate_total)?;
        let proof = generate_proof(&vote)?;

        let tally = match election.tally {
            Some(version) => version.id(),
            None => self.engine.create_zero_tally(election.candidate_total)?,
        };
        let receipt_id = self.engine.encrypt_vote(&vote)?;
        let new_tally = self.engine.add_to_tally(tally, receipt_id)?;

        election.tally = Some(TallyVersion::new(new_tally));
        election.voters.insert(voter_id.to_owned());
        election.votes_cast += 1;

        Ok(VoteReceipt {
            election_id: election_id.to_owned(),
            receipt_id,
            proof,
        })
    }

    /// Decrypt the election's current tally into per-candidate counts.
    ///
    /// An election nobody has voted in yet reports all-zero counts
    /// without ever having created a ciphertext.
    pub fn results(&self, election_id: &str) -> Result<ElectionResults, TallyError> {
        let election = self
            .elections
            .get(election_id)
            .ok_or_else(|| TallyError::UnknownElection(election_id.to_owned()))?;

        let counts = match election.tally {
            Some(version) => self
                .engine
                .decrypt_tally(version.id(), election.candidate_total)?,
            None => vec![0; election.candidate_total],
        };
        let total_votes = counts.iter().sum();

        Ok(ElectionResults {
            election_id: election_id.to_owned(),
            counts,
            total_votes,
        })
    }

    /// Number of votes folded into `election_id` so far.
    pub fn votes_cast(&self, election_id: &str) -> Result<u64, TallyError> {
        self.elections
            .get(election_id)
            .map(|e| e.votes_cast)
            .ok_or_else(|| TallyError::UnknownElection(election_id.to_owned()))
    }

    /// The engine behind this board.
    #[must_use]
    pub fn engine(&self) -> &TallyEngine {
        &self.engine
    }
}
