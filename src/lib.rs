//! hetally ― homomorphic tally accumulation for encrypted elections.
//!
//! Each vote is a one-hot vector, encrypted once under BFV and folded
//! into a running encrypted tally by ciphertext addition; only the
//! final sum is ever decrypted. The lattice scheme itself comes from
//! the `fhe` crate; this crate is the layer above it: what gets
//! encrypted, how ciphertexts are cached and combined, how decrypted
//! counts are normalized, and how memory stays bounded under unbounded
//! vote volume.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, missing_docs)]

pub mod context;
pub mod election;
pub mod engine;
pub mod error;
pub mod proof;
pub mod store;
pub mod vote;

pub use context::{SchemeContext, SchemeParameters};
pub use election::{ElectionBoard, ElectionResults, VoteReceipt};
pub use engine::{check_integrity, TallyEngine, TallyVersion};
pub use error::TallyError;
pub use store::{CipherId, CipherStore};
pub use vote::{create_vote_vector, validate_one_hot};
