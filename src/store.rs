//! Bounded FIFO store of ciphertext handles, indexed by opaque
//! identifiers.
//!
//! Only identifiers are durable: callers persist a `CipherId` next to
//! their vote/election records, while the ciphertext bytes themselves
//! live here for the life of the process. A deployment that must
//! survive restarts has to serialize ciphertexts elsewhere.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use fhe::bfv::Ciphertext;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::TallyError;

/// Default store capacity.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Opaque handle to a stored ciphertext: a random 128-bit token, never
/// reused while an entry under it is live.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CipherId(u128);

impl fmt::Display for CipherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// Insertion-ordered, capacity-bounded map from [`CipherId`] to
/// ciphertext.
///
/// Eviction is strict FIFO: when full, the single oldest surviving
/// entry is dropped before the new one goes in, and lookups never
/// refresh an entry's position. A ring of identifiers plus a hash index
/// keeps insert, evict and lookup O(1).
///
/// All mutating operations take `&mut self`, so exclusive access is
/// enforced by the borrow checker; share across threads by wrapping the
/// store (or the engine that owns it) in a lock.
pub struct CipherStore {
    order: VecDeque<CipherId>,
    entries: HashMap<CipherId, Ciphertext>,
    capacity: usize,
}

impl CipherStore {
    /// Store holding at most `capacity` ciphertexts (at least 1).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            order: VecDeque::with_capacity(capacity),
            entries: HashMap::with_capacity(capacity),
            capacity,
        }
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries; fixed at construction.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Insert `ciphertext` under a freshly minted identifier, evicting
    /// the oldest entry first if the store is full. `len() <= capacity()`
    /// holds on return.
    pub fn put(&mut self, ciphertext: Ciphertext) -> CipherId {
        if self.entries.len() == self.capacity {
            self.evict_oldest();
        }

        let id = self.mint_id();
        self.order.push_back(id);
        self.entries.insert(id, ciphertext);
        id
    }

    /// Look up a stored ciphertext. Never mutates the store, so FIFO
    /// eviction order stays deterministic.
    ///
    /// # Errors
    /// [`TallyError::UnknownCiphertextId`] when `id` was evicted,
    /// cleared, or never issued.
    pub fn get(&self, id: CipherId) -> Result<&Ciphertext, TallyError> {
        self.entries
            .get(&id)
            .ok_or(TallyError::UnknownCiphertextId(id))
    }

    /// Drop every entry. Previously issued identifiers become invalid.
    pub fn clear(&mut self) {
        let dropped = self.entries.len();
        self.order.clear();
        self.entries.clear();
        debug!(dropped, "ciphertext store cleared");
    }

    /// Amortized cleanup for long streaming runs: when occupancy
    /// exceeds half the capacity, retain only the most recently
    /// inserted `capacity / 2` entries and evict the rest in one pass.
    pub fn compact_to_half(&mut self) {
        let target = self.capacity / 2;
        if self.entries.len() <= target {
            return;
        }

        let evicted = self.entries.len() - target.max(1);
        while self.entries.len() > target.max(1) {
            self.evict_oldest();
        }
        debug!(evicted, retained = self.entries.len(), "ciphertext store compacted");
    }

    fn evict_oldest(&mut self) {
        if let Some(oldest) = self.order.pop_front() {
            self.entries.remove(&oldest);
            debug!(id = %oldest, "evicted oldest ciphertext");
        }
    }

    fn mint_id(&self) -> CipherId {
        let mut rng = rand::rng();
        loop {
            let id = CipherId(rng.random::<u128>());
            // Identifiers must never repeat within a store lifetime;
            // re-roll on the (vanishingly unlikely) collision.
            if !self.entries.contains_key(&id) {
                return id;
            }
        }
    }
}

impl Default for CipherStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}
