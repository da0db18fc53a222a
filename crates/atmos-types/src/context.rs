//! Per-transaction execution context.
//!
//! The hosting environment hands one context to every call. It carries the
//! authenticated sender and derives identities for objects created during
//! the transaction. Ids are unique as long as the host gives every
//! transaction its own digest.

use crate::{Address, ObjectId};

/// Transaction context: authenticated sender plus a fresh-id counter.
#[derive(Debug)]
pub struct TxContext {
    sender: Address,
    tx_digest: [u8; 32],
    ids_created: u64,
}

impl TxContext {
    pub fn new(sender: Address, tx_digest: [u8; 32]) -> Self {
        Self {
            sender,
            tx_digest,
            ids_created: 0,
        }
    }

    /// Context whose digest is derived from the sender alone. Every such
    /// context for one sender yields the same id sequence, so it is only
    /// available to tests.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn for_sender(sender: Address) -> Self {
        let digest = *blake3::hash(sender.as_bytes()).as_bytes();
        Self::new(sender, digest)
    }

    pub fn sender(&self) -> Address {
        self.sender
    }

    pub fn digest(&self) -> &[u8; 32] {
        &self.tx_digest
    }

    /// Number of ids handed out so far.
    pub fn ids_created(&self) -> u64 {
        self.ids_created
    }

    /// Derive a new unique object id: `blake3(digest || sender || counter)`.
    pub fn fresh_id(&mut self) -> ObjectId {
        let id = ObjectId::derive(&[
            &self.tx_digest,
            self.sender.as_bytes(),
            &self.ids_created.to_le_bytes(),
        ]);
        self.ids_created += 1;
        id
    }
}
