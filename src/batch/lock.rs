//! Advisory per-address locks.
//!
//! Two batches in one process must not drive the same account: their
//! nonce sequencers would collide. Locks are released when the guard drops.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::{Arc, OnceLock};
use uuid::Uuid;

use crate::ledger::Address;

/// Registry of addresses currently owned by a batch.
#[derive(Debug, Clone, Default)]
pub struct AccountLocks {
    inner: Arc<DashMap<Address, Uuid>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry.
    pub fn global() -> &'static AccountLocks {
        static GLOBAL: OnceLock<AccountLocks> = OnceLock::new();
        GLOBAL.get_or_init(AccountLocks::new)
    }

    /// Lock every address for `batch_id`, all or nothing.
    ///
    /// Returns the first address held by another batch.
    pub fn acquire<'a, I>(&self, batch_id: Uuid, addresses: I) -> Result<AccountLockGuard, Address>
    where
        I: IntoIterator<Item = &'a Address>,
    {
        let mut guard = AccountLockGuard {
            locks: self.clone(),
            batch_id,
            held: Vec::new(),
        };
        for address in addresses {
            let busy = match self.inner.entry(address.clone()) {
                Entry::Occupied(owner) => *owner.get() != batch_id,
                Entry::Vacant(slot) => {
                    slot.insert(batch_id);
                    guard.held.push(address.clone());
                    false
                }
            };
            if busy {
                // dropping the guard releases what was taken so far
                return Err(address.clone());
            }
        }
        Ok(guard)
    }

    pub fn is_locked(&self, address: &Address) -> bool {
        self.inner.contains_key(address)
    }
}

/// Releases its addresses on drop.
#[derive(Debug)]
pub struct AccountLockGuard {
    locks: AccountLocks,
    batch_id: Uuid,
    held: Vec<Address>,
}

impl Drop for AccountLockGuard {
    fn drop(&mut self) {
        for address in &self.held {
            self.locks
                .inner
                .remove_if(address, |_, owner| *owner == self.batch_id);
        }
    }
}
