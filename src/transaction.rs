//! Write-buffering transaction over a [`Storage`].
//!
//! Mutating handlers run against a [`StorageTransaction`], which reads through to the
//! base store and keeps every write in memory. Writes reach the base store only when
//! the handler succeeds.

use std::collections::BTreeMap;
use std::ops::Bound;

use cosmwasm_std::{Order, Record, Storage};
use tracing::debug;

/// Buffered change to one key; `None` is a deletion
type Change = Option<Vec<u8>>;

/// A read-through view of a store that buffers writes
pub struct StorageTransaction<'a> {
    storage: &'a dyn Storage,
    local: BTreeMap<Vec<u8>, Change>,
}

impl<'a> StorageTransaction<'a> {
    pub fn new(storage: &'a dyn Storage) -> Self {
        Self {
            storage,
            local: BTreeMap::new(),
        }
    }

    /// Returns true when nothing was written
    pub fn is_empty(&self) -> bool {
        self.local.is_empty()
    }

    /// Ends the transaction, returning the buffered writes
    pub fn prepare(self) -> PendingWrites {
        PendingWrites(self.local)
    }
}

impl Storage for StorageTransaction<'_> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.local.get(key) {
            Some(change) => change.clone(),
            None => self.storage.get(key),
        }
    }

    fn range<'b>(
        &'b self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        order: Order,
    ) -> Box<dyn Iterator<Item = Record> + 'b> {
        if let (Some(start), Some(end)) = (start, end) {
            if start >= end {
                return Box::new(std::iter::empty());
            }
        }

        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = self.storage.range(start, end, Order::Ascending).collect();

        let lower = start.map_or(Bound::Unbounded, |s| Bound::Included(s.to_vec()));
        let upper = end.map_or(Bound::Unbounded, |e| Bound::Excluded(e.to_vec()));
        for (key, change) in self.local.range::<Vec<u8>, _>((lower, upper)) {
            match change {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }

        let records: Vec<Record> = match order {
            Order::Ascending => merged.into_iter().collect(),
            Order::Descending => merged.into_iter().rev().collect(),
        };
        Box::new(records.into_iter())
    }

    fn set(&mut self, key: &[u8], value: &[u8]) {
        self.local.insert(key.to_vec(), Some(value.to_vec()));
    }

    fn remove(&mut self, key: &[u8]) {
        self.local.insert(key.to_vec(), None);
    }
}

/// Writes collected by a finished transaction
#[derive(Debug, Default)]
pub struct PendingWrites(BTreeMap<Vec<u8>, Change>);

impl PendingWrites {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Applies every write to `storage` in key order
    pub fn commit(self, storage: &mut dyn Storage) {
        for (key, change) in self.0 {
            match change {
                Some(value) => storage.set(&key, &value),
                None => storage.remove(&key),
            }
        }
    }
}

/// Runs `action` in a transaction, committing its writes only if it returns `Ok`
pub fn transactional<T, E, F>(storage: &mut dyn Storage, action: F) -> Result<T, E>
where
    F: FnOnce(&mut dyn Storage) -> Result<T, E>,
{
    let mut tx = StorageTransaction::new(&*storage);
    let result = action(&mut tx)?;

    let writes = tx.prepare();
    debug!(writes = writes.len(), "committing transaction");
    writes.commit(storage);

    Ok(result)
}
