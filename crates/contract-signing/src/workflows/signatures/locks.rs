use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::domain::ContractId;

/// One mutex per contract so record updates and the aggregate recomputation
/// for that contract run as a single unit.
///
/// Entries live only while some caller holds or waits on them; the last one out
/// removes the entry, so the table never outgrows the contracts in flight.
#[derive(Debug, Default)]
pub(crate) struct ContractLocks {
    inner: Mutex<HashMap<ContractId, Arc<Mutex<()>>>>,
}

impl ContractLocks {
    /// Run `work` while holding the contract's mutex.
    pub(crate) fn with_contract<T>(
        &self,
        contract_id: &ContractId,
        work: impl FnOnce() -> T,
    ) -> T {
        let lock = self.for_contract(contract_id);
        let outcome = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            work()
        };
        self.release(contract_id, lock);
        outcome
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn for_contract(&self, contract_id: &ContractId) -> Arc<Mutex<()>> {
        let mut table = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        table
            .entry(contract_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    // Clones are only handed out under the table mutex, so a count of two (table +
    // this caller) means nobody else is holding or waiting on the entry.
    fn release(&self, contract_id: &ContractId, lock: Arc<Mutex<()>>) {
        let mut table = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let idle = table
            .get(contract_id)
            .is_some_and(|entry| Arc::ptr_eq(entry, &lock) && Arc::strong_count(entry) == 2);
        drop(lock);
        if idle {
            table.remove(contract_id);
        }
    }
}
