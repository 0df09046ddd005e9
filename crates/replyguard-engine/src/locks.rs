use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use replyguard_core::NaturalId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async lock per natural id, created on demand.
#[derive(Debug, Default)]
pub(crate) struct IdLocks {
    locks: Mutex<HashMap<NaturalId, Arc<AsyncMutex<()>>>>,
}

impl IdLocks {
    pub(crate) async fn lock(&self, id: &NaturalId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Entries nobody holds or waits on are dropped here.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(id.clone()).or_default())
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
