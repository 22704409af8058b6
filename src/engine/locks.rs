use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::model::ClientId;

/// Per-client async mutual exclusion.
///
/// Holding a [`ClientGuard`] linearizes every read-decide-commit sequence for
/// that client while other clients proceed in parallel. Entries are dropped
/// from the map once nobody holds or waits on them.
#[derive(Debug, Default)]
pub(crate) struct ClientLocks {
    inner: DashMap<ClientId, Arc<Mutex<()>>>,
}

pub(crate) struct ClientGuard<'a> {
    locks: &'a ClientLocks,
    client: ClientId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl ClientLocks {
    pub(crate) async fn lock(&self, client: ClientId) -> ClientGuard<'_> {
        let mutex = self.inner.entry(client).or_default().clone();
        let guard = mutex.lock_owned().await;
        ClientGuard {
            locks: self,
            client,
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.inner.len()
    }
}

impl Drop for ClientGuard<'_> {
    fn drop(&mut self) {
        // release first so the map holds the only remaining reference if idle
        drop(self.guard.take());
        self.locks
            .inner
            .remove_if(&self.client, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
