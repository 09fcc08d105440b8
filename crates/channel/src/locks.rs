use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-actor mutual exclusion.
///
/// Messages from the same customer are handled one at a time while different
/// customers proceed in parallel. Entries nobody holds are pruned on each call.
#[derive(Default)]
pub struct ActorLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ActorLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, actor: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.retain(|key, lock| key == actor || Arc::strong_count(lock) > 1);
            locks.entry(actor.to_owned()).or_default().clone()
        };
        lock.lock_owned().await
    }

    pub async fn tracked(&self) -> usize {
        self.locks.lock().await.len()
    }
}
