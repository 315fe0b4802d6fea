use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

/// Ride ids with a mutation currently on the wire.
///
/// Scoped to one list view. The only way in is [`InFlightSet::try_acquire`];
/// the only way out is dropping the returned guard, which happens on every
/// exit path of the mutation.
#[derive(Debug, Clone, Default)]
pub struct InFlightSet {
    ids: Arc<Mutex<HashSet<String>>>,
}

impl InFlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim `id`, or `None` if a mutation for it is already in flight
    pub fn try_acquire(&self, id: &str) -> Option<InFlightGuard> {
        if !self.lock().insert(id.to_string()) {
            debug!(ride = id, "Mutation already in flight");
            return None;
        }
        debug!(ride = id, "Mutation started");
        Some(InFlightGuard {
            ids: self.ids.clone(),
            id: id.to_string(),
        })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains(id)
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lock().iter().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Releases its id when dropped
#[derive(Debug)]
pub struct InFlightGuard {
    ids: Arc<Mutex<HashSet<String>>>,
    id: String,
}

impl InFlightGuard {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
        debug!(ride = %self.id, "Mutation finished");
    }
}
