//! Per-conversation send serialization.
//!
//! At most one send may be generating for a conversation at a time. A
//! permit is taken before the model is invoked and released when it is
//! dropped, whichever way the send ends.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::foundation::ConversationId;

/// Set of conversations with a send in progress.
#[derive(Debug, Default)]
pub struct InFlightRegistry {
    active: Mutex<HashSet<ConversationId>>,
}

impl InFlightRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Claims `id`, or returns `None` if a send already holds it.
    pub fn try_acquire(self: &Arc<Self>, id: ConversationId) -> Option<InFlightPermit> {
        if self.lock().insert(id) {
            Some(InFlightPermit {
                registry: Arc::clone(self),
                id,
            })
        } else {
            None
        }
    }

    pub fn is_active(&self, id: &ConversationId) -> bool {
        self.lock().contains(id)
    }

    pub fn active_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<ConversationId>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Exclusive claim on one conversation. Released on drop.
#[derive(Debug)]
pub struct InFlightPermit {
    registry: Arc<InFlightRegistry>,
    id: ConversationId,
}

impl Drop for InFlightPermit {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.id);
    }
}
