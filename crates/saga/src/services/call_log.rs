//! Shared, ordered record of collaborator calls.

use std::sync::{Arc, Mutex, PoisonError};

/// Ordered log of calls observed by the in-memory collaborators.
///
/// Clones share the same log, so one instance handed to all three services
/// captures the cross-service call order of a saga run. Entries look like
/// `identity.create_user:alice` or `billing.update_invoice:67890,PAID`.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    /// Creates an empty call log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a call.
    pub fn record(&self, call: impl Into<String>) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call.into());
    }

    /// Returns a snapshot of all calls in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns how many recorded calls start with `prefix`.
    pub fn count_of(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    /// Removes all recorded calls.
    pub fn clear(&self) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
