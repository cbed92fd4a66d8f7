// src/approvals.rs
// In-memory approval ledger for staged operations

use crate::kit::Operation;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// One staged operation awaiting explicit confirmation.
#[derive(Debug, Clone)]
pub struct PendingApproval {
    pub id: String,
    pub operation: Operation,
    pub summary: String,
    pub created_at: DateTime<Utc>,
    /// Draft this entry was promoted from, if any. Promotion references the
    /// draft; it never modifies the draft file.
    pub draft_id: Option<String>,
}

/// Pending approvals keyed by handle.
///
/// Process-lifetime state with no persistence: a restart drops every pending
/// approval. Handles are assigned monotonically and never reused, so a
/// consumed or expired handle can never resolve again.
pub struct ApprovalQueue {
    max_age: Duration,
    inner: Mutex<Inner>,
}

struct Inner {
    entries: HashMap<String, PendingApproval>,
    next_id: u64,
}

impl ApprovalQueue {
    pub fn new(max_age: Duration) -> Self {
        Self {
            max_age,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Stage an operation and return its freshly assigned handle.
    pub fn register(
        &self,
        operation: Operation,
        summary: String,
        draft_id: Option<String>,
    ) -> String {
        let mut inner = self.lock();
        let id = format!("approval_{}", inner.next_id);
        inner.next_id += 1;
        inner.entries.insert(
            id.clone(),
            PendingApproval {
                id: id.clone(),
                operation,
                summary,
                created_at: Utc::now(),
                draft_id,
            },
        );
        id
    }

    /// Look up a handle without removing it.
    ///
    /// Entries past the maximum age are reported absent even before the
    /// sweep physically drops them, so expiry holds at every query time.
    pub fn resolve(&self, id: &str) -> Option<PendingApproval> {
        let cutoff = Utc::now() - self.max_age;
        self.lock()
            .entries
            .get(id)
            .filter(|entry| entry.created_at > cutoff)
            .cloned()
    }

    /// Remove a handle. Removing an unknown or already-consumed handle is a
    /// no-op; the expiry sweep may race an in-flight confirmation.
    pub fn consume(&self, id: &str) -> Option<PendingApproval> {
        self.lock().entries.remove(id)
    }

    /// Live entries, in arbitrary map order; callers sort by `created_at`.
    pub fn list(&self) -> Vec<PendingApproval> {
        let cutoff = Utc::now() - self.max_age;
        self.lock()
            .entries
            .values()
            .filter(|entry| entry.created_at > cutoff)
            .cloned()
            .collect()
    }

    /// Drop every entry past the maximum age and return how many were
    /// removed. The periodic sweep is the only automatic removal path.
    pub fn expire(&self) -> usize {
        let cutoff = Utc::now() - self.max_age;
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| entry.created_at > cutoff);
        before - inner.entries.len()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("approval queue lock poisoned")
    }

    #[cfg(test)]
    fn backdate(&self, id: &str, by: Duration) {
        if let Some(entry) = self.lock().entries.get_mut(id) {
            entry.created_at -= by;
        }
    }
}
