// SPDX-License-Identifier: MIT

//! C13 Retry Manager (§4.13).
//!
//! A bounded, TTL-expiring store of blocked-operation capsules. TTL is
//! enforced lazily on every read and write; overflow evicts the oldest entry
//! (FIFO) rather than rejecting the new one, since a blocked operation that
//! just happened is more actionable than one the caller may have already
//! abandoned.

use parking_lot::Mutex;
use safeshell_core::pending_retry::{BlockedReason, PendingRetry, RetryId};
use safeshell_core::shell::ShellId;
use safeshell_core::Clock;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

struct State {
    /// Insertion order, for FIFO eviction on overflow.
    order: VecDeque<RetryId>,
    entries: HashMap<RetryId, PendingRetry>,
}

/// C13 Retry Manager: bounded mapping keyed by a locally-unique id, with a
/// TTL swept lazily (§4.13).
pub struct RetryManager {
    clock: Arc<dyn Clock>,
    cap: usize,
    ttl_ms: u64,
    next_seq: AtomicU64,
    state: Mutex<State>,
}

impl RetryManager {
    pub fn new(clock: Arc<dyn Clock>, cap: usize, ttl_ms: u64) -> Self {
        Self {
            clock,
            cap,
            ttl_ms,
            next_seq: AtomicU64::new(1),
            state: Mutex::new(State {
                order: VecDeque::new(),
                entries: HashMap::new(),
            }),
        }
    }

    /// Create a pending retry capsule (§4.13 `create`), pruning expired
    /// entries and evicting the oldest (FIFO) if at capacity (I3).
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        &self,
        code: String,
        script_hash: Option<String>,
        shell_id: ShellId,
        context: HashMap<String, String>,
        reason: BlockedReason,
    ) -> RetryId {
        let mut state = self.state.lock();
        self.sweep_expired_locked(&mut state);

        while state.entries.len() >= self.cap {
            if let Some(oldest) = state.order.pop_front() {
                state.entries.remove(&oldest);
            } else {
                break;
            }
        }

        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let id = RetryId::new(format!("retry-{seq}"));
        let entry = PendingRetry {
            id: id.clone(),
            code,
            script_hash,
            shell_id,
            context,
            reason,
            created_at_ms: self.clock.epoch_ms(),
        };
        state.order.push_back(id.clone());
        state.entries.insert(id.clone(), entry);
        id
    }

    /// Look up a pending retry without consuming it (§4.13 `get`). Returns
    /// `None` if absent or expired (expired entries are pruned as a side
    /// effect).
    pub fn get(&self, id: &RetryId) -> Option<PendingRetry> {
        let mut state = self.state.lock();
        self.sweep_expired_locked(&mut state);
        state.entries.get(id).cloned()
    }

    /// Consume a pending retry (§4.13 `consume`): returns it and deletes it,
    /// or `None` if absent/expired.
    pub fn consume(&self, id: &RetryId) -> Option<PendingRetry> {
        let mut state = self.state.lock();
        self.sweep_expired_locked(&mut state);
        let entry = state.entries.remove(id)?;
        state.order.retain(|existing| existing != id);
        Some(entry)
    }

    pub fn len(&self) -> usize {
        let mut state = self.state.lock();
        self.sweep_expired_locked(&mut state);
        state.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sweep_expired_locked(&self, state: &mut State) {
        let now = self.clock.epoch_ms();
        let ttl_ms = self.ttl_ms;
        state.entries.retain(|_, entry| !entry.is_expired(now, ttl_ms));
        state.order.retain(|id| state.entries.contains_key(id));
    }
}

#[cfg(test)]
#[path = "retry_manager_tests.rs"]
mod tests;
