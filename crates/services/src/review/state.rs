use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use flashdeck_core::model::{CardId, Flashcard};
use flashdeck_core::{CollectionError, CollectionModel, DeleteBusy, MutationGuard};

/// Everything a review screen mutates: the collection and its delete guard.
#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub(crate) collection: CollectionModel,
    pub(crate) guard: MutationGuard,
    /// Ids whose deletion the store confirmed during this session. Store ids are never
    /// reused, so a fetch that still lists one of these started before the delete landed.
    confirmed_deleted: HashSet<CardId>,
}

impl SessionState {
    /// Load a fetched list, skipping cards deleted after the fetch began.
    ///
    /// Returns `(stale, duplicates)`: how many records were skipped for each reason.
    pub(crate) fn load_fetched(&mut self, records: Vec<Flashcard>) -> (usize, usize) {
        let fetched = records.len();
        let fresh: Vec<Flashcard> = records
            .into_iter()
            .filter(|card| !self.confirmed_deleted.contains(&card.id()))
            .collect();
        let stale = fetched - fresh.len();
        let duplicates = self.collection.load(fresh);
        (stale, duplicates)
    }
}

pub(crate) type SharedState = Arc<Mutex<SessionState>>;

/// Run `f` with the state locked. The lock is never held across an await.
pub(crate) fn with_state<R>(state: &Mutex<SessionState>, f: impl FnOnce(&mut SessionState) -> R) -> R {
    let mut guard = state.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut guard)
}

/// Proof of admission through the `MutationGuard`.
///
/// Dropping the ticket releases the guard, so every exit path of the deletion flow
/// (rejection, store error, panic, aborted task) frees it. The ticket only holds a weak
/// reference: once the controller is gone, reconciliation and release are no-ops.
#[derive(Debug)]
pub(crate) struct DeleteTicket {
    state: Weak<Mutex<SessionState>>,
    id: CardId,
    released: bool,
}

impl DeleteTicket {
    pub(crate) fn admit(state: &SharedState, id: CardId) -> Result<Self, DeleteBusy> {
        with_state(state, |s| s.guard.try_begin_delete(id))?;
        Ok(Self {
            state: Arc::downgrade(state),
            id,
            released: false,
        })
    }

    pub(crate) fn id(&self) -> CardId {
        self.id
    }

    /// Apply a confirmed deletion locally and release the guard in one step.
    ///
    /// Returns `None` when the controller has been torn down.
    pub(crate) fn reconcile(mut self) -> Option<Result<(), CollectionError>> {
        let state = self.state.upgrade()?;
        let id = self.id;
        let removed = with_state(&state, |s| {
            s.confirmed_deleted.insert(id);
            let removed = s.collection.remove_by_id(id).map(|_| ());
            s.guard.end_delete();
            removed
        });
        self.released = true;
        Some(removed)
    }
}

impl Drop for DeleteTicket {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Some(state) = self.state.upgrade() {
            with_state(&state, |s| s.guard.end_delete());
        }
    }
}
