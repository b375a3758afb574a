use crate::error::DeleteBusy;
use crate::model::CardId;

/// Single-flight admission for destructive operations.
///
/// At most one delete is admitted at a time across the whole collection. A second
/// request is refused, never queued, even when it targets the card already in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationGuard {
    in_flight: Option<CardId>,
}

impl MutationGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a delete for `id` if nothing else is running.
    ///
    /// # Errors
    ///
    /// Returns `DeleteBusy` naming the card currently being deleted.
    pub fn try_begin_delete(&mut self, id: CardId) -> Result<(), DeleteBusy> {
        match self.in_flight {
            Some(in_flight) => Err(DeleteBusy { in_flight }),
            None => {
                self.in_flight = Some(id);
                Ok(())
            }
        }
    }

    /// Release the guard. Safe to call when nothing is in flight.
    pub fn end_delete(&mut self) {
        self.in_flight = None;
    }

    #[must_use]
    pub fn in_flight(&self) -> Option<CardId> {
        self.in_flight
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }
}
