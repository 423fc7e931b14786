use tracing::{debug, warn};

use super::store::KvStore;

pub const DEFAULT_QUIET_MS: u64 = 400;

/// Handle for one scheduled save. Whoever arms the timer waits until `due_ms`
/// on the session clock and hands it back to [`Debouncer::fire`]; a ticket that
/// is no longer the pending one is inert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SaveTicket {
    pub epoch: u64,
    pub due_ms: u64,
}

/// What happened when a ticket fired.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FireOutcome {
    Written,
    /// Write attempted and failed; the failure was logged and dropped.
    Failed,
    /// Superseded or cancelled ticket.
    Stale,
    /// The session was torn down.
    Suppressed,
}

impl FireOutcome {
    /// Whether the saving flag changed as a result of this fire.
    pub fn settled(self) -> bool {
        matches!(self, Self::Written | Self::Failed)
    }
}

/// IDLE/PENDING save scheduler. At most one save is ever pending.
#[derive(Debug)]
pub struct Debouncer {
    key: &'static str,
    quiet_ms: u64,
    epoch_seq: u64,
    pending: Option<SaveTicket>,
    saving: bool,
    alive: bool,
}

impl Debouncer {
    pub fn new(key: &'static str, quiet_ms: u64) -> Self {
        Self {
            key,
            quiet_ms: quiet_ms.max(1),
            epoch_seq: 0,
            pending: None,
            saving: false,
            alive: true,
        }
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    #[cfg(test)]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn set_quiet_ms(&mut self, quiet_ms: u64) {
        self.quiet_ms = quiet_ms.max(1);
    }

    /// Cancel whatever is pending and schedule a fresh save.
    pub fn schedule(&mut self, now_ms: u64) -> Option<SaveTicket> {
        if !self.alive {
            return None;
        }
        self.cancel();
        self.epoch_seq = self.epoch_seq.wrapping_add(1);
        let ticket = SaveTicket {
            epoch: self.epoch_seq,
            due_ms: now_ms.saturating_add(self.quiet_ms),
        };
        self.pending = Some(ticket);
        self.saving = true;
        Some(ticket)
    }

    /// Drop the pending save, if any. The saving flag clears unless the
    /// session is already gone.
    pub fn cancel(&mut self) -> bool {
        let had = self.pending.take().is_some();
        if had && self.alive {
            self.saving = false;
        }
        had
    }

    /// Commit `ticket` if it is still the pending one, writing `value`.
    pub fn fire(
        &mut self,
        ticket: SaveTicket,
        value: i64,
        store: &mut dyn KvStore,
    ) -> FireOutcome {
        if !self.alive {
            return FireOutcome::Suppressed;
        }
        if self.pending.map(|p| p.epoch) != Some(ticket.epoch) {
            return FireOutcome::Stale;
        }
        self.pending = None;
        self.commit(value, store)
    }

    /// Fire the pending save if its quiet interval has elapsed at `now_ms`.
    #[cfg(test)]
    pub fn poll(
        &mut self,
        now_ms: u64,
        value: i64,
        store: &mut dyn KvStore,
    ) -> Option<FireOutcome> {
        let ticket = self.pending.filter(|p| now_ms >= p.due_ms)?;
        Some(self.fire(ticket, value, store))
    }

    /// Terminal: nothing is written and the flag is frozen from here on.
    pub fn teardown(&mut self) {
        self.pending = None;
        self.alive = false;
    }

    fn commit(&mut self, value: i64, store: &mut dyn KvStore) -> FireOutcome {
        let outcome = match store.set(self.key, &value.to_string()) {
            Ok(()) => {
                debug!(key = self.key, value, "counter saved");
                FireOutcome::Written
            }
            Err(e) => {
                warn!(key = self.key, error = %e, "counter save failed; ignoring");
                FireOutcome::Failed
            }
        };
        self.saving = false;
        outcome
    }
}
