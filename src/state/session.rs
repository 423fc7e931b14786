use tracing::{info, warn};

use super::counter::CounterState;
use super::debounce::{DEFAULT_QUIET_MS, Debouncer, FireOutcome, SaveTicket};
use super::history::History;
use super::keys::KeyBinder;
use super::store::KvStore;

/// Key the count is persisted under.
pub const STORAGE_KEY: &str = "counter";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    Mounted,
    Unmounted,
}

/// Observable state handed to the presentation layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub count: i64,
    pub history: Vec<i64>,
    pub saving: bool,
}

/// One counter session: state, history, debounced persistence and the key
/// binding, wired together.
///
/// Every mutation that changes the count records it in the history and
/// reschedules the save; the returned [`SaveTicket`] is what the caller arms a
/// timer with. Times are milliseconds on a caller-supplied monotonic clock.
pub struct CounterSession {
    state: CounterState,
    history: History,
    saver: Debouncer,
    keys: KeyBinder,
    store: Box<dyn KvStore>,
    lifecycle: Lifecycle,
}

impl CounterSession {
    pub fn mount(store: Box<dyn KvStore>) -> Self {
        Self::mount_with(store, DEFAULT_QUIET_MS)
    }

    pub fn mount_with(store: Box<dyn KvStore>, quiet_ms: u64) -> Self {
        let initial = load_initial(store.as_ref());
        let state = CounterState::new(initial);
        let mut keys = KeyBinder::new(state.step_cell());
        keys.attach();
        info!(initial, "counter session mounted");
        Self {
            state,
            history: History::seeded(initial),
            saver: Debouncer::new(STORAGE_KEY, quiet_ms),
            keys,
            store,
            lifecycle: Lifecycle::Mounted,
        }
    }

    pub fn count(&self) -> i64 {
        self.state.count()
    }

    #[cfg(test)]
    pub fn step(&self) -> i64 {
        self.state.step()
    }

    #[cfg(test)]
    pub fn history(&self) -> &[i64] {
        self.history.entries()
    }

    pub fn is_saving(&self) -> bool {
        self.saver.is_saving()
    }

    #[cfg(test)]
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    #[cfg(test)]
    pub fn keys_attached(&self) -> bool {
        self.keys.is_attached()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            count: self.count(),
            history: self.history.entries().to_vec(),
            saving: self.is_saving(),
        }
    }

    pub fn increment(&mut self, now_ms: u64) -> Option<SaveTicket> {
        if !self.mounted() {
            return None;
        }
        let next = self.state.increment()?;
        self.changed(next, now_ms)
    }

    pub fn decrement(&mut self, now_ms: u64) -> Option<SaveTicket> {
        if !self.mounted() {
            return None;
        }
        let next = self.state.decrement()?;
        self.changed(next, now_ms)
    }

    /// Returns the normalized step.
    pub fn set_step(&mut self, raw: &str) -> i64 {
        if !self.mounted() {
            return self.state.step();
        }
        self.state.set_step(raw)
    }

    pub fn set_quiet_ms(&mut self, quiet_ms: u64) {
        self.saver.set_quiet_ms(quiet_ms);
    }

    /// Count to 0, history emptied, persisted value removed. Not recorded as a
    /// transition and never followed by a save.
    pub fn reset(&mut self) {
        if !self.mounted() {
            return;
        }
        self.saver.cancel();
        self.state.assign(0);
        self.history.clear();
        if let Err(e) = self.store.remove(STORAGE_KEY) {
            warn!(key = STORAGE_KEY, error = %e, "failed to clear persisted counter; ignoring");
        }
        info!("counter reset");
    }

    /// Route a named key signal through the binder.
    pub fn handle_signal(&mut self, name: &str, now_ms: u64) -> Option<SaveTicket> {
        if !self.mounted() {
            return None;
        }
        let delta = self.keys.dispatch(name)?;
        let next = self.state.adjust(delta)?;
        self.changed(next, now_ms)
    }

    /// Timer callback for `ticket`.
    pub fn fire_save(&mut self, ticket: SaveTicket) -> FireOutcome {
        let value = self.state.count();
        self.saver.fire(ticket, value, self.store.as_mut())
    }

    /// Fire the pending save if it is due at `now_ms`.
    #[cfg(test)]
    pub fn poll_save(&mut self, now_ms: u64) -> Option<FireOutcome> {
        let value = self.state.count();
        self.saver.poll(now_ms, value, self.store.as_mut())
    }

    /// MOUNTED -> UNMOUNTED. Safe to call more than once.
    pub fn teardown(&mut self) {
        if !self.mounted() {
            return;
        }
        self.saver.teardown();
        self.keys.detach();
        self.lifecycle = Lifecycle::Unmounted;
        info!(count = self.state.count(), "counter session torn down");
    }

    fn mounted(&self) -> bool {
        self.lifecycle == Lifecycle::Mounted
    }

    fn changed(&mut self, next: i64, now_ms: u64) -> Option<SaveTicket> {
        self.history.record(next);
        self.saver.schedule(now_ms)
    }
}

fn load_initial(store: &dyn KvStore) -> i64 {
    match store.get(STORAGE_KEY) {
        Ok(Some(raw)) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key = STORAGE_KEY, raw = %raw, "persisted counter unreadable; starting at 0");
            0
        }),
        Ok(None) => 0,
        Err(e) => {
            warn!(key = STORAGE_KEY, error = %e, "failed to load counter; starting at 0");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::store::memory::MemoryStore;

    fn mount(store: &MemoryStore) -> CounterSession {
        CounterSession::mount(Box::new(store.clone()))
    }

    #[test]
    fn starts_from_persisted_value() {
        let store = MemoryStore::with_value(STORAGE_KEY, "42");
        let s = mount(&store);
        assert_eq!(s.count(), 42);
        assert_eq!(s.history(), &[42]);
        assert!(s.keys_attached());
        assert!(!s.is_saving());
    }

    #[test]
    fn load_failures_fall_back_to_zero() {
        let garbage = MemoryStore::with_value(STORAGE_KEY, "forty-two");
        assert_eq!(mount(&garbage).count(), 0);

        let broken = MemoryStore::with_value(STORAGE_KEY, "42");
        broken.fail_reads(true);
        assert_eq!(mount(&broken).count(), 0);
    }

    #[test]
    fn walkthrough_from_empty_store() {
        let store = MemoryStore::default();
        let mut s = mount(&store);
        assert_eq!(s.count(), 0);
        assert_eq!(s.history(), &[0]);

        for t in [0, 10, 20] {
            s.handle_signal("up", t);
        }
        assert_eq!(s.count(), 3);
        assert_eq!(s.history(), &[0, 1, 2, 3]);

        assert_eq!(s.set_step("4"), 4);
        s.handle_signal("down", 30);
        assert_eq!(s.count(), -1);
        assert_eq!(s.history(), &[0, 1, 2, 3, -1]);

        s.reset();
        assert_eq!(s.count(), 0);
        assert!(s.history().is_empty());
        assert_eq!(store.value(STORAGE_KEY), None);
    }

    #[test]
    fn reset_removes_key_and_stays_removed() {
        let store = MemoryStore::with_value(STORAGE_KEY, "5");
        let mut s = mount(&store);
        s.increment(0);
        s.reset();
        assert_eq!(store.value(STORAGE_KEY), None);
        assert!(!s.is_saving());
        // the save scheduled before reset was cancelled
        assert_eq!(s.poll_save(10_000), None);
        assert_eq!(store.value(STORAGE_KEY), None);
    }

    #[test]
    fn reset_with_failing_store_is_silent() {
        let store = MemoryStore::with_value(STORAGE_KEY, "5");
        let mut s = mount(&store);
        store.fail_writes(true);
        s.reset();
        assert_eq!(s.count(), 0);
        assert!(s.history().is_empty());
    }

    #[test]
    fn debounced_save_writes_latest_value_once() {
        let store = MemoryStore::default();
        let mut s = mount(&store);
        s.increment(0);
        s.increment(100);
        s.increment(200);
        assert!(s.is_saving());

        assert_eq!(s.poll_save(400), None);
        assert_eq!(s.poll_save(500), None);
        assert_eq!(s.poll_save(600), Some(FireOutcome::Written));
        assert_eq!(store.writes(), vec![(STORAGE_KEY.to_string(), "3".to_string())]);
        assert!(!s.is_saving());
    }

    #[test]
    fn persisted_value_is_count_at_fire_time() {
        let store = MemoryStore::default();
        let mut s = mount(&store);
        let stale = s.increment(0).unwrap();
        let live = s.increment(50).unwrap();
        assert_eq!(s.fire_save(stale), FireOutcome::Stale);
        assert_eq!(s.fire_save(live), FireOutcome::Written);
        assert_eq!(store.value(STORAGE_KEY).as_deref(), Some("2"));
    }

    #[test]
    fn teardown_before_quiet_interval_writes_nothing() {
        let store = MemoryStore::default();
        let mut s = mount(&store);
        let ticket = s.increment(0).unwrap();
        s.teardown();

        assert_eq!(s.fire_save(ticket), FireOutcome::Suppressed);
        assert_eq!(s.poll_save(1_000), None);
        assert!(store.writes().is_empty());
        assert_eq!(s.lifecycle(), Lifecycle::Unmounted);
        assert!(!s.keys_attached());
    }

    #[test]
    fn unmounted_session_ignores_mutations() {
        let store = MemoryStore::default();
        let mut s = mount(&store);
        s.teardown();
        s.teardown();
        assert!(s.increment(0).is_none());
        assert!(s.handle_signal("up", 0).is_none());
        s.reset();
        assert_eq!(s.count(), 0);
        assert_eq!(s.history(), &[0]);
    }

    #[test]
    fn step_change_applies_to_bound_listener() {
        let store = MemoryStore::default();
        let mut s = mount(&store);
        s.set_step("5");
        s.handle_signal("up", 0);
        assert_eq!(s.count(), 5);

        s.set_step("0");
        s.handle_signal("up", 10);
        assert_eq!(s.count(), 6);

        s.set_step("abc");
        assert_eq!(s.step(), 1);
    }

    #[test]
    fn unknown_signal_changes_nothing() {
        let store = MemoryStore::default();
        let mut s = mount(&store);
        assert!(s.handle_signal("space", 0).is_none());
        assert_eq!(s.history(), &[0]);
        assert!(!s.is_saving());
    }

    #[test]
    fn write_failure_is_swallowed() {
        let store = MemoryStore::default();
        store.fail_writes(true);
        let mut s = mount(&store);
        s.decrement(0);
        assert_eq!(s.poll_save(400), Some(FireOutcome::Failed));
        assert!(!s.is_saving());
        assert_eq!(s.count(), -1);
    }

    #[test]
    fn snapshot_reflects_session() {
        let store = MemoryStore::default();
        let mut s = mount(&store);
        s.set_step("2");
        s.increment(0);
        assert_eq!(
            s.snapshot(),
            Snapshot {
                count: 2,
                history: vec![0, 2],
                saving: true,
            }
        );
    }
}
