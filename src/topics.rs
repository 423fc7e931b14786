use streamdeck_lib::TopicId;

use crate::state::Snapshot;

/// Published after every counter change and every settled save.
/// Subscribed by `HistoryAction` and `StatusAction`.
pub const COUNTER_CHANGED: TopicId<CounterChanged> = TopicId::new("counter_changed");

/// The plugin-wide key-signal source. `SignalAction` publishes, every
/// `CounterAction` listens.
pub const KEY_SIGNAL: TopicId<KeySignal> = TopicId::new("key_signal");

#[derive(Clone, Debug)]
pub struct CounterChanged {
    pub snapshot: Snapshot,
}

#[derive(Clone, Debug)]
pub struct KeySignal {
    pub name: String,
}
