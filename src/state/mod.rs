//! Counter core: value and step, change history, debounced persistence and
//! key-signal binding. Nothing in here talks to Stream Deck except
//! [`store::GlobalsStore`].

pub mod counter;
pub mod debounce;
pub mod history;
pub mod keys;
pub mod session;
pub mod store;

pub use debounce::SaveTicket;
pub use session::{CounterSession, Snapshot};
pub use store::GlobalsStore;
