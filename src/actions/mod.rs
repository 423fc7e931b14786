pub mod counter;
pub mod history;
pub mod signal;
pub mod status;

pub mod ids {
    use crate::PLUGIN_ID;

    pub const COUNTER: &str = const_format::concatcp!(PLUGIN_ID, ".counter");
    pub const SIGNAL: &str = const_format::concatcp!(PLUGIN_ID, ".signal");
    pub const HISTORY: &str = const_format::concatcp!(PLUGIN_ID, ".history");
    pub const STATUS: &str = const_format::concatcp!(PLUGIN_ID, ".status");
}
