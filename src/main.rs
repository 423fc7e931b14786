mod actions;
mod render;
mod state;
mod topics;

use streamdeck_lib::prelude::*;
use tracing::info;

use actions::{
    counter::CounterAction, history::HistoryAction, signal::SignalAction, status::StatusAction,
};

pub const PLUGIN_ID: &str = "icu.veelume.stepcounter";

fn main() -> anyhow::Result<()> {
    let _guard = init(PLUGIN_ID);
    info!("Starting V's Step Counter Stream Deck plugin");

    let plugin = Plugin::new()
        .add_action(ActionFactory::default_of::<CounterAction>())
        .add_action(ActionFactory::default_of::<SignalAction>())
        .add_action(ActionFactory::default_of::<HistoryAction>())
        .add_action(ActionFactory::default_of::<StatusAction>());

    run_plugin(plugin)
}
