use serde_json::{Map, Value};
use streamdeck_lib::prelude::*;

use crate::render::render_history;
use crate::topics::COUNTER_CHANGED;

const DEFAULT_ENTRIES: usize = 3;

/// Shows the most recent counter values, numbered.
pub struct HistoryAction {
    entries: usize,
    last: Vec<i64>,
}

impl Default for HistoryAction {
    fn default() -> Self {
        Self {
            entries: DEFAULT_ENTRIES,
            last: Vec::new(),
        }
    }
}

impl ActionStatic for HistoryAction {
    const ID: &'static str = super::ids::HISTORY;
}

impl Action for HistoryAction {
    fn id(&self) -> &str {
        Self::ID
    }

    fn topics(&self) -> &'static [&'static str] {
        &[COUNTER_CHANGED.name]
    }

    fn init(&mut self, cx: &Context, ctx_id: &str) {
        cx.sd().get_settings(ctx_id);
        render_history(cx, ctx_id, &self.last, self.entries);
    }

    fn did_receive_settings(&mut self, cx: &Context, ev: &incoming::DidReceiveSettings) {
        self.entries = parse_settings(&ev.settings);
        render_history(cx, ev.context, &self.last, self.entries);
    }

    fn on_notify(&mut self, cx: &Context, ctx_id: &str, event: &ErasedTopic) {
        if let Some(msg) = event.downcast(COUNTER_CHANGED) {
            // Saves republish the same history; skip the redraw
            if msg.snapshot.history == self.last {
                return;
            }
            self.last = msg.snapshot.history.clone();
            render_history(cx, ctx_id, &self.last, self.entries);
        }
    }
}

// ── Settings ────────────────────────────────────────────────────────────────

fn parse_settings(v: &Map<String, Value>) -> usize {
    let n = match v.get("entries") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    n.and_then(|n| usize::try_from(n).ok())
        .filter(|&n| n > 0)
        .unwrap_or(DEFAULT_ENTRIES)
}
