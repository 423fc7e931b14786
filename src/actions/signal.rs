use serde_json::{Map, Value};
use streamdeck_lib::prelude::*;
use tracing::debug;

use crate::render::render_text;
use crate::topics::{KEY_SIGNAL, KeySignal};

const DEFAULT_SIGNAL: &str = "up";

/// A button that plays the role of a keyboard shortcut: pressing it emits its
/// configured signal name to every listening counter.
pub struct SignalAction {
    signal: String,
}

impl Default for SignalAction {
    fn default() -> Self {
        Self {
            signal: DEFAULT_SIGNAL.to_string(),
        }
    }
}

impl ActionStatic for SignalAction {
    const ID: &'static str = super::ids::SIGNAL;
}

impl Action for SignalAction {
    fn id(&self) -> &str {
        Self::ID
    }

    fn init(&mut self, cx: &Context, ctx_id: &str) {
        cx.sd().get_settings(ctx_id);
        render_text(cx, ctx_id, &label(&self.signal));
    }

    fn did_receive_settings(&mut self, cx: &Context, ev: &incoming::DidReceiveSettings) {
        self.signal = parse_settings(&ev.settings);
        render_text(cx, ev.context, &label(&self.signal));
    }

    fn key_up(&mut self, cx: &Context, _ev: &incoming::KeyUp) {
        debug!(signal = %self.signal, "key signal");
        cx.bus().publish_t(
            KEY_SIGNAL,
            KeySignal {
                name: self.signal.clone(),
            },
        );
    }
}

fn label(signal: &str) -> String {
    signal.to_uppercase()
}

// ── Settings ────────────────────────────────────────────────────────────────

fn parse_settings(v: &Map<String, Value>) -> String {
    v.get("signal")
        .and_then(|s| s.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SIGNAL)
        .to_string()
}
