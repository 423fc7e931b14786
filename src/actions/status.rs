use streamdeck_lib::prelude::*;

use crate::render::render_text;
use crate::topics::COUNTER_CHANGED;

/// Saving/Saved indicator for the counter's debounced persistence.
#[derive(Default)]
pub struct StatusAction {
    saving: Option<bool>,
}

impl ActionStatic for StatusAction {
    const ID: &'static str = super::ids::STATUS;
}

impl Action for StatusAction {
    fn id(&self) -> &str {
        Self::ID
    }

    fn topics(&self) -> &'static [&'static str] {
        &[COUNTER_CHANGED.name]
    }

    fn init(&mut self, cx: &Context, ctx_id: &str) {
        render_text(cx, ctx_id, status_text(self.saving.unwrap_or(false)));
    }

    fn on_notify(&mut self, cx: &Context, ctx_id: &str, event: &ErasedTopic) {
        if let Some(msg) = event.downcast(COUNTER_CHANGED) {
            let saving = msg.snapshot.saving;
            if self.saving == Some(saving) {
                return;
            }
            self.saving = Some(saving);
            render_text(cx, ctx_id, status_text(saving));
        }
    }
}

fn status_text(saving: bool) -> &'static str {
    if saving { "Saving..." } else { "Saved" }
}

#[cfg(test)]
mod tests {
    use super::status_text;

    #[test]
    fn indicator_text() {
        assert_eq!(status_text(true), "Saving...");
        assert_eq!(status_text(false), "Saved");
    }
}
