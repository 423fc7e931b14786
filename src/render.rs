use std::sync::OnceLock;

use streamdeck_lib::Context;
use streamdeck_render::{Canvas, FontHandle, FontRegistry, TextOptions, WrapOptions, wrap_text};
use tracing::warn;

// Relative to the plugin bundle, which Stream Deck uses as the working directory.
const FONT_PATH: &str = "fonts/UAV-OSD-Sans-Mono.ttf";

static FONT: OnceLock<Option<FontHandle>> = OnceLock::new();

fn font() -> Option<&'static FontHandle> {
    FONT.get_or_init(|| {
        let bytes = match std::fs::read(FONT_PATH) {
            Ok(b) => b,
            Err(e) => {
                warn!(path = FONT_PATH, error = %e, "font not found; buttons will not render");
                return None;
            }
        };
        // Loaded once per process; the registry wants 'static bytes.
        let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
        let mut reg = FontRegistry::new();
        let handle = reg.load_bytes("mono", bytes).ok();
        if handle.is_none() {
            warn!(path = FONT_PATH, "font failed to load; buttons will not render");
        }
        handle
    })
    .as_ref()
}

/// Render the counter value (144×144 PNG), shrinking the font for long numbers.
pub fn render_number(cx: &Context, ctx_id: &str, value: i64) {
    render_lines(cx, ctx_id, &[value.to_string()]);
}

/// Short label or status text, one line.
pub fn render_text(cx: &Context, ctx_id: &str, text: &str) {
    render_lines(cx, ctx_id, &[text.to_string()]);
}

/// The last `max` history entries, numbered by their position in the full log,
/// one entry per line.
pub fn render_history(cx: &Context, ctx_id: &str, history: &[i64], max: usize) {
    render_lines(cx, ctx_id, &history_lines(history, max));
}

fn history_lines(history: &[i64], max: usize) -> Vec<String> {
    if history.is_empty() {
        return vec!["-".to_string()];
    }
    let skip = history.len().saturating_sub(max.max(1));
    history
        .iter()
        .enumerate()
        .skip(skip)
        .map(|(i, v)| format!("{}. {}", i + 1, v))
        .collect()
}

/// Each entry gets exactly one line; the font shrinks until every entry fits
/// the width and all lines fit the height.
fn render_lines(cx: &Context, ctx_id: &str, entries: &[String]) {
    let Some(font) = font() else {
        return;
    };

    // Try font sizes from largest to smallest until the text fits.
    let sizes = [56.0_f32, 44.0, 36.0, 28.0, 20.0];
    let max_width = 136.0_f32; // leave a small margin inside 144px
    let max_height = 136.0_f32;

    let opts = WrapOptions { max_width, max_lines: 1 };
    let layout = |size: f32| {
        let mut lines = Vec::new();
        for entry in entries {
            lines.extend(wrap_text(font, size, entry, &opts));
        }
        lines
    };
    let fits = |size: f32| {
        let lines = layout(size);
        lines.len() == entries.len()
            && lines.iter().all(|l| l.width_px <= max_width)
            && size * lines.len() as f32 <= max_height
    };
    // fallback: always render at minimum size
    let chosen_size = sizes.iter().copied().find(|&s| fits(s)).unwrap_or(20.0);

    let lines = layout(chosen_size);

    let mut canvas = Canvas::key_icon();
    if !lines.is_empty() {
        canvas
            .draw_text(&lines, &TextOptions::new(font.clone(), chosen_size))
            .ok();
    }

    if let Ok(data_url) = canvas.finish().to_data_url() {
        cx.sd().set_image(ctx_id, Some(data_url), None, None);
    }
}

#[cfg(test)]
mod tests {
    use super::history_lines;

    #[test]
    fn history_lines_number_recent_entries() {
        assert_eq!(history_lines(&[0, 1, 2, 3], 3), ["2. 1", "3. 2", "4. 3"]);
        assert_eq!(history_lines(&[5], 3), ["1. 5"]);
        assert_eq!(history_lines(&[], 3), ["-"]);
        assert_eq!(history_lines(&[1, 2], 0), ["2. 2"]);
    }

    #[test]
    fn each_entry_stays_whole() {
        let lines = history_lines(&[-100, 2_000_000, -3], 3);
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|l| !l.contains('\n')));
        assert_eq!(lines[1], "2. 2000000");
    }
}
