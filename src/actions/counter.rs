use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicU64, Ordering},
};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use streamdeck_lib::prelude::*;
use tracing::debug;

use crate::render::render_number;
use crate::state::debounce::DEFAULT_QUIET_MS;
use crate::state::{CounterSession, GlobalsStore, SaveTicket};
use crate::topics::{COUNTER_CHANGED, CounterChanged, KEY_SIGNAL};

type SharedSession = Arc<Mutex<CounterSession>>;

/// Hosts one counter session per button. Short and long presses map to
/// configurable operations; `up`/`down` key signals from the bus adjust by the
/// current step.
pub struct CounterAction {
    session: Option<SharedSession>,
    // Monotonic origin for the session's millisecond clock
    mounted_at: Instant,

    // Long-press tracking
    holding: Arc<AtomicBool>,
    press_seq: u64,
    active_press_id: Arc<AtomicU64>,
    long_fired_press_id: Arc<AtomicU64>,

    // Cached settings
    settings: CounterSettings,
}

impl Default for CounterAction {
    fn default() -> Self {
        Self {
            session: None,
            mounted_at: Instant::now(),

            holding: Arc::new(AtomicBool::new(false)),
            press_seq: 0,
            active_press_id: Arc::new(AtomicU64::new(0)),
            long_fired_press_id: Arc::new(AtomicU64::new(0)),

            settings: CounterSettings::default(),
        }
    }
}

impl ActionStatic for CounterAction {
    const ID: &'static str = super::ids::COUNTER;
}

impl Action for CounterAction {
    fn id(&self) -> &str {
        Self::ID
    }

    fn topics(&self) -> &'static [&'static str] {
        &[KEY_SIGNAL.name]
    }

    fn init(&mut self, cx: &Context, ctx_id: &str) {
        let session = CounterSession::mount(Box::new(GlobalsStore::new(cx)));
        let count = session.count();
        self.mounted_at = Instant::now();
        self.session = Some(Arc::new(Mutex::new(session)));
        render_number(cx, ctx_id, count);
        cx.sd().get_settings(ctx_id);
    }

    fn did_receive_settings(&mut self, cx: &Context, ev: &incoming::DidReceiveSettings) {
        self.settings = parse_settings(&ev.settings);
        self.apply_settings();
        self.publish(cx, ev.context);
    }

    fn teardown(&mut self, _cx: &Context, _ctx_id: &str) {
        self.holding.store(false, Ordering::SeqCst);
        if let Some(session) = self.session.take() {
            if let Ok(mut s) = session.lock() {
                s.teardown();
            }
        }
    }

    fn key_down(&mut self, cx: &Context, ev: &incoming::KeyDown) {
        // Settings travel with every key event; keep the session in sync
        self.settings = parse_settings(&ev.settings);
        self.apply_settings();

        let Some(session) = self.session.clone() else {
            return;
        };

        // Start a new press epoch
        self.holding.store(true, Ordering::SeqCst);

        self.press_seq = self.press_seq.wrapping_add(1);
        let pid = self.press_seq;
        self.active_press_id.store(pid, Ordering::SeqCst);
        self.long_fired_press_id.store(0, Ordering::SeqCst);

        // Spawn the long-press timer thread
        let holding = Arc::clone(&self.holding);
        let active_id = Arc::clone(&self.active_press_id);
        let fired_id = Arc::clone(&self.long_fired_press_id);
        let cx2 = cx.clone();
        let ctx = ev.context.to_string();
        let long_action = self.settings.long_action;
        let long_press_ms = self.settings.long_press_ms;
        let origin = self.mounted_at;

        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(long_press_ms));

            // Only fire if still holding AND this is still the active press
            if !holding.load(Ordering::SeqCst) {
                return;
            }
            if active_id.load(Ordering::SeqCst) != pid {
                return;
            }
            if long_action == Op::None {
                return;
            }

            fired_id.store(pid, Ordering::SeqCst);
            run_op(&cx2, &ctx, &session, origin, long_action);
        });
    }

    fn key_up(&mut self, cx: &Context, ev: &incoming::KeyUp) {
        self.holding.store(false, Ordering::SeqCst);

        let pid = self.active_press_id.load(Ordering::SeqCst);
        if self.long_fired_press_id.load(Ordering::SeqCst) == pid {
            // Long press already handled this
            return;
        }

        let Some(session) = &self.session else {
            return;
        };
        run_op(cx, ev.context, session, self.mounted_at, self.settings.short_action);
    }

    fn on_notify(&mut self, cx: &Context, ctx_id: &str, event: &ErasedTopic) {
        let Some(sig) = event.downcast(KEY_SIGNAL) else {
            return;
        };
        let Some(session) = &self.session else {
            return;
        };
        let now = elapsed_ms(self.mounted_at);
        let ticket = match session.lock() {
            Ok(mut s) => s.handle_signal(&sig.name, now),
            Err(_) => return,
        };
        if let Some(ticket) = ticket {
            after_change(cx, ctx_id, session, self.mounted_at, ticket);
        }
    }
}

impl CounterAction {
    fn apply_settings(&self) {
        let Some(session) = &self.session else {
            return;
        };
        if let Ok(mut s) = session.lock() {
            let step = s.set_step(&self.settings.step);
            s.set_quiet_ms(self.settings.debounce_ms);
            debug!(step, debounce_ms = self.settings.debounce_ms, "counter settings applied");
        }
    }

    fn publish(&self, cx: &Context, ctx_id: &str) {
        if let Some(session) = &self.session {
            publish_snapshot(cx, ctx_id, session);
        }
    }
}

// ── Session driving ─────────────────────────────────────────────────────────

fn elapsed_ms(origin: Instant) -> u64 {
    origin.elapsed().as_millis().try_into().unwrap_or(u64::MAX)
}

fn run_op(cx: &Context, ctx_id: &str, session: &SharedSession, origin: Instant, op: Op) {
    let now = elapsed_ms(origin);
    let ticket = {
        let Ok(mut s) = session.lock() else {
            return;
        };
        match op {
            Op::None => return,
            Op::Increment => s.increment(now),
            Op::Decrement => s.decrement(now),
            Op::Reset => {
                s.reset();
                None
            }
        }
    };
    match ticket {
        Some(ticket) => after_change(cx, ctx_id, session, origin, ticket),
        // Reset (or a saturated no-op) still needs a redraw
        None => publish_snapshot(cx, ctx_id, session),
    }
}

/// Time left until `ticket` is due on the session clock.
fn save_delay(ticket: SaveTicket, now_ms: u64) -> Duration {
    Duration::from_millis(ticket.due_ms.saturating_sub(now_ms))
}

/// Redraw, notify listeners and arm the save timer for `ticket`.
fn after_change(
    cx: &Context,
    ctx_id: &str,
    session: &SharedSession,
    origin: Instant,
    ticket: SaveTicket,
) {
    publish_snapshot(cx, ctx_id, session);

    let session = Arc::clone(session);
    let cx2 = cx.clone();
    let ctx = ctx_id.to_string();

    std::thread::spawn(move || {
        std::thread::sleep(save_delay(ticket, elapsed_ms(origin)));

        // The liveness check and the write happen under the lock teardown takes
        let settled = match session.lock() {
            Ok(mut s) => s.fire_save(ticket).settled(),
            Err(_) => return,
        };
        if settled {
            publish_snapshot(&cx2, &ctx, &session);
        }
    });
}

fn publish_snapshot(cx: &Context, ctx_id: &str, session: &SharedSession) {
    let snapshot = match session.lock() {
        Ok(s) => s.snapshot(),
        Err(_) => return,
    };
    render_number(cx, ctx_id, snapshot.count);
    cx.bus().publish_t(COUNTER_CHANGED, CounterChanged { snapshot });
}

// ── Settings ────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    #[default]
    None,
    Increment,
    Decrement,
    Reset,
}

#[derive(Clone, Debug, PartialEq)]
struct CounterSettings {
    /// Raw step input; normalized by the session.
    step: String,
    short_action: Op,
    long_action: Op,
    long_press_ms: u64,
    debounce_ms: u64,
}

impl Default for CounterSettings {
    fn default() -> Self {
        Self {
            step: "1".to_string(),
            short_action: Op::Increment,
            long_action: Op::Reset,
            long_press_ms: 500,
            debounce_ms: DEFAULT_QUIET_MS,
        }
    }
}

fn parse_settings(v: &Map<String, Value>) -> CounterSettings {
    let mut s = CounterSettings::default();
    if let Some(raw) = get_raw(v, "step") {
        s.step = raw;
    }
    s.short_action = get_op(v, "shortAction").unwrap_or(Op::Increment);
    s.long_action = get_op(v, "longAction").unwrap_or(Op::Reset);
    if let Some(ms) = get_u64(v, "longPressMs") {
        s.long_press_ms = ms;
    }
    if let Some(ms) = get_u64(v, "debounceMs") {
        s.debounce_ms = ms.max(1);
    }
    s
}

/// Numbers and strings both come back as text so step parsing sees exactly
/// what the user typed.
fn get_raw(v: &Map<String, Value>, k: &str) -> Option<String> {
    match v.get(k)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn get_u64(v: &Map<String, Value>, k: &str) -> Option<u64> {
    match v.get(k) {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

fn get_op(v: &Map<String, Value>, k: &str) -> Option<Op> {
    serde_json::from_value(v.get(k)?.clone()).ok()
}
