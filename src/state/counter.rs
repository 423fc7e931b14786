use std::sync::{
    Arc,
    atomic::{AtomicI64, Ordering},
};

use tracing::debug;

pub const DEFAULT_STEP: i64 = 1;

/// Latest-value cell for the step multiplier.
///
/// The store is the only writer. Readers (the key binder) load it at dispatch
/// time so a listener bound once still sees every later step change.
#[derive(Clone, Debug)]
pub struct StepCell(Arc<AtomicI64>);

impl StepCell {
    fn new(step: i64) -> Self {
        Self(Arc::new(AtomicI64::new(step)))
    }

    pub fn get(&self) -> i64 {
        self.0.load(Ordering::Relaxed)
    }

    fn set(&self, step: i64) {
        self.0.store(step, Ordering::Relaxed);
    }
}

/// Count and step. Every mutation returns the new count when it changed.
#[derive(Debug)]
pub struct CounterState {
    count: i64,
    step: StepCell,
}

impl CounterState {
    pub fn new(initial: i64) -> Self {
        Self {
            count: initial,
            step: StepCell::new(DEFAULT_STEP),
        }
    }

    pub fn count(&self) -> i64 {
        self.count
    }

    pub fn step(&self) -> i64 {
        self.step.get()
    }

    /// Handle for readers that must not capture the step by value.
    pub fn step_cell(&self) -> StepCell {
        self.step.clone()
    }

    pub fn increment(&mut self) -> Option<i64> {
        self.adjust(self.step())
    }

    pub fn decrement(&mut self) -> Option<i64> {
        self.adjust(self.step().saturating_neg())
    }

    pub fn adjust(&mut self, delta: i64) -> Option<i64> {
        self.assign(self.count.saturating_add(delta))
    }

    /// Absolute assignment; `None` when the count is unchanged.
    pub fn assign(&mut self, next: i64) -> Option<i64> {
        if next == self.count {
            return None;
        }
        self.count = next;
        Some(next)
    }

    pub fn set_step(&mut self, raw: &str) -> i64 {
        let step = parse_step(raw);
        self.step.set(step);
        step
    }
}

/// Normalize raw step input. Non-numeric, non-finite, zero and negative values
/// become 1; fractions truncate toward zero.
pub fn parse_step(raw: &str) -> i64 {
    let t = raw.trim();
    if let Ok(n) = t.parse::<i64>() {
        return if n >= 1 { n } else { DEFAULT_STEP };
    }
    match t.parse::<f64>() {
        Ok(f) if f.is_finite() && f >= 1.0 => {
            // `as` saturates at i64::MAX for huge inputs
            f.trunc() as i64
        }
        _ => {
            debug!(raw, "step input normalized to default");
            DEFAULT_STEP
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_normalization() {
        assert_eq!(parse_step("5"), 5);
        assert_eq!(parse_step(" 12 "), 12);
        assert_eq!(parse_step("0"), 1);
        assert_eq!(parse_step("abc"), 1);
        assert_eq!(parse_step(""), 1);
        assert_eq!(parse_step("-3"), 1);
        assert_eq!(parse_step("2.7"), 2);
        assert_eq!(parse_step("0.5"), 1);
        assert_eq!(parse_step("NaN"), 1);
        assert_eq!(parse_step("inf"), 1);
        assert_eq!(parse_step("1e30"), i64::MAX);
    }

    #[test]
    fn relative_moves_follow_step() {
        let mut s = CounterState::new(0);
        s.set_step("3");
        for _ in 0..4 {
            s.increment();
        }
        s.decrement();
        assert_eq!(s.count(), 9);
    }

    #[test]
    fn net_moves_equal_difference_times_step() {
        for step in [1_i64, 2, 7] {
            let mut s = CounterState::new(-4);
            s.set_step(&step.to_string());
            let pattern = [true, true, false, true, false, false, false, true, true];
            let (mut inc, mut dec) = (0_i64, 0_i64);
            for up in pattern {
                if up {
                    s.increment();
                    inc += 1;
                } else {
                    s.decrement();
                    dec += 1;
                }
            }
            assert_eq!(s.count(), -4 + (inc - dec) * step);
        }
    }

    #[test]
    fn arithmetic_saturates() {
        let mut s = CounterState::new(i64::MAX - 1);
        s.set_step("5");
        assert_eq!(s.increment(), Some(i64::MAX));
        assert_eq!(s.increment(), None);
    }

    #[test]
    fn step_cell_sees_later_updates() {
        let mut s = CounterState::new(0);
        let cell = s.step_cell();
        s.set_step("5");
        assert_eq!(cell.get(), 5);
        s.set_step("abc");
        assert_eq!(cell.get(), 1);
    }
}
