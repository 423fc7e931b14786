use tracing::debug;

use super::counter::StepCell;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    Up,
    Down,
}

impl Signal {
    /// Recognizes `up`/`down` and their `ArrowUp`/`ArrowDown` aliases,
    /// ignoring case. Anything else is not ours.
    pub fn parse(name: &str) -> Option<Self> {
        let n = name.trim();
        if n.eq_ignore_ascii_case("up") || n.eq_ignore_ascii_case("arrowup") {
            Some(Self::Up)
        } else if n.eq_ignore_ascii_case("down") || n.eq_ignore_ascii_case("arrowdown") {
            Some(Self::Down)
        } else {
            None
        }
    }
}

/// Session-owned listener registration for the global key-signal source.
#[derive(Debug)]
pub struct KeyBinder {
    step: StepCell,
    attached: bool,
    detached: bool,
}

impl KeyBinder {
    pub fn new(step: StepCell) -> Self {
        Self {
            step,
            attached: false,
            detached: false,
        }
    }

    /// Register once. Returns `false` on any repeat call, including after detach.
    pub fn attach(&mut self) -> bool {
        if self.attached || self.detached {
            return false;
        }
        self.attached = true;
        debug!("key signal listener attached");
        true
    }

    /// Deregister once. Returns `false` if never attached or already detached.
    pub fn detach(&mut self) -> bool {
        if !self.attached {
            return false;
        }
        self.attached = false;
        self.detached = true;
        debug!("key signal listener detached");
        true
    }

    #[cfg(test)]
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Relative adjustment for `name`, using the step current right now.
    pub fn dispatch(&self, name: &str) -> Option<i64> {
        if !self.attached {
            return None;
        }
        let step = self.step.get();
        match Signal::parse(name)? {
            Signal::Up => Some(step),
            Signal::Down => Some(step.saturating_neg()),
        }
    }
}
